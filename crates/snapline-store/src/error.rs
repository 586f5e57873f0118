use thiserror::Error;

use crate::models::ItemKey;

/// Contract violations reported synchronously by the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No item with this key is present.
    #[error("Item not found: {0}")]
    NotFound(ItemKey),

    /// An item with this key already exists.
    #[error("Item already exists: {0}")]
    Conflict(ItemKey),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
