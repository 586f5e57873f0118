//! # snapline-store
//!
//! Viewer-local state for social interactions.
//!
//! [`InteractionStore`] holds the fetched posts and profiles in memory and
//! applies like, bookmark and follow toggles optimistically. Every toggle
//! that needs backend confirmation yields an [`Intent`]; the caller sends
//! it and reports back through [`InteractionStore::confirm`] or
//! [`InteractionStore::compensate`]. Nothing here performs I/O.

pub mod intent;
pub mod interactions;
pub mod models;

mod error;

pub use error::StoreError;
pub use intent::{Compensation, Intent, IntentAction, Outcome};
pub use interactions::{BookmarkSync, InteractionStore};
pub use models::*;
