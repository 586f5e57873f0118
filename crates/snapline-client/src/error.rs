use thiserror::Error;

use snapline_net::NetworkError;
use snapline_store::StoreError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Playback error: {0}")]
    Playback(#[from] PlaybackError),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

/// Invalid story playback requests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("Story sequence is empty")]
    EmptySequence,

    #[error("Story index {index} out of range (sequence has {len})")]
    OutOfRange { index: usize, len: usize },
}

impl<T> From<std::sync::PoisonError<T>> for ClientError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        Self::LockPoisoned(e.to_string())
    }
}
