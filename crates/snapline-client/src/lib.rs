//! # snapline-client
//!
//! Client core for Snapline: optimistic feed interactions reconciled with
//! the backend, and the story viewer.

pub mod config;
pub mod error;
pub mod events;
pub mod feed;
pub mod state;
pub mod story;

mod reconcile;

#[cfg(test)]
mod test_support;

pub use config::{ClientConfig, ReconcilePolicy};
pub use error::{ClientError, PlaybackError};
pub use events::{ClientEvent, EventBus};
pub use feed::{FeedService, PendingConfirmation};
pub use state::AppState;
pub use story::{PlaybackSignal, PlaybackSnapshot, StoryPlayback, StoryPlayer, StoryItem, StorySequence};

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// default filter.
///
/// Panics if a global subscriber is already installed.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("snapline_client=debug,snapline_net=debug,snapline_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
