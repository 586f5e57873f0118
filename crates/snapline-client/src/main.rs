//! # snapline
//!
//! Headless Snapline client. Fetches the feed, then plays the story
//! session from the first fetched story to the end, logging every client
//! event along the way.

use anyhow::Context;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use snapline_client::{init_tracing, AppState, ClientConfig, ClientEvent};
use snapline_shared::constants::APP_NAME;

const VIEWER: &str = "me";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Tracing and configuration
    // -----------------------------------------------------------------------
    init_tracing();
    info!("Starting {APP_NAME} headless client v{}", env!("CARGO_PKG_VERSION"));

    let config = ClientConfig::from_env();
    info!(
        api_url = %config.api_url,
        authenticated = config.api_token.is_some(),
        policy = ?config.reconcile_policy,
        bookmark_sync = ?config.bookmark_sync,
        timeout_ms = config.request_timeout.as_millis() as u64,
        "Loaded configuration"
    );

    let mut state = AppState::connect(config).context("Failed to build backend client")?;
    let mut events = state.events.subscribe();

    // -----------------------------------------------------------------------
    // 2. Feed
    // -----------------------------------------------------------------------
    let count = state.feed.refresh().await.context("Failed to fetch feed")?;
    info!(count, "Feed loaded");
    for item in state.feed.snapshot()? {
        info!(
            post = %item.id,
            author = %item.author,
            likes = item.like_count,
            liked = item.is_liked,
            bookmarked = item.is_bookmarked,
            "Feed item"
        );
    }

    // -----------------------------------------------------------------------
    // 3. Stories
    // -----------------------------------------------------------------------
    let sequence = state
        .load_stories(VIEWER)
        .await
        .context("Failed to fetch stories")?;

    // Index 0 is the viewer's own entry, which waits for input.
    if sequence.len() > 1 {
        let session = state.stories.start(sequence, 1)?;
        loop {
            match events.recv().await {
                Ok(ClientEvent::StorySessionEnded { session_id }) if session_id == session => {
                    info!(session = %session_id, "Story session finished");
                    break;
                }
                Ok(event) => info!(?event, "Client event"),
                Err(RecvError::Lagged(missed)) => warn!(missed, "Event listener lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    } else {
        info!("No stories to play");
    }

    state.shutdown().await;
    Ok(())
}
