//! Application state shared by the presentation layer.
//!
//! [`AppState`] wires the configuration, the remote backend, the feed
//! service and the story player around a single [`EventBus`].

use std::sync::Arc;

use tracing::{info, warn};

use snapline_net::{HttpRemote, RemoteDataClient, SocialApi};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::events::EventBus;
use crate::feed::FeedService;
use crate::story::{StoryPlayer, StorySequence};

/// Central application state.
pub struct AppState {
    pub config: ClientConfig,

    /// Announcements for the presentation layer (confirmations,
    /// rollbacks, story navigation).
    pub events: EventBus,

    /// Feed items, profiles and their optimistic interactions.
    pub feed: FeedService,

    /// Story viewer. Idle until a session is started.
    pub stories: StoryPlayer,

    api: SocialApi,
}

impl AppState {
    /// Build the state on top of an arbitrary backend.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: ClientConfig, remote: Arc<dyn RemoteDataClient>) -> Self {
        let events = EventBus::new();
        let api = SocialApi::new(remote);
        let feed = FeedService::start(
            api.clone(),
            config.reconcile_policy,
            config.bookmark_sync,
            events.clone(),
        );
        let stories = StoryPlayer::new(events.clone());

        Self {
            config,
            events,
            feed,
            stories,
            api,
        }
    }

    /// Build the state against the configured HTTP backend.
    pub fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let remote = HttpRemote::new(config.http())?;
        info!(api_url = %remote.base_url(), "Using HTTP backend");
        Ok(Self::new(config, Arc::new(remote)))
    }

    /// Fetch stories and build a viewing sequence for `viewer`, with the
    /// viewer's own-story entry first.
    pub async fn load_stories(&self, viewer: &str) -> Result<StorySequence, ClientError> {
        let records = self.api.list_stories().await?;
        let sequence =
            StorySequence::from_records(viewer, records, self.config.story_duration_ms);
        info!(stories = sequence.len() - 1, "Loaded stories");
        Ok(sequence)
    }

    /// Stop the story timer and drain pending confirmations.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.stories.exit() {
            warn!(error = %e, "Failed to stop story session");
        }
        self.feed.shutdown().await;
        info!("Client state shut down");
    }
}
