//! Events announced to the presentation layer.

use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use snapline_shared::constants::EVENT_CHANNEL_SIZE;
use snapline_store::ItemKey;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// The backend accepted an optimistic mutation.
    InteractionConfirmed {
        intent_id: Uuid,
        key: ItemKey,
        action: &'static str,
    },
    /// An optimistic mutation was undone; show a transient notice.
    InteractionReverted {
        intent_id: Uuid,
        key: ItemKey,
        action: &'static str,
        message: String,
        /// The failure looked transient, so the viewer may simply retry.
        retryable: bool,
    },
    /// A confirmation failed but local state was left as is.
    ConfirmationFailed {
        intent_id: Uuid,
        key: ItemKey,
        action: &'static str,
        message: String,
        retryable: bool,
    },
    FeedRefreshed {
        count: usize,
    },
    StoryAdvanced {
        session_id: Uuid,
        index: usize,
    },
    StorySessionEnded {
        session_id: Uuid,
    },
}

/// Fan-out channel for [`ClientEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: ClientEvent) {
        // No subscriber is a normal state (e.g. headless use).
        if self.tx.send(event).is_err() {
            tracing::trace!("Client event dropped, no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
