//! Confirmation worker.
//!
//! A single task drains the confirmation queue in FIFO order, so requests
//! for the same item reach the backend in the order the toggles happened.
//! Store access goes through the same mutex the feed uses; the lock is
//! never held across an await.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use snapline_net::{NetworkError, SocialApi};
use snapline_store::{Compensation, Intent, IntentAction, InteractionStore, Outcome};

use crate::config::ReconcilePolicy;
use crate::events::{ClientEvent, EventBus};

/// An intent waiting in the confirmation queue.
#[derive(Debug)]
pub(crate) struct Queued {
    pub intent: Intent,
    pub cancel: CancellationToken,
}

pub(crate) struct ConfirmationWorker {
    store: Arc<Mutex<InteractionStore>>,
    api: SocialApi,
    policy: ReconcilePolicy,
    events: EventBus,
    rx: mpsc::UnboundedReceiver<Queued>,
}

impl ConfirmationWorker {
    pub fn new(
        store: Arc<Mutex<InteractionStore>>,
        api: SocialApi,
        policy: ReconcilePolicy,
        events: EventBus,
        rx: mpsc::UnboundedReceiver<Queued>,
    ) -> Self {
        Self {
            store,
            api,
            policy,
            events,
            rx,
        }
    }

    /// Run until every sender is dropped and the queue is drained.
    pub async fn run(mut self) {
        info!(policy = ?self.policy, "Confirmation worker started");

        while let Some(queued) = self.rx.recv().await {
            if queued.cancel.is_cancelled() {
                self.abandon(&queued.intent);
                continue;
            }
            self.process(&queued.intent).await;
        }

        info!("Confirmation worker stopped");
    }

    async fn process(&self, intent: &Intent) {
        debug!(intent = %intent.id, key = %intent.key(), action = intent.action.label(), "Confirming");

        match self.send(intent).await {
            Ok(outcome) => {
                if let Err(e) = self.store.lock().map(|mut s| s.confirm(intent, outcome)) {
                    error!(error = %e, "Store lock poisoned, dropping confirmation");
                    return;
                }
                self.events.emit(ClientEvent::InteractionConfirmed {
                    intent_id: intent.id,
                    key: intent.key(),
                    action: intent.action.label(),
                });
            }
            Err(e) => self.on_failure(intent, e),
        }
    }

    /// Issue the backend call matching an intent.
    async fn send(&self, intent: &Intent) -> Result<Outcome, NetworkError> {
        match intent.action {
            IntentAction::CreateLike { post_id } => {
                let like = self.api.like_post(post_id).await?;
                Ok(Outcome::LikeCreated(like.id))
            }
            IntentAction::DeleteLike { post_id } => {
                let like_id = match self.relation(|s| s.like_id(post_id)) {
                    Some(like_id) => Some(like_id),
                    None => {
                        debug!(post = %post_id, "No known like id, looking it up");
                        self.api.find_like(post_id).await?
                    }
                };
                match like_id {
                    Some(like_id) => deleted(self.api.unlike(like_id).await),
                    None => {
                        info!(post = %post_id, "Backend has no like for post, unlike already applied");
                        Ok(Outcome::RelationDeleted)
                    }
                }
            }
            IntentAction::SetBookmark {
                post_id,
                bookmarked,
            } => {
                self.api.set_bookmark(post_id, bookmarked).await?;
                Ok(Outcome::Updated)
            }
            IntentAction::CreateFollow { user_id } => {
                let follow = self.api.follow_user(user_id).await?;
                Ok(Outcome::FollowCreated(follow.id))
            }
            IntentAction::DeleteFollow { user_id } => {
                let follow_id = match self.relation(|s| s.follow_id(user_id)) {
                    Some(follow_id) => Some(follow_id),
                    None => {
                        debug!(user = %user_id, "No known follow id, looking it up");
                        self.api.find_follow(user_id).await?
                    }
                };
                match follow_id {
                    Some(follow_id) => deleted(self.api.unfollow(follow_id).await),
                    None => {
                        info!(user = %user_id, "Backend has no follow for user, unfollow already applied");
                        Ok(Outcome::RelationDeleted)
                    }
                }
            }
        }
    }

    fn relation<T>(&self, f: impl FnOnce(&InteractionStore) -> Option<T>) -> Option<T> {
        match self.store.lock() {
            Ok(store) => f(&*store),
            Err(e) => {
                error!(error = %e, "Store lock poisoned");
                None
            }
        }
    }

    fn on_failure(&self, intent: &Intent, err: NetworkError) {
        let message = err.to_string();
        let retryable = err.is_transient();

        match self.policy {
            ReconcilePolicy::KeepOptimistic => {
                warn!(
                    intent = %intent.id,
                    key = %intent.key(),
                    action = intent.action.label(),
                    error = %err,
                    retryable,
                    "Confirmation failed, keeping optimistic state"
                );
                self.announce_failure(intent, message, retryable);
            }
            ReconcilePolicy::Rollback => match self.compensate(intent) {
                Some(Compensation::Reverted) => {
                    warn!(
                        intent = %intent.id,
                        key = %intent.key(),
                        action = intent.action.label(),
                        error = %err,
                        retryable,
                        "Confirmation failed, reverted"
                    );
                    self.events.emit(ClientEvent::InteractionReverted {
                        intent_id: intent.id,
                        key: intent.key(),
                        action: intent.action.label(),
                        message,
                        retryable,
                    });
                }
                Some(outcome) => {
                    warn!(
                        intent = %intent.id,
                        key = %intent.key(),
                        ?outcome,
                        error = %err,
                        "Confirmation failed for a superseded mutation"
                    );
                    self.announce_failure(intent, message, retryable);
                }
                None => {}
            },
        }
    }

    /// A cancelled intent is dropped unsent and its mutation undone.
    fn abandon(&self, intent: &Intent) {
        let outcome = self.compensate(intent);
        debug!(intent = %intent.id, ?outcome, "Skipped cancelled confirmation");
        if outcome == Some(Compensation::Reverted) {
            self.events.emit(ClientEvent::InteractionReverted {
                intent_id: intent.id,
                key: intent.key(),
                action: intent.action.label(),
                message: "cancelled".to_string(),
                retryable: false,
            });
        }
    }

    fn compensate(&self, intent: &Intent) -> Option<Compensation> {
        match self.store.lock() {
            Ok(mut store) => Some(store.compensate(intent)),
            Err(e) => {
                error!(error = %e, "Store lock poisoned, cannot compensate");
                None
            }
        }
    }

    fn announce_failure(&self, intent: &Intent, message: String, retryable: bool) {
        self.events.emit(ClientEvent::ConfirmationFailed {
            intent_id: intent.id,
            key: intent.key(),
            action: intent.action.label(),
            message,
            retryable,
        });
    }
}

/// A delete that hits a missing relation already has the desired effect.
fn deleted(result: Result<(), NetworkError>) -> Result<Outcome, NetworkError> {
    match result {
        Ok(()) | Err(NetworkError::Status { status: 404, .. }) => Ok(Outcome::RelationDeleted),
        Err(e) => Err(e),
    }
}
