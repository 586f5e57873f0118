//! Feed service: optimistic toggles plus backend reconciliation.
//!
//! Toggles mutate the store synchronously and queue their intent for the
//! confirmation worker; they never wait on the network.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use snapline_net::SocialApi;
use snapline_shared::protocol::NewPost;
use snapline_shared::types::{PostId, UserId};
use snapline_store::{BookmarkSync, ContentItem, Intent, InteractionStore, Profile};

use crate::config::ReconcilePolicy;
use crate::error::ClientError;
use crate::events::{ClientEvent, EventBus};
use crate::reconcile::{ConfirmationWorker, Queued};

/// Handle to an intent that is queued for backend confirmation.
///
/// Cancelling before the worker reaches the intent drops the request and
/// undoes its local mutation, unless a later toggle superseded it. Once the
/// request is on the wire, cancelling has no effect.
#[derive(Debug, Clone)]
pub struct PendingConfirmation {
    intent: Intent,
    cancel: CancellationToken,
}

impl PendingConfirmation {
    pub fn intent(&self) -> &Intent {
        &self.intent
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Owns the interaction store and its confirmation worker.
pub struct FeedService {
    store: Arc<Mutex<InteractionStore>>,
    api: SocialApi,
    events: EventBus,
    queue: mpsc::UnboundedSender<Queued>,
    worker: JoinHandle<()>,
}

impl FeedService {
    /// Create the service and spawn its confirmation worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        api: SocialApi,
        policy: ReconcilePolicy,
        bookmark_sync: BookmarkSync,
        events: EventBus,
    ) -> Self {
        let store = Arc::new(Mutex::new(InteractionStore::new(bookmark_sync)));
        let (queue, rx) = mpsc::unbounded_channel();

        let worker = ConfirmationWorker::new(store.clone(), api.clone(), policy, events.clone(), rx);
        let worker = tokio::spawn(worker.run());

        Self {
            store,
            api,
            events,
            queue,
            worker,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, InteractionStore>, ClientError> {
        Ok(self.store.lock()?)
    }

    fn enqueue(&self, intent: Intent) -> PendingConfirmation {
        let cancel = CancellationToken::new();
        let queued = Queued {
            intent,
            cancel: cancel.clone(),
        };

        if let Err(mpsc::error::SendError(queued)) = self.queue.send(queued) {
            // Worker is gone; nothing will ever confirm this mutation.
            warn!(intent = %queued.intent.id, "Confirmation worker stopped, undoing mutation");
            if let Ok(mut store) = self.store.lock() {
                store.compensate(&queued.intent);
            }
            cancel.cancel();
        }

        PendingConfirmation { intent, cancel }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    pub fn toggle_like(&self, post_id: PostId) -> Result<PendingConfirmation, ClientError> {
        let intent = self.lock()?.toggle_like(post_id)?;
        Ok(self.enqueue(intent))
    }

    /// Returns `None` when bookmarks are a local-only preference.
    pub fn toggle_bookmark(
        &self,
        post_id: PostId,
    ) -> Result<Option<PendingConfirmation>, ClientError> {
        let intent = self.lock()?.toggle_bookmark(post_id)?;
        Ok(intent.map(|i| self.enqueue(i)))
    }

    pub fn toggle_follow(&self, user_id: UserId) -> Result<PendingConfirmation, ClientError> {
        let intent = self.lock()?.toggle_follow(user_id)?;
        Ok(self.enqueue(intent))
    }

    /// Fetch the feed and replace the local collection with it.
    pub async fn refresh(&self) -> Result<usize, ClientError> {
        let records = self.api.list_posts().await?;
        let count = {
            let mut store = self.lock()?;
            store.replace_all(records);
            store.len()
        };
        self.events.emit(ClientEvent::FeedRefreshed { count });
        Ok(count)
    }

    /// Create a post on the backend and put it at the top of the feed.
    pub async fn publish(&self, post: NewPost) -> Result<ContentItem, ClientError> {
        let record = self.api.create_post(&post).await?;
        let item = ContentItem::from(record);
        self.lock()?.merge_new(item.clone())?;
        info!(post = %item.id, "Published post");
        Ok(item)
    }

    pub fn seed_profiles(&self, profiles: Vec<Profile>) -> Result<(), ClientError> {
        self.lock()?.replace_profiles(profiles);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Readers
    // -----------------------------------------------------------------------

    pub fn snapshot(&self) -> Result<Vec<ContentItem>, ClientError> {
        Ok(self.lock()?.snapshot())
    }

    pub fn get(&self, post_id: PostId) -> Result<Option<ContentItem>, ClientError> {
        Ok(self.lock()?.get(post_id).cloned())
    }

    pub fn profile(&self, user_id: UserId) -> Result<Option<Profile>, ClientError> {
        Ok(self.lock()?.profile(user_id).cloned())
    }

    /// Stop accepting toggles and wait for queued confirmations to finish.
    pub async fn shutdown(self) {
        drop(self.queue);
        if let Err(e) = self.worker.await {
            warn!(error = %e, "Confirmation worker ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use serde_json::json;
    use snapline_net::NetworkError;
    use snapline_shared::types::{LikeId, Method};
    use snapline_store::ItemKey;
    use tokio::sync::broadcast;

    use crate::test_support::ScriptedRemote;

    fn service(remote: &Arc<ScriptedRemote>, policy: ReconcilePolicy) -> FeedService {
        FeedService::start(
            SocialApi::new(remote.clone()),
            policy,
            BookmarkSync::Remote,
            EventBus::new(),
        )
    }

    async fn seed(feed: &FeedService, remote: &ScriptedRemote) {
        remote.respond(
            Method::Get,
            "/post",
            Ok(json!([
                {"id": 1, "likes": 10},
                {"id": 2, "likes": 0, "liked": true, "like_id": 30}
            ])),
        );
        assert_eq!(feed.refresh().await.unwrap(), 2);
    }

    async fn next_event(rx: &mut broadcast::Receiver<ClientEvent>) -> ClientEvent {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("event timed out")
            .expect("event channel closed")
    }

    fn liked(feed: &FeedService, id: u64) -> (bool, u64) {
        let item = feed.get(PostId(id)).unwrap().unwrap();
        (item.is_liked, item.like_count)
    }

    #[tokio::test]
    async fn test_like_is_applied_before_confirmation() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        seed(&feed, &remote).await;
        let mut rx = feed.events.subscribe();

        remote.respond(Method::Post, "/like", Ok(json!({"id": 55, "post_id": 1})));
        let pending = feed.toggle_like(PostId(1)).unwrap();
        assert_eq!(liked(&feed, 1), (true, 11));

        match next_event(&mut rx).await {
            ClientEvent::InteractionConfirmed { intent_id, key, .. } => {
                assert_eq!(intent_id, pending.intent().id);
                assert_eq!(key, ItemKey::Post(PostId(1)));
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(feed.get(PostId(1)).unwrap().unwrap().like_id, Some(LikeId(55)));
        assert_eq!(remote.calls()[1].1, "/like");
    }

    #[tokio::test]
    async fn test_failed_like_is_rolled_back() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        seed(&feed, &remote).await;
        let mut rx = feed.events.subscribe();

        remote.respond(Method::Post, "/like", Err(NetworkError::Timeout));
        feed.toggle_like(PostId(1)).unwrap();

        match next_event(&mut rx).await {
            ClientEvent::InteractionReverted {
                action,
                message,
                retryable,
                ..
            } => {
                assert_eq!(action, "like");
                assert_eq!(message, "Request timed out");
                assert!(retryable);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(liked(&feed, 1), (false, 10));
    }

    #[tokio::test]
    async fn test_keep_optimistic_policy_keeps_flip() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::KeepOptimistic);
        seed(&feed, &remote).await;
        let mut rx = feed.events.subscribe();

        remote.respond(Method::Post, "/like", Err(NetworkError::Transport("reset".into())));
        feed.toggle_like(PostId(1)).unwrap();

        assert!(matches!(
            next_event(&mut rx).await,
            ClientEvent::ConfirmationFailed { .. }
        ));
        assert_eq!(liked(&feed, 1), (true, 11));
    }

    #[tokio::test]
    async fn test_rapid_toggles_reach_backend_in_order() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        seed(&feed, &remote).await;
        let mut rx = feed.events.subscribe();

        remote.respond(Method::Post, "/like", Ok(json!({"id": 70, "post_id": 1})));
        remote.respond(Method::Delete, "/like/70", Ok(json!(null)));

        feed.toggle_like(PostId(1)).unwrap();
        feed.toggle_like(PostId(1)).unwrap();
        assert_eq!(liked(&feed, 1), (false, 10));

        for _ in 0..2 {
            assert!(matches!(
                next_event(&mut rx).await,
                ClientEvent::InteractionConfirmed { .. }
            ));
        }

        let calls = remote.calls();
        assert_eq!(calls[1], (Method::Post, "/like".to_string()));
        assert_eq!(calls[2], (Method::Delete, "/like/70".to_string()));
        assert_eq!(feed.get(PostId(1)).unwrap().unwrap().like_id, None);
    }

    #[tokio::test]
    async fn test_failed_first_toggle_does_not_undo_second() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        seed(&feed, &remote).await;
        let mut rx = feed.events.subscribe();

        // Like fails; the unlike then finds no relation on the backend.
        remote.respond(Method::Post, "/like", Err(NetworkError::Timeout));
        remote.respond(Method::Get, "/like", Ok(json!([])));
        feed.toggle_like(PostId(1)).unwrap();
        feed.toggle_like(PostId(1)).unwrap();

        assert!(matches!(
            next_event(&mut rx).await,
            ClientEvent::ConfirmationFailed { .. }
        ));
        assert!(matches!(
            next_event(&mut rx).await,
            ClientEvent::InteractionConfirmed { .. }
        ));
        assert_eq!(liked(&feed, 1), (false, 10));
        let calls = remote.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2], (Method::Get, "/like".to_string()));
    }

    #[tokio::test]
    async fn test_unlike_of_server_liked_post_uses_known_id() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        seed(&feed, &remote).await;
        let mut rx = feed.events.subscribe();

        remote.respond(
            Method::Delete,
            "/like/30",
            Err(NetworkError::Status {
                status: 404,
                message: "gone".into(),
            }),
        );
        feed.toggle_like(PostId(2)).unwrap();

        assert!(matches!(
            next_event(&mut rx).await,
            ClientEvent::InteractionConfirmed { .. }
        ));
        assert_eq!(liked(&feed, 2), (false, 0));
    }

    async fn seed_liked_without_id(feed: &FeedService, remote: &ScriptedRemote) {
        remote.respond(
            Method::Get,
            "/post",
            Ok(json!([{"id": 3, "liked": true, "likes": 5}])),
        );
        feed.refresh().await.unwrap();
    }

    #[tokio::test]
    async fn test_unlike_without_known_id_looks_up_relation() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        seed_liked_without_id(&feed, &remote).await;
        let mut rx = feed.events.subscribe();

        remote.respond(
            Method::Get,
            "/like",
            Ok(json!([{"id": 90, "post_id": 4}, {"id": 91, "post_id": 3}])),
        );
        remote.respond(Method::Delete, "/like/91", Ok(json!(null)));
        feed.toggle_like(PostId(3)).unwrap();
        assert_eq!(liked(&feed, 3), (false, 4));

        match next_event(&mut rx).await {
            ClientEvent::InteractionConfirmed { action, .. } => assert_eq!(action, "unlike"),
            other => panic!("unexpected event: {other:?}"),
        }
        let calls = remote.calls();
        assert_eq!(calls[1], (Method::Get, "/like".to_string()));
        assert_eq!(calls[2], (Method::Delete, "/like/91".to_string()));
        assert_eq!(liked(&feed, 3), (false, 4));
    }

    #[tokio::test]
    async fn test_failed_relation_lookup_rolls_back_unlike() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        seed_liked_without_id(&feed, &remote).await;
        let mut rx = feed.events.subscribe();

        remote.respond(Method::Get, "/like", Err(NetworkError::Timeout));
        feed.toggle_like(PostId(3)).unwrap();

        match next_event(&mut rx).await {
            ClientEvent::InteractionReverted {
                action, retryable, ..
            } => {
                assert_eq!(action, "unlike");
                assert!(retryable);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(liked(&feed, 3), (true, 5));
        assert!(!remote
            .calls()
            .iter()
            .any(|(method, _)| *method == Method::Delete));
    }

    #[tokio::test]
    async fn test_unfollow_without_known_id_looks_up_relation() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        let mut rx = feed.events.subscribe();

        let mut profile = Profile::new(UserId(4), "mia", 10);
        profile.is_followed = true;
        feed.seed_profiles(vec![profile]).unwrap();

        remote.respond(Method::Get, "/follow", Ok(json!([{"id": 12, "followed_id": 4}])));
        remote.respond(Method::Delete, "/follow/12", Ok(json!(null)));
        feed.toggle_follow(UserId(4)).unwrap();

        match next_event(&mut rx).await {
            ClientEvent::InteractionConfirmed { action, .. } => assert_eq!(action, "unfollow"),
            other => panic!("unexpected event: {other:?}"),
        }
        let profile = feed.profile(UserId(4)).unwrap().unwrap();
        assert!(!profile.is_followed);
        assert_eq!(profile.follower_count, 9);
        assert_eq!(remote.calls()[1], (Method::Delete, "/follow/12".to_string()));
    }

    #[tokio::test]
    async fn test_rejected_request_is_not_retryable() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::KeepOptimistic);
        seed(&feed, &remote).await;
        let mut rx = feed.events.subscribe();

        remote.respond(
            Method::Post,
            "/like",
            Err(NetworkError::Status {
                status: 403,
                message: "forbidden".into(),
            }),
        );
        feed.toggle_like(PostId(1)).unwrap();

        match next_event(&mut rx).await {
            ClientEvent::ConfirmationFailed { retryable, .. } => assert!(!retryable),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cancelled_confirmation_is_not_sent() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        seed(&feed, &remote).await;
        let mut rx = feed.events.subscribe();

        // Hold the worker on a slow request so the next intent stays queued.
        remote.respond_after(
            Method::Patch,
            "/post/2",
            Duration::from_millis(100),
            Ok(json!({"id": 2})),
        );
        feed.toggle_bookmark(PostId(2)).unwrap().unwrap();
        let pending = feed.toggle_like(PostId(1)).unwrap();
        pending.cancel();

        assert!(matches!(
            next_event(&mut rx).await,
            ClientEvent::InteractionConfirmed { .. }
        ));
        match next_event(&mut rx).await {
            ClientEvent::InteractionReverted { message, .. } => assert_eq!(message, "cancelled"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(liked(&feed, 1), (false, 10));
        assert!(!remote.calls().iter().any(|(_, path)| path == "/like"));
    }

    #[tokio::test]
    async fn test_local_only_bookmark_has_no_confirmation() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = FeedService::start(
            SocialApi::new(remote.clone()),
            ReconcilePolicy::Rollback,
            BookmarkSync::LocalOnly,
            EventBus::new(),
        );
        seed(&feed, &remote).await;

        assert!(feed.toggle_bookmark(PostId(1)).unwrap().is_none());
        assert!(feed.get(PostId(1)).unwrap().unwrap().is_bookmarked);
        feed.shutdown().await;
        assert_eq!(remote.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_post_is_reported_synchronously() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        let err = feed.toggle_like(PostId(999)).unwrap_err();
        assert!(matches!(err, ClientError::Store(_)));
    }

    #[tokio::test]
    async fn test_publish_prepends_and_follow_round_trip() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        seed(&feed, &remote).await;

        remote.respond(Method::Post, "/post", Ok(json!({"id": 9, "caption": "new"})));
        let item = feed
            .publish(NewPost {
                caption: "new".into(),
                image: None,
            })
            .await
            .unwrap();
        assert_eq!(item.id, PostId(9));
        assert_eq!(feed.snapshot().unwrap()[0].id, PostId(9));

        feed.seed_profiles(vec![Profile::new(UserId(4), "mia", 10)]).unwrap();
        remote.respond(Method::Post, "/follow", Ok(json!({"id": 2, "followed_id": 4})));
        feed.toggle_follow(UserId(4)).unwrap();
        feed.shutdown().await;

        assert_eq!(remote.calls().last().unwrap().1, "/follow");
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let remote = Arc::new(ScriptedRemote::new());
        let feed = service(&remote, ReconcilePolicy::Rollback);
        seed(&feed, &remote).await;

        remote.respond(Method::Post, "/like", Ok(json!({"id": 1, "post_id": 1})));
        remote.respond(Method::Patch, "/post/1", Ok(json!({"id": 1})));
        feed.toggle_like(PostId(1)).unwrap();
        feed.toggle_bookmark(PostId(1)).unwrap();
        feed.shutdown().await;

        assert_eq!(remote.calls().len(), 3);
    }
}
