//! The in-memory interaction store.
//!
//! Posts are kept newest-first. Every mutation bumps a store-wide revision
//! counter and stamps it on the touched entry, so a failed confirmation can
//! only be undone while it is still the entry's latest mutation.

use std::collections::HashMap;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, info, warn};

use snapline_shared::types::{FollowId, LikeId, PostId, UserId};

use crate::error::{Result, StoreError};
use crate::intent::{Compensation, Intent, IntentAction, Outcome};
use crate::models::{ContentItem, ItemKey, Profile};

/// Whether bookmarks are confirmed with the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BookmarkSync {
    /// Bookmarks are a client-only preference; toggles yield no intent.
    #[default]
    LocalOnly,
    /// Bookmarks are persisted through the update-post call.
    Remote,
}

impl FromStr for BookmarkSync {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "local_only" | "local-only" => Ok(Self::LocalOnly),
            "remote" => Ok(Self::Remote),
            other => Err(format!("unknown bookmark sync mode: {other}")),
        }
    }
}

#[derive(Debug, Clone)]
struct Tracked<T> {
    value: T,
    revision: u64,
}

/// Flip a boolean flag together with its counter.
fn flip_counted(flag: &mut bool, count: &mut u64) {
    if *flag {
        *count = count.saturating_sub(1);
    } else {
        *count += 1;
    }
    *flag = !*flag;
}

/// Viewer-local truth for likes, bookmarks and follows.
#[derive(Debug, Default)]
pub struct InteractionStore {
    order: Vec<PostId>,
    posts: HashMap<PostId, Tracked<ContentItem>>,
    profiles: HashMap<UserId, Tracked<Profile>>,
    bookmark_sync: BookmarkSync,
    revision: u64,
}

impl InteractionStore {
    pub fn new(bookmark_sync: BookmarkSync) -> Self {
        Self {
            bookmark_sync,
            ..Self::default()
        }
    }

    pub fn bookmark_sync(&self) -> BookmarkSync {
        self.bookmark_sync
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    // -----------------------------------------------------------------------
    // Collection management
    // -----------------------------------------------------------------------

    /// Replace every post at once.
    ///
    /// The new collection is built aside and swapped in, so a reader never
    /// sees a mix of old and new posts. Duplicate ids keep the first
    /// occurrence.
    pub fn replace_all<I, T>(&mut self, items: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<ContentItem>,
    {
        let mut order = Vec::new();
        let mut posts = HashMap::new();

        for item in items {
            let item: ContentItem = item.into();
            if posts.contains_key(&item.id) {
                warn!(post = %item.id, "Duplicate post in fetched feed, keeping first");
                continue;
            }
            let revision = self.next_revision();
            order.push(item.id);
            posts.insert(item.id, Tracked { value: item, revision });
        }

        self.order = order;
        self.posts = posts;
        info!(count = self.order.len(), "Feed replaced");
    }

    /// Prepend a newly authored post.
    pub fn merge_new(&mut self, item: impl Into<ContentItem>) -> Result<()> {
        let item: ContentItem = item.into();
        if self.posts.contains_key(&item.id) {
            return Err(StoreError::Conflict(item.key()));
        }
        let revision = self.next_revision();
        debug!(post = %item.id, "Merged new post");
        self.order.insert(0, item.id);
        self.posts.insert(item.id, Tracked { value: item, revision });
        Ok(())
    }

    /// Drop a post from the collection.
    pub fn remove(&mut self, post_id: PostId) -> Option<ContentItem> {
        let removed = self.posts.remove(&post_id)?;
        self.order.retain(|id| *id != post_id);
        Some(removed.value)
    }

    /// Replace every profile at once.
    pub fn replace_profiles<I, T>(&mut self, profiles: I)
    where
        I: IntoIterator<Item = T>,
        T: Into<Profile>,
    {
        let mut map = HashMap::new();
        for profile in profiles {
            let profile: Profile = profile.into();
            let revision = self.next_revision();
            map.entry(profile.user_id)
                .or_insert(Tracked { value: profile, revision });
        }
        self.profiles = map;
    }

    /// Insert or overwrite a single profile with freshly fetched state.
    pub fn put_profile(&mut self, profile: impl Into<Profile>) {
        let profile: Profile = profile.into();
        let revision = self.next_revision();
        self.profiles
            .insert(profile.user_id, Tracked { value: profile, revision });
    }

    // -----------------------------------------------------------------------
    // Optimistic toggles
    // -----------------------------------------------------------------------

    /// Flip the viewer's like and adjust the counter in the same step.
    pub fn toggle_like(&mut self, post_id: PostId) -> Result<Intent> {
        let tracked = self
            .posts
            .get_mut(&post_id)
            .ok_or(StoreError::NotFound(ItemKey::Post(post_id)))?;

        self.revision += 1;
        tracked.revision = self.revision;

        let item = &mut tracked.value;
        flip_counted(&mut item.is_liked, &mut item.like_count);

        debug!(
            post = %post_id,
            liked = item.is_liked,
            likes = item.like_count,
            "Toggled like"
        );

        let action = if item.is_liked {
            IntentAction::CreateLike { post_id }
        } else {
            IntentAction::DeleteLike { post_id }
        };
        Ok(Intent::new(tracked.revision, action))
    }

    /// Flip the bookmark flag.
    ///
    /// Returns an intent only when bookmarks are synced with the backend.
    pub fn toggle_bookmark(&mut self, post_id: PostId) -> Result<Option<Intent>> {
        let tracked = self
            .posts
            .get_mut(&post_id)
            .ok_or(StoreError::NotFound(ItemKey::Post(post_id)))?;

        self.revision += 1;
        tracked.revision = self.revision;

        let item = &mut tracked.value;
        item.is_bookmarked = !item.is_bookmarked;
        debug!(post = %post_id, bookmarked = item.is_bookmarked, "Toggled bookmark");

        Ok(match self.bookmark_sync {
            BookmarkSync::LocalOnly => None,
            BookmarkSync::Remote => Some(Intent::new(
                tracked.revision,
                IntentAction::SetBookmark {
                    post_id,
                    bookmarked: item.is_bookmarked,
                },
            )),
        })
    }

    /// Flip the viewer's follow and adjust the follower counter.
    pub fn toggle_follow(&mut self, user_id: UserId) -> Result<Intent> {
        let tracked = self
            .profiles
            .get_mut(&user_id)
            .ok_or(StoreError::NotFound(ItemKey::Profile(user_id)))?;

        self.revision += 1;
        tracked.revision = self.revision;

        let profile = &mut tracked.value;
        flip_counted(&mut profile.is_followed, &mut profile.follower_count);

        debug!(
            user = %user_id,
            followed = profile.is_followed,
            followers = profile.follower_count,
            "Toggled follow"
        );

        let action = if profile.is_followed {
            IntentAction::CreateFollow { user_id }
        } else {
            IntentAction::DeleteFollow { user_id }
        };
        Ok(Intent::new(tracked.revision, action))
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    /// Record what the backend returned for a confirmed intent.
    ///
    /// Relation ids are recorded regardless of later local toggles: the
    /// relation exists on the backend either way, and a queued delete needs
    /// its id.
    pub fn confirm(&mut self, intent: &Intent, outcome: Outcome) {
        match (intent.key(), outcome) {
            (ItemKey::Post(id), Outcome::LikeCreated(like_id)) => {
                if let Some(t) = self.posts.get_mut(&id) {
                    t.value.like_id = Some(like_id);
                }
            }
            (ItemKey::Post(id), Outcome::RelationDeleted) => {
                if let Some(t) = self.posts.get_mut(&id) {
                    t.value.like_id = None;
                }
            }
            (ItemKey::Profile(id), Outcome::FollowCreated(follow_id)) => {
                if let Some(t) = self.profiles.get_mut(&id) {
                    t.value.follow_id = Some(follow_id);
                }
            }
            (ItemKey::Profile(id), Outcome::RelationDeleted) => {
                if let Some(t) = self.profiles.get_mut(&id) {
                    t.value.follow_id = None;
                }
            }
            (_, Outcome::Updated) => {}
            (key, outcome) => {
                warn!(%key, ?outcome, "Outcome does not match intent target, ignoring");
            }
        }
    }

    /// Undo the optimistic mutation of a failed intent.
    ///
    /// Only the latest mutation of an entry can be undone. If the entry was
    /// toggled again, or reloaded by a refresh, the failure is superseded.
    pub fn compensate(&mut self, intent: &Intent) -> Compensation {
        let next = self.revision + 1;

        let outcome = match intent.action {
            IntentAction::CreateLike { post_id }
            | IntentAction::DeleteLike { post_id }
            | IntentAction::SetBookmark { post_id, .. } => match self.posts.get_mut(&post_id) {
                None => Compensation::Gone,
                Some(t) if t.revision != intent.revision => Compensation::Superseded,
                Some(t) => {
                    let item = &mut t.value;
                    if let IntentAction::SetBookmark { .. } = intent.action {
                        item.is_bookmarked = !item.is_bookmarked;
                    } else {
                        flip_counted(&mut item.is_liked, &mut item.like_count);
                    }
                    t.revision = next;
                    Compensation::Reverted
                }
            },
            IntentAction::CreateFollow { user_id } | IntentAction::DeleteFollow { user_id } => {
                match self.profiles.get_mut(&user_id) {
                    None => Compensation::Gone,
                    Some(t) if t.revision != intent.revision => Compensation::Superseded,
                    Some(t) => {
                        let p = &mut t.value;
                        flip_counted(&mut p.is_followed, &mut p.follower_count);
                        t.revision = next;
                        Compensation::Reverted
                    }
                }
            }
        };

        if outcome == Compensation::Reverted {
            self.revision = next;
        }
        debug!(intent = %intent.id, key = %intent.key(), ?outcome, "Compensated intent");
        outcome
    }

    // -----------------------------------------------------------------------
    // Readers
    // -----------------------------------------------------------------------

    pub fn get(&self, post_id: PostId) -> Option<&ContentItem> {
        self.posts.get(&post_id).map(|t| &t.value)
    }

    pub fn profile(&self, user_id: UserId) -> Option<&Profile> {
        self.profiles.get(&user_id).map(|t| &t.value)
    }

    /// Posts in display order (newest first).
    pub fn items(&self) -> impl Iterator<Item = &ContentItem> + '_ {
        self.order.iter().filter_map(|id| self.get(*id))
    }

    /// Owned copy of the feed for handing to the presentation layer.
    pub fn snapshot(&self) -> Vec<ContentItem> {
        self.items().cloned().collect()
    }

    pub fn like_id(&self, post_id: PostId) -> Option<LikeId> {
        self.get(post_id).and_then(|item| item.like_id)
    }

    pub fn follow_id(&self, user_id: UserId) -> Option<FollowId> {
        self.profile(user_id).and_then(|p| p.follow_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(items: &[(u64, u64, bool)]) -> InteractionStore {
        let mut store = InteractionStore::new(BookmarkSync::LocalOnly);
        store.replace_all(items.iter().map(|&(id, likes, liked)| {
            let mut item = ContentItem::new(PostId(id), likes);
            item.is_liked = liked;
            item
        }));
        store
    }

    fn state(store: &InteractionStore, id: u64) -> (bool, u64) {
        let item = store.get(PostId(id)).unwrap();
        (item.is_liked, item.like_count)
    }

    #[test]
    fn test_like_then_unlike_scenario() {
        let mut store = store_with(&[(1, 10, false)]);

        let first = store.toggle_like(PostId(1)).unwrap();
        assert_eq!(state(&store, 1), (true, 11));
        assert_eq!(first.action, IntentAction::CreateLike { post_id: PostId(1) });

        let second = store.toggle_like(PostId(1)).unwrap();
        assert_eq!(state(&store, 1), (false, 10));
        assert_eq!(second.action, IntentAction::DeleteLike { post_id: PostId(1) });
        assert!(second.revision > first.revision);
    }

    #[test]
    fn test_toggle_twice_restores_state() {
        let mut store = store_with(&[(1, 0, false), (2, 5, true)]);
        for id in [1, 2] {
            let before = state(&store, id);
            store.toggle_like(PostId(id)).unwrap();
            store.toggle_like(PostId(id)).unwrap();
            assert_eq!(state(&store, id), before);
        }
    }

    #[test]
    fn test_counter_tracks_flag_on_every_toggle() {
        let mut store = store_with(&[(7, 3, true)]);
        for _ in 0..9 {
            let (_, before) = state(&store, 7);
            store.toggle_like(PostId(7)).unwrap();
            let (liked, after) = state(&store, 7);
            let expected = if liked { before + 1 } else { before - 1 };
            assert_eq!(after, expected);
        }
    }

    #[test]
    fn test_toggle_unknown_item_is_not_found() {
        let mut store = store_with(&[(1, 10, false)]);
        assert_eq!(
            store.toggle_like(PostId(999)),
            Err(StoreError::NotFound(ItemKey::Post(PostId(999))))
        );
        assert_eq!(
            store.toggle_bookmark(PostId(999)),
            Err(StoreError::NotFound(ItemKey::Post(PostId(999))))
        );
        assert_eq!(
            store.toggle_follow(UserId(999)),
            Err(StoreError::NotFound(ItemKey::Profile(UserId(999))))
        );
    }

    #[test]
    fn test_compensate_latest_intent_reverts() {
        let mut store = store_with(&[(1, 10, false)]);
        let intent = store.toggle_like(PostId(1)).unwrap();

        assert_eq!(store.compensate(&intent), Compensation::Reverted);
        assert_eq!(state(&store, 1), (false, 10));

        // A second compensation of the same intent is stale.
        assert_eq!(store.compensate(&intent), Compensation::Superseded);
        assert_eq!(state(&store, 1), (false, 10));
    }

    #[test]
    fn test_out_of_order_failure_does_not_undo_newer_toggle() {
        let mut store = store_with(&[(1, 10, false)]);
        let a = store.toggle_like(PostId(1)).unwrap();
        let b = store.toggle_like(PostId(1)).unwrap();

        // A's confirmation fails after B was applied: B stays authoritative.
        assert_eq!(store.compensate(&a), Compensation::Superseded);
        assert_eq!(state(&store, 1), (false, 10));

        assert_eq!(store.compensate(&b), Compensation::Reverted);
        assert_eq!(state(&store, 1), (true, 11));
    }

    #[test]
    fn test_replace_all_swaps_whole_collection() {
        let mut store = store_with(&[(1, 1, false), (2, 2, false)]);
        let stale = store.toggle_like(PostId(2)).unwrap();

        store.replace_all(vec![ContentItem::new(PostId(2), 40), ContentItem::new(PostId(3), 0)]);

        let ids: Vec<PostId> = store.items().map(|i| i.id).collect();
        assert_eq!(ids, vec![PostId(2), PostId(3)]);
        assert!(store.get(PostId(1)).is_none());
        assert_eq!(state(&store, 2), (false, 40));

        // The refreshed entry is server truth; the old intent cannot touch it.
        assert_eq!(store.compensate(&stale), Compensation::Superseded);
        assert_eq!(state(&store, 2), (false, 40));
    }

    #[test]
    fn test_replace_all_keeps_first_duplicate() {
        let mut store = InteractionStore::default();
        store.replace_all(vec![ContentItem::new(PostId(1), 5), ContentItem::new(PostId(1), 9)]);
        assert_eq!(store.len(), 1);
        assert_eq!(state(&store, 1), (false, 5));
    }

    #[test]
    fn test_compensate_removed_item_is_gone() {
        let mut store = store_with(&[(1, 1, false)]);
        let intent = store.toggle_like(PostId(1)).unwrap();
        assert!(store.remove(PostId(1)).is_some());
        assert!(store.is_empty());
        assert_eq!(store.compensate(&intent), Compensation::Gone);
    }

    #[test]
    fn test_merge_new_prepends_and_rejects_duplicates() {
        let mut store = store_with(&[(1, 0, false)]);
        store.merge_new(ContentItem::new(PostId(2), 0)).unwrap();

        let ids: Vec<PostId> = store.items().map(|i| i.id).collect();
        assert_eq!(ids, vec![PostId(2), PostId(1)]);

        assert_eq!(
            store.merge_new(ContentItem::new(PostId(1), 0)),
            Err(StoreError::Conflict(ItemKey::Post(PostId(1))))
        );
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_local_only_bookmark_yields_no_intent() {
        let mut store = store_with(&[(1, 0, false)]);
        assert_eq!(store.toggle_bookmark(PostId(1)).unwrap(), None);
        assert!(store.get(PostId(1)).unwrap().is_bookmarked);
        assert_eq!(store.toggle_bookmark(PostId(1)).unwrap(), None);
        assert!(!store.get(PostId(1)).unwrap().is_bookmarked);
    }

    #[test]
    fn test_remote_bookmark_yields_intent_and_reverts() {
        let mut store = InteractionStore::new(BookmarkSync::Remote);
        store.replace_all(vec![ContentItem::new(PostId(4), 0)]);

        let intent = store.toggle_bookmark(PostId(4)).unwrap().unwrap();
        assert_eq!(
            intent.action,
            IntentAction::SetBookmark {
                post_id: PostId(4),
                bookmarked: true
            }
        );

        assert_eq!(store.compensate(&intent), Compensation::Reverted);
        assert!(!store.get(PostId(4)).unwrap().is_bookmarked);
    }

    #[test]
    fn test_follow_toggle_and_relation_ids() {
        let mut store = InteractionStore::default();
        store.put_profile(Profile::new(UserId(3), "mia", 1452));

        let follow = store.toggle_follow(UserId(3)).unwrap();
        assert_eq!(follow.action, IntentAction::CreateFollow { user_id: UserId(3) });
        assert_eq!(store.profile(UserId(3)).unwrap().follower_count, 1453);

        store.confirm(&follow, Outcome::FollowCreated(FollowId(90)));
        assert_eq!(store.follow_id(UserId(3)), Some(FollowId(90)));

        let unfollow = store.toggle_follow(UserId(3)).unwrap();
        store.confirm(&unfollow, Outcome::RelationDeleted);
        assert_eq!(store.follow_id(UserId(3)), None);
        assert_eq!(store.profile(UserId(3)).unwrap().follower_count, 1452);
    }

    #[test]
    fn test_confirm_records_like_id_after_later_toggle() {
        let mut store = store_with(&[(1, 0, false)]);
        let like = store.toggle_like(PostId(1)).unwrap();
        let _unlike = store.toggle_like(PostId(1)).unwrap();

        store.confirm(&like, Outcome::LikeCreated(LikeId(12)));
        assert_eq!(store.like_id(PostId(1)), Some(LikeId(12)));
    }

    #[test]
    fn test_replace_profiles() {
        let mut store = InteractionStore::default();
        store.replace_profiles(vec![Profile::new(UserId(1), "a", 0), Profile::new(UserId(2), "b", 4)]);
        assert!(store.profile(UserId(2)).is_some());

        store.replace_profiles(vec![Profile::new(UserId(2), "b", 5)]);
        assert!(store.profile(UserId(1)).is_none());
        assert_eq!(store.profile(UserId(2)).unwrap().follower_count, 5);
    }

    #[test]
    fn test_bookmark_sync_from_str() {
        assert_eq!("remote".parse::<BookmarkSync>(), Ok(BookmarkSync::Remote));
        assert_eq!(" Local ".parse::<BookmarkSync>(), Ok(BookmarkSync::LocalOnly));
        assert!("cloud".parse::<BookmarkSync>().is_err());
    }
}
