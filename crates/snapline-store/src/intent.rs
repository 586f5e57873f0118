//! Pending backend confirmations produced by optimistic toggles.

use serde::Serialize;
use uuid::Uuid;

use snapline_shared::types::{FollowId, LikeId, PostId, UserId};

use crate::models::ItemKey;

/// What the backend must be told to match a local mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum IntentAction {
    CreateLike { post_id: PostId },
    DeleteLike { post_id: PostId },
    SetBookmark { post_id: PostId, bookmarked: bool },
    CreateFollow { user_id: UserId },
    DeleteFollow { user_id: UserId },
}

impl IntentAction {
    pub fn key(&self) -> ItemKey {
        match *self {
            Self::CreateLike { post_id }
            | Self::DeleteLike { post_id }
            | Self::SetBookmark { post_id, .. } => ItemKey::Post(post_id),
            Self::CreateFollow { user_id } | Self::DeleteFollow { user_id } => {
                ItemKey::Profile(user_id)
            }
        }
    }

    /// Short label for logs and notices.
    pub fn label(&self) -> &'static str {
        match self {
            Self::CreateLike { .. } => "like",
            Self::DeleteLike { .. } => "unlike",
            Self::SetBookmark { .. } => "bookmark",
            Self::CreateFollow { .. } => "follow",
            Self::DeleteFollow { .. } => "unfollow",
        }
    }
}

/// One optimistic mutation awaiting backend confirmation.
///
/// `revision` is the item's revision right after the mutation; it is how
/// [`InteractionStore::compensate`](crate::InteractionStore::compensate)
/// tells whether a later mutation has superseded this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Intent {
    pub id: Uuid,
    pub revision: u64,
    pub action: IntentAction,
}

impl Intent {
    pub(crate) fn new(revision: u64, action: IntentAction) -> Self {
        Self {
            id: Uuid::new_v4(),
            revision,
            action,
        }
    }

    pub fn key(&self) -> ItemKey {
        self.action.key()
    }
}

/// Backend result of a confirmed intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    LikeCreated(LikeId),
    FollowCreated(FollowId),
    RelationDeleted,
    Updated,
}

/// Result of compensating a failed intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Compensation {
    /// The optimistic mutation was undone.
    Reverted,
    /// A later mutation already changed the item; nothing was undone.
    Superseded,
    /// The item is no longer in the store.
    Gone,
}
