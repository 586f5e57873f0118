//! Domain models held by the interaction store.
//!
//! Every struct derives `Serialize` so it can be handed directly to the
//! presentation layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use snapline_shared::protocol::PostRecord;
use snapline_shared::types::{FollowId, LikeId, PostId, UserId};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Identifies one mutable entry in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKey {
    Post(PostId),
    Profile(UserId),
}

impl std::fmt::Display for ItemKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Post(id) => write!(f, "post:{id}"),
            Self::Profile(id) => write!(f, "profile:{id}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ContentItem
// ---------------------------------------------------------------------------

/// A post or reel in the feed, with the viewer's interaction state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: PostId,
    pub author: String,
    pub author_avatar: Option<String>,
    pub author_verified: bool,
    pub image: Option<String>,
    pub caption: String,
    pub like_count: u64,
    pub comment_count: u64,
    pub is_liked: bool,
    pub is_bookmarked: bool,
    /// The viewer's like resource on the backend, once known.
    pub like_id: Option<LikeId>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ContentItem {
    /// A bare item with no interactions, mostly useful for tests.
    pub fn new(id: PostId, like_count: u64) -> Self {
        Self {
            id,
            author: String::new(),
            author_avatar: None,
            author_verified: false,
            image: None,
            caption: String::new(),
            like_count,
            comment_count: 0,
            is_liked: false,
            is_bookmarked: false,
            like_id: None,
            created_at: None,
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::Post(self.id)
    }
}

impl From<PostRecord> for ContentItem {
    fn from(r: PostRecord) -> Self {
        Self {
            id: r.id,
            author: r.user.username,
            author_avatar: r.user.avatar,
            author_verified: r.user.verified,
            image: r.image,
            caption: r.caption,
            // A liked post always counts the viewer's own like.
            like_count: if r.liked { r.likes.max(1) } else { r.likes },
            comment_count: r.comments,
            is_liked: r.liked,
            is_bookmarked: r.bookmarked,
            like_id: r.like_id,
            created_at: r.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Profile
// ---------------------------------------------------------------------------

/// A user profile with the viewer's follow state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: UserId,
    pub username: String,
    pub follower_count: u64,
    pub is_followed: bool,
    /// The viewer's follow resource on the backend, once known.
    pub follow_id: Option<FollowId>,
}

impl Profile {
    pub fn new(user_id: UserId, username: impl Into<String>, follower_count: u64) -> Self {
        Self {
            user_id,
            username: username.into(),
            follower_count,
            is_followed: false,
            follow_id: None,
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::Profile(self.user_id)
    }
}
