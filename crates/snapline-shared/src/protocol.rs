//! JSON records exchanged with the social backend.
//!
//! The backend is lenient about which fields it returns, so everything
//! except the primary id is defaulted on the way in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{FollowId, LikeId, PostId, StoryId, UserId};

/// Author summary embedded in a post.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorRecord {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub verified: bool,
}

/// A post as returned by `GET /post` and `POST /post`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostRecord {
    pub id: PostId,
    #[serde(default)]
    pub user: AuthorRecord,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default, alias = "like_count")]
    pub likes: u64,
    #[serde(default, alias = "comment_count")]
    pub comments: u64,
    #[serde(default)]
    pub liked: bool,
    #[serde(default)]
    pub bookmarked: bool,
    /// Id of the viewer's own like, when the backend reports it.
    #[serde(default)]
    pub like_id: Option<LikeId>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /post`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewPost {
    pub caption: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Body of `PATCH /post/{id}` when persisting a bookmark.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BookmarkPatch {
    pub bookmarked: bool,
}

/// Body of `POST /like`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeRequest {
    pub post_id: PostId,
}

/// A like relationship as returned by `POST /like` and `GET /like`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LikeRecord {
    pub id: LikeId,
    pub post_id: PostId,
}

/// Body of `POST /follow`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FollowRequest {
    pub followed_id: UserId,
}

/// A follow relationship as returned by `POST /follow` and `GET /follow`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct FollowRecord {
    pub id: FollowId,
    pub followed_id: UserId,
}

/// A story as returned by `GET /story`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoryRecord {
    pub id: StoryId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub media: String,
    /// Display duration in milliseconds; the client default applies when absent.
    #[serde(default)]
    pub duration: Option<u64>,
}
