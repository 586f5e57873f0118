//! Typed endpoint helpers over a [`RemoteDataClient`].

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use snapline_shared::constants::{FOLLOW_PATH, LIKE_PATH, POST_PATH, STORY_PATH};
use snapline_shared::protocol::{
    BookmarkPatch, FollowRecord, FollowRequest, LikeRecord, LikeRequest, NewPost, PostRecord,
    StoryRecord,
};
use snapline_shared::types::{FollowId, LikeId, Method, PostId, UserId};

use crate::error::NetworkError;
use crate::remote::RemoteDataClient;

fn to_body<T: Serialize>(value: &T) -> Result<Value, NetworkError> {
    serde_json::to_value(value).map_err(|e| NetworkError::InvalidRequest(e.to_string()))
}

/// The social backend's posts, likes, follows and stories endpoints.
#[derive(Clone)]
pub struct SocialApi {
    remote: Arc<dyn RemoteDataClient>,
}

impl SocialApi {
    pub fn new(remote: Arc<dyn RemoteDataClient>) -> Self {
        Self { remote }
    }

    pub async fn list_posts(&self) -> Result<Vec<PostRecord>, NetworkError> {
        self.remote
            .request(Method::Get, POST_PATH, None)
            .await?
            .json()
    }

    pub async fn create_post(&self, post: &NewPost) -> Result<PostRecord, NetworkError> {
        self.remote
            .request(Method::Post, POST_PATH, Some(to_body(post)?))
            .await?
            .json()
    }

    /// Persist the bookmark flag through the generic update-post call.
    pub async fn set_bookmark(&self, post_id: PostId, bookmarked: bool) -> Result<(), NetworkError> {
        let path = format!("{POST_PATH}/{post_id}");
        self.remote
            .request(Method::Patch, &path, Some(to_body(&BookmarkPatch { bookmarked })?))
            .await?;
        Ok(())
    }

    pub async fn like_post(&self, post_id: PostId) -> Result<LikeRecord, NetworkError> {
        self.remote
            .request(Method::Post, LIKE_PATH, Some(to_body(&LikeRequest { post_id })?))
            .await?
            .json()
    }

    pub async fn list_likes(&self) -> Result<Vec<LikeRecord>, NetworkError> {
        self.remote
            .request(Method::Get, LIKE_PATH, None)
            .await?
            .json()
    }

    /// Look up the like on `post_id` when its id was never reported.
    pub async fn find_like(&self, post_id: PostId) -> Result<Option<LikeId>, NetworkError> {
        let likes = self.list_likes().await?;
        Ok(likes.into_iter().find(|l| l.post_id == post_id).map(|l| l.id))
    }

    pub async fn unlike(&self, like_id: LikeId) -> Result<(), NetworkError> {
        let path = format!("{LIKE_PATH}/{like_id}");
        self.remote.request(Method::Delete, &path, None).await?;
        Ok(())
    }

    pub async fn follow_user(&self, followed_id: UserId) -> Result<FollowRecord, NetworkError> {
        self.remote
            .request(
                Method::Post,
                FOLLOW_PATH,
                Some(to_body(&FollowRequest { followed_id })?),
            )
            .await?
            .json()
    }

    pub async fn list_follows(&self) -> Result<Vec<FollowRecord>, NetworkError> {
        self.remote
            .request(Method::Get, FOLLOW_PATH, None)
            .await?
            .json()
    }

    /// Look up the follow of `followed_id` when its id was never reported.
    pub async fn find_follow(&self, followed_id: UserId) -> Result<Option<FollowId>, NetworkError> {
        let follows = self.list_follows().await?;
        Ok(follows
            .into_iter()
            .find(|f| f.followed_id == followed_id)
            .map(|f| f.id))
    }

    pub async fn unfollow(&self, follow_id: FollowId) -> Result<(), NetworkError> {
        let path = format!("{FOLLOW_PATH}/{follow_id}");
        self.remote.request(Method::Delete, &path, None).await?;
        Ok(())
    }

    pub async fn list_stories(&self) -> Result<Vec<StoryRecord>, NetworkError> {
        self.remote
            .request(Method::Get, STORY_PATH, None)
            .await?
            .json()
    }
}
