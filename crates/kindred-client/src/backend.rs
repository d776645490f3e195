use async_trait::async_trait;
use kindred_types::api::{FriendAction, LoginResponse, PageResponse};
use kindred_types::events::FriendshipChange;
use kindred_types::models::LikeSet;
use kindred_types::{Comment, FriendRequest, Notification, Post, User};

use crate::error::Result;

/// Everything the client asks of the remote backend.
///
/// [`crate::ApiClient`] implements it over HTTP; tests substitute their
/// own.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse>;
    async fn logout(&self, user_id: &str) -> Result<()>;
    /// The user behind the current token. 401/403 map to
    /// [`crate::ClientError::Unauthorized`].
    async fn verify(&self) -> Result<User>;
    async fn fetch_user(&self, user_id: &str) -> Result<User>;

    async fn fetch_feed(&self, user_id: &str, after: Option<&str>, limit: u32) -> Result<PageResponse<Post>>;
    async fn fetch_profile_posts(&self, user_id: &str, after: Option<&str>, limit: u32) -> Result<PageResponse<Post>>;
    async fn fetch_notifications(
        &self,
        user_id: &str,
        after: Option<&str>,
        limit: u32,
    ) -> Result<PageResponse<Notification>>;

    async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<LikeSet>;
    async fn add_comment(&self, post_id: &str, user_id: &str, comment: &str) -> Result<Vec<Comment>>;

    /// Succeeds only on `201 Created`.
    async fn send_friend_request(&self, sender_id: &str, receiver_id: &str) -> Result<FriendRequest>;
    async fn respond_friend_request(
        &self,
        user_id: &str,
        target_id: &str,
        request_id: &str,
        action: FriendAction,
    ) -> Result<FriendshipChange>;
    async fn fetch_pending_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>>;
    async fn fetch_accepted_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>>;

    async fn unread_count(&self, user_id: &str) -> Result<i64>;
    async fn mark_all_read(&self, user_id: &str) -> Result<()>;
    async fn mark_opened(&self, notification_id: &str) -> Result<()>;
}
