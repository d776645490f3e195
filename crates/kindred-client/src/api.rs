use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use kindred_types::api::{
    CommentRequest, CommentResponse, FriendAction, LikeRequest, LikeResponse, LoginRequest,
    LoginResponse, LogoutRequest, PageQuery, PageResponse, UnreadCountResponse, UserResponse,
};
use kindred_types::events::{FriendshipChange, StatusEnvelope};
use kindred_types::models::LikeSet;
use kindred_types::{Comment, FriendRequest, Notification, Post, User};

use crate::backend::Backend;
use crate::credentials::Credentials;
use crate::error::{ClientError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Some endpoints wrap their body in `data`, some do not.
#[derive(Deserialize)]
#[serde(untagged)]
enum Enveloped<T> {
    Data { data: T },
    Bare(T),
}

impl<T> Enveloped<T> {
    fn into_inner(self) -> T {
        match self {
            Self::Data { data } | Self::Bare(data) => data,
        }
    }
}

/// HTTP client for the backend REST API.
///
/// Every request goes through [`ApiClient::request`], which attaches the
/// stored bearer token when there is one.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(base_url: &str, credentials: Credentials) -> Result<Self> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}{}", self.base_url, path));
        match self.credentials.token().await {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, method: Method, path: &str, builder: RequestBuilder) -> Result<Response> {
        trace!("{} {}", method, path);
        let resp = builder.send().await?;
        match resp.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ClientError::Unauthorized),
            status if status.is_success() => Ok(resp),
            status => {
                debug!("{} {} failed with {}", method, path, status);
                Err(ClientError::Status {
                    method,
                    path: path.to_string(),
                    status: status.as_u16(),
                })
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let builder = self.request(Method::GET, path).await;
        let resp = self.send(Method::GET, path, builder).await?;
        read_json(resp).await
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        after: Option<&str>,
        limit: u32,
    ) -> Result<PageResponse<T>> {
        let builder = self
            .request(Method::GET, path)
            .await
            .query(&PageQuery { after, limit });
        let resp = self.send(Method::GET, path, builder).await?;
        read_json(resp).await
    }

    async fn patch_empty(&self, path: &str) -> Result<Response> {
        let builder = self
            .request(Method::PATCH, path)
            .await
            .json(&serde_json::json!({}));
        self.send(Method::PATCH, path, builder).await
    }
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let bytes = resp.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl Backend for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
            fcm_token: None,
            browser: "kindred".into(),
        };
        let builder = self.request(Method::POST, "/auth/login").await.json(&body);
        let resp = self.send(Method::POST, "/auth/login", builder).await?;
        read_json(resp).await
    }

    async fn logout(&self, user_id: &str) -> Result<()> {
        let body = LogoutRequest {
            user_id: user_id.to_string(),
        };
        let builder = self.request(Method::POST, "/auth/logout").await.json(&body);
        self.send(Method::POST, "/auth/logout", builder).await?;
        Ok(())
    }

    async fn verify(&self) -> Result<User> {
        let user: UserResponse = self.get("/auth/verify").await?;
        Ok(user.into_user())
    }

    async fn fetch_user(&self, user_id: &str) -> Result<User> {
        let user: UserResponse = self.get(&format!("/users/{}", user_id)).await?;
        Ok(user.into_user())
    }

    async fn fetch_feed(&self, user_id: &str, after: Option<&str>, limit: u32) -> Result<PageResponse<Post>> {
        self.get_page(&format!("/posts/{}", user_id), after, limit).await
    }

    async fn fetch_profile_posts(&self, user_id: &str, after: Option<&str>, limit: u32) -> Result<PageResponse<Post>> {
        self.get_page(&format!("/posts/{}/posts", user_id), after, limit).await
    }

    async fn fetch_notifications(
        &self,
        user_id: &str,
        after: Option<&str>,
        limit: u32,
    ) -> Result<PageResponse<Notification>> {
        self.get_page(&format!("/notifications/{}", user_id), after, limit).await
    }

    async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<LikeSet> {
        let path = format!("/post/{}/like", post_id);
        let builder = self
            .request(Method::PATCH, &path)
            .await
            .json(&LikeRequest { user_id });
        let resp = self.send(Method::PATCH, &path, builder).await?;
        let body: LikeResponse = read_json(resp).await?;
        Ok(body.likes)
    }

    async fn add_comment(&self, post_id: &str, user_id: &str, comment: &str) -> Result<Vec<Comment>> {
        let path = format!("/post/{}/comment", post_id);
        let builder = self
            .request(Method::POST, &path)
            .await
            .json(&CommentRequest { user_id, comment });
        let resp = self.send(Method::POST, &path, builder).await?;
        let body: CommentResponse = read_json(resp).await?;
        Ok(body.comments)
    }

    async fn send_friend_request(&self, sender_id: &str, receiver_id: &str) -> Result<FriendRequest> {
        let path = format!("/friend/{}/{}", sender_id, receiver_id);
        let builder = self
            .request(Method::POST, &path)
            .await
            .json(&serde_json::json!({}));
        let resp = self.send(Method::POST, &path, builder).await?;
        if resp.status() != StatusCode::CREATED {
            return Err(ClientError::Status {
                method: Method::POST,
                path,
                status: resp.status().as_u16(),
            });
        }
        let body: Enveloped<FriendRequest> = read_json(resp).await?;
        Ok(body.into_inner())
    }

    async fn respond_friend_request(
        &self,
        user_id: &str,
        target_id: &str,
        request_id: &str,
        action: FriendAction,
    ) -> Result<FriendshipChange> {
        let path = format!(
            "/friend/{}/{}/{}/{}",
            user_id,
            target_id,
            request_id,
            action.as_str()
        );
        let resp = self.patch_empty(&path).await?;
        let body: StatusEnvelope<FriendshipChange> = read_json(resp).await?;
        Ok(body.status)
    }

    async fn fetch_pending_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>> {
        let body: Enveloped<Vec<FriendRequest>> =
            self.get(&format!("/friends/pending/{}", user_id)).await?;
        Ok(body.into_inner())
    }

    async fn fetch_accepted_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>> {
        let body: Enveloped<Vec<FriendRequest>> =
            self.get(&format!("/friends/accept/{}", user_id)).await?;
        Ok(body.into_inner())
    }

    async fn unread_count(&self, user_id: &str) -> Result<i64> {
        let body: UnreadCountResponse = self
            .get(&format!("/notifications/unreadCount/{}", user_id))
            .await?;
        Ok(body.count())
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<()> {
        self.patch_empty(&format!("/notifications/markRead/{}", user_id))
            .await?;
        Ok(())
    }

    async fn mark_opened(&self, notification_id: &str) -> Result<()> {
        self.patch_empty(&format!("/notifications/singleMarkRead/{}", notification_id))
            .await?;
        Ok(())
    }
}
