#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use kindred_client::{Backend, ClientConfig, ClientError, Result};
use kindred_store::{AppState, Store};
use kindred_types::api::{FriendAction, LoginResponse, PageResponse};
use kindred_types::events::FriendshipChange;
use kindred_types::models::LikeSet;
use kindred_types::{Comment, FriendRequest, Notification, Post, User};

pub fn post(id: &str, author: &str) -> Post {
    serde_json::from_value(json!({ "_id": id, "userId": author })).unwrap()
}

pub fn posts(ids: &[&str]) -> Vec<Post> {
    ids.iter().map(|id| post(id, "author")).collect()
}

pub fn notification(id: &str) -> Notification {
    serde_json::from_value(json!({ "_id": id, "title": id })).unwrap()
}

pub fn user(id: &str) -> User {
    serde_json::from_value(json!({ "_id": id, "firstName": "Test", "lastName": id })).unwrap()
}

pub fn request(id: &str, sender: &str, receiver: &str, status: &str) -> FriendRequest {
    serde_json::from_value(json!({
        "_id": id,
        "friendRequestSenderId": sender,
        "friendRequestReceiverId": receiver,
        "isFriend": status,
    }))
    .unwrap()
}

pub fn page<T>(items: Vec<T>, cursor: Option<&str>) -> PageResponse<T> {
    PageResponse {
        items,
        next_cursor: cursor.map(String::from),
    }
}

/// Config for sessions that never reach a real gateway.
pub fn offline_config() -> ClientConfig {
    ClientConfig {
        socket_url: "ws://127.0.0.1:1/socket".into(),
        reconnect_min: Duration::from_secs(60),
        reconnect_max: Duration::from_secs(60),
        ..ClientConfig::default()
    }
}

fn server_error(path: &str) -> ClientError {
    ClientError::Status {
        method: reqwest::Method::GET,
        path: path.to_string(),
        status: 500,
    }
}

/// In-memory backend. Pages are served by cursor; every call is recorded.
#[derive(Default)]
pub struct FakeBackend {
    pub feed: Mutex<HashMap<Option<String>, PageResponse<Post>>>,
    pub profile: Mutex<HashMap<Option<String>, PageResponse<Post>>>,
    pub notifications: Mutex<HashMap<Option<String>, PageResponse<Notification>>>,
    pub pending: Mutex<Vec<FriendRequest>>,
    pub accepted: Mutex<Vec<FriendRequest>>,
    pub unread: AtomicI64,
    pub verified_user: Mutex<Option<User>>,
    pub fail_fetches: AtomicBool,
    pub fail_mutations: AtomicBool,
    pub reject_token: AtomicBool,
    /// When set, feed fetches wait for `release` before answering
    pub hold_fetches: AtomicBool,
    pub release: Notify,
    pub calls: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn check_auth(&self) -> Result<()> {
        if self.reject_token.load(Ordering::SeqCst) {
            return Err(ClientError::Unauthorized);
        }
        Ok(())
    }

    fn mutation(&self, path: &str) -> Result<()> {
        self.check_auth()?;
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(server_error(path));
        }
        Ok(())
    }

    fn serve<T: Clone>(
        &self,
        pages: &Mutex<HashMap<Option<String>, PageResponse<T>>>,
        path: &str,
        after: Option<&str>,
    ) -> Result<PageResponse<T>> {
        self.check_auth()?;
        if self.fail_fetches.load(Ordering::SeqCst) {
            return Err(server_error(path));
        }
        Ok(pages
            .lock()
            .unwrap()
            .get(&after.map(String::from))
            .cloned()
            .unwrap_or_else(|| page(Vec::new(), None)))
    }
}

#[async_trait]
impl Backend for FakeBackend {
    async fn login(&self, email: &str, _password: &str) -> Result<LoginResponse> {
        self.record(format!("login {}", email));
        self.check_auth()?;
        Ok(LoginResponse {
            user: user("me"),
            token: "t0k".into(),
        })
    }

    async fn logout(&self, user_id: &str) -> Result<()> {
        self.record(format!("logout {}", user_id));
        Ok(())
    }

    async fn verify(&self) -> Result<User> {
        self.record("verify".into());
        self.check_auth()?;
        Ok(self.verified_user.lock().unwrap().clone().unwrap_or_else(|| user("me")))
    }

    async fn fetch_user(&self, user_id: &str) -> Result<User> {
        self.record(format!("fetch_user {}", user_id));
        Ok(user(user_id))
    }

    async fn fetch_feed(&self, user_id: &str, after: Option<&str>, limit: u32) -> Result<PageResponse<Post>> {
        self.record(format!("fetch_feed {} {:?} {}", user_id, after, limit));
        if self.hold_fetches.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        self.serve(&self.feed, "/posts", after)
    }

    async fn fetch_profile_posts(&self, user_id: &str, after: Option<&str>, limit: u32) -> Result<PageResponse<Post>> {
        self.record(format!("fetch_profile {} {:?} {}", user_id, after, limit));
        self.serve(&self.profile, "/posts/profile", after)
    }

    async fn fetch_notifications(
        &self,
        user_id: &str,
        after: Option<&str>,
        limit: u32,
    ) -> Result<PageResponse<Notification>> {
        self.record(format!("fetch_notifications {} {:?} {}", user_id, after, limit));
        self.serve(&self.notifications, "/notifications", after)
    }

    async fn toggle_like(&self, post_id: &str, user_id: &str) -> Result<LikeSet> {
        self.record(format!("toggle_like {} {}", post_id, user_id));
        self.mutation("/post/like")?;
        Ok(LikeSet::new())
    }

    async fn add_comment(&self, post_id: &str, user_id: &str, comment: &str) -> Result<Vec<Comment>> {
        self.record(format!("add_comment {} {} {}", post_id, user_id, comment));
        self.mutation("/post/comment")?;
        Ok(Vec::new())
    }

    async fn send_friend_request(&self, sender_id: &str, receiver_id: &str) -> Result<FriendRequest> {
        self.record(format!("send_friend_request {} {}", sender_id, receiver_id));
        self.mutation("/friend")?;
        Ok(request("r-new", sender_id, receiver_id, "pending"))
    }

    async fn respond_friend_request(
        &self,
        user_id: &str,
        target_id: &str,
        request_id: &str,
        action: FriendAction,
    ) -> Result<FriendshipChange> {
        self.record(format!(
            "respond {} {} {} {}",
            user_id,
            target_id,
            request_id,
            action.as_str()
        ));
        self.mutation("/friend")?;
        // a removal carries the request's status at removal time
        let was_accepted = self
            .accepted
            .lock()
            .unwrap()
            .iter()
            .any(|r| r.id == request_id);
        let (label, status) = match action {
            FriendAction::Accept => ("accepted friend request", "accepted"),
            FriendAction::Remove if was_accepted => ("removed friend", "accepted"),
            FriendAction::Remove => ("removed friend", "pending"),
        };
        Ok(FriendshipChange {
            action: label.into(),
            logged_user_id: Some(user_id.into()),
            friend_id: Some(target_id.into()),
            friend_request_data: request(request_id, target_id, user_id, status),
        })
    }

    async fn fetch_pending_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>> {
        self.record(format!("fetch_pending {}", user_id));
        self.check_auth()?;
        Ok(self.pending.lock().unwrap().clone())
    }

    async fn fetch_accepted_requests(&self, user_id: &str) -> Result<Vec<FriendRequest>> {
        self.record(format!("fetch_accepted {}", user_id));
        self.check_auth()?;
        Ok(self.accepted.lock().unwrap().clone())
    }

    async fn unread_count(&self, user_id: &str) -> Result<i64> {
        self.record(format!("unread_count {}", user_id));
        self.check_auth()?;
        Ok(self.unread.load(Ordering::SeqCst))
    }

    async fn mark_all_read(&self, user_id: &str) -> Result<()> {
        self.record(format!("mark_all_read {}", user_id));
        self.mutation("/notifications/markRead")
    }

    async fn mark_opened(&self, notification_id: &str) -> Result<()> {
        self.record(format!("mark_opened {}", notification_id));
        self.mutation("/notifications/singleMarkRead")
    }
}

/// Wait until the store satisfies `pred`, failing the test after a second.
pub async fn wait_for<F>(store: &Store, pred: F)
where
    F: Fn(&AppState) -> bool,
{
    let mut rx = store.subscribe();
    let waited = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            let ready = {
                let state = rx.borrow_and_update();
                pred(&*state)
            };
            if ready {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    })
    .await;
    assert!(waited.is_ok(), "store never reached the expected state");
}

/// Wait until `backend` has recorded a call starting with `prefix`.
pub async fn wait_for_call(backend: &FakeBackend, prefix: &str) {
    let waited = tokio::time::timeout(Duration::from_secs(1), async {
        while backend.count(prefix) == 0 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "backend never saw {}", prefix);
}
