//! User actions. Optimistic ones apply at once and roll back when the
//! request fails; failures are logged, never raised.

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use kindred_store::{CommentSubmit, FriendRequestSend, LikeToggle, MarkOpened, Store, Transaction};
use kindred_types::api::FriendAction;
use kindred_types::{Comment, FriendRequest};

use crate::backend::Backend;
use crate::error::ClientError;

#[derive(Clone)]
pub struct Actions {
    backend: Arc<dyn Backend>,
    store: Store,
    user_id: String,
    auth_lost: CancellationToken,
}

impl Actions {
    pub fn new(backend: Arc<dyn Backend>, store: Store, user_id: &str, auth_lost: CancellationToken) -> Self {
        Self {
            backend,
            store,
            user_id: user_id.to_string(),
            auth_lost,
        }
    }

    fn failed(&self, what: &str, err: &ClientError) {
        warn!("{} failed: {}", what, err);
        if err.is_unauthorized() {
            self.auth_lost.cancel();
        }
    }

    fn revert<T: Transaction>(&self, tx: &T, what: &str, err: ClientError) -> bool {
        self.failed(what, &err);
        self.store.rollback(tx);
        false
    }

    /// Like or unlike a loaded post. Returns whether the change stuck.
    pub async fn toggle_like(&self, post_id: &str) -> bool {
        let Some(tx) = self
            .store
            .begin(|state| LikeToggle::capture(state, post_id, &self.user_id))
        else {
            debug!("Like on {} ignored: post not loaded", post_id);
            return false;
        };

        match self.backend.toggle_like(post_id, &self.user_id).await {
            Ok(_) => true,
            Err(e) => self.revert(&tx, "Like", e),
        }
    }

    pub async fn submit_comment(&self, post_id: &str, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }

        let (first_name, last_name) = self.store.read(|state| {
            state
                .user()
                .map(|user| (user.first_name.clone(), user.last_name.clone()))
                .unwrap_or_default()
        });
        let comment = Comment {
            user_id: self.user_id.clone(),
            first_name,
            last_name,
            comment: text.to_string(),
            timestamp: Some(Utc::now()),
        };

        let Some(tx) = self
            .store
            .begin(|state| CommentSubmit::capture(state, post_id, comment))
        else {
            debug!("Comment on {} ignored: post not loaded", post_id);
            return false;
        };

        match self.backend.add_comment(post_id, &self.user_id, text).await {
            Ok(_) => true,
            Err(e) => self.revert(&tx, "Comment", e),
        }
    }

    /// Ask `target_id` for friendship. Skipped when a request is already
    /// pending or the two are friends.
    pub async fn send_friend_request(&self, target_id: &str) -> bool {
        if target_id == self.user_id {
            return false;
        }
        let Some(tx) = self
            .store
            .begin(|state| FriendRequestSend::capture(state, target_id))
        else {
            debug!("Friend request to {} skipped", target_id);
            return false;
        };

        match self.backend.send_friend_request(&self.user_id, target_id).await {
            Ok(request) => {
                info!("Friend request {} sent to {}", request.id, target_id);
                true
            }
            Err(e) => self.revert(&tx, "Friend request", e),
        }
    }

    pub async fn accept_friend(&self, request: &FriendRequest) -> bool {
        self.respond(request, FriendAction::Accept).await
    }

    pub async fn remove_friend(&self, request: &FriendRequest) -> bool {
        self.respond(request, FriendAction::Remove).await
    }

    async fn respond(&self, request: &FriendRequest, action: FriendAction) -> bool {
        let target_id = if request.friend_request_sender_id == self.user_id {
            &request.friend_request_receiver_id
        } else {
            &request.friend_request_sender_id
        };

        match self
            .backend
            .respond_friend_request(&self.user_id, target_id, &request.id, action)
            .await
        {
            Ok(change) => {
                self.store.apply_friendship_change(&change);
                true
            }
            Err(e) => {
                self.failed("Friend response", &e);
                false
            }
        }
    }

    /// Mark one notification as opened.
    pub async fn open_notification(&self, notification_id: &str) -> bool {
        let Some(tx) = self
            .store
            .begin(|state| MarkOpened::capture(state, notification_id))
        else {
            return false;
        };

        match self.backend.mark_opened(notification_id).await {
            Ok(()) => true,
            Err(e) => self.revert(&tx, "Mark opened", e),
        }
    }

    /// Mark everything read. The counter is cleared once the backend
    /// confirms.
    pub async fn mark_all_read(&self) -> bool {
        match self.backend.mark_all_read(&self.user_id).await {
            Ok(()) => {
                self.store.clear_unread();
                true
            }
            Err(e) => {
                self.failed("Mark all read", &e);
                false
            }
        }
    }

    pub async fn refresh_unread_count(&self) -> bool {
        match self.backend.unread_count(&self.user_id).await {
            Ok(count) => {
                self.store.set_unread_count(count);
                true
            }
            Err(e) => {
                self.failed("Unread count", &e);
                false
            }
        }
    }

    /// Replace both friend-request lists with the backend's.
    pub async fn refresh_friend_requests(&self) -> bool {
        let (pending, accepted) = tokio::join!(
            self.backend.fetch_pending_requests(&self.user_id),
            self.backend.fetch_accepted_requests(&self.user_id),
        );

        let mut ok = true;
        match pending {
            Ok(requests) => self.store.set_pending_requests(requests),
            Err(e) => {
                self.failed("Pending requests", &e);
                ok = false;
            }
        }
        match accepted {
            Ok(requests) => self.store.set_accepted_requests(requests),
            Err(e) => {
                self.failed("Accepted requests", &e);
                ok = false;
            }
        }
        ok
    }
}
