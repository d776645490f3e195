//! Optimistic mutations as explicit transactions.
//!
//! A transaction is captured against the current state, applied at once and
//! rolled back if the request behind it fails. Each one snapshots only the
//! fields it owns, so rolling back an earlier transaction leaves later
//! changes to the same entity in place.

use kindred_types::{Comment, FriendStatus, Post};
use tracing::trace;

use crate::collection::PagedCollection;
use crate::state::AppState;

pub trait Transaction {
    fn apply(&self, state: &mut AppState);
    fn rollback(&self, state: &mut AppState);
}

fn update_post<F>(state: &mut AppState, post_id: &str, f: F)
where
    F: Fn(&mut Post),
{
    state.for_each_posts(|posts| {
        let mut next = posts.clone();
        next.update(post_id, &f);
        next
    });
}

/// Like or unlike one post on behalf of one user.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeToggle {
    post_id: String,
    user_id: String,
    previous: Option<bool>,
}

impl LikeToggle {
    pub fn capture(state: &AppState, post_id: &str, user_id: &str) -> Option<Self> {
        let post = state.post(post_id)?;
        Some(Self {
            post_id: post_id.to_string(),
            user_id: user_id.to_string(),
            previous: post.likes.get(user_id).copied(),
        })
    }

    /// Whether applying this transaction adds a like.
    pub fn likes(&self) -> bool {
        self.previous != Some(true)
    }
}

impl Transaction for LikeToggle {
    fn apply(&self, state: &mut AppState) {
        let liking = self.likes();
        update_post(state, &self.post_id, |post| {
            if liking {
                post.likes.insert(self.user_id.clone(), true);
            } else {
                post.likes.remove(&self.user_id);
            }
        });
    }

    fn rollback(&self, state: &mut AppState) {
        trace!("Like on {} by {} rolled back", self.post_id, self.user_id);
        update_post(state, &self.post_id, |post| match self.previous {
            Some(value) => {
                post.likes.insert(self.user_id.clone(), value);
            }
            None => {
                post.likes.remove(&self.user_id);
            }
        });
    }
}

/// Append a comment to one post.
#[derive(Debug, Clone, PartialEq)]
pub struct CommentSubmit {
    post_id: String,
    comment: Comment,
}

impl CommentSubmit {
    pub fn capture(state: &AppState, post_id: &str, comment: Comment) -> Option<Self> {
        state.post(post_id)?;
        Some(Self {
            post_id: post_id.to_string(),
            comment,
        })
    }
}

impl Transaction for CommentSubmit {
    fn apply(&self, state: &mut AppState) {
        update_post(state, &self.post_id, |post| post.comments.push(self.comment.clone()));
    }

    fn rollback(&self, state: &mut AppState) {
        update_post(state, &self.post_id, |post| {
            // a commentUpdate may already have replaced the list
            if let Some(position) = post.comments.iter().rposition(|c| *c == self.comment) {
                post.comments.remove(position);
            }
        });
    }
}

/// Send a friend request to the author of loaded posts.
#[derive(Debug, Clone, PartialEq)]
pub struct FriendRequestSend {
    target_id: String,
    previous_tags: Vec<(String, FriendStatus)>,
    previous_friend: FriendStatus,
}

impl FriendRequestSend {
    /// `None` when a request is already pending or the two are friends.
    pub fn capture(state: &AppState, target_id: &str) -> Option<Self> {
        let previous_friend = state.friend_status(target_id);
        if previous_friend != FriendStatus::None {
            return None;
        }

        let mut previous_tags = Vec::new();
        collect_tags(state.feed(), target_id, &mut previous_tags);
        for posts in state.profile_posts.values() {
            collect_tags(posts, target_id, &mut previous_tags);
        }
        if previous_tags.iter().any(|(_, tag)| *tag != FriendStatus::None) {
            return None;
        }

        Some(Self {
            target_id: target_id.to_string(),
            previous_tags,
            previous_friend,
        })
    }
}

fn collect_tags(posts: &PagedCollection<Post>, author_id: &str, out: &mut Vec<(String, FriendStatus)>) {
    out.extend(
        posts
            .iter()
            .filter(|post| post.user_id == author_id)
            .map(|post| (post.id.clone(), post.is_friend)),
    );
}

impl Transaction for FriendRequestSend {
    fn apply(&self, state: &mut AppState) {
        state.mark_author(&self.target_id, FriendStatus::Pending);
        state.set_friend(&self.target_id, FriendStatus::Pending);
    }

    fn rollback(&self, state: &mut AppState) {
        // only undo our own tag; an accept that landed meanwhile stays
        for (post_id, tag) in &self.previous_tags {
            update_post(state, post_id, |post| {
                if post.is_friend == FriendStatus::Pending {
                    post.is_friend = *tag;
                }
            });
        }
        if state.friend_status(&self.target_id) == FriendStatus::Pending {
            state.set_friend(&self.target_id, self.previous_friend);
        }
    }
}

/// Mark one notification as opened (`singleUnread = true`).
#[derive(Debug, Clone, PartialEq)]
pub struct MarkOpened {
    notification_id: String,
    previous: bool,
}

impl MarkOpened {
    /// `None` when the notification is not loaded or already opened.
    pub fn capture(state: &AppState, notification_id: &str) -> Option<Self> {
        let notification = state.notifications().get(notification_id)?;
        if notification.single_unread {
            return None;
        }
        Some(Self {
            notification_id: notification_id.to_string(),
            previous: notification.single_unread,
        })
    }
}

impl Transaction for MarkOpened {
    fn apply(&self, state: &mut AppState) {
        state
            .notifications
            .update(&self.notification_id, |n| n.single_unread = true);
    }

    fn rollback(&self, state: &mut AppState) {
        let previous = self.previous;
        state
            .notifications
            .update(&self.notification_id, |n| n.single_unread = previous);
    }
}
