use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Friendship of the viewer with some other user, as tagged by the backend.
/// Serialized as `""`, `"pending"` or `"accepted"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum FriendStatus {
    #[default]
    None,
    Pending,
    Accepted,
}

impl FriendStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "",
            Self::Pending => "pending",
            Self::Accepted => "accepted",
        }
    }
}

impl From<Option<String>> for FriendStatus {
    fn from(raw: Option<String>) -> Self {
        match raw.as_deref() {
            Some("pending") => Self::Pending,
            Some("accepted") => Self::Accepted,
            _ => Self::None,
        }
    }
}

impl From<FriendStatus> for String {
    fn from(status: FriendStatus) -> Self {
        status.as_str().to_string()
    }
}

/// Like-set of a post: user id -> presence. Order is irrelevant.
pub type LikeSet = BTreeMap<String, bool>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub user_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub comment: String,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn author_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub picture_path: Option<String>,
    #[serde(default)]
    pub user_picture_path: String,
    #[serde(default)]
    pub likes: LikeSet,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub is_friend: FriendStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.get(user_id).copied().unwrap_or(false)
    }

    pub fn like_count(&self) -> usize {
        self.likes.values().filter(|liked| **liked).count()
    }
}

/// A notification as the backend sends it.
///
/// `unread` is the list-level read marker; `single_unread` records whether
/// the user opened this particular item. The two are tracked independently
/// and neither is derived from the unread counter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub unread: bool,
    #[serde(default)]
    pub single_unread: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Denormalized name + picture of one side of a friend request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    #[serde(default, rename = "_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub picture_path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    #[serde(rename = "_id")]
    pub id: String,
    pub friend_request_sender_id: String,
    pub friend_request_receiver_id: String,
    #[serde(default)]
    pub friend_request_sender_details: UserSnapshot,
    #[serde(default)]
    pub friend_request_receiver_details: UserSnapshot,
    #[serde(default)]
    pub is_friend: FriendStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub picture_path: String,
    #[serde(default)]
    pub friends: HashMap<String, FriendStatus>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub fn is_friend_with(&self, user_id: &str) -> bool {
        self.friends
            .get(user_id)
            .is_some_and(|status| *status != FriendStatus::None)
    }
}
