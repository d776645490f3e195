use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{Comment, FriendRequest, LikeSet, Notification, Post};

/// One text frame on the real-time connection, in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventFrame {
    pub event: String,
    #[serde(default)]
    pub payload: Value,
}

/// Which notification event produced a [`ServerEvent::Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Post,
    Like,
    Comment,
    FriendRequest,
}

impl NotificationKind {
    pub fn event_name(self) -> &'static str {
        match self {
            Self::Post => "postNotification",
            Self::Like => "likeNotification",
            Self::Comment => "commentNotification",
            Self::FriendRequest => "friendRequestNotification",
        }
    }
}

/// Like-set replacement for one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeUpdate {
    #[serde(rename = "_id")]
    pub post_id: String,
    pub likes: LikeSet,
}

/// Comment-list replacement for one post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentUpdate {
    #[serde(rename = "_id")]
    pub post_id: String,
    pub comments: Vec<Comment>,
}

pub const ACTION_ACCEPTED: &str = "accepted friend request";
pub const ACTION_REMOVED: &str = "removed friend";

/// Outcome of an accept/remove on a friendship. Sent by the backend both as
/// the `friendRequestAccept` event and as the PATCH response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendshipChange {
    pub action: String,
    #[serde(default)]
    pub logged_user_id: Option<String>,
    #[serde(default)]
    pub friend_id: Option<String>,
    pub friend_request_data: FriendRequest,
}

impl FriendshipChange {
    pub fn is_accept(&self) -> bool {
        self.action == ACTION_ACCEPTED
    }

    pub fn is_removal(&self) -> bool {
        self.action == ACTION_REMOVED
    }

    /// Users whose posts carry the changed friendship tag.
    pub fn affected_users(&self) -> impl Iterator<Item = &str> {
        self.logged_user_id
            .as_deref()
            .into_iter()
            .chain(self.friend_id.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StatusEnvelope<T> {
    pub status: T,
}

#[derive(Debug, Clone, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

/// Events pushed by the backend over the real-time connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// `postUpload`: a new post for the feed
    PostUpload(Post),

    /// `likeUpdate`: wholesale like-set replacement
    LikeUpdate(LikeUpdate),

    /// `commentUpdate`: wholesale comment-list replacement
    CommentUpdate(CommentUpdate),

    /// `friendRequest`: someone sent the session user a request
    FriendRequestSent(FriendRequest),

    /// `friendRequestAccept`: a friendship was accepted or removed
    FriendshipChanged(FriendshipChange),

    /// `postNotification`, `likeNotification`, `commentNotification`,
    /// `friendRequestNotification`
    Notification {
        kind: NotificationKind,
        notification: Notification,
    },
}

#[derive(Debug, Error)]
pub enum EventDecodeError {
    #[error("unknown event `{0}`")]
    UnknownEvent(String),

    #[error("malformed `{event}` payload: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ServerEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PostUpload(_) => "postUpload",
            Self::LikeUpdate(_) => "likeUpdate",
            Self::CommentUpdate(_) => "commentUpdate",
            Self::FriendRequestSent(_) => "friendRequest",
            Self::FriendshipChanged(_) => "friendRequestAccept",
            Self::Notification { kind, .. } => kind.event_name(),
        }
    }

    /// Decode a named event payload into its typed form.
    pub fn decode(event: &str, payload: Value) -> Result<Self, EventDecodeError> {
        let notification = |kind: NotificationKind, payload: Value| {
            wrapped::<Notification>(event, payload)
                .map(|notification| Self::Notification { kind, notification })
        };

        match event {
            "postUpload" => wrapped(event, payload).map(Self::PostUpload),
            "likeUpdate" => bare(event, payload).map(Self::LikeUpdate),
            "commentUpdate" => wrapped(event, payload).map(Self::CommentUpdate),
            "friendRequest" => wrapped(event, payload).map(Self::FriendRequestSent),
            "friendRequestAccept" => bare::<StatusEnvelope<FriendshipChange>>(event, payload)
                .map(|envelope| Self::FriendshipChanged(envelope.status)),
            "postNotification" => notification(NotificationKind::Post, payload),
            "likeNotification" => notification(NotificationKind::Like, payload),
            "commentNotification" => notification(NotificationKind::Comment, payload),
            "friendRequestNotification" => notification(NotificationKind::FriendRequest, payload),
            other => Err(EventDecodeError::UnknownEvent(other.to_string())),
        }
    }

    /// Decode a raw text frame.
    pub fn from_frame(text: &str) -> Result<Self, EventDecodeError> {
        let frame: EventFrame =
            serde_json::from_str(text).map_err(|source| EventDecodeError::Malformed {
                event: "<frame>".into(),
                source,
            })?;
        Self::decode(&frame.event, frame.payload)
    }
}

fn bare<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T, EventDecodeError> {
    serde_json::from_value(payload).map_err(|source| EventDecodeError::Malformed {
        event: event.to_string(),
        source,
    })
}

fn wrapped<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T, EventDecodeError> {
    bare::<DataEnvelope<T>>(event, payload).map(|envelope| envelope.data)
}

/// Commands sent FROM client TO server over the real-time connection.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// Bind this connection to a user; sent after every (re)connect
    RegisterUser { user_id: String },
}

impl ClientCommand {
    pub fn to_frame(&self) -> EventFrame {
        match self {
            Self::RegisterUser { user_id } => EventFrame {
                event: "registerUser".into(),
                payload: serde_json::json!({ "userId": user_id }),
            },
        }
    }
}
