pub mod api;
pub mod events;
pub mod models;

pub use events::{EventDecodeError, ServerEvent};
pub use models::{Comment, FriendRequest, FriendStatus, Notification, Post, User};
