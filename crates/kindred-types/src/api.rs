use serde::{Deserialize, Serialize};

use crate::models::{Comment, LikeSet, User};

// -- Auth --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub fcm_token: Option<String>,
    pub browser: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutRequest {
    pub user_id: String,
}

/// `GET /auth/verify` and `GET /users/{id}` answer with the user either
/// bare or under `user`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UserResponse {
    Wrapped { user: User },
    Bare(User),
}

impl UserResponse {
    pub fn into_user(self) -> User {
        match self {
            Self::Wrapped { user } | Self::Bare(user) => user,
        }
    }
}

// -- Pagination --

/// One page of a cursor-paginated collection. A `next_cursor` of `None`
/// means there is nothing after this page.
///
/// The backend names the item array after the collection (`posts`,
/// `notifications`); `items` is accepted as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse<T> {
    #[serde(alias = "posts", alias = "notifications")]
    pub items: Vec<T>,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PageQuery<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<&'a str>,
    pub limit: u32,
}

// -- Posts --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest<'a> {
    pub user_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRequest<'a> {
    pub user_id: &'a str,
    pub comment: &'a str,
}

/// Body of the like PATCH. The backend answers with the updated post; only
/// the like-set is read.
#[derive(Debug, Deserialize)]
pub struct LikeResponse {
    #[serde(default)]
    pub likes: LikeSet,
}

#[derive(Debug, Deserialize)]
pub struct CommentResponse {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

// -- Friends --

/// Last path segment of the friendship PATCH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FriendAction {
    Accept,
    Remove,
}

impl FriendAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accept => "accept",
            Self::Remove => "remove",
        }
    }
}

// -- Notifications --

/// Unread count as reported by the backend; accepts a bare integer or
/// `{ "count": n }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum UnreadCountResponse {
    Bare(i64),
    Wrapped { count: i64 },
}

impl UnreadCountResponse {
    pub fn count(&self) -> i64 {
        match self {
            Self::Bare(n) | Self::Wrapped { count: n } => *n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Post;

    #[test]
    fn page_accepts_collection_named_arrays() {
        let page: PageResponse<Post> = serde_json::from_value(serde_json::json!({
            "posts": [{ "_id": "p1", "userId": "u1" }],
            "nextCursor": "c1",
        }))
        .unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.next_cursor.as_deref(), Some("c1"));

        let page: PageResponse<Post> = serde_json::from_value(serde_json::json!({
            "items": [],
            "nextCursor": null,
        }))
        .unwrap();
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn unread_count_shapes() {
        let bare: UnreadCountResponse = serde_json::from_str("7").unwrap();
        let wrapped: UnreadCountResponse = serde_json::from_str(r#"{"count":3}"#).unwrap();
        assert_eq!(bare.count(), 7);
        assert_eq!(wrapped.count(), 3);
    }

    #[test]
    fn user_response_shapes() {
        let wrapped: UserResponse =
            serde_json::from_str(r#"{"user":{"_id":"u1","firstName":"Ada"}}"#).unwrap();
        let bare: UserResponse = serde_json::from_str(r#"{"_id":"u2"}"#).unwrap();
        assert_eq!(wrapped.into_user().first_name, "Ada");
        assert_eq!(bare.into_user().id, "u2");
    }

    #[test]
    fn page_query_omits_missing_cursor() {
        let query = PageQuery { after: None, limit: 5 };
        assert_eq!(serde_json::to_value(&query).unwrap(), serde_json::json!({ "limit": 5 }));
    }
}
