use std::sync::Arc;

use kindred_types::api::PageResponse;
use kindred_types::events::{FriendshipChange, ServerEvent};
use kindred_types::{FriendRequest, Notification, Post, User};
use tokio::sync::watch;
use tracing::debug;

use crate::optimistic::Transaction;
use crate::state::{AppState, PostCollection};

/// The single writer path to [`AppState`].
///
/// Every reducer runs to completion under the channel's lock, so readers
/// only ever see whole updates. Subscribers are woken after each one.
#[derive(Clone)]
pub struct Store {
    tx: Arc<watch::Sender<AppState>>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(AppState::default());
        Self { tx: Arc::new(tx) }
    }

    /// A consistent copy of the current state. Cheap: collections share
    /// structure with the live state.
    pub fn snapshot(&self) -> AppState {
        self.tx.borrow().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&AppState) -> R) -> R {
        f(&self.tx.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.tx.subscribe()
    }

    fn modify(&self, f: impl FnOnce(&mut AppState)) {
        self.tx.send_modify(f);
    }

    // -- Session --

    pub fn set_user(&self, user: Option<User>) {
        self.modify(|state| state.set_user(user));
    }

    /// Drop everything; used when the session ends.
    pub fn reset(&self) {
        self.modify(|state| *state = AppState::default());
    }

    // -- Pages --

    pub fn append_posts(&self, target: &PostCollection, page: PageResponse<Post>) {
        debug!("Appending {} posts to {:?}", page.items.len(), target);
        self.modify(|state| state.append_posts(target, page));
    }

    pub fn replace_posts(&self, target: &PostCollection, page: PageResponse<Post>) {
        debug!("Replacing {:?} with {} posts", target, page.items.len());
        self.modify(|state| state.replace_posts(target, page));
    }

    pub fn append_notifications(&self, page: PageResponse<Notification>) {
        self.modify(|state| state.append_notifications(page));
    }

    pub fn replace_notifications(&self, page: PageResponse<Notification>) {
        self.modify(|state| state.replace_notifications(page));
    }

    // -- Friends --

    pub fn set_pending_requests(&self, requests: Vec<FriendRequest>) {
        self.modify(|state| state.set_pending_requests(requests));
    }

    pub fn set_accepted_requests(&self, requests: Vec<FriendRequest>) {
        self.modify(|state| state.set_accepted_requests(requests));
    }

    pub fn apply_friendship_change(&self, change: &FriendshipChange) {
        self.modify(|state| state.apply_friendship_change(change));
    }

    // -- Events --

    pub fn apply_event(&self, event: &ServerEvent) {
        self.modify(|state| state.apply_event(event));
    }

    // -- Unread counter --

    pub fn set_unread_count(&self, count: i64) {
        self.modify(|state| state.unread.set(count));
    }

    pub fn clear_unread(&self) {
        self.modify(|state| state.unread.clear());
    }

    // -- Optimistic transactions --

    /// Capture a transaction against the current state and apply it in the
    /// same step. Returns `None`, with nothing applied, when `capture`
    /// declines.
    pub fn begin<T, F>(&self, capture: F) -> Option<T>
    where
        T: Transaction,
        F: FnOnce(&AppState) -> Option<T>,
    {
        let mut captured = None;
        self.tx.send_if_modified(|state| {
            let Some(tx) = capture(state) else {
                return false;
            };
            tx.apply(state);
            captured = Some(tx);
            true
        });
        captured
    }

    pub fn rollback<T: Transaction>(&self, tx: &T) {
        self.modify(|state| tx.rollback(state));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimistic::LikeToggle;
    use kindred_types::FriendStatus;
    use serde_json::json;

    fn post(id: &str) -> Post {
        serde_json::from_value(json!({ "_id": id, "userId": "author" })).unwrap()
    }

    fn page<T>(items: Vec<T>, cursor: Option<&str>) -> PageResponse<T> {
        PageResponse {
            items,
            next_cursor: cursor.map(String::from),
        }
    }

    fn notification_event(id: &str) -> ServerEvent {
        ServerEvent::decode("commentNotification", json!({ "data": { "_id": id } })).unwrap()
    }

    #[test]
    fn counter_moves_by_exactly_n() {
        let store = Store::new();
        store.set_unread_count(3);
        for i in 0..7 {
            store.apply_event(&notification_event(&format!("n{i}")));
        }
        assert_eq!(store.snapshot().unread_count(), 10);

        store.clear_unread();
        assert_eq!(store.snapshot().unread_count(), 0);
        // the list itself is untouched by clear
        assert_eq!(store.snapshot().notifications().len(), 7);
    }

    #[test]
    fn interleaved_events_and_pages_never_duplicate() {
        let store = Store::new();
        store.append_posts(&PostCollection::Feed, page(vec![post("p2"), post("p3")], Some("c1")));

        let new_post = |id: &str| {
            ServerEvent::decode("postUpload", json!({ "data": { "_id": id, "userId": "x" } })).unwrap()
        };
        store.apply_event(&new_post("p1"));
        store.apply_event(&new_post("p1"));
        // next page overlaps with the pushed post
        store.append_posts(&PostCollection::Feed, page(vec![post("p1"), post("p4")], None));
        store.apply_event(&new_post("p4"));

        let ids = store.snapshot().feed().ids();
        assert_eq!(ids, vec!["p1", "p2", "p3", "p4"]);
        assert!(!store.snapshot().feed().has_next_page());
    }

    #[test]
    fn refresh_replaces_pages() {
        let store = Store::new();
        store.append_posts(&PostCollection::Feed, page(vec![post("p1")], Some("c1")));
        store.append_posts(&PostCollection::Feed, page(vec![post("p2")], None));
        store.replace_posts(&PostCollection::Feed, page(vec![post("p0"), post("p1")], Some("c9")));

        let state = store.snapshot();
        assert_eq!(state.feed().ids(), vec!["p0", "p1"]);
        assert_eq!(state.feed().page_count(), 1);
    }

    #[test]
    fn snapshots_are_isolated_from_later_updates() {
        let store = Store::new();
        store.append_posts(&PostCollection::Feed, page(vec![post("p1")], None));
        let before = store.snapshot();

        store.begin(|state| LikeToggle::capture(state, "p1", "u1")).unwrap();

        assert!(!before.feed().get("p1").unwrap().is_liked_by("u1"));
        assert!(store.snapshot().feed().get("p1").unwrap().is_liked_by("u1"));
    }

    #[test]
    fn declined_capture_changes_nothing() {
        let store = Store::new();
        let rx = store.subscribe();

        let tx = store.begin(|state| LikeToggle::capture(state, "missing", "u1"));
        assert!(tx.is_none());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn friend_request_event_tags_sender_posts() {
        let store = Store::new();
        store.append_posts(&PostCollection::Feed, page(vec![post("p1")], None));
        let event = ServerEvent::decode(
            "friendRequest",
            json!({ "data": {
                "_id": "r1",
                "friendRequestSenderId": "author",
                "friendRequestReceiverId": "me",
                "isFriend": "pending"
            }}),
        )
        .unwrap();
        store.apply_event(&event);

        let state = store.snapshot();
        assert_eq!(state.pending_requests().front().unwrap().id, "r1");
        assert_eq!(state.feed().get("p1").unwrap().is_friend, FriendStatus::Pending);
        assert_eq!(state.friend_status("author"), FriendStatus::Pending);
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let store = Store::new();
        let mut rx = store.subscribe();
        store.set_unread_count(4);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().unread_count(), 4);
    }
}
