use im::HashMap;
use kindred_types::api::PageResponse;
use kindred_types::events::{FriendshipChange, ServerEvent};
use kindred_types::{FriendRequest, FriendStatus, Notification, Post, User};
use tracing::debug;

use crate::collection::{NextPage, PagedCollection};
use crate::counter::UnreadCounter;
use crate::friends::FriendRequestBook;
use crate::keyed_list::KeyedList;
use crate::reconcile;

/// Which post collection an operation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PostCollection {
    Feed,
    Profile(String),
}

/// A paginated collection together with the subject it is fetched for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CollectionKey {
    /// Home feed of the given user
    Feed(String),
    /// Posts authored by the given user
    ProfilePosts(String),
    /// Notifications addressed to the given user
    Notifications(String),
}

impl CollectionKey {
    pub fn subject(&self) -> &str {
        match self {
            Self::Feed(id) | Self::ProfilePosts(id) | Self::Notifications(id) => id,
        }
    }
}

/// Process-wide client state. Read through the selectors; written only by
/// [`crate::Store`].
#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub(crate) user: Option<User>,
    pub(crate) feed: PagedCollection<Post>,
    pub(crate) profile_posts: HashMap<String, PagedCollection<Post>>,
    pub(crate) notifications: PagedCollection<Notification>,
    pub(crate) friend_requests: FriendRequestBook,
    pub(crate) friends: HashMap<String, FriendStatus>,
    pub(crate) unread: UnreadCounter,
}

impl AppState {
    // -- Selectors --

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.id.as_str())
    }

    pub fn feed(&self) -> &PagedCollection<Post> {
        &self.feed
    }

    pub fn profile_posts(&self, user_id: &str) -> Option<&PagedCollection<Post>> {
        self.profile_posts.get(user_id)
    }

    pub fn notifications(&self) -> &PagedCollection<Notification> {
        &self.notifications
    }

    pub fn pending_requests(&self) -> &KeyedList<FriendRequest> {
        self.friend_requests.pending()
    }

    pub fn accepted_requests(&self) -> &KeyedList<FriendRequest> {
        self.friend_requests.accepted()
    }

    pub fn friend_status(&self, user_id: &str) -> FriendStatus {
        self.friends.get(user_id).copied().unwrap_or_default()
    }

    pub fn unread_count(&self) -> u64 {
        self.unread.get()
    }

    pub fn post(&self, post_id: &str) -> Option<&Post> {
        self.feed
            .get(post_id)
            .or_else(|| self.profile_posts.values().find_map(|posts| posts.get(post_id)))
    }

    pub fn next_page(&self, key: &CollectionKey) -> NextPage {
        match key {
            CollectionKey::Feed(_) => self.feed.next_page(),
            CollectionKey::ProfilePosts(user_id) => self
                .profile_posts
                .get(user_id)
                .map(PagedCollection::next_page)
                .unwrap_or(NextPage::First),
            CollectionKey::Notifications(_) => self.notifications.next_page(),
        }
    }

    // -- Reducers --

    pub(crate) fn set_user(&mut self, user: Option<User>) {
        self.friends = user
            .as_ref()
            .map(|user| {
                user.friends
                    .iter()
                    .filter(|(_, status)| **status != FriendStatus::None)
                    .map(|(id, status)| (id.clone(), *status))
                    .collect()
            })
            .unwrap_or_default();
        self.user = user;
    }

    pub(crate) fn posts_mut(&mut self, target: &PostCollection) -> &mut PagedCollection<Post> {
        match target {
            PostCollection::Feed => &mut self.feed,
            PostCollection::Profile(user_id) => {
                self.profile_posts.entry(user_id.clone()).or_default()
            }
        }
    }

    /// Run `f` over the feed and every loaded profile collection.
    pub(crate) fn for_each_posts<F>(&mut self, mut f: F)
    where
        F: FnMut(&PagedCollection<Post>) -> PagedCollection<Post>,
    {
        self.feed = f(&self.feed);
        self.profile_posts = self
            .profile_posts
            .iter()
            .map(|(id, posts)| (id.clone(), f(posts)))
            .collect();
    }

    pub(crate) fn append_posts(&mut self, target: &PostCollection, page: PageResponse<Post>) {
        self.posts_mut(target).append_page(page.items, page.next_cursor);
    }

    pub(crate) fn replace_posts(&mut self, target: &PostCollection, page: PageResponse<Post>) {
        *self.posts_mut(target) = PagedCollection::with_first_page(page.items, page.next_cursor);
    }

    pub(crate) fn append_notifications(&mut self, page: PageResponse<Notification>) {
        self.notifications.append_page(page.items, page.next_cursor);
    }

    pub(crate) fn replace_notifications(&mut self, page: PageResponse<Notification>) {
        self.notifications = PagedCollection::with_first_page(page.items, page.next_cursor);
    }

    pub(crate) fn set_pending_requests(&mut self, requests: Vec<FriendRequest>) {
        self.friend_requests.set_pending(requests);
    }

    pub(crate) fn set_accepted_requests(&mut self, requests: Vec<FriendRequest>) {
        self.friend_requests.set_accepted(requests);
    }

    pub(crate) fn set_friend(&mut self, user_id: &str, status: FriendStatus) {
        if status == FriendStatus::None {
            self.friends.remove(user_id);
        } else {
            self.friends.insert(user_id.to_string(), status);
        }
    }

    pub(crate) fn mark_author(&mut self, author_id: &str, status: FriendStatus) {
        self.for_each_posts(|posts| reconcile::mark_author(posts, author_id, status));
    }

    pub(crate) fn apply_friendship_change(&mut self, change: &FriendshipChange) {
        self.for_each_posts(|posts| reconcile::friendship_posts(posts, change));
        self.friend_requests = reconcile::friendship_requests(&self.friend_requests, change);
        let me = self.user.as_ref().map(|user| user.id.clone());
        self.friends = reconcile::friendship_friends(&self.friends, change, me.as_deref());
    }

    pub(crate) fn apply_event(&mut self, event: &ServerEvent) {
        debug!("Reconciling {}", event.name());
        match event {
            ServerEvent::PostUpload(post) => {
                self.feed = reconcile::new_post(&self.feed, post);
            }
            ServerEvent::LikeUpdate(update) => {
                self.for_each_posts(|posts| reconcile::like_update(posts, update));
            }
            ServerEvent::CommentUpdate(update) => {
                self.for_each_posts(|posts| reconcile::comment_update(posts, update));
            }
            ServerEvent::FriendRequestSent(request) => {
                self.friend_requests = reconcile::friend_request_sent(&self.friend_requests, request);
                self.mark_author(&request.friend_request_sender_id, FriendStatus::Pending);
                self.set_friend(&request.friend_request_sender_id, FriendStatus::Pending);
            }
            ServerEvent::FriendshipChanged(change) => self.apply_friendship_change(change),
            ServerEvent::Notification { notification, .. } => {
                let (notifications, unread) =
                    reconcile::notification_created(&self.notifications, self.unread, notification);
                self.notifications = notifications;
                self.unread = unread;
            }
        }
    }
}
