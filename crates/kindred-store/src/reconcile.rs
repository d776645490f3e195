//! Pure merge functions: `(collection, event) -> collection`.
//!
//! Each function returns a new value and leaves its input untouched. An
//! event that names an entity that is not loaded leaves the collection
//! unchanged.

use im::HashMap;
use kindred_types::events::{CommentUpdate, FriendshipChange, LikeUpdate};
use kindred_types::{FriendRequest, FriendStatus, Notification, Post};
use tracing::{debug, trace};

use crate::collection::PagedCollection;
use crate::counter::UnreadCounter;
use crate::friends::FriendRequestBook;

/// New post: prepended to the first page of the feed unless already there.
pub fn new_post(feed: &PagedCollection<Post>, post: &Post) -> PagedCollection<Post> {
    let mut next = feed.clone();
    if !next.prepend_new(post.clone()) {
        trace!("New post {} skipped (duplicate or feed not loaded)", post.id);
    }
    next
}

/// Replace the like-set of one post, wherever in the loaded pages it is.
pub fn like_update(posts: &PagedCollection<Post>, update: &LikeUpdate) -> PagedCollection<Post> {
    let mut next = posts.clone();
    next.update(&update.post_id, |post| post.likes = update.likes.clone());
    next
}

/// Replace the comment list of one post, wherever in the loaded pages it is.
pub fn comment_update(
    posts: &PagedCollection<Post>,
    update: &CommentUpdate,
) -> PagedCollection<Post> {
    let mut next = posts.clone();
    next.update(&update.post_id, |post| {
        post.comments = update.comments.clone();
    });
    next
}

/// Tag every loaded post by `author_id` with `status`.
pub fn mark_author(
    posts: &PagedCollection<Post>,
    author_id: &str,
    status: FriendStatus,
) -> PagedCollection<Post> {
    let mut next = posts.clone();
    let touched = next.update_where(|post| post.user_id == author_id, |post| {
        post.is_friend = status;
    });
    trace!("Tagged {} posts by {} as {:?}", touched, author_id, status);
    next
}

/// Friendship accepted or removed: retag posts of both parties.
pub fn friendship_posts(
    posts: &PagedCollection<Post>,
    change: &FriendshipChange,
) -> PagedCollection<Post> {
    let status = if change.is_accept() {
        FriendStatus::Accepted
    } else if change.is_removal() {
        FriendStatus::None
    } else {
        return posts.clone();
    };

    let affected: Vec<&str> = change.affected_users().collect();
    let mut next = posts.clone();
    next.update_where(
        |post| affected.contains(&post.user_id.as_str()),
        |post| post.is_friend = status,
    );
    next
}

/// Friend request received: goes to the front of the pending list.
pub fn friend_request_sent(book: &FriendRequestBook, request: &FriendRequest) -> FriendRequestBook {
    let mut next = book.clone();
    next.add_pending(request.clone());
    next
}

/// Friendship accepted: pending -> accepted. Removed: dropped from the
/// list its own status names.
pub fn friendship_requests(book: &FriendRequestBook, change: &FriendshipChange) -> FriendRequestBook {
    let mut next = book.clone();
    if change.is_accept() {
        next.accept(change.friend_request_data.clone());
    } else if change.is_removal() {
        next.remove(&change.friend_request_data);
    } else {
        debug!("Ignoring unknown friendship action {}", change.action);
    }
    next
}

/// Session user's friend map after a friendship change. The entry belongs
/// to whichever party is not `me`.
pub fn friendship_friends(
    friends: &HashMap<String, FriendStatus>,
    change: &FriendshipChange,
    me: Option<&str>,
) -> HashMap<String, FriendStatus> {
    let mut next = friends.clone();
    let Some(other) = change.affected_users().find(|id| Some(*id) != me) else {
        return next;
    };
    if change.is_accept() {
        next.insert(other.to_string(), FriendStatus::Accepted);
    } else if change.is_removal() {
        next.remove(other);
    }
    next
}

/// Notification created: to the front of the first page (a single page
/// with no cursor if nothing is loaded yet). The counter always moves.
pub fn notification_created(
    notifications: &PagedCollection<Notification>,
    counter: UnreadCounter,
    notification: &Notification,
) -> (PagedCollection<Notification>, UnreadCounter) {
    let mut next = notifications.clone();
    let mut notification = notification.clone();
    notification.unread = true;
    next.move_to_front(notification);

    let mut counter = counter;
    counter.increment();
    (next, counter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_types::events::{ACTION_ACCEPTED, ACTION_REMOVED};
    use serde_json::json;

    fn post(id: &str, author: &str) -> Post {
        serde_json::from_value(json!({ "_id": id, "userId": author })).unwrap()
    }

    fn notification(id: &str) -> Notification {
        serde_json::from_value(json!({ "_id": id, "title": "t" })).unwrap()
    }

    fn two_page_feed() -> PagedCollection<Post> {
        let mut feed = PagedCollection::new();
        feed.append_page(vec![post("p1", "a"), post("p2", "b")], Some("c1".into()));
        feed.append_page(vec![post("p3", "a")], None);
        feed
    }

    #[test]
    fn like_update_reaches_later_pages_and_is_idempotent() {
        let feed = two_page_feed();
        let update = LikeUpdate {
            post_id: "p3".into(),
            likes: [("u9".to_string(), true)].into_iter().collect(),
        };

        let once = like_update(&feed, &update);
        let twice = like_update(&once, &update);

        assert!(once.get("p3").unwrap().is_liked_by("u9"));
        assert_eq!(once.to_vec(), twice.to_vec());
        // input untouched
        assert!(feed.get("p3").unwrap().likes.is_empty());
    }

    #[test]
    fn comment_update_replaces_list() {
        let feed = two_page_feed();
        let update: CommentUpdate = serde_json::from_value(json!({
            "_id": "p2",
            "comments": [{ "userId": "u1", "comment": "first" }]
        }))
        .unwrap();
        let next = comment_update(&feed, &update);
        assert_eq!(next.get("p2").unwrap().comments.len(), 1);
    }

    #[test]
    fn unknown_post_is_a_no_op() {
        let feed = two_page_feed();
        let update = LikeUpdate {
            post_id: "missing".into(),
            likes: Default::default(),
        };
        assert_eq!(like_update(&feed, &update).to_vec(), feed.to_vec());
    }

    #[test]
    fn new_post_never_duplicates() {
        let feed = two_page_feed();
        let next = new_post(&new_post(&feed, &post("p0", "c")), &post("p0", "c"));
        let again = new_post(&next, &post("p3", "a"));
        assert_eq!(again.ids(), vec!["p0", "p1", "p2", "p3"]);
    }

    #[test]
    fn mark_author_tags_all_their_posts() {
        let feed = mark_author(&two_page_feed(), "a", FriendStatus::Pending);
        assert_eq!(feed.get("p1").unwrap().is_friend, FriendStatus::Pending);
        assert_eq!(feed.get("p3").unwrap().is_friend, FriendStatus::Pending);
        assert_eq!(feed.get("p2").unwrap().is_friend, FriendStatus::None);
    }

    #[test]
    fn notification_prepends_and_counts() {
        let mut list = PagedCollection::new();
        list.append_page(vec![notification("n1")], Some("c1".into()));

        let (list, counter) = notification_created(&list, UnreadCounter::default(), &notification("n2"));
        let (list, counter) = notification_created(&list, counter, &notification("n1"));

        assert_eq!(list.ids(), vec!["n1", "n2"]);
        assert!(list.get("n1").unwrap().unread);
        assert_eq!(counter.get(), 2);
        // cursor of the first page survives
        assert!(list.has_next_page());
    }

    #[test]
    fn friendship_accept_moves_request_and_tags_posts() {
        let request: FriendRequest = serde_json::from_value(json!({
            "_id": "r1",
            "friendRequestSenderId": "a",
            "friendRequestReceiverId": "me",
            "isFriend": "pending",
        }))
        .unwrap();
        let book = friend_request_sent(&FriendRequestBook::default(), &request);

        let mut accepted = request.clone();
        accepted.is_friend = FriendStatus::Accepted;
        let change = FriendshipChange {
            action: ACTION_ACCEPTED.into(),
            logged_user_id: Some("me".into()),
            friend_id: Some("a".into()),
            friend_request_data: accepted,
        };

        let book = friendship_requests(&book, &change);
        assert!(!book.pending().contains("r1"));
        assert_eq!(book.accepted().front().unwrap().id, "r1");

        let friends = friendship_friends(&HashMap::new(), &change, Some("me"));
        assert_eq!(friends.get("a"), Some(&FriendStatus::Accepted));
        assert!(friends.get("me").is_none());

        let feed = friendship_posts(&two_page_feed(), &change);
        assert_eq!(feed.get("p3").unwrap().is_friend, FriendStatus::Accepted);
        assert_eq!(feed.get("p2").unwrap().is_friend, FriendStatus::None);
    }

    fn removal(id: &str, status: &str) -> FriendshipChange {
        FriendshipChange {
            action: ACTION_REMOVED.into(),
            logged_user_id: Some("me".into()),
            friend_id: Some("a".into()),
            friend_request_data: serde_json::from_value(json!({
                "_id": id,
                "friendRequestSenderId": "a",
                "friendRequestReceiverId": "me",
                "isFriend": status,
            }))
            .unwrap(),
        }
    }

    #[test]
    fn friendship_removal_follows_request_status() {
        let mut book = FriendRequestBook::default();
        book.set_pending(vec![removal("r1", "pending").friend_request_data]);
        book.set_accepted(vec![removal("r2", "accepted").friend_request_data]);

        let book = friendship_requests(&book, &removal("r2", "accepted"));
        assert!(book.accepted().is_empty());
        assert!(book.pending().contains("r1"));

        let book = friendship_requests(&book, &removal("r1", "pending"));
        assert!(book.pending().is_empty());
    }

    #[test]
    fn friendship_removal_clears_tags_and_friend_entry() {
        let change = removal("r2", "accepted");
        let tagged = mark_author(&two_page_feed(), "a", FriendStatus::Accepted);
        let feed = friendship_posts(&tagged, &change);
        assert_eq!(feed.get("p1").unwrap().is_friend, FriendStatus::None);
        assert_eq!(feed.get("p3").unwrap().is_friend, FriendStatus::None);

        let friends: HashMap<String, FriendStatus> =
            [("a".to_string(), FriendStatus::Accepted), ("b".to_string(), FriendStatus::Pending)]
                .into_iter()
                .collect();
        let friends = friendship_friends(&friends, &change, Some("me"));
        assert!(friends.get("a").is_none());
        assert_eq!(friends.get("b"), Some(&FriendStatus::Pending));
    }
}
