//! Client-side reconciliation core.
//!
//! Holds the paginated feed, profile and notification collections, the
//! friend-request lists and the unread counter, and merges fetched pages,
//! pushed events and optimistic mutations into them. Every mutation goes
//! through [`Store`]; collections are persistent structures, so a snapshot
//! taken by a reader is never affected by a later update.

pub mod collection;
pub mod counter;
pub mod friends;
pub mod keyed_list;
pub mod optimistic;
pub mod reconcile;
pub mod state;
pub mod store;

pub use collection::{Keyed, NextPage, PagedCollection};
pub use counter::UnreadCounter;
pub use friends::FriendRequestBook;
pub use keyed_list::KeyedList;
pub use optimistic::{CommentSubmit, FriendRequestSend, LikeToggle, MarkOpened, Transaction};
pub use state::{AppState, CollectionKey, PostCollection};
pub use store::Store;
