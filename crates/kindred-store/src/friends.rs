use kindred_types::{FriendRequest, FriendStatus};
use tracing::debug;

use crate::keyed_list::KeyedList;

/// Pending and accepted friend requests. A request id is in at most one
/// of the two lists; moving between them is a remove plus an insert.
#[derive(Debug, Clone, Default)]
pub struct FriendRequestBook {
    pending: KeyedList<FriendRequest>,
    accepted: KeyedList<FriendRequest>,
}

impl FriendRequestBook {
    pub fn pending(&self) -> &KeyedList<FriendRequest> {
        &self.pending
    }

    pub fn accepted(&self) -> &KeyedList<FriendRequest> {
        &self.accepted
    }

    pub fn set_pending(&mut self, requests: Vec<FriendRequest>) {
        self.pending = KeyedList::from_vec(requests);
        for request in self.pending.to_vec() {
            self.accepted.remove(&request.id);
        }
    }

    pub fn set_accepted(&mut self, requests: Vec<FriendRequest>) {
        self.accepted = KeyedList::from_vec(requests);
        for request in self.accepted.to_vec() {
            self.pending.remove(&request.id);
        }
    }

    pub fn add_pending(&mut self, mut request: FriendRequest) {
        request.is_friend = FriendStatus::Pending;
        self.accepted.remove(&request.id);
        self.pending.push_front(request);
    }

    pub fn accept(&mut self, mut request: FriendRequest) {
        if self.pending.remove(&request.id).is_none() {
            debug!("Accepted request {} was not in the pending list", request.id);
        }
        request.is_friend = FriendStatus::Accepted;
        self.accepted.push_front(request);
    }

    /// Remove from the list named by the request's own status.
    pub fn remove(&mut self, request: &FriendRequest) -> Option<FriendRequest> {
        match request.is_friend {
            FriendStatus::Pending => self.pending.remove(&request.id),
            _ => self.accepted.remove(&request.id),
        }
    }
}
