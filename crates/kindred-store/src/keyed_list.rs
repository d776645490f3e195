use im::{HashMap, Vector};

use crate::collection::Keyed;

/// Ordered list with identifier lookup.
///
/// The order lives in an id vector and the entities in a map next to it,
/// so `get` does not scan and a removal does not rebuild an index.
#[derive(Debug, Clone)]
pub struct KeyedList<T: Clone> {
    order: Vector<String>,
    entities: HashMap<String, T>,
}

impl<T: Clone> Default for KeyedList<T> {
    fn default() -> Self {
        Self {
            order: Vector::new(),
            entities: HashMap::new(),
        }
    }
}

impl<T: Keyed> KeyedList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a fetched list. Repeated ids keep their first position
    /// and their last value.
    pub fn from_vec(items: Vec<T>) -> Self {
        let mut list = Self::new();
        for item in items {
            let id = item.key().to_string();
            if list.entities.insert(id.clone(), item).is_none() {
                list.order.push_back(id);
            }
        }
        list
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entities.get(id)
    }

    pub fn front(&self) -> Option<&T> {
        self.order.front().and_then(|id| self.entities.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter().filter_map(|id| self.entities.get(id))
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Insert at the front; an existing entry with the same id is replaced
    /// and moved.
    pub fn push_front(&mut self, item: T) {
        let id = item.key().to_string();
        if self.entities.contains_key(&id) {
            self.order.retain(|existing| *existing != id);
        }
        self.order.push_front(id.clone());
        self.entities.insert(id, item);
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.entities.remove(id)?;
        if let Some(position) = self.order.index_of(&id.to_string()) {
            self.order.remove(position);
        }
        Some(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kindred_types::FriendRequest;

    fn request(id: &str) -> FriendRequest {
        serde_json::from_value(serde_json::json!({
            "_id": id,
            "friendRequestSenderId": "s",
            "friendRequestReceiverId": "r",
            "isFriend": "pending",
        }))
        .unwrap()
    }

    #[test]
    fn push_front_moves_existing() {
        let mut list = KeyedList::from_vec(vec![request("r1"), request("r2"), request("r3")]);
        list.push_front(request("r3"));
        let ids: Vec<_> = list.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["r3", "r1", "r2"]);
        assert_eq!(list.len(), 3);
    }

    #[test]
    fn remove_keeps_lookup_consistent() {
        let mut list = KeyedList::from_vec(vec![request("r1"), request("r2"), request("r3")]);
        assert!(list.remove("r2").is_some());
        assert!(list.remove("r2").is_none());
        assert!(!list.contains("r2"));
        assert!(list.get("r3").is_some());
        let ids: Vec<_> = list.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids, vec!["r1", "r3"]);
    }

    #[test]
    fn from_vec_dedupes() {
        let list = KeyedList::from_vec(vec![request("r1"), request("r1")]);
        assert_eq!(list.len(), 1);
        assert_eq!(list.front().unwrap().id, "r1");
    }
}
