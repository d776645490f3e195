use im::{HashMap, Vector};

use kindred_types::{FriendRequest, Notification, Post};

/// Entities that carry a stable backend identifier.
pub trait Keyed: Clone {
    fn key(&self) -> &str;
}

impl Keyed for Post {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Notification {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for FriendRequest {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Where the next fetch of a collection should start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// Nothing loaded yet; fetch from the beginning.
    First,
    /// Resume after this cursor.
    After(String),
    /// The last loaded page carried a null cursor.
    Exhausted,
}

#[derive(Debug, Clone, Default)]
struct PageSlot {
    ids: Vector<String>,
    next_cursor: Option<String>,
}

/// A cursor-paginated collection.
///
/// Pages keep their server order and their cursor; entities live in a
/// keyed map, so every identifier appears once across all pages and lookup
/// does not depend on which page holds the item. When a fetched page
/// repeats an identifier the entity takes the newer value and keeps its
/// original position.
#[derive(Debug, Clone)]
pub struct PagedCollection<T: Clone> {
    pages: Vector<PageSlot>,
    entities: HashMap<String, T>,
    page_of: HashMap<String, usize>,
}

impl<T: Clone> Default for PagedCollection<T> {
    fn default() -> Self {
        Self {
            pages: Vector::new(),
            entities: HashMap::new(),
            page_of: HashMap::new(),
        }
    }
}

impl<T: Keyed> PagedCollection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A collection holding exactly one page.
    pub fn with_first_page(items: Vec<T>, next_cursor: Option<String>) -> Self {
        let mut collection = Self::new();
        collection.append_page(items, next_cursor);
        collection
    }

    pub fn is_loaded(&self) -> bool {
        !self.pages.is_empty()
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn has_next_page(&self) -> bool {
        matches!(self.next_page(), NextPage::After(_))
    }

    pub fn next_page(&self) -> NextPage {
        match self.pages.last() {
            None => NextPage::First,
            Some(PageSlot {
                next_cursor: Some(cursor),
                ..
            }) => NextPage::After(cursor.clone()),
            Some(_) => NextPage::Exhausted,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&T> {
        self.entities.get(id)
    }

    /// Items in display order: pages in fetch order, each in server order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.pages
            .iter()
            .flat_map(|page| page.ids.iter())
            .filter_map(|id| self.entities.get(id))
    }

    pub fn ids(&self) -> Vec<String> {
        self.pages
            .iter()
            .flat_map(|page| page.ids.iter().cloned())
            .collect()
    }

    pub fn to_vec(&self) -> Vec<T> {
        self.iter().cloned().collect()
    }

    /// Append a fetched page. Identifiers already present are updated in
    /// place rather than repeated.
    pub fn append_page(&mut self, items: Vec<T>, next_cursor: Option<String>) {
        let index = self.pages.len();
        let mut slot = PageSlot {
            ids: Vector::new(),
            next_cursor,
        };

        for item in items {
            let id = item.key().to_string();
            if self.entities.insert(id.clone(), item).is_none() {
                self.page_of.insert(id.clone(), index);
                slot.ids.push_back(id);
            }
        }

        self.pages.push_back(slot);
    }

    /// Put `item` at the front of the first page unless its identifier is
    /// already loaded or there is no page to put it in.
    pub fn prepend_new(&mut self, item: T) -> bool {
        if self.pages.is_empty() || self.contains(item.key()) {
            return false;
        }
        self.insert_front(item);
        true
    }

    /// Put `item` at the front of the first page, dropping any older copy.
    /// With nothing loaded, this creates a single page with no cursor.
    pub fn move_to_front(&mut self, item: T) {
        if self.pages.is_empty() {
            self.pages.push_back(PageSlot::default());
        }
        self.remove(item.key());
        self.insert_front(item);
    }

    fn insert_front(&mut self, item: T) {
        let id = item.key().to_string();
        if let Some(first) = self.pages.front_mut() {
            first.ids.push_front(id.clone());
        }
        self.page_of.insert(id.clone(), 0);
        self.entities.insert(id, item);
    }

    pub fn remove(&mut self, id: &str) -> Option<T> {
        let removed = self.entities.remove(id)?;
        if let Some(index) = self.page_of.remove(id) {
            if let Some(page) = self.pages.get_mut(index) {
                page.ids.retain(|existing| existing != id);
            }
        }
        Some(removed)
    }

    /// Mutate one entity in place. Returns false when it is not loaded.
    pub fn update<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut T),
    {
        match self.entities.get_mut(id) {
            Some(entity) => {
                f(entity);
                true
            }
            None => false,
        }
    }

    /// Mutate every entity matching `pred`. Returns how many were touched.
    pub fn update_where<P, F>(&mut self, pred: P, mut f: F) -> usize
    where
        P: Fn(&T) -> bool,
        F: FnMut(&mut T),
    {
        let matching: Vec<String> = self
            .entities
            .iter()
            .filter(|(_, entity)| pred(entity))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &matching {
            if let Some(entity) = self.entities.get_mut(id) {
                f(entity);
            }
        }
        matching.len()
    }
}
