use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use kindred_store::{CollectionKey, NextPage, PostCollection, Store};
use kindred_types::Post;
use kindred_types::api::PageResponse;

use crate::backend::Backend;
use crate::error::Result;

/// Per-collection fetch status, for loading spinners and retry buttons.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchState {
    pub loading: bool,
    /// Message of the last failed fetch; cleared when the next one starts
    pub error: Option<String>,
    /// When the first page was last fetched
    pub fetched_at: Option<Instant>,
    /// A refresh arrived while a fetch was in flight
    pub refresh_pending: bool,
}

impl FetchState {
    fn is_fresh(&self, window: Duration) -> bool {
        self.fetched_at.is_some_and(|at| at.elapsed() < window)
    }
}

/// What a fetch call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// No subject: nothing requested
    Inert,
    /// Another fetch for the same collection is running
    InFlight,
    /// A refresh will run as soon as the fetch in flight finishes
    Queued,
    /// The last page had a null cursor
    Exhausted,
    /// First page is within the freshness window
    Fresh,
    /// A page was merged; the number of items it carried
    Loaded(usize),
    Failed,
    /// The backend rejected the token
    Unauthorized,
}

/// Cursor-paginated loader for the store's collections.
///
/// At most one request per collection is in flight; extra calls while one
/// runs return [`FetchOutcome::InFlight`] without a request. A failed fetch
/// records its error and leaves loaded pages as they were.
#[derive(Clone)]
pub struct Fetcher {
    backend: Arc<dyn Backend>,
    store: Store,
    page_size: u32,
    stale_after: Duration,
    states: Arc<Mutex<HashMap<CollectionKey, FetchState>>>,
}

impl Fetcher {
    pub fn new(backend: Arc<dyn Backend>, store: Store, page_size: u32, stale_after: Duration) -> Self {
        Self {
            backend,
            store,
            page_size,
            stale_after,
            states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<CollectionKey, FetchState>> {
        self.states.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self, key: &CollectionKey) -> FetchState {
        self.states().get(key).cloned().unwrap_or_default()
    }

    pub fn has_next_page(&self, key: &CollectionKey) -> bool {
        matches!(self.store.read(|state| state.next_page(key)), NextPage::After(_))
    }

    /// Load the page after the last one loaded. A collection that was never
    /// fetched, or was invalidated, starts over from the first page and
    /// replaces what is there.
    ///
    /// When a refresh was queued while this fetch ran, the first page is
    /// fetched right after it and that result is returned.
    pub async fn fetch_next(&self, key: Option<&CollectionKey>) -> FetchOutcome {
        let Some(key) = key else {
            trace!("Fetch skipped: no subject");
            return FetchOutcome::Inert;
        };

        let mut after = match self.start(key) {
            Ok(after) => after,
            Err(outcome) => return outcome,
        };

        loop {
            let first = after.is_none();
            let result = self.load(key, after.as_deref(), first).await;
            let (outcome, rerun) = self.finish(key, result, first);
            if !rerun {
                return outcome;
            }
            debug!("Running queued refresh for {:?}", key);
            after = None;
        }
    }

    /// Claim the collection and pick the cursor to fetch after.
    fn start(&self, key: &CollectionKey) -> std::result::Result<Option<String>, FetchOutcome> {
        let mut states = self.states();
        let entry = states.entry(key.clone()).or_default();
        if entry.loading {
            return Err(FetchOutcome::InFlight);
        }

        let next = if entry.fetched_at.is_none() {
            NextPage::First
        } else {
            self.store.read(|state| state.next_page(key))
        };
        let after = match next {
            NextPage::Exhausted => return Err(FetchOutcome::Exhausted),
            NextPage::First => None,
            NextPage::After(cursor) => Some(cursor),
        };

        entry.loading = true;
        entry.error = None;
        Ok(after)
    }

    /// Record the result. The collection stays claimed when a queued
    /// refresh has to run next.
    fn finish(&self, key: &CollectionKey, result: Result<usize>, first: bool) -> (FetchOutcome, bool) {
        let mut states = self.states();
        let entry = states.entry(key.clone()).or_default();
        let outcome = match result {
            Ok(count) => {
                if first {
                    entry.fetched_at = Some(Instant::now());
                }
                debug!("Fetched {} items for {:?}", count, key);
                FetchOutcome::Loaded(count)
            }
            Err(e) => {
                warn!("Fetch for {:?} failed: {}", key, e);
                entry.error = Some(e.to_string());
                if e.is_unauthorized() {
                    FetchOutcome::Unauthorized
                } else {
                    FetchOutcome::Failed
                }
            }
        };

        let rerun = entry.refresh_pending && outcome != FetchOutcome::Unauthorized;
        entry.refresh_pending = false;
        if rerun {
            entry.fetched_at = None;
            entry.error = None;
        } else {
            entry.loading = false;
        }
        (outcome, rerun)
    }

    /// Forget freshness; the next fetch starts from the first page.
    pub fn invalidate(&self, key: &CollectionKey) {
        if let Some(entry) = self.states().get_mut(key) {
            entry.fetched_at = None;
        }
    }

    /// Refetch the first page and replace the collection with it. With a
    /// fetch already in flight the refresh is queued behind it and
    /// [`FetchOutcome::Queued`] is returned.
    pub async fn refresh(&self, key: Option<&CollectionKey>) -> FetchOutcome {
        if let Some(key) = key {
            let mut states = self.states();
            let entry = states.entry(key.clone()).or_default();
            entry.fetched_at = None;
            if entry.loading {
                entry.refresh_pending = true;
                return FetchOutcome::Queued;
            }
        }
        self.fetch_next(key).await
    }

    /// Refetch the first page unless it was fetched within the freshness
    /// window.
    pub async fn ensure_fresh(&self, key: Option<&CollectionKey>) -> FetchOutcome {
        if let Some(key) = key {
            if self.state(key).is_fresh(self.stale_after) {
                return FetchOutcome::Fresh;
            }
        }
        self.refresh(key).await
    }

    async fn load(&self, key: &CollectionKey, after: Option<&str>, first: bool) -> Result<usize> {
        let limit = self.page_size;
        match key {
            CollectionKey::Feed(user_id) => {
                let page = self.backend.fetch_feed(user_id, after, limit).await?;
                Ok(self.merge_posts(PostCollection::Feed, page, first))
            }
            CollectionKey::ProfilePosts(user_id) => {
                let page = self.backend.fetch_profile_posts(user_id, after, limit).await?;
                Ok(self.merge_posts(PostCollection::Profile(user_id.clone()), page, first))
            }
            CollectionKey::Notifications(user_id) => {
                let page = self.backend.fetch_notifications(user_id, after, limit).await?;
                let count = page.items.len();
                if first {
                    self.store.replace_notifications(page);
                } else {
                    self.store.append_notifications(page);
                }
                Ok(count)
            }
        }
    }

    fn merge_posts(&self, target: PostCollection, page: PageResponse<Post>, first: bool) -> usize {
        let count = page.items.len();
        if first {
            self.store.replace_posts(&target, page);
        } else {
            self.store.append_posts(&target, page);
        }
        count
    }
}
