use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use kindred_store::{CollectionKey, FriendRequestSend, Store};
use kindred_types::{ServerEvent, User};

use crate::actions::Actions;
use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::{ClientError, Result};
use crate::fetcher::{FetchOutcome, Fetcher};
use crate::gateway::{Backoff, GatewayClient};

/// One signed-in user's lifetime: the gateway connection, the single event
/// reconciler and the timers that belong to the session.
///
/// Event handling is registered once here rather than per screen, so no
/// event is missed while views come and go. [`Session::shutdown`] cancels
/// every task the session owns.
pub struct Session {
    user_id: String,
    store: Store,
    fetcher: Fetcher,
    actions: Actions,
    backend: Arc<dyn Backend>,
    credentials: Credentials,
    events: mpsc::UnboundedSender<ServerEvent>,
    cancel: CancellationToken,
    auth_lost: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Session {
    /// Log in with email and password, persist the token, start a session.
    pub async fn login(
        config: &ClientConfig,
        backend: Arc<dyn Backend>,
        credentials: Credentials,
        store: Store,
        email: &str,
        password: &str,
    ) -> Result<Self> {
        let login = backend.login(email, password).await?;
        credentials.save_session(&login.token, &login.user.id).await?;
        info!("Logged in as {}", login.user.display_name());
        Self::start(config, backend, credentials, store, login.user).await
    }

    /// Start from a stored token. A missing or rejected token clears the
    /// stored session and returns [`ClientError::Unauthorized`].
    pub async fn resume(
        config: &ClientConfig,
        backend: Arc<dyn Backend>,
        credentials: Credentials,
        store: Store,
    ) -> Result<Self> {
        if credentials.token().await.is_none() {
            return Err(ClientError::Unauthorized);
        }

        let user = match backend.verify().await {
            Ok(user) => user,
            Err(ClientError::Unauthorized) => {
                warn!("Stored token rejected");
                if let Err(e) = credentials.clear_session().await {
                    warn!("Could not clear stored session: {}", e);
                }
                return Err(ClientError::Unauthorized);
            }
            Err(e) => return Err(e),
        };
        Self::start(config, backend, credentials, store, user).await
    }

    pub async fn start(
        config: &ClientConfig,
        backend: Arc<dyn Backend>,
        credentials: Credentials,
        store: Store,
        user: User,
    ) -> Result<Self> {
        let user_id = user.id.clone();
        let backoff = Backoff::new(config.reconnect_min, config.reconnect_max);
        let gateway = GatewayClient::new(&config.socket_url, &user_id, backoff)?;

        store.set_user(Some(user.clone()));

        let cancel = CancellationToken::new();
        let auth_lost = CancellationToken::new();
        let (events, events_rx) = mpsc::unbounded_channel();

        let mut tasks = Vec::new();
        tasks.push(tokio::spawn(reconcile_events(
            store.clone(),
            events_rx,
            cancel.clone(),
        )));
        tasks.push(tokio::spawn(gateway.run(events.clone(), cancel.clone())));

        if let Some(welcome_id) = config.welcome_friend_id.clone() {
            tasks.push(tokio::spawn(first_contact(
                backend.clone(),
                credentials.clone(),
                store.clone(),
                user,
                welcome_id,
                config.welcome_delay,
                cancel.clone(),
            )));
        }

        let fetcher = Fetcher::new(backend.clone(), store.clone(), config.page_size, config.stale_after);
        let actions = Actions::new(backend.clone(), store.clone(), &user_id, auth_lost.clone());

        let session = Self {
            user_id,
            store,
            fetcher,
            actions,
            backend,
            credentials,
            events,
            cancel,
            auth_lost,
            tasks,
        };
        session.sync().await;
        info!("Session started for {}", session.user_id);
        Ok(session)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn actions(&self) -> &Actions {
        &self.actions
    }

    /// Feed events from another source (push notifications) into the same
    /// ordered stream as the gateway.
    pub fn events(&self) -> mpsc::UnboundedSender<ServerEvent> {
        self.events.clone()
    }

    /// Fires when the backend rejects the session token.
    pub fn auth_lost(&self) -> CancellationToken {
        self.auth_lost.clone()
    }

    pub fn feed_key(&self) -> CollectionKey {
        CollectionKey::Feed(self.user_id.clone())
    }

    pub fn notifications_key(&self) -> CollectionKey {
        CollectionKey::Notifications(self.user_id.clone())
    }

    pub fn profile_key(user_id: Option<&str>) -> Option<CollectionKey> {
        user_id.map(|id| CollectionKey::ProfilePosts(id.to_string()))
    }

    fn track(&self, outcome: FetchOutcome) -> FetchOutcome {
        if outcome == FetchOutcome::Unauthorized {
            self.auth_lost.cancel();
        }
        outcome
    }

    pub async fn fetch_next(&self, key: Option<&CollectionKey>) -> FetchOutcome {
        self.track(self.fetcher.fetch_next(key).await)
    }

    pub async fn refresh(&self, key: Option<&CollectionKey>) -> FetchOutcome {
        self.track(self.fetcher.refresh(key).await)
    }

    /// Initial load: first pages unless fresh, unread count, friend lists.
    async fn sync(&self) {
        let feed = self.feed_key();
        let notifications = self.notifications_key();
        let (feed, notifications, _, _) = tokio::join!(
            self.fetcher.ensure_fresh(Some(&feed)),
            self.fetcher.ensure_fresh(Some(&notifications)),
            self.actions.refresh_unread_count(),
            self.actions.refresh_friend_requests(),
        );
        self.track(feed);
        self.track(notifications);
    }

    /// App came back from the background: refetch the first pages of feed
    /// and notifications, the unread count and both friend lists.
    pub async fn on_foreground(&self) {
        debug!("Foreground refresh for {}", self.user_id);
        let feed = self.feed_key();
        let notifications = self.notifications_key();
        let (feed, notifications, _, _) = tokio::join!(
            self.fetcher.refresh(Some(&feed)),
            self.fetcher.refresh(Some(&notifications)),
            self.actions.refresh_unread_count(),
            self.actions.refresh_friend_requests(),
        );
        self.track(feed);
        self.track(notifications);
    }

    /// Log out on the backend, forget the stored session and stop.
    pub async fn logout(self) {
        if let Err(e) = self.backend.logout(&self.user_id).await {
            warn!("Logout request failed: {}", e);
        }
        if let Err(e) = self.credentials.clear_session().await {
            warn!("Could not clear stored session: {}", e);
        }
        let store = self.store.clone();
        self.shutdown().await;
        store.reset();
    }

    /// Cancel the gateway, the reconciler and pending timers, and wait for
    /// them. Requests already in flight are left to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("Session task ended abnormally: {}", e);
            }
        }
        info!("Session for {} closed", self.user_id);
    }
}

/// The one consumer of inbound events. Applies them in arrival order.
async fn reconcile_events(
    store: Store,
    mut events: mpsc::UnboundedReceiver<ServerEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            event = events.recv() => match event {
                Some(event) => store.apply_event(&event),
                None => break,
            },
            _ = cancel.cancelled() => break,
        }
    }
    debug!("Event reconciler stopped");
}

/// One-time welcome friend request, sent `delay` after session start and
/// remembered per user on this installation.
async fn first_contact(
    backend: Arc<dyn Backend>,
    credentials: Credentials,
    store: Store,
    user: User,
    welcome_id: String,
    delay: Duration,
    cancel: CancellationToken,
) {
    if user.id == welcome_id || user.is_friend_with(&welcome_id) {
        return;
    }
    if credentials.first_contact_sent(&user.id).await {
        return;
    }

    tokio::select! {
        _ = cancel.cancelled() => return,
        _ = tokio::time::sleep(delay) => {}
    }

    if let Err(e) = backend.fetch_user(&welcome_id).await {
        warn!("Welcome account {} unavailable: {}", welcome_id, e);
        return;
    }

    match backend.send_friend_request(&welcome_id, &user.id).await {
        Ok(request) => {
            info!("Welcome friend request {} created", request.id);
            store.begin(|state| FriendRequestSend::capture(state, &welcome_id));
            if let Err(e) = credentials.mark_first_contact_sent(&user.id).await {
                warn!("Could not persist first-contact flag: {}", e);
            }
        }
        Err(e) => warn!("Welcome friend request failed: {}", e),
    }
}
