use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

use kindred_client::{ApiClient, Backend, ClientConfig, ClientError, Credentials, Session};
use kindred_db::Database;
use kindred_store::{AppState, Store};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kindred=debug".into()),
        )
        .init();

    // Config
    let config = ClientConfig::from_env();
    let db = Database::open(&config.db_path)?;
    let credentials = Credentials::new(Arc::new(db));
    let backend: Arc<dyn Backend> = Arc::new(ApiClient::new(&config.api_url, credentials.clone())?);
    let store = Store::new();

    info!("Connecting to {}", config.api_url);
    let session = match Session::resume(&config, backend.clone(), credentials.clone(), store.clone()).await {
        Ok(session) => session,
        Err(ClientError::Unauthorized) => {
            let (Ok(email), Ok(password)) = (
                std::env::var("KINDRED_EMAIL"),
                std::env::var("KINDRED_PASSWORD"),
            ) else {
                error!("Not logged in; set KINDRED_EMAIL and KINDRED_PASSWORD");
                std::process::exit(2);
            };
            match Session::login(&config, backend, credentials.clone(), store.clone(), &email, &password).await {
                Ok(session) => session,
                Err(ClientError::Unauthorized) => {
                    error!("Login rejected for {}", email);
                    std::process::exit(2);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(e) => return Err(e.into()),
    };

    let mut changes = store.subscribe();
    let auth_lost = session.auth_lost();
    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut expired = false;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            _ = auth_lost.cancelled() => {
                warn!("Session rejected by the backend");
                expired = true;
                break;
            }
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = changes.borrow_and_update().clone();
                log_state(&state);
            }
            line = commands.next_line(), if stdin_open => match line {
                Ok(Some(line)) => run_command(&session, line.trim()).await,
                Ok(None) => stdin_open = false,
                Err(e) => {
                    warn!("stdin: {}", e);
                    stdin_open = false;
                }
            }
        }
    }

    session.shutdown().await;
    if expired {
        if let Err(e) = credentials.clear_session().await {
            warn!("Could not clear stored session: {}", e);
        }
        std::process::exit(1);
    }
    Ok(())
}

async fn run_command(session: &Session, line: &str) {
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("refresh"), _) => session.on_foreground().await,
        (Some("more"), _) => {
            let outcome = session.fetch_next(Some(&session.feed_key())).await;
            info!("Feed: {:?}", outcome);
        }
        (Some("notifications"), _) => {
            let outcome = session.fetch_next(Some(&session.notifications_key())).await;
            info!("Notifications: {:?}", outcome);
        }
        (Some("profile"), user_id) => {
            let outcome = session.fetch_next(Session::profile_key(user_id).as_ref()).await;
            info!("Profile: {:?}", outcome);
        }
        (Some("like"), Some(post_id)) => {
            session.actions().toggle_like(post_id).await;
        }
        (Some("open"), Some(id)) => {
            session.actions().open_notification(id).await;
        }
        (Some("read"), _) => {
            session.actions().mark_all_read().await;
        }
        (Some(other), _) => warn!("Unknown command {}", other),
        (None, _) => {}
    }
}

fn log_state(state: &AppState) {
    info!(
        "feed {} posts, {} notifications, {} unread, {} pending / {} accepted requests",
        state.feed().len(),
        state.notifications().len(),
        state.unread_count(),
        state.pending_requests().len(),
        state.accepted_requests().len(),
    );
}
