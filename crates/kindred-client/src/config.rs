use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

pub const DEFAULT_API_URL: &str = "http://localhost:3001/api";

/// Runtime settings, read from `KINDRED_*` environment variables.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base of every HTTP path, without a trailing slash
    pub api_url: String,
    pub socket_url: String,
    pub page_size: u32,
    /// How long a fetched first page counts as fresh
    pub stale_after: Duration,
    pub reconnect_min: Duration,
    pub reconnect_max: Duration,
    /// Account whose friend request greets a user on first contact
    pub welcome_friend_id: Option<String>,
    pub welcome_delay: Duration,
    pub db_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            socket_url: socket_url_for(DEFAULT_API_URL),
            page_size: 5,
            stale_after: Duration::from_secs(300),
            reconnect_min: Duration::from_millis(1000),
            reconnect_max: Duration::from_millis(5000),
            welcome_friend_id: None,
            welcome_delay: Duration::from_secs(10),
            db_path: PathBuf::from("kindred.db"),
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Missing keys take the default; values
    /// that do not parse take the default with a warning.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_url = lookup("KINDRED_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        let socket_url = lookup("KINDRED_SOCKET_URL").unwrap_or_else(|| socket_url_for(&api_url));

        Self {
            socket_url,
            page_size: parsed(&lookup, "KINDRED_PAGE_SIZE", defaults.page_size),
            stale_after: Duration::from_secs(parsed(&lookup, "KINDRED_STALE_SECS", 300)),
            reconnect_min: Duration::from_millis(parsed(&lookup, "KINDRED_RECONNECT_MIN_MS", 1000)),
            reconnect_max: Duration::from_millis(parsed(&lookup, "KINDRED_RECONNECT_MAX_MS", 5000)),
            welcome_friend_id: lookup("KINDRED_WELCOME_FRIEND_ID").filter(|id| !id.is_empty()),
            welcome_delay: Duration::from_secs(parsed(&lookup, "KINDRED_WELCOME_DELAY_SECS", 10)),
            db_path: lookup("KINDRED_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            api_url,
        }
    }
}

fn parsed<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{} = {:?} is not valid, using {}", key, raw, default);
            default
        }),
    }
}

/// `http://host/api` -> `ws://host/api/socket`.
fn socket_url_for(api_url: &str) -> String {
    let base = api_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        base.to_string()
    };
    format!("{}/socket", base)
}
