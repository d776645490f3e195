use std::sync::Arc;

use kindred_db::KeyValueStore;
use tracing::warn;

use crate::error::{ClientError, Result};

const TOKEN_KEY: &str = "token";
const USER_ID_KEY: &str = "userId";

fn first_contact_key(user_id: &str) -> String {
    format!("friendRequestSent_{}", user_id)
}

/// Session credentials and install-local flags over a [`KeyValueStore`].
///
/// Storage calls run on the blocking pool. A failed read is logged and
/// reported as an absent value.
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn KeyValueStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    async fn read(&self, key: &str) -> Option<String> {
        let store = self.store.clone();
        let key_owned = key.to_string();
        match tokio::task::spawn_blocking(move || store.get(&key_owned)).await {
            Ok(Ok(value)) => value,
            Ok(Err(e)) => {
                warn!("Credential read of {} failed: {:#}", key, e);
                None
            }
            Err(e) => {
                warn!("Credential read of {} panicked: {}", key, e);
                None
            }
        }
    }

    async fn write(&self, key: &str, value: Option<String>) -> Result<()> {
        let store = self.store.clone();
        let key = key.to_string();
        tokio::task::spawn_blocking(move || match value {
            Some(value) => store.set(&key, &value),
            None => store.delete(&key),
        })
        .await
        .map_err(|e| ClientError::Storage(e.into()))?
        .map_err(ClientError::Storage)
    }

    pub async fn token(&self) -> Option<String> {
        self.read(TOKEN_KEY).await
    }

    pub async fn user_id(&self) -> Option<String> {
        self.read(USER_ID_KEY).await
    }

    pub async fn save_session(&self, token: &str, user_id: &str) -> Result<()> {
        self.write(TOKEN_KEY, Some(token.to_string())).await?;
        self.write(USER_ID_KEY, Some(user_id.to_string())).await
    }

    pub async fn clear_session(&self) -> Result<()> {
        self.write(TOKEN_KEY, None).await?;
        self.write(USER_ID_KEY, None).await
    }

    /// Whether the first-contact friend request already went out for this
    /// user on this installation.
    pub async fn first_contact_sent(&self, user_id: &str) -> bool {
        self.read(&first_contact_key(user_id)).await.as_deref() == Some("true")
    }

    pub async fn mark_first_contact_sent(&self, user_id: &str) -> Result<()> {
        self.write(&first_contact_key(user_id), Some("true".into())).await
    }
}
