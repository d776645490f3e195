use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method} {path} returned {status}")]
    Status {
        method: reqwest::Method,
        path: String,
        status: u16,
    },

    /// 401/403 from the backend, or no stored session.
    #[error("not authenticated")]
    Unauthorized,

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("local storage: {0:#}")]
    Storage(anyhow::Error),

    #[error("gateway: {0}")]
    Gateway(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// Whether the session should be dropped and the user sent back to
    /// login.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}
