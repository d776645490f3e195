//! Network side of the client: HTTP API, real-time gateway, page fetcher,
//! session lifecycle and the user actions that drive optimistic updates.

pub mod actions;
pub mod api;
pub mod backend;
pub mod config;
pub mod credentials;
pub mod error;
pub mod fetcher;
pub mod gateway;
pub mod session;

pub use actions::Actions;
pub use api::ApiClient;
pub use backend::Backend;
pub use config::ClientConfig;
pub use credentials::Credentials;
pub use error::{ClientError, Result};
pub use fetcher::{FetchOutcome, FetchState, Fetcher};
pub use gateway::{Backoff, GatewayClient};
pub use session::Session;
