use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use kindred_types::events::{ClientCommand, EventDecodeError, ServerEvent};

use crate::error::Result;

/// Client keepalive: a Ping every 15 seconds while connected.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

/// Reconnect delay that doubles after every failed attempt, up to `max`.
#[derive(Debug, Clone)]
pub struct Backoff {
    min: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(min: Duration, max: Duration) -> Self {
        let max = max.max(min);
        Self {
            min,
            max,
            current: min,
        }
    }

    /// Delay before the next attempt.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.min;
    }
}

/// Real-time connection to the backend.
///
/// Reconnects indefinitely and registers the user again after every
/// connect. Decoded events go out on one channel in arrival order.
pub struct GatewayClient {
    url: Url,
    user_id: String,
    backoff: Backoff,
}

impl GatewayClient {
    pub fn new(socket_url: &str, user_id: &str, backoff: Backoff) -> Result<Self> {
        let mut url = Url::parse(socket_url)?;
        url.query_pairs_mut().append_pair("userId", user_id);
        Ok(Self {
            url,
            user_id: user_id.to_string(),
            backoff,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Run until `cancel` fires or the receiving side of `events` is gone.
    pub async fn run(mut self, events: mpsc::UnboundedSender<ServerEvent>, cancel: CancellationToken) {
        loop {
            match self.run_connection(&events, &cancel).await {
                Ok(()) => debug!("Gateway connection for {} ended", self.user_id),
                Err(e) => warn!("Gateway connection for {} failed: {}", self.user_id, e),
            }

            if cancel.is_cancelled() || events.is_closed() {
                break;
            }

            let delay = self.backoff.next_delay();
            debug!("Reconnecting gateway in {:?}", delay);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }
        info!("Gateway for {} stopped", self.user_id);
    }

    async fn run_connection(
        &mut self,
        events: &mpsc::UnboundedSender<ServerEvent>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let connect = tokio_tungstenite::connect_async(self.url.as_str());
        let (ws_stream, _) = tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            result = connect => result?,
        };
        self.backoff.reset();
        info!("Gateway connected for {}", self.user_id);

        let (mut sink, mut stream) = ws_stream.split();

        let register = ClientCommand::RegisterUser {
            user_id: self.user_id.clone(),
        }
        .to_frame();
        sink.send(Message::Text(serde_json::to_string(&register)?))
            .await?;

        let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    return Ok(());
                }
                msg = stream.next() => {
                    let msg = match msg {
                        Some(Ok(msg)) => msg,
                        Some(Err(e)) => return Err(e.into()),
                        None => return Ok(()),
                    };

                    match msg {
                        Message::Text(text) => match ServerEvent::from_frame(&text) {
                            Ok(event) => {
                                trace!("Gateway event {}", event.name());
                                if events.send(event).is_err() {
                                    return Ok(());
                                }
                            }
                            Err(EventDecodeError::UnknownEvent(name)) => {
                                debug!("Ignoring gateway event {}", name);
                            }
                            Err(e) => warn!("Dropping gateway frame: {}", e),
                        },
                        Message::Close(frame) => {
                            debug!("Gateway closed by server: {:?}", frame);
                            return Ok(());
                        }
                        _ => {}
                    }
                }
                _ = heartbeat.tick() => {
                    sink.send(Message::Ping(Vec::new())).await?;
                }
            }
        }
    }
}
