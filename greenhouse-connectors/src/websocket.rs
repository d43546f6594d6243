//! WebSocket provider
//!
//! Connects to `url + path`, decodes every text frame with [`crate::wire`]
//! and reconnects through [`crate::session`].
//!
//! # Example
//!
//! ```rust,no_run
//! use greenhouse_connectors::{DataProvider, EventSink, WebSocketConfig, WebSocketProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = WebSocketConfig::new("ws://controller.local:8080")
//!     .path("/telemetry")
//!     .connect_timeout_secs(5);
//!
//! let mut provider = WebSocketProvider::new(config)?;
//! let (sink, mut events) = EventSink::channel();
//! provider.connect(sink)?;
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffPolicy;
use crate::session::{self, SessionContext, SessionEnd};
use crate::{handle_payload, ConnectionStats, ConnectorError, DataProvider, EventSink, SharedStats};

/// WebSocket configuration
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Server base URL, `ws://` or `wss://`
    pub url: String,
    /// Path appended to the base URL
    pub path: String,
    /// Time allowed for the opening handshake
    pub connect_timeout: Duration,
    /// Reconnect delays
    pub backoff: BackoffPolicy,
}

impl WebSocketConfig {
    /// Create config for a server
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            path: "/".into(),
            connect_timeout: Duration::from_secs(10),
            backoff: BackoffPolicy::default(),
        }
    }

    /// Set the path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set handshake timeout in seconds
    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.connect_timeout = Duration::from_secs(secs);
        self
    }

    /// Set the backoff policy
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Full endpoint the provider dials
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.url, self.path)
    }
}

/// Reconnecting WebSocket client
pub struct WebSocketProvider {
    config: WebSocketConfig,
    stats: SharedStats,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl WebSocketProvider {
    /// Create provider, validating the URL
    pub fn new(config: WebSocketConfig) -> Result<Self, ConnectorError> {
        if !config.url.starts_with("ws://") && !config.url.starts_with("wss://") {
            return Err(ConnectorError::InvalidUrl(format!(
                "{} (must start with ws:// or wss://)",
                config.url
            )));
        }
        if config.connect_timeout.is_zero() {
            return Err(ConnectorError::ConfigError(
                "connect timeout must be positive".into(),
            ));
        }

        Ok(Self {
            config,
            stats: SharedStats::default(),
            cancel: None,
            task: None,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &WebSocketConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl DataProvider for WebSocketProvider {
    fn connect(&mut self, sink: EventSink) -> Result<(), ConnectorError> {
        if self.cancel.as_ref().is_some_and(|c| !c.is_cancelled()) {
            return Err(ConnectorError::AlreadyConnected);
        }

        let cancel = CancellationToken::new();
        let ctx = SessionContext {
            sink,
            stats: self.stats.clone(),
            cancel: cancel.clone(),
        };
        let endpoint = self.config.endpoint();
        let timeout = self.config.connect_timeout;
        log::info!("websocket: connecting to {}", endpoint);

        self.task = Some(session::spawn_after(
            "websocket",
            self.task.take(),
            session::run("websocket", ctx, self.config.backoff, move |ctx| {
                run_session(endpoint.clone(), timeout, ctx)
            }),
        ));
        self.cancel = Some(cancel);
        Ok(())
    }

    fn disconnect(&mut self) {
        if let Some(cancel) = &self.cancel {
            cancel.cancel();
        }
    }

    async fn closed(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                log::error!("websocket: connection task failed: {}", e);
            }
        }
    }

    fn name(&self) -> &'static str {
        "websocket"
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.snapshot()
    }
}

async fn run_session(endpoint: String, timeout: Duration, ctx: SessionContext) -> SessionEnd {
    let connecting = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(endpoint.as_str()));
    let stream = tokio::select! {
        _ = ctx.cancel.cancelled() => return SessionEnd::Cancelled,
        result = connecting => match result {
            Ok(Ok((stream, _response))) => stream,
            Ok(Err(e)) => return SessionEnd::Failed(e.to_string()),
            Err(_) => return SessionEnd::Failed(format!("handshake timed out after {:?}", timeout)),
        },
    };

    ctx.opened();
    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                if let Err(e) = write.send(Message::Close(None)).await {
                    log::debug!("websocket: close frame not sent: {}", e);
                }
                return SessionEnd::Cancelled;
            }
            frame = read.next() => match frame {
                Some(Ok(Message::Text(text))) => handle_payload(&text, &ctx.sink, &ctx.stats),
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => handle_payload(text, &ctx.sink, &ctx.stats),
                    Err(e) => {
                        ctx.stats.update(|s| s.messages_malformed += 1);
                        log::warn!("websocket: dropping non-UTF-8 binary frame: {}", e);
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    log::debug!("websocket: close frame {:?}", frame);
                    return SessionEnd::Closed(None);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return SessionEnd::Closed(Some(e.to_string())),
                None => return SessionEnd::Closed(None),
            },
        }
    }
}
