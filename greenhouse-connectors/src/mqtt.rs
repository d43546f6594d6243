//! MQTT provider
//!
//! Subscribes to one topic whose payloads use the same JSON envelope as the
//! WebSocket transport. A fresh client and event loop are built for every
//! session so reconnects follow the shared backoff instead of rumqttc's
//! internal retry.

use std::time::Duration;

use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::backoff::BackoffPolicy;
use crate::session::{self, SessionContext, SessionEnd};
use crate::{handle_payload, ConnectionStats, ConnectorError, DataProvider, EventSink, SharedStats};

/// Request channel capacity per client
const REQUEST_CAPACITY: usize = 16;

/// MQTT configuration
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// Broker host
    pub host: String,
    /// Broker port
    pub port: u16,
    /// Client identifier
    pub client_id: String,
    /// Topic carrying telemetry envelopes
    pub topic: String,
    /// Keep-alive interval
    pub keep_alive: Duration,
    /// Reconnect delays
    pub backoff: BackoffPolicy,
}

impl MqttConfig {
    /// Create config for a broker
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            client_id: "greenhouse-dashboard".into(),
            topic: "greenhouse/telemetry".into(),
            keep_alive: Duration::from_secs(30),
            backoff: BackoffPolicy::default(),
        }
    }

    /// Set the client identifier
    pub fn client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = id.into();
        self
    }

    /// Set the subscribed topic
    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set keep-alive in seconds
    pub fn keep_alive_secs(mut self, secs: u64) -> Self {
        self.keep_alive = Duration::from_secs(secs);
        self
    }

    /// Set the backoff policy
    pub fn backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    fn options(&self) -> MqttOptions {
        let mut options = MqttOptions::new(self.client_id.clone(), self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        options
    }
}

/// Reconnecting MQTT subscriber
pub struct MqttProvider {
    config: MqttConfig,
    stats: SharedStats,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl MqttProvider {
    /// Create provider, validating the configuration
    pub fn new(config: MqttConfig) -> Result<Self, ConnectorError> {
        if config.host.is_empty() {
            return Err(ConnectorError::InvalidUrl("empty broker host".into()));
        }
        if config.client_id.is_empty() {
            return Err(ConnectorError::ConfigError("client id must not be empty".into()));
        }
        if config.topic.is_empty() || config.topic.contains(['+', '#']) {
            return Err(ConnectorError::ConfigError(format!(
                "topic must be a non-empty name without wildcards, got {:?}",
                config.topic
            )));
        }
        if config.keep_alive < Duration::from_secs(1) {
            return Err(ConnectorError::ConfigError(
                "keep-alive must be at least one second".into(),
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
    pub fn config(&self) -> &MqttConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl DataProvider for MqttProvider {
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
        let config = self.config.clone();
        log::info!(
            "mqtt: connecting to {}:{} topic {}",
            config.host,
            config.port,
            config.topic
        );

        self.task = Some(session::spawn_after(
            "mqtt",
            self.task.take(),
            session::run("mqtt", ctx, self.config.backoff, move |ctx| {
                run_session(config.clone(), ctx)
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
                log::error!("mqtt: connection task failed: {}", e);
            }
        }
    }

    fn name(&self) -> &'static str {
        "mqtt"
    }

    fn stats(&self) -> ConnectionStats {
        self.stats.snapshot()
    }
}

async fn run_session(config: MqttConfig, ctx: SessionContext) -> SessionEnd {
    let (client, mut eventloop) = AsyncClient::new(config.options(), REQUEST_CAPACITY);
    let mut opened = false;

    loop {
        tokio::select! {
            _ = ctx.cancel.cancelled() => {
                if opened {
                    say_goodbye(&client, &mut eventloop).await;
                }
                return SessionEnd::Cancelled;
            }
            event = eventloop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                    if let Err(e) = client.try_subscribe(config.topic.as_str(), QoS::AtLeastOnce) {
                        return SessionEnd::Failed(format!("subscribe to {} failed: {}", config.topic, e));
                    }
                    opened = true;
                    ctx.opened();
                }
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    match std::str::from_utf8(&publish.payload) {
                        Ok(text) => handle_payload(text, &ctx.sink, &ctx.stats),
                        Err(e) => {
                            ctx.stats.update(|s| s.messages_malformed += 1);
                            log::warn!("mqtt: dropping non-UTF-8 payload on {}: {}", publish.topic, e);
                        }
                    }
                }
                Ok(_) => {}
                Err(e) if opened => return SessionEnd::Closed(Some(e.to_string())),
                Err(e) => return SessionEnd::Failed(e.to_string()),
            },
        }
    }
}

/// Send DISCONNECT and drive the loop until it is written out
async fn say_goodbye(client: &AsyncClient, eventloop: &mut EventLoop) {
    if client.try_disconnect().is_err() {
        return;
    }
    let flushed = tokio::time::timeout(Duration::from_secs(1), async {
        loop {
            match eventloop.poll().await {
                Ok(Event::Outgoing(Outgoing::Disconnect)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;
    if flushed.is_err() {
        log::debug!("mqtt: disconnect not acknowledged in time");
    }
}
