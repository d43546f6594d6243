//! Reconnecting Telemetry Transports
//!
//! ## Overview
//!
//! A [`DataProvider`] owns one transport connection to the greenhouse
//! controller and keeps it alive until told to stop. Whatever the protocol,
//! every provider reports through the same three notification channels,
//! delivered as [`ProviderEvent`]s on an [`EventSink`]:
//!
//! | Notification | Meaning                                              |
//! |--------------|------------------------------------------------------|
//! | `Snapshot`   | Bulk transfer, typically right after connecting      |
//! | `Delta`      | Incremental update of one or a few new samples       |
//! | `State`      | Connection state transition                          |
//!
//! ## Connection State Machine
//!
//! ```text
//!            connect()
//! Offline ───────────────► Reconnecting ──open──► Live
//!    ▲                          │                  │
//!    │                        fail             close/error
//!    │                          ▼                  ▼
//!    └──── disconnect() ◄──── Offline ◄────────────┘
//!                               │
//!                        wait backoff, then Reconnecting again
//! ```
//!
//! Every attempt, including the first, announces `Reconnecting`. Transport
//! errors never reach the caller: they end the session, which the reconnect
//! policy handles like any close. After [`DataProvider::disconnect`] no
//! further attempt is scheduled and the machine halts in `Offline`.
//!
//! ## Retry Logic
//!
//! Exponential backoff without jitter:
//! ```text
//! delay = min(500ms · 2^consecutive_failures, 8000ms)
//! ```
//! A successful open resets the delay. See [`backoff`].
//!
//! ## Malformed Input
//!
//! Unparseable payloads and unknown message types are logged and dropped.
//! The connection stays up.
//!
//! ## Protocols
//!
//! - [`websocket`]: JSON frames `{"type": "snapshot"|"delta", "data": [...]}`
//!   over a WebSocket (feature `websocket`).
//! - [`mqtt`]: the same JSON payloads published on an MQTT topic
//!   (feature `mqtt`).
//!
//! New transports implement [`DataProvider`] and reuse [`session`] for the
//! reconnect loop.

pub mod backoff;
pub mod session;
pub mod wire;

#[cfg(feature = "websocket")]
pub mod websocket;

#[cfg(feature = "mqtt")]
pub mod mqtt;

// Re-export common types
pub use backoff::{Backoff, BackoffPolicy};
pub use wire::{WireError, WireMessage};

#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketProvider};

#[cfg(feature = "mqtt")]
pub use mqtt::{MqttConfig, MqttProvider};

use std::sync::{Arc, Mutex, PoisonError};

use greenhouse_core::{ConnectionState, Sample};
use thiserror::Error;
use tokio::sync::mpsc;

/// Provider setup errors
///
/// Runtime transport failures are not represented here; they are folded
/// into the reconnect state machine.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Already connected")]
    AlreadyConnected,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// One notification from a provider
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    /// Bulk transfer of multiple samples
    Snapshot(Vec<Sample>),
    /// Incremental update
    Delta(Vec<Sample>),
    /// Connection state transition
    State(ConnectionState),
}

/// Sending half of a provider's notification channel
///
/// Sends never block. When the receiving side is gone the notification is
/// dropped.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ProviderEvent>,
}

impl EventSink {
    /// Create a sink and the receiver the consumer polls
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProviderEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report a snapshot batch
    pub fn snapshot(&self, samples: Vec<Sample>) -> bool {
        self.send(ProviderEvent::Snapshot(samples))
    }

    /// Report a delta batch
    pub fn delta(&self, samples: Vec<Sample>) -> bool {
        self.send(ProviderEvent::Delta(samples))
    }

    /// Report a state transition
    pub fn state(&self, state: ConnectionState) -> bool {
        log::info!("connection state -> {}", state);
        self.send(ProviderEvent::State(state))
    }

    /// Forward a decoded wire message
    pub fn dispatch(&self, message: WireMessage) -> bool {
        match message {
            WireMessage::Snapshot(samples) => self.snapshot(samples),
            WireMessage::Delta(samples) => self.delta(samples),
        }
    }

    /// Whether the consumer has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, event: ProviderEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Polymorphic transport capability
///
/// `connect` returns immediately; the connection is established and kept
/// alive by a background task until `disconnect` is called.
#[async_trait::async_trait]
pub trait DataProvider: Send {
    /// Start connecting, reporting every notification to `sink`
    ///
    /// After `disconnect` a provider may be connected again right away; the
    /// new connection starts once the previous task has stopped.
    fn connect(&mut self, sink: EventSink) -> Result<(), ConnectorError>;

    /// Stop the connection for good
    ///
    /// Synchronously prevents any further reconnect attempt. Idempotent.
    fn disconnect(&mut self);

    /// Wait until the background task has fully stopped
    async fn closed(&mut self);

    /// Short transport name for logs
    fn name(&self) -> &'static str;

    /// Get connection statistics
    fn stats(&self) -> ConnectionStats;
}

/// Connection statistics common to all providers
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ConnectionStats {
    /// Connection attempts made
    pub attempts: u64,
    /// Attempts that reached `Live`
    pub connections: u64,
    /// Well-formed messages received
    pub messages_received: u64,
    /// Samples carried by those messages
    pub samples_received: u64,
    /// Messages dropped as malformed or of unknown type
    pub messages_malformed: u64,
    /// Last transport error message
    pub last_error: Option<String>,
}

/// Statistics shared between a provider and its background task
#[derive(Debug, Clone, Default)]
pub struct SharedStats(Arc<Mutex<ConnectionStats>>);

impl SharedStats {
    /// Apply a change
    pub fn update(&self, f: impl FnOnce(&mut ConnectionStats)) {
        let mut stats = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut stats);
    }

    /// Copy of the current values
    pub fn snapshot(&self) -> ConnectionStats {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

/// Decode one inbound text payload and forward it, logging what is dropped
pub fn handle_payload(text: &str, sink: &EventSink, stats: &SharedStats) {
    match wire::decode(text) {
        Ok(message) => {
            let count = message.len();
            stats.update(|s| {
                s.messages_received += 1;
                s.samples_received += count as u64;
            });
            log::trace!("received {} with {} samples", message.kind(), count);
            sink.dispatch(message);
        }
        Err(e) => {
            stats.update(|s| s.messages_malformed += 1);
            log::warn!("dropping inbound message: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sink_delivers_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.state(ConnectionState::Reconnecting);
        sink.delta(vec![Sample::new(20.0, 50.0, 800.0, 1)]);

        assert_eq!(
            rx.recv().await,
            Some(ProviderEvent::State(ConnectionState::Reconnecting))
        );
        assert!(matches!(rx.recv().await, Some(ProviderEvent::Delta(v)) if v.len() == 1));
    }

    #[test]
    fn sink_reports_closed_receiver() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        assert!(sink.is_closed());
        assert!(!sink.state(ConnectionState::Live));
    }

    #[test]
    fn malformed_payload_is_counted_not_forwarded() {
        let (sink, mut rx) = EventSink::channel();
        let stats = SharedStats::default();

        handle_payload("not json", &sink, &stats);
        handle_payload(r#"{"type":"heartbeat","data":[]}"#, &sink, &stats);
        handle_payload(
            r#"{"type":"delta","data":[{"temperature":1,"humidity":2,"co2":3,"event":"","timestamp":9}]}"#,
            &sink,
            &stats,
        );

        let stats = stats.snapshot();
        assert_eq!(stats.messages_malformed, 2);
        assert_eq!(stats.messages_received, 1);
        assert_eq!(stats.samples_received, 1);
        assert!(matches!(rx.try_recv(), Ok(ProviderEvent::Delta(_))));
        assert!(rx.try_recv().is_err());
    }
}
