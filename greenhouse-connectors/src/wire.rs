//! Wire codec
//!
//! Every transport carries the same JSON envelope:
//!
//! ```json
//! { "type": "snapshot", "data": [ { "temperature": 25.1, "humidity": 50.2,
//!   "co2": 801.4, "event": "", "timestamp": 1700000000000 } ] }
//! ```
//!
//! `type` is `snapshot` or `delta`. Anything else is rejected as
//! [`WireError::UnknownType`] so callers can log it separately from payloads
//! that do not parse at all.

use greenhouse_core::Sample;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decoding failures
#[derive(Debug, Error)]
pub enum WireError {
    /// Payload is not a valid envelope or its samples do not parse
    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Envelope parsed but `type` is not recognized
    #[error("unknown message type: {0:?}")]
    UnknownType(String),
}

/// Decoded message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum WireMessage {
    /// Bulk transfer
    Snapshot(Vec<Sample>),
    /// Incremental update
    Delta(Vec<Sample>),
}

impl WireMessage {
    /// Message type as it appears on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Snapshot(_) => "snapshot",
            WireMessage::Delta(_) => "delta",
        }
    }

    /// Number of samples carried
    pub fn len(&self) -> usize {
        self.samples().len()
    }

    /// Whether no sample is carried
    pub fn is_empty(&self) -> bool {
        self.samples().is_empty()
    }

    /// Samples carried
    pub fn samples(&self) -> &[Sample] {
        match self {
            WireMessage::Snapshot(samples) | WireMessage::Delta(samples) => samples,
        }
    }
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Decode one text payload
pub fn decode(text: &str) -> Result<WireMessage, WireError> {
    unwrap_envelope(serde_json::from_str(text)?)
}

/// Decode a binary payload that should hold UTF-8 JSON
pub fn decode_bytes(bytes: &[u8]) -> Result<WireMessage, WireError> {
    unwrap_envelope(serde_json::from_slice(bytes)?)
}

fn unwrap_envelope(envelope: Envelope) -> Result<WireMessage, WireError> {
    match envelope.kind.as_str() {
        "snapshot" => Ok(WireMessage::Snapshot(serde_json::from_value(envelope.data)?)),
        "delta" => Ok(WireMessage::Delta(serde_json::from_value(envelope.data)?)),
        _ => Err(WireError::UnknownType(envelope.kind)),
    }
}

/// Encode a message, used by test servers and replay tools
pub fn encode(message: &WireMessage) -> Result<String, WireError> {
    Ok(serde_json::to_string(message)?)
}
