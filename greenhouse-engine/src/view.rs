//! Read-only snapshot handed to the display layer

use greenhouse_core::{AnomalyEvent, Checkpoint, ConnectionState, HistoryPoint, Sample, Timestamp};
use serde::Serialize;

/// Operator-visible label carried by a delta sample
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceEvent {
    /// Label as sent by the controller
    pub label: String,
    /// Timestamp of the sample that carried it
    pub timestamp: Timestamp,
}

/// Pipeline counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// Samples that reached the filter and detector
    pub processed: u64,
    /// Failed gap checks
    pub gap_count: u64,
    /// Duplicates collapsed by the sanitizer
    pub duplicate_count: u64,
    /// Samples discarded below the checkpoint
    pub stale_count: u64,
    /// Samples dropped from a full ingestion buffer
    pub dropped_count: u64,
    /// Storage appends that failed
    pub store_failures: u64,
}

/// Everything the display layer reads
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayView {
    /// Most recent raw sample
    pub latest: Option<Sample>,
    /// Rate-limited copy of `latest`
    pub coalesced_latest: Option<Sample>,
    /// Anomaly events, newest first
    pub events: Vec<AnomalyEvent>,
    /// Device event labels, newest first
    pub device_events: Vec<DeviceEvent>,
    /// Current connection state
    pub connection_state: ConnectionState,
    /// Connection attempts announced by the provider
    pub reconnect_count: u64,
    /// Primary-channel history, oldest first
    pub history: Vec<HistoryPoint>,
    /// Pipeline counters
    pub counters: Counters,
    /// Processing checkpoint
    pub checkpoint: Checkpoint,
}
