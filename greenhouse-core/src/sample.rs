//! Data Model for Climate Telemetry
//!
//! ## Overview
//!
//! A [`Sample`] is one reading from the greenhouse controller: three channel
//! values plus an optional device event label, stamped with the device's
//! millisecond clock. Samples flow through the pipeline in three shapes:
//!
//! ```text
//! Transport ──► Sample (raw, unordered) ──► Sample (sanitized)
//!                                              │
//!                         ┌────────────────────┼──────────────────┐
//!                         ▼                    ▼                  ▼
//!                  SensorRecord          Channel values     AnomalyEvent
//!                  (storage)             (filter/detector)  (display)
//! ```
//!
//! ## Channels
//!
//! Each monitored quantity is a [`Channel`]. The scheduler keeps one rolling
//! window and one detector per channel, and all three channels see the same
//! sanitized sequence in the same order.
//!
//! ## Identity
//!
//! Samples are identified by timestamp alone. The sanitizer collapses two
//! samples with the same timestamp even when their values differ, and storage
//! uses the timestamp as primary key.

use alloc::format;
use alloc::string::String;
use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// One raw telemetry reading
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// Air temperature in °C
    pub temperature: f64,
    /// Relative humidity in %
    pub humidity: f64,
    /// CO2 concentration in ppm
    pub co2: f64,
    /// Device-reported event label, empty when nothing happened
    #[cfg_attr(feature = "serde", serde(rename = "event", alias = "eventLabel", default))]
    pub event_label: String,
    /// Device timestamp in milliseconds
    pub timestamp: Timestamp,
}

impl Sample {
    /// Create a sample with no event label
    pub fn new(temperature: f64, humidity: f64, co2: f64, timestamp: Timestamp) -> Self {
        Self {
            temperature,
            humidity,
            co2,
            event_label: String::new(),
            timestamp,
        }
    }

    /// Attach a device event label
    pub fn with_event(mut self, label: impl Into<String>) -> Self {
        self.event_label = label.into();
        self
    }

    /// Whether the device flagged an event with this sample
    pub fn has_event(&self) -> bool {
        !self.event_label.is_empty()
    }

    /// Value of a single channel
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
            Channel::Co2 => self.co2,
        }
    }
}

/// Flat record shape handed to the storage collaborator
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorRecord {
    /// Air temperature in °C
    pub temperature: f64,
    /// Relative humidity in %
    pub humidity: f64,
    /// CO2 concentration in ppm
    pub co2: f64,
    /// Device timestamp in milliseconds (primary key)
    pub timestamp: Timestamp,
}

impl From<&Sample> for SensorRecord {
    fn from(sample: &Sample) -> Self {
        Self {
            temperature: sample.temperature,
            humidity: sample.humidity,
            co2: sample.co2,
            timestamp: sample.timestamp,
        }
    }
}

/// Monitored channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum Channel {
    /// Air temperature
    Temperature = 0,
    /// Relative humidity
    Humidity = 1,
    /// CO2 concentration
    Co2 = 2,
}

impl Channel {
    /// All channels in processing order
    pub const ALL: [Channel; 3] = [Channel::Temperature, Channel::Humidity, Channel::Co2];

    /// Channel charted by the history series
    pub const PRIMARY: Channel = Channel::Temperature;

    /// Human-readable name
    pub const fn name(&self) -> &'static str {
        match self {
            Channel::Temperature => "Temperature",
            Channel::Humidity => "Humidity",
            Channel::Co2 => "CO2",
        }
    }

    /// Unit of measurement
    pub const fn unit(&self) -> &'static str {
        match self {
            Channel::Temperature => "°C",
            Channel::Humidity => "%",
            Channel::Co2 => "ppm",
        }
    }

    /// Dense index for per-channel arrays
    pub const fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Transport connection state
///
/// Exactly one is current at any instant. See the provider docs in
/// `greenhouse-connectors` for the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum ConnectionState {
    /// No connection and no attempt in flight
    #[default]
    Offline,
    /// A connection attempt is in progress
    Reconnecting,
    /// Connected and receiving
    Live,
}

impl ConnectionState {
    /// Label for status displays
    pub const fn label(&self) -> &'static str {
        match self {
            ConnectionState::Offline => "OFFLINE",
            ConnectionState::Reconnecting => "RECONNECTING",
            ConnectionState::Live => "LIVE",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Anomaly flagged by the detector for one channel
///
/// Created once by the scheduler and never mutated.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnomalyEvent {
    /// Channel that tripped the detector
    pub channel: Channel,
    /// Display message, e.g. `Temperature anomaly: 31.2°C (z=3.41)`
    pub message: String,
    /// Smoothed value that was checked
    pub value: f64,
    /// Z-score reported by the detector
    pub z_score: f64,
    /// Timestamp of the sample that produced it
    pub timestamp: Timestamp,
}

impl AnomalyEvent {
    /// Build an event with the standard message
    pub fn new(channel: Channel, value: f64, z_score: f64, timestamp: Timestamp) -> Self {
        let message = format!(
            "{} anomaly: {:.1}{} (z={:.2})",
            channel.name(),
            value,
            channel.unit(),
            z_score
        );
        Self {
            channel,
            message,
            value,
            z_score,
            timestamp,
        }
    }
}
