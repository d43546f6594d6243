//! Core telemetry pipeline for Greenhouse
//!
//! Turns a raw, unordered stream of climate samples (temperature, humidity,
//! CO2) into an ordered, smoothed and anomaly-checked sequence before any
//! value reaches a display or storage layer.
//!
//! Everything in this crate is synchronous and free of I/O:
//! - [`sanitize`] orders, deduplicates and gap-checks a batch
//! - [`filter`] applies the fixed five-tap smoothing kernel
//! - [`detector`] tracks a per-channel EWMA mean/variance and flags outliers
//! - [`history`] keeps a bounded trailing time series for charts
//! - [`store`] defines the durable-storage collaborator
//!
//! The async transport and the scheduler that drives these stages live in
//! `greenhouse-connectors` and `greenhouse-engine`.
//!
//! ```
//! use greenhouse_core::{sanitize, Checkpoint, Sample};
//!
//! let batch = vec![
//!     Sample::new(21.0, 55.0, 800.0, 2_000),
//!     Sample::new(21.1, 55.0, 801.0, 1_500),
//!     Sample::new(21.0, 55.0, 800.0, 2_000),
//! ];
//!
//! let result = sanitize(Checkpoint::at(1_000), 1_000, batch);
//! assert!(result.gap_ok);
//! assert_eq!(result.checkpoint, Checkpoint::at(2_000));
//! assert_eq!(result.ordered.len(), 2);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

extern crate alloc;

// Macro for optional logging
#[cfg(feature = "log")]
macro_rules! log_warn {
    ($($arg:tt)*) => { log::warn!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "log")]
macro_rules! log_debug {
    ($($arg:tt)*) => { log::debug!($($arg)*) };
}

#[cfg(not(feature = "log"))]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

pub mod constants;
pub mod detector;
pub mod errors;
pub mod filter;
pub mod history;
pub mod sample;
pub mod sanitize;
pub mod store;
pub mod time;
pub mod window;

// Public API
pub use detector::{AnomalyDetector, ChannelDetectors, Detection, EwmaState};
pub use errors::{CoreResult, DetectorError, FilterError, StoreError};
pub use filter::smooth;
pub use history::{HistoryPoint, HistorySeries};
pub use sample::{AnomalyEvent, Channel, ConnectionState, Sample, SensorRecord};
pub use sanitize::{sanitize, GapViolation, Sanitized};
pub use store::{MemoryStore, RecordStore};
pub use time::{Checkpoint, Timestamp};
pub use window::SampleWindow;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
