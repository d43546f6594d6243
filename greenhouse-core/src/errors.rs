//! Error Types for the Telemetry Pipeline
//!
//! ## Design Philosophy
//!
//! Most pipeline failures are not errors at all. A dropped connection is folded
//! into the reconnect state machine, a gap in the stream is a counter, a
//! duplicate sample is silently collapsed. What remains here are the genuine
//! contract violations and collaborator failures:
//!
//! 1. **Caller contract**: [`FilterError::InvalidInput`] means the smoothing
//!    filter was handed an empty window. The scheduler never does this; seeing
//!    it means a bug upstream.
//!
//! 2. **Configuration**: [`DetectorError::InvalidAlpha`] rejects smoothing
//!    factors the EWMA update cannot work with (zero, negative, NaN).
//!
//! 3. **Collaborators**: [`StoreError`] is what a storage backend reports back.
//!    The scheduler logs it and keeps going; persistence is best effort.
//!
//! The first two are `Copy` and allocation-free so they can cross `no_std`
//! boundaries. `StoreError` carries a `String` because backends want to say
//! what went wrong.
//!
//! ## Error Handling Strategy
//!
//! ```rust
//! use greenhouse_core::{smooth, FilterError};
//!
//! let window: [f64; 0] = [];
//! match smooth(&window) {
//!     Ok(value) => { let _ = value; }
//!     Err(FilterError::InvalidInput) => {
//!         // Caller bug: never smooth before the window has a sample
//!     }
//! }
//! ```

use alloc::string::String;
use thiserror_no_std::Error;

use crate::time::Timestamp;

/// Result type for core pipeline operations
pub type CoreResult<T, E> = Result<T, E>;

/// Smoothing filter errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterError {
    /// Filter was called with zero samples
    #[error("Invalid input: smoothing filter requires at least one sample")]
    InvalidInput,
}

/// Anomaly detector errors
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum DetectorError {
    /// Smoothing factor must be finite and strictly positive
    #[error("Invalid alpha {alpha}: must be finite and > 0")]
    InvalidAlpha {
        /// The rejected smoothing factor
        alpha: f64,
    },
}

/// Storage collaborator errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The batch repeats a timestamp; the batch was rejected
    #[error("Duplicate record at timestamp {timestamp}")]
    DuplicateTimestamp {
        /// Timestamp that appeared more than once
        timestamp: Timestamp,
    },

    /// Backend is not reachable or not initialized
    #[error("Storage unavailable: {reason}")]
    Unavailable {
        /// Backend-specific description
        reason: String,
    },
}
