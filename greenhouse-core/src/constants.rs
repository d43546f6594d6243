//! Pipeline Constants
//!
//! Numeric constants shared by the pipeline stages. The defaults for the
//! scheduler intervals live here too so the engine configuration and the
//! tests agree on a single source.
//!
//! ## Smoothing kernel
//!
//! The smoothing filter uses a fixed five-tap kernel halving at each lag
//! (with the remainder folded into lag 0):
//!
//! ```text
//! lag:     0        1      2       3        4
//! weight:  0.53125  0.25   0.125   0.0625   0.03125   (sum = 1.0)
//! ```
//!
//! All weights are exact binary fractions, so partial sums are exact in
//! `f64` and the renormalized kernels sum to 1.0 without rounding drift.

/// Smoothing kernel weights for lag 0 (newest) through lag 4 (oldest)
pub const SMOOTHING_KERNEL: [f64; 5] = [0.53125, 0.25, 0.125, 0.0625, 0.03125];

/// Number of taps in the smoothing kernel, and the rolling window length
pub const SMOOTHING_TAPS: usize = SMOOTHING_KERNEL.len();

/// Variance floor for the EWMA detector
///
/// Seeds the variance on first observation and bounds it from below on
/// every update, so the standard deviation is never zero.
pub const VARIANCE_FLOOR: f64 = 1e-6;

/// Standard deviations below this are treated as zero (z-score forced to 0)
pub const MIN_STDDEV: f64 = 1e-6;

/// |z| above this flags an anomaly
pub const ANOMALY_Z_THRESHOLD: f64 = 3.0;

/// Default EWMA smoothing factor for a channel with no explicit setting
pub const DEFAULT_ALPHA: f64 = 0.3;

/// Alpha used for temperature by the deployed configuration
pub const DEPLOYED_TEMPERATURE_ALPHA: f64 = 2.0;

/// Alpha used for humidity by the deployed configuration
pub const DEPLOYED_HUMIDITY_ALPHA: f64 = 1.0;

/// Alpha used for CO2 by the deployed configuration
pub const DEPLOYED_CO2_ALPHA: f64 = 1.0;

/// Trailing duration kept by the history series (15 minutes)
pub const HISTORY_WINDOW_MS: u64 = 15 * 60 * 1000;

/// Default maximum tolerated gap between consecutive samples
pub const DEFAULT_MAX_GAP_MS: u64 = 2_000;

/// Default process tick interval
pub const DEFAULT_PROCESS_INTERVAL_MS: u64 = 1_000;

/// Default coalesce tick interval
pub const DEFAULT_COALESCE_INTERVAL_MS: u64 = 200;

/// Default history tick interval
pub const DEFAULT_HISTORY_INTERVAL_MS: u64 = 60_000;

/// Default bound on retained anomaly and device events
pub const DEFAULT_MAX_EVENTS: usize = 200;

/// Default bound on the ingestion buffer between process ticks
pub const DEFAULT_MAX_BUFFER: usize = 10_000;
