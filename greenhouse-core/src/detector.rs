//! Exponentially-Weighted Anomaly Detector
//!
//! ## Overview
//!
//! Each channel carries a streaming estimate of its mean and variance that
//! needs no historical replay. Every new (smoothed) value updates the estimate
//! and is scored against it:
//!
//! ```text
//! mean'     = α·x + (1−α)·mean
//! variance' = max(α·(x − mean')² + (1−α)·variance, ε)
//! z         = (x − mean') / sqrt(variance')      (0 when the stddev ≤ 1e-6)
//! anomaly   = |z| > 3
//! ```
//!
//! The first observation only seeds the state (`mean = x`, `variance = ε`)
//! and reports `z = 0`.
//!
//! ## Self-adaptation
//!
//! State is updated whether or not the value is flagged. A sustained shift is
//! reported while the estimate catches up and then stops being anomalous; the
//! detector tracks the process rather than a fixed baseline.
//!
//! ## Choosing α
//!
//! The step response bounds the reachable z-score. For a jump `d` from a
//! settled state, `z ≈ (1−α)·d / ((1−α)·d·√α) = 1/√α`, so only `α < 1/9` can
//! ever exceed the 3σ threshold on a single step. Values of 0.05–0.1 flag
//! genuine spikes; 0.3 mostly tracks.
//!
//! Factors above 1 are accepted but make the update extrapolate instead of
//! average. They are logged as a warning at construction.

use crate::constants::{ANOMALY_Z_THRESHOLD, MIN_STDDEV, VARIANCE_FLOOR};
use crate::errors::DetectorError;
use crate::sample::Channel;

/// Per-channel EWMA statistics
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EwmaState {
    /// Exponentially weighted mean
    pub mean: f64,
    /// Exponentially weighted variance, never below the floor once initialized
    pub variance: f64,
    /// Whether the first observation has been seen
    pub initialized: bool,
}

/// Score of one observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    /// Standard deviations from the updated mean
    pub z_score: f64,
    /// `|z_score| > 3`
    pub is_anomaly: bool,
}

impl Detection {
    const NORMAL: Self = Self {
        z_score: 0.0,
        is_anomaly: false,
    };
}

/// Stateful EWMA detector for one channel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    alpha: f64,
    state: EwmaState,
}

impl AnomalyDetector {
    /// Create a detector with smoothing factor `alpha`
    ///
    /// ## Errors
    ///
    /// [`DetectorError::InvalidAlpha`] when `alpha` is not finite or not > 0.
    pub fn new(alpha: f64) -> Result<Self, DetectorError> {
        validate_alpha(alpha)?;
        if alpha > 1.0 {
            log_warn!(
                "EWMA alpha {} is above 1; the update will extrapolate rather than average",
                alpha
            );
        }
        Ok(Self {
            alpha,
            state: EwmaState::default(),
        })
    }

    /// Smoothing factor in use
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Current statistics
    pub fn state(&self) -> EwmaState {
        self.state
    }

    /// Fold a value into the statistics and score it
    pub fn update(&mut self, value: f64) -> Detection {
        let state = &mut self.state;
        if !state.initialized {
            state.mean = value;
            state.variance = VARIANCE_FLOOR;
            state.initialized = true;
            return Detection::NORMAL;
        }

        let alpha = self.alpha;
        state.mean = alpha * value + (1.0 - alpha) * state.mean;

        let deviation = value - state.mean;
        let variance = alpha * deviation * deviation + (1.0 - alpha) * state.variance;
        // NaN fails the comparison and is floored as well
        state.variance = if variance > VARIANCE_FLOOR {
            variance
        } else {
            VARIANCE_FLOOR
        };

        let stddev = libm::sqrt(state.variance);
        let z_score = if stddev > MIN_STDDEV {
            deviation / stddev
        } else {
            0.0
        };

        Detection {
            z_score,
            is_anomaly: libm::fabs(z_score) > ANOMALY_Z_THRESHOLD,
        }
    }
}

/// Check a smoothing factor without building a detector
pub fn validate_alpha(alpha: f64) -> Result<(), DetectorError> {
    if alpha.is_finite() && alpha > 0.0 {
        Ok(())
    } else {
        Err(DetectorError::InvalidAlpha { alpha })
    }
}

/// One detector per monitored channel
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelDetectors {
    detectors: [AnomalyDetector; 3],
}

impl ChannelDetectors {
    /// Create detectors with per-channel smoothing factors
    pub fn new(temperature: f64, humidity: f64, co2: f64) -> Result<Self, DetectorError> {
        Ok(Self {
            detectors: [
                AnomalyDetector::new(temperature)?,
                AnomalyDetector::new(humidity)?,
                AnomalyDetector::new(co2)?,
            ],
        })
    }

    /// Wrap detectors built in [`Channel::ALL`] order
    pub fn from_detectors(detectors: [AnomalyDetector; 3]) -> Self {
        Self { detectors }
    }

    /// Update and score one channel
    pub fn update(&mut self, channel: Channel, value: f64) -> Detection {
        self.detectors[channel.index()].update(value)
    }

    /// Detector for one channel
    pub fn get(&self, channel: Channel) -> &AnomalyDetector {
        &self.detectors[channel.index()]
    }
}
