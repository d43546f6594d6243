//! Engine configuration
//!
//! ```rust
//! use greenhouse_engine::{ChannelAlphas, EngineConfig};
//!
//! let config = EngineConfig::default()
//!     .process_interval_ms(500)
//!     .max_gap_ms(5_000)
//!     .alphas(ChannelAlphas::uniform(0.1));
//!
//! assert!(config.validate().is_ok());
//! ```

use std::time::Duration;

use greenhouse_core::constants::{
    DEFAULT_COALESCE_INTERVAL_MS, DEFAULT_HISTORY_INTERVAL_MS, DEFAULT_MAX_BUFFER,
    DEFAULT_MAX_EVENTS, DEFAULT_MAX_GAP_MS, DEFAULT_PROCESS_INTERVAL_MS,
    DEPLOYED_CO2_ALPHA, DEPLOYED_HUMIDITY_ALPHA, DEPLOYED_TEMPERATURE_ALPHA, HISTORY_WINDOW_MS,
};
use greenhouse_core::detector::validate_alpha;
use greenhouse_core::{AnomalyDetector, Channel, ChannelDetectors};

use crate::error::ConfigError;

/// Per-channel EWMA smoothing factors
///
/// Defaults are the values the deployed dashboards run with. Temperature at
/// 2.0 and humidity/CO2 at 1.0 sit outside the usual (0, 1) range; see the
/// detector docs for what that does to the z-score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelAlphas {
    /// Temperature factor
    pub temperature: f64,
    /// Humidity factor
    pub humidity: f64,
    /// CO2 factor
    pub co2: f64,
}

impl ChannelAlphas {
    /// Same factor on every channel
    pub fn uniform(alpha: f64) -> Self {
        Self {
            temperature: alpha,
            humidity: alpha,
            co2: alpha,
        }
    }

    /// Factor for one channel
    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
            Channel::Co2 => self.co2,
        }
    }

    /// Build one detector per channel; factors above 1 are logged there
    pub(crate) fn detectors(&self) -> Result<ChannelDetectors, ConfigError> {
        let detector = |channel: Channel| {
            let alpha = self.get(channel);
            AnomalyDetector::new(alpha).map_err(|_| ConfigError::InvalidAlpha { channel, alpha })
        };
        Ok(ChannelDetectors::from_detectors([
            detector(Channel::Temperature)?,
            detector(Channel::Humidity)?,
            detector(Channel::Co2)?,
        ]))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for channel in Channel::ALL {
            let alpha = self.get(channel);
            validate_alpha(alpha).map_err(|_| ConfigError::InvalidAlpha { channel, alpha })?;
        }
        Ok(())
    }
}

impl Default for ChannelAlphas {
    fn default() -> Self {
        Self {
            temperature: DEPLOYED_TEMPERATURE_ALPHA,
            humidity: DEPLOYED_HUMIDITY_ALPHA,
            co2: DEPLOYED_CO2_ALPHA,
        }
    }
}

/// Scheduler and engine settings
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Drain-and-process cadence
    pub process_interval: Duration,
    /// Coalesced-view refresh cadence
    pub coalesce_interval: Duration,
    /// History append cadence
    pub history_interval: Duration,
    /// Trailing span kept in the history series
    pub history_window: Duration,
    /// Largest tolerated spacing between consecutive samples, in ms
    pub max_gap: u64,
    /// Ingestion buffer bound; oldest samples are dropped beyond it
    pub max_buffer: Option<usize>,
    /// Bound on the anomaly and device event lists
    pub max_events: usize,
    /// Detector smoothing factors
    pub alphas: ChannelAlphas,
}

impl EngineConfig {
    /// Set process interval in milliseconds
    pub fn process_interval_ms(mut self, ms: u64) -> Self {
        self.process_interval = Duration::from_millis(ms);
        self
    }

    /// Set coalesce interval in milliseconds
    pub fn coalesce_interval_ms(mut self, ms: u64) -> Self {
        self.coalesce_interval = Duration::from_millis(ms);
        self
    }

    /// Set history interval in milliseconds
    pub fn history_interval_ms(mut self, ms: u64) -> Self {
        self.history_interval = Duration::from_millis(ms);
        self
    }

    /// Set history window in milliseconds
    pub fn history_window_ms(mut self, ms: u64) -> Self {
        self.history_window = Duration::from_millis(ms);
        self
    }

    /// Set gap tolerance in milliseconds
    pub fn max_gap_ms(mut self, ms: u64) -> Self {
        self.max_gap = ms;
        self
    }

    /// Bound the ingestion buffer, or `None` for unbounded
    pub fn max_buffer(mut self, max: Option<usize>) -> Self {
        self.max_buffer = max;
        self
    }

    /// Set event list bound
    pub fn max_events(mut self, max: usize) -> Self {
        self.max_events = max;
        self
    }

    /// Set detector smoothing factors
    pub fn alphas(mut self, alphas: ChannelAlphas) -> Self {
        self.alphas = alphas;
        self
    }

    /// History window in milliseconds
    pub fn history_window_millis(&self) -> u64 {
        u64::try_from(self.history_window.as_millis()).unwrap_or(u64::MAX)
    }

    /// Check every setting
    ///
    /// Alphas above 1 pass; the detectors log a warning for them when built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, interval) in [
            ("process", self.process_interval),
            ("coalesce", self.coalesce_interval),
            ("history", self.history_interval),
        ] {
            if interval.is_zero() {
                return Err(ConfigError::ZeroInterval { name });
            }
        }
        if self.history_window.is_zero() {
            return Err(ConfigError::ZeroWindow);
        }
        if self.max_events == 0 {
            return Err(ConfigError::ZeroMaxEvents);
        }
        if self.max_buffer == Some(0) {
            return Err(ConfigError::ZeroMaxBuffer);
        }
        self.alphas.validate()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            process_interval: Duration::from_millis(DEFAULT_PROCESS_INTERVAL_MS),
            coalesce_interval: Duration::from_millis(DEFAULT_COALESCE_INTERVAL_MS),
            history_interval: Duration::from_millis(DEFAULT_HISTORY_INTERVAL_MS),
            history_window: Duration::from_millis(HISTORY_WINDOW_MS),
            max_gap: DEFAULT_MAX_GAP_MS,
            max_buffer: Some(DEFAULT_MAX_BUFFER),
            max_events: DEFAULT_MAX_EVENTS,
            alphas: ChannelAlphas::default(),
        }
    }
}
