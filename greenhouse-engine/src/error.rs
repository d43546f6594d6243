//! Engine error types

use greenhouse_connectors::ConnectorError;
use greenhouse_core::Channel;
use thiserror::Error;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Invalid engine configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A timer interval is zero
    #[error("{name} interval must be positive")]
    ZeroInterval {
        /// Which interval
        name: &'static str,
    },

    /// History window is zero
    #[error("history window must be positive")]
    ZeroWindow,

    /// Event lists cannot hold anything
    #[error("max events must be positive")]
    ZeroMaxEvents,

    /// Buffer bound of zero would drop every sample
    #[error("max buffer must be positive when set")]
    ZeroMaxBuffer,

    /// Smoothing factor not finite or not positive
    #[error("invalid alpha {alpha} for {channel}")]
    InvalidAlpha {
        /// Channel the factor belongs to
        channel: Channel,
        /// Rejected value
        alpha: f64,
    },
}

/// Engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Provider refused to start
    #[error("connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Engine task panicked or was aborted
    #[error("engine task failed: {0}")]
    Task(String),
}
