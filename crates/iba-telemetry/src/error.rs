//! Errors raised while turning a logging configuration into a subscriber.

use thiserror::Error;

/// Failure to set up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// Unknown format name or unparsable filter directive.
    #[error("invalid logging configuration: {0}")]
    ConfigError(String),

    /// A global subscriber was already installed.
    #[error("cannot install subscriber: {0}")]
    InitError(String),

    /// The file target's directory could not be created.
    #[error("log directory {path} unusable: {reason}")]
    LogDirectory {
        /// Directory that was requested.
        path: String,
        /// Underlying I/O failure.
        reason: String,
    },
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
