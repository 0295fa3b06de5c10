//! Logging setup for intent-bound authorization.
//!
//! Decisions made by the validator and binder are emitted as `tracing`
//! events. This crate installs the subscriber that renders them.
//!
//! # Example
//!
//! ```rust,no_run
//! use iba_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), iba_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("iba_intent=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("authorization service started");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileLogConfig, FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging,
    setup_logging,
};
