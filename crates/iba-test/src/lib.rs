//! IBA Test - Shared test utilities for intent-bound authorization.
//!
//! Fixtures and harness helpers used by the integration tests and
//! available to any crate as a dev-dependency. Fixture declarations are
//! issued at a fixed instant, so validate them against [`manual_clock`]
//! rather than the system clock.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! iba-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use iba_test::{healthcare_declaration, manual_clock, setup_test_logging_default, validator_at};
//!
//! #[test]
//! fn calendar_is_allowed() {
//!     setup_test_logging_default();
//!     let validator = validator_at(healthcare_declaration(), &manual_clock());
//!     assert!(validator.validate_action("read", "calendar:read").is_allowed());
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;
