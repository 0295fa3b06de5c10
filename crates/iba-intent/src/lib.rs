//! IBA Intent - Declared intents and per-session enforcement.
//!
//! An agent is authorized by an [`IntentDeclaration`]: who issued it, for
//! what purpose, over which resources ([`IntentScope`]), and until when.
//! An [`IntentValidator`] wraps one declaration for the length of a session
//! and decides each action in a fixed order:
//!
//! 1. expired declarations deny everything
//! 2. forbidden patterns deny, even under an allow-all scope
//! 3. resources outside the allowed patterns deny
//! 4. named usage limits deny once their ceiling is reached
//!
//! Every decision is recorded, so the validator can report statistics and
//! flag drift (repeated violations) at any point.
//!
//! # Example
//!
//! ```
//! use iba_intent::prelude::*;
//!
//! let scope = IntentScope::new()
//!     .allow("calendar:*")
//!     .forbid("medical_records:*")
//!     .limit("max_api_calls", 50);
//! let intent = IntentDeclaration::new(
//!     "healthcare-001",
//!     "Schedule dentist appointment for next Tuesday",
//!     "user@example.com",
//!     scope,
//! )?;
//!
//! let validator = IntentValidator::new(intent);
//! assert!(validator.validate_action("read", "calendar:read").is_allowed());
//! assert!(validator.enforce("read", "medical_records:history").is_err());
//! # Ok::<(), IntentError>(())
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod clock;
mod declaration;
mod drift;
mod error;
mod limits;
mod outcome;
mod scope;
mod validator;

pub use clock::{Clock, ManualClock, SystemClock};
pub use declaration::{
    DEFAULT_TTL_SECS, DeclarationBuilder, DeclarationRecord, HASH_DOMAIN, IntentDeclaration,
};
pub use drift::{DEFAULT_DRIFT_THRESHOLD, DriftPolicy};
pub use error::{IntentError, IntentResult};
pub use limits::{API_CALLS_LIMIT, LimitRule};
pub use outcome::{
    ALLOW_REASON, ActionRecord, DRIFT_REASON, DenialKind, DenialReason, DriftReport,
    SessionStatistics, ValidationOutcome,
};
pub use scope::{IntentScope, PatternKind, ResourcePattern};
pub use validator::{IntentValidator, SessionState, ValidatorConfig, ValidatorSnapshot};
