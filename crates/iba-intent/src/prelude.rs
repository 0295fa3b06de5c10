//! Commonly used types for convenient import.
//!
//! Use `use iba_intent::prelude::*;` to import the essentials.

pub use crate::{IntentError, IntentResult};

pub use crate::{IntentDeclaration, IntentScope, ResourcePattern};

pub use crate::{
    DenialKind, DenialReason, DriftReport, SessionStatistics, ValidationOutcome,
};

pub use crate::{IntentValidator, ValidatorConfig};

pub use crate::{Clock, ManualClock, SystemClock};
