//! Error types for intent declarations and enforcement.

use thiserror::Error;

use crate::outcome::DenialReason;

/// Errors raised by intent construction and strict enforcement.
///
/// An ordinary denial is *not* an error: [`IntentValidator::validate_action`]
/// returns it as a [`ValidationOutcome`](crate::ValidationOutcome). Only
/// [`IntentValidator::enforce`] turns a denial into
/// [`IntentError::Violation`].
///
/// [`IntentValidator::validate_action`]: crate::IntentValidator::validate_action
/// [`IntentValidator::enforce`]: crate::IntentValidator::enforce
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IntentError {
    /// The declaration is malformed.
    #[error("invalid intent: {field}: {message}")]
    InvalidIntent {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },

    /// An action was denied on the fail-closed path.
    #[error("intent violation: {action} on {resource}: {reason}")]
    Violation {
        /// The attempted action.
        action: String,
        /// The resource it targeted.
        resource: String,
        /// Why it was denied.
        reason: DenialReason,
    },

    /// A session snapshot was taken under a different declaration.
    #[error("snapshot was taken for intent hash {expected}, declaration hashes to {actual}")]
    SnapshotMismatch {
        /// Hash recorded in the snapshot.
        expected: String,
        /// Hash of the declaration it was restored onto.
        actual: String,
    },

    /// A declaration record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl IntentError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidIntent {
            field,
            message: message.into(),
        }
    }

    /// The denial behind a [`Violation`](Self::Violation), if this is one.
    #[must_use]
    pub fn denial(&self) -> Option<&DenialReason> {
        match self {
            Self::Violation { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for IntentError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result type for intent operations.
pub type IntentResult<T> = Result<T, IntentError>;
