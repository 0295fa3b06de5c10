//! Results produced by the session validator.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason text for an admitted action.
pub const ALLOW_REASON: &str = "Action aligns with declared intent";

/// Reason text reported when drift is detected.
pub const DRIFT_REASON: &str = "Repeated violations detected";

/// Why an action was denied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DenialReason {
    /// The declaration's validity window has closed.
    Expired {
        /// When the declaration expired.
        expired_at: DateTime<Utc>,
    },
    /// The resource matched a forbidden pattern.
    Forbidden {
        /// The resource that was requested.
        resource: String,
        /// The forbidden pattern it matched.
        pattern: String,
    },
    /// No allowed pattern matched the resource.
    OutOfScope {
        /// The resource that was requested.
        resource: String,
    },
    /// A named usage ceiling was reached.
    LimitExceeded {
        /// Limit name.
        limit: String,
        /// Its ceiling.
        ceiling: u64,
    },
}

impl DenialReason {
    /// The classification of this denial.
    #[must_use]
    pub fn kind(&self) -> DenialKind {
        match self {
            Self::Expired { .. } => DenialKind::Expired,
            Self::Forbidden { .. } => DenialKind::Forbidden,
            Self::OutOfScope { .. } => DenialKind::OutOfScope,
            Self::LimitExceeded { .. } => DenialKind::LimitExceeded,
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Expired { expired_at } => {
                write!(f, "Intent expired at {}", expired_at.to_rfc3339())
            },
            Self::Forbidden { resource, pattern } => write!(
                f,
                "Resource '{resource}' is forbidden by pattern '{pattern}'"
            ),
            Self::OutOfScope { resource } => {
                write!(f, "Resource '{resource}' not in allowed scope")
            },
            Self::LimitExceeded { limit, ceiling } => {
                write!(f, "Limit '{limit}' exceeded (ceiling {ceiling})")
            },
        }
    }
}

/// Denial classes, for callers that branch on the kind of denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// See [`DenialReason::Expired`].
    Expired,
    /// See [`DenialReason::Forbidden`].
    Forbidden,
    /// See [`DenialReason::OutOfScope`].
    OutOfScope,
    /// See [`DenialReason::LimitExceeded`].
    LimitExceeded,
}

/// Decision for one action.
///
/// Serializes as `{"allowed": bool, "reason": string}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// The action fits the declared intent.
    Allowed,
    /// The action was denied.
    Denied(DenialReason),
}

impl ValidationOutcome {
    /// Whether the action was admitted.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// The denial, if any.
    #[must_use]
    pub fn denial(&self) -> Option<&DenialReason> {
        match self {
            Self::Allowed => None,
            Self::Denied(reason) => Some(reason),
        }
    }

    /// Human-readable reason for either outcome.
    #[must_use]
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allowed => f.write_str(ALLOW_REASON),
            Self::Denied(reason) => reason.fmt(f),
        }
    }
}

impl Serialize for ValidationOutcome {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Wire {
            allowed: bool,
            reason: String,
        }

        Wire {
            allowed: self.is_allowed(),
            reason: self.reason(),
        }
        .serialize(serializer)
    }
}

/// One entry in a session's action history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// The attempted action (e.g. `"read"`).
    pub action: String,
    /// The resource it targeted.
    pub resource: String,
    /// Whether it was admitted.
    pub allowed: bool,
    /// Reason text, as returned to the caller.
    pub reason: String,
    /// Denial class, `None` for admitted actions.
    pub kind: Option<DenialKind>,
    /// When the decision was made.
    pub timestamp: DateTime<Utc>,
}

impl ActionRecord {
    pub(crate) fn new(
        action: &str,
        resource: &str,
        outcome: &ValidationOutcome,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            action: action.to_owned(),
            resource: resource.to_owned(),
            allowed: outcome.is_allowed(),
            reason: outcome.reason(),
            kind: outcome.denial().map(DenialReason::kind),
            timestamp,
        }
    }
}

/// Result of drift detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Whether the session looks like it has drifted from its intent.
    pub drift_detected: bool,
    /// `"Repeated violations detected"` when drift was found.
    pub reason: Option<String>,
    /// Denied actions in the inspected window.
    pub violations: usize,
    /// Number of actions inspected.
    pub inspected: usize,
}

/// Session tallies.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SessionStatistics {
    /// Actions validated so far.
    pub total_actions: usize,
    /// Actions admitted.
    pub allowed: usize,
    /// Actions denied.
    pub blocked: usize,
    /// `blocked / total_actions`, or `0.0` for an empty session.
    pub violation_rate: f64,
}

impl SessionStatistics {
    #[allow(clippy::cast_precision_loss)]
    pub(crate) fn from_tallies(allowed: usize, blocked: usize) -> Self {
        let total_actions = allowed.saturating_add(blocked);
        let violation_rate = if total_actions == 0 {
            0.0
        } else {
            blocked as f64 / total_actions as f64
        };
        Self {
            total_actions,
            allowed,
            blocked,
            violation_rate,
        }
    }
}
