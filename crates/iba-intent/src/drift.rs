//! Drift detection policy.
//!
//! Drift is inferred from repeated denials: once the number of blocked
//! actions in the inspected window reaches the threshold, the session is
//! considered to be acting outside its declared purpose.

use iba_config::ValidatorSection;
use serde::{Deserialize, Serialize};

use crate::outcome::{ActionRecord, DRIFT_REASON, DriftReport};

/// Default number of denials that counts as drift.
pub const DEFAULT_DRIFT_THRESHOLD: usize = 3;

/// How many denials, over how much history, count as drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftPolicy {
    /// Denials needed to report drift. Values below 1 are treated as 1.
    pub threshold: usize,
    /// Only the most recent `window` actions are inspected. `None` inspects
    /// the whole session.
    pub window: Option<usize>,
}

impl Default for DriftPolicy {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DRIFT_THRESHOLD,
            window: None,
        }
    }
}

impl DriftPolicy {
    /// Build from the `[validator]` config section. A window of `0` means the
    /// whole session.
    #[must_use]
    pub fn from_section(section: &ValidatorSection) -> Self {
        Self {
            threshold: section.drift_threshold,
            window: (section.drift_window > 0).then_some(section.drift_window),
        }
    }

    /// Evaluate this policy over `history`.
    #[must_use]
    pub fn evaluate(&self, history: &[ActionRecord]) -> DriftReport {
        let start = self
            .window
            .map_or(0, |w| history.len().saturating_sub(w));
        let inspected = history.get(start..).unwrap_or_default();
        let violations = inspected.iter().filter(|r| !r.allowed).count();
        let drift_detected = violations >= self.threshold.max(1);

        DriftReport {
            drift_detected,
            reason: drift_detected.then(|| DRIFT_REASON.to_owned()),
            violations,
            inspected: inspected.len(),
        }
    }
}
