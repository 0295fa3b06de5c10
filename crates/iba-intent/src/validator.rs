//! Per-session action validation.
//!
//! An [`IntentValidator`] wraps one declaration and gates every action an
//! agent attempts during the session. Each decision is recorded, so drift
//! detection and statistics can be computed from the history at any time.
//!
//! All mutable session state lives behind a single [`RwLock`]. The
//! check-then-charge of limit counters happens under the write lock, so
//! concurrent callers can never push usage past a ceiling.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use iba_config::ValidatorSection;
use iba_crypto::ContentHash;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::declaration::IntentDeclaration;
use crate::drift::DriftPolicy;
use crate::error::{IntentError, IntentResult};
use crate::limits::{LimitRule, applicable_limits};
use crate::outcome::{
    ActionRecord, DenialReason, DriftReport, SessionStatistics, ValidationOutcome,
};

/// Validator policy: drift detection and limit dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorConfig {
    /// When repeated denials count as drift.
    pub drift: DriftPolicy,
    /// Which actions charge which named limits.
    pub limit_rules: Vec<LimitRule>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            drift: DriftPolicy::default(),
            limit_rules: vec![LimitRule::default()],
        }
    }
}

impl ValidatorConfig {
    /// Build from the `[validator]` config section.
    #[must_use]
    pub fn from_section(section: &ValidatorSection) -> Self {
        Self {
            drift: DriftPolicy::from_section(section),
            limit_rules: section.limit_rules.iter().map(LimitRule::from).collect(),
        }
    }

    /// Replace the drift policy.
    #[must_use]
    pub fn with_drift(mut self, drift: DriftPolicy) -> Self {
        self.drift = drift;
        self
    }

    /// Add a limit rule.
    #[must_use]
    pub fn with_rule(mut self, rule: LimitRule) -> Self {
        self.limit_rules.push(rule);
        self
    }
}

/// Where a session stands with respect to further admissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// Actions may still be admitted.
    Active,
    /// The declaration has expired; every action is denied.
    Expired,
    /// These limits have reached their ceilings; actions charging them are
    /// denied.
    Exhausted {
        /// Exhausted limit names.
        limits: Vec<String>,
    },
}

#[derive(Debug, Clone, Default)]
struct Session {
    counters: BTreeMap<String, u64>,
    history: Vec<ActionRecord>,
    allowed: usize,
    blocked: usize,
}

impl Session {
    fn for_declaration(declaration: &IntentDeclaration) -> Self {
        Self {
            counters: declaration
                .scope
                .resource_limits
                .keys()
                .map(|name| (name.clone(), 0))
                .collect(),
            ..Self::default()
        }
    }

    fn record(&mut self, record: ActionRecord) {
        if record.allowed {
            self.allowed = self.allowed.saturating_add(1);
        } else {
            self.blocked = self.blocked.saturating_add(1);
        }
        self.history.push(record);
    }
}

/// Serializable state of a session, for persistence and resumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorSnapshot {
    /// Hash of the declaration the session ran under.
    pub intent_hash: ContentHash,
    /// Limit usage.
    pub counters: BTreeMap<String, u64>,
    /// Every decision made so far.
    pub history: Vec<ActionRecord>,
    /// Admitted actions.
    pub allowed: usize,
    /// Denied actions.
    pub blocked: usize,
    /// When the snapshot was taken.
    pub taken_at: DateTime<Utc>,
}

/// Stateful gate for one intent session.
///
/// Thread-safe via an internal [`RwLock`]; share it with [`Arc`].
///
/// # Example
///
/// ```
/// use iba_intent::{IntentDeclaration, IntentScope, IntentValidator};
///
/// let intent = IntentDeclaration::new(
///     "healthcare-001",
///     "Schedule dentist appointment",
///     "user@example.com",
///     IntentScope::new()
///         .allow("calendar:read")
///         .forbid("medical_records:*")
///         .limit("max_api_calls", 50),
/// )
/// .unwrap();
///
/// let validator = IntentValidator::new(intent);
/// assert!(validator.validate_action("read", "calendar:read").is_allowed());
/// assert!(!validator.validate_action("read", "medical_records:x").is_allowed());
///
/// let stats = validator.get_statistics();
/// assert_eq!((stats.allowed, stats.blocked), (1, 1));
/// ```
pub struct IntentValidator {
    declaration: IntentDeclaration,
    config: ValidatorConfig,
    clock: Arc<dyn Clock>,
    session: RwLock<Session>,
}

impl IntentValidator {
    /// Create a validator with the default policy and the system clock.
    #[must_use]
    pub fn new(declaration: IntentDeclaration) -> Self {
        Self::with_config(declaration, ValidatorConfig::default())
    }

    /// Create a validator with an explicit policy and the system clock.
    #[must_use]
    pub fn with_config(declaration: IntentDeclaration, config: ValidatorConfig) -> Self {
        Self::with_clock(declaration, config, Arc::new(SystemClock))
    }

    /// Create a validator with an explicit policy and clock.
    #[must_use]
    pub fn with_clock(
        declaration: IntentDeclaration,
        config: ValidatorConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        for limit in declaration.scope.resource_limits.keys() {
            if !config.limit_rules.iter().any(|r| &r.limit == limit) {
                debug!(
                    intent_id = %declaration.intent_id,
                    limit = %limit,
                    "limit has no dispatch rule and will not be charged"
                );
            }
        }

        let session = Session::for_declaration(&declaration);
        Self {
            declaration,
            config,
            clock,
            session: RwLock::new(session),
        }
    }

    /// Rebuild a session from a snapshot.
    ///
    /// Tallies are re-derived from the snapshot's history and counters are
    /// clamped to `ceiling + 1`, so a hand-edited snapshot cannot grant extra
    /// budget or break `allowed + blocked == history.len()`.
    ///
    /// # Errors
    ///
    /// Returns [`IntentError::SnapshotMismatch`] if the snapshot was taken
    /// under a declaration with a different hash.
    pub fn restore(
        declaration: IntentDeclaration,
        snapshot: ValidatorSnapshot,
        config: ValidatorConfig,
        clock: Arc<dyn Clock>,
    ) -> IntentResult<Self> {
        let actual = declaration.get_deterministic_hash();
        if !actual.ct_eq(&snapshot.intent_hash) {
            return Err(IntentError::SnapshotMismatch {
                expected: snapshot.intent_hash.to_hex(),
                actual: actual.to_hex(),
            });
        }

        let validator = Self::with_clock(declaration, config, clock);
        {
            let mut session = validator.write_session();
            for (name, ceiling) in &validator.declaration.scope.resource_limits {
                let used = snapshot.counters.get(name).copied().unwrap_or(0);
                session
                    .counters
                    .insert(name.clone(), used.min(ceiling.saturating_add(1)));
            }
            for record in snapshot.history {
                session.record(record);
            }
        }
        Ok(validator)
    }

    fn read_session(&self) -> RwLockReadGuard<'_, Session> {
        self.session.read().unwrap_or_else(|e| {
            warn!("IntentValidator lock poisoned, recovering");
            e.into_inner()
        })
    }

    fn write_session(&self) -> RwLockWriteGuard<'_, Session> {
        self.session.write().unwrap_or_else(|e| {
            warn!("IntentValidator lock poisoned, recovering");
            e.into_inner()
        })
    }

    /// The declaration this session enforces.
    #[must_use]
    pub fn declaration(&self) -> &IntentDeclaration {
        &self.declaration
    }

    /// The active policy.
    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Decide whether `action` on `resource` fits the declared intent.
    ///
    /// Denial is a normal outcome, never an error. Every call appends one
    /// record to the history.
    pub fn validate_action(&self, action: &str, resource: &str) -> ValidationOutcome {
        let mut session = self.write_session();
        // Read under the lock so history timestamps follow append order.
        let now = self.clock.now();

        let outcome = self.decide(&mut session, action, resource, now);
        session.record(ActionRecord::new(action, resource, &outcome, now));
        drop(session);

        match &outcome {
            ValidationOutcome::Allowed => trace!(
                intent_id = %self.declaration.intent_id,
                action,
                resource,
                "action allowed"
            ),
            ValidationOutcome::Denied(reason) => debug!(
                intent_id = %self.declaration.intent_id,
                action,
                resource,
                reason = %reason,
                "action denied"
            ),
        }
        outcome
    }

    /// Admission in priority order: expiration, forbidden, out of scope,
    /// limits. Must be called with the write lock held.
    fn decide(
        &self,
        session: &mut Session,
        action: &str,
        resource: &str,
        now: DateTime<Utc>,
    ) -> ValidationOutcome {
        let scope = &self.declaration.scope;

        if self.declaration.is_expired_at(now) {
            return ValidationOutcome::Denied(DenialReason::Expired {
                expired_at: self.declaration.expiration,
            });
        }

        if let Some(pattern) = scope.forbidden_match(resource) {
            return ValidationOutcome::Denied(DenialReason::Forbidden {
                resource: resource.to_owned(),
                pattern: pattern.to_string(),
            });
        }

        if !scope.is_allowed(resource) {
            return ValidationOutcome::Denied(DenialReason::OutOfScope {
                resource: resource.to_owned(),
            });
        }

        let charged: Vec<(&str, u64)> =
            applicable_limits(&self.config.limit_rules, action, resource)
                .into_iter()
                .filter_map(|name| scope.ceiling(name).map(|ceiling| (name, ceiling)))
                .collect();

        let mut exceeded: Option<DenialReason> = None;
        for &(name, ceiling) in &charged {
            let used = session.counters.get(name).copied().unwrap_or(0);
            if used >= ceiling {
                // Saturate one past the ceiling; repeated attempts stay there.
                session
                    .counters
                    .insert(name.to_owned(), ceiling.saturating_add(1));
                exceeded.get_or_insert_with(|| DenialReason::LimitExceeded {
                    limit: name.to_owned(),
                    ceiling,
                });
            }
        }
        if let Some(reason) = exceeded {
            return ValidationOutcome::Denied(reason);
        }

        for (name, _) in charged {
            let counter = session.counters.entry(name.to_owned()).or_insert(0);
            *counter = counter.saturating_add(1);
        }
        ValidationOutcome::Allowed
    }

    /// Fail-closed form of [`validate_action`](Self::validate_action).
    ///
    /// # Errors
    ///
    /// Returns [`IntentError::Violation`] carrying the same denial
    /// `validate_action` would have returned.
    pub fn enforce(&self, action: &str, resource: &str) -> IntentResult<()> {
        match self.validate_action(action, resource) {
            ValidationOutcome::Allowed => Ok(()),
            ValidationOutcome::Denied(reason) => Err(IntentError::Violation {
                action: action.to_owned(),
                resource: resource.to_owned(),
                reason,
            }),
        }
    }

    /// Check the history for repeated violations.
    #[must_use]
    pub fn detect_drift(&self) -> DriftReport {
        let report = self.config.drift.evaluate(&self.read_session().history);
        if report.drift_detected {
            warn!(
                intent_id = %self.declaration.intent_id,
                violations = report.violations,
                inspected = report.inspected,
                "intent drift detected"
            );
        }
        report
    }

    /// Session tallies.
    #[must_use]
    pub fn get_statistics(&self) -> SessionStatistics {
        let session = self.read_session();
        SessionStatistics::from_tallies(session.allowed, session.blocked)
    }

    /// Whether further actions can be admitted.
    #[must_use]
    pub fn session_state(&self) -> SessionState {
        if self.declaration.is_expired_at(self.clock.now()) {
            return SessionState::Expired;
        }

        let session = self.read_session();
        let limits: Vec<String> = self
            .declaration
            .scope
            .resource_limits
            .iter()
            .filter(|(name, ceiling)| {
                session.counters.get(*name).copied().unwrap_or(0) >= **ceiling
            })
            .map(|(name, _)| name.clone())
            .collect();

        if limits.is_empty() {
            SessionState::Active
        } else {
            SessionState::Exhausted { limits }
        }
    }

    /// Current limit usage.
    #[must_use]
    pub fn counters(&self) -> BTreeMap<String, u64> {
        self.read_session().counters.clone()
    }

    /// Charges left on a named limit, or `None` if the scope sets no such
    /// limit.
    #[must_use]
    pub fn remaining(&self, limit: &str) -> Option<u64> {
        let ceiling = self.declaration.scope.ceiling(limit)?;
        let used = self.read_session().counters.get(limit).copied().unwrap_or(0);
        Some(ceiling.saturating_sub(used))
    }

    /// Every decision made so far, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<ActionRecord> {
        self.read_session().history.clone()
    }

    /// Capture the session for later [`restore`](Self::restore).
    #[must_use]
    pub fn snapshot(&self) -> ValidatorSnapshot {
        let session = self.read_session();
        ValidatorSnapshot {
            intent_hash: self.declaration.get_deterministic_hash(),
            counters: session.counters.clone(),
            history: session.history.clone(),
            allowed: session.allowed,
            blocked: session.blocked,
            taken_at: self.clock.now(),
        }
    }
}

impl fmt::Debug for IntentValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.get_statistics();
        f.debug_struct("IntentValidator")
            .field("intent_id", &self.declaration.intent_id)
            .field("config", &self.config)
            .field("total_actions", &stats.total_actions)
            .field("blocked", &stats.blocked)
            .finish_non_exhaustive()
    }
}
