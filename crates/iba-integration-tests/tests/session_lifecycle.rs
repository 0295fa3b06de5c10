//! Session behaviour over time: limits, drift, expiry, snapshots and
//! concurrent callers.

use std::sync::Arc;
use std::thread;

use chrono::Duration;
use iba_intent::{
    DRIFT_REASON, DenialKind, DriftPolicy, IntentError, IntentScope, IntentValidator, LimitRule,
    SessionState, ValidatorConfig, ValidatorSnapshot,
};
use iba_test::{
    healthcare_declaration, limited_declaration, manual_clock, test_declaration, validator_at,
};

#[test]
fn test_limit_exhaustion() {
    let clock = manual_clock();
    let validator = validator_at(limited_declaration(3), &clock);

    for call in 1..=3 {
        assert!(
            validator.validate_action("call", "api:endpoint").is_allowed(),
            "call {call} should be admitted"
        );
    }
    let fourth = validator.validate_action("call", "api:endpoint");
    assert!(!fourth.is_allowed());
    assert!(fourth.reason().contains("exceeded"));

    assert_eq!(validator.remaining("max_api_calls"), Some(0));
    assert_eq!(
        validator.session_state(),
        SessionState::Exhausted {
            limits: vec!["max_api_calls".to_owned()]
        }
    );
}

#[test]
fn test_rules_dispatch_to_named_limits() {
    let clock = manual_clock();
    let scope = IntentScope::new()
        .allow("*")
        .limit("max_api_calls", 10)
        .limit("max_writes", 1);
    let config = ValidatorConfig::default()
        .with_rule(LimitRule::all("max_writes").for_actions(["write"]));
    let validator = IntentValidator::with_clock(test_declaration(scope), config, clock);

    assert!(validator.validate_action("write", "calendar:write").is_allowed());
    assert!(validator.validate_action("read", "calendar:read").is_allowed());

    let second_write = validator.validate_action("write", "calendar:write");
    assert_eq!(
        second_write.denial().map(|d| d.kind()),
        Some(DenialKind::LimitExceeded)
    );

    // The denied write charged nothing.
    assert_eq!(validator.remaining("max_api_calls"), Some(8));
    assert!(validator.validate_action("read", "calendar:read").is_allowed());
}

#[test]
fn test_drift_after_burst_of_denials() {
    let clock = manual_clock();
    let validator = validator_at(healthcare_declaration(), &clock);

    assert!(!validator.detect_drift().drift_detected);
    validator.validate_action("read", "medical_records:a");
    assert!(!validator.detect_drift().drift_detected);

    for _ in 0..4 {
        validator.validate_action("read", "medical_records:a");
    }
    let report = validator.detect_drift();
    assert!(report.drift_detected);
    assert_eq!(report.reason.as_deref(), Some(DRIFT_REASON));
    assert_eq!(report.violations, 5);
}

#[test]
fn test_windowed_drift_forgets_old_denials() {
    let clock = manual_clock();
    let config = ValidatorConfig::default().with_drift(DriftPolicy {
        threshold: 2,
        window: Some(3),
    });
    let validator =
        IntentValidator::with_clock(healthcare_declaration(), config, clock);

    validator.validate_action("read", "medical_records:a");
    validator.validate_action("read", "medical_records:b");
    assert!(validator.detect_drift().drift_detected);

    for _ in 0..3 {
        validator.validate_action("read", "calendar:read");
    }
    let report = validator.detect_drift();
    assert!(!report.drift_detected);
    assert_eq!(report.inspected, 3);
}

#[test]
fn test_expiry_denies_everything() {
    let clock = manual_clock();
    let validator = validator_at(healthcare_declaration(), &clock);
    assert!(validator.validate_action("read", "calendar:read").is_allowed());

    clock.advance(Duration::minutes(61));
    assert_eq!(validator.session_state(), SessionState::Expired);

    let outcome = validator.validate_action("read", "calendar:read");
    assert_eq!(outcome.denial().map(|d| d.kind()), Some(DenialKind::Expired));
    assert!(outcome.reason().contains("expired"));

    // Expiry takes precedence over forbidden.
    let outcome = validator.validate_action("read", "medical_records:x");
    assert_eq!(outcome.denial().map(|d| d.kind()), Some(DenialKind::Expired));
}

#[test]
fn test_snapshot_survives_json_and_resumes() {
    let clock = manual_clock();
    let validator = validator_at(limited_declaration(3), &clock);
    validator.validate_action("call", "api:a");
    validator.validate_action("call", "api:b");

    let json = serde_json::to_string(&validator.snapshot()).unwrap();
    let snapshot: ValidatorSnapshot = serde_json::from_str(&json).unwrap();

    let resumed = IntentValidator::restore(
        limited_declaration(3),
        snapshot,
        ValidatorConfig::default(),
        clock,
    )
    .unwrap();
    assert_eq!(resumed.remaining("max_api_calls"), Some(1));
    assert_eq!(resumed.history().len(), 2);
    assert!(resumed.validate_action("call", "api:c").is_allowed());
    assert!(!resumed.validate_action("call", "api:d").is_allowed());
}

#[test]
fn test_snapshot_rejected_for_other_intent() {
    let clock = manual_clock();
    let validator = validator_at(limited_declaration(3), &clock);
    let snapshot = validator.snapshot();

    let err = IntentValidator::restore(
        limited_declaration(30),
        snapshot,
        ValidatorConfig::default(),
        clock,
    )
    .unwrap_err();
    assert!(matches!(err, IntentError::SnapshotMismatch { .. }));
}

#[test]
fn test_tampered_snapshot_cannot_grant_budget() {
    let clock = manual_clock();
    let validator = validator_at(limited_declaration(2), &clock);
    validator.validate_action("call", "api:a");

    let mut snapshot = validator.snapshot();
    snapshot.allowed = 0;
    snapshot.blocked = 100;
    snapshot
        .counters
        .insert("max_api_calls".to_owned(), u64::MAX);

    let resumed = IntentValidator::restore(
        limited_declaration(2),
        snapshot,
        ValidatorConfig::default(),
        clock,
    )
    .unwrap();
    let stats = resumed.get_statistics();
    assert_eq!((stats.allowed, stats.blocked), (1, 0));
    assert_eq!(resumed.counters().get("max_api_calls"), Some(&3));
    assert!(!resumed.validate_action("call", "api:b").is_allowed());
}

#[test]
fn test_concurrent_callers_never_exceed_ceiling() {
    let clock = manual_clock();
    let validator = Arc::new(validator_at(limited_declaration(50), &clock));

    let handles: Vec<_> = (0..16)
        .map(|worker| {
            let validator = Arc::clone(&validator);
            thread::spawn(move || {
                (0..10)
                    .filter(|i| {
                        validator
                            .validate_action("call", &format!("api:{worker}-{i}"))
                            .is_allowed()
                    })
                    .count()
            })
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(admitted, 50);

    let stats = validator.get_statistics();
    assert_eq!(stats.total_actions, 160);
    assert_eq!(stats.allowed + stats.blocked, stats.total_actions);
    assert_eq!(validator.history().len(), 160);
}
