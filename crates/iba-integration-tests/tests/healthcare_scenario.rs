//! End-to-end run of the dentist-booking assistant.
//!
//! The assistant may read and write the calendar, search providers and
//! create bookings. It must never touch medical records, insurance or
//! payment details.

use iba_binder::{BindingVerifier, IntentBinder, SimpleIntentBinder};
use iba_intent::{DenialKind, IntentScope};
use iba_test::{
    healthcare_declaration, manual_clock, setup_test_logging_default, test_declaration,
    validator_at,
};

#[test]
fn test_healthcare_session() {
    setup_test_logging_default();
    let clock = manual_clock();
    let intent = healthcare_declaration();

    let binder = SimpleIntentBinder::generate().with_clock(clock.clone());
    let token = binder.bind_intent(&intent, "user@example.com").unwrap();
    assert!(binder.verify_intent(&token, &intent));

    let validator = validator_at(intent, &clock);

    for (action, resource) in [
        ("search", "healthcare:search"),
        ("read", "calendar:read"),
        ("create", "booking:create"),
    ] {
        let outcome = validator.validate_action(action, resource);
        assert!(outcome.is_allowed(), "{action} {resource}: {}", outcome.reason());
    }

    for (action, resource) in [
        ("read", "medical_records:patient_history"),
        ("modify", "insurance:plan"),
        ("modify", "payment:credit_card"),
    ] {
        let outcome = validator.validate_action(action, resource);
        assert!(!outcome.is_allowed(), "{action} {resource} was admitted");
    }

    let stats = validator.get_statistics();
    assert_eq!(stats.total_actions, 6);
    assert_eq!(stats.allowed, 3);
    assert_eq!(stats.blocked, 3);
    assert!((stats.violation_rate - 0.5).abs() < f64::EPSILON);

    // Three blocked actions meet the default threshold.
    assert!(validator.detect_drift().drift_detected);
    assert_eq!(validator.remaining("max_api_calls"), Some(47));
}

#[test]
fn test_denial_kinds_are_distinguishable() {
    let clock = manual_clock();
    let validator = validator_at(healthcare_declaration(), &clock);

    let forbidden = validator.validate_action("read", "medical_records:patient_history");
    assert_eq!(forbidden.denial().map(|d| d.kind()), Some(DenialKind::Forbidden));
    assert!(forbidden.reason().contains("forbidden"));

    // payment:credit_card is neither allowed nor matched by payment:modify.
    let out_of_scope = validator.validate_action("modify", "payment:credit_card");
    assert_eq!(
        out_of_scope.denial().map(|d| d.kind()),
        Some(DenialKind::OutOfScope)
    );
    assert!(out_of_scope.reason().contains("not in allowed scope"));

    let kinds: Vec<_> = validator.history().iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![Some(DenialKind::Forbidden), Some(DenialKind::OutOfScope)]
    );
}

#[test]
fn test_forbidden_overrides_allow_all() {
    let clock = manual_clock();
    let scope = IntentScope::new().allow("*").forbid("medical_records:*");
    assert!(scope.is_allowed("medical_records:x"));
    assert!(!scope.permits("medical_records:x"));

    let validator = validator_at(test_declaration(scope), &clock);
    assert!(validator.validate_action("read", "calendar:read").is_allowed());
    let outcome = validator.validate_action("read", "medical_records:x");
    assert_eq!(outcome.denial().map(|d| d.kind()), Some(DenialKind::Forbidden));
}

#[test]
fn test_strict_enforcement_matches_outcome() {
    let clock = manual_clock();
    let validator = validator_at(healthcare_declaration(), &clock);

    assert!(validator.enforce("read", "calendar:read").is_ok());
    let err = validator.enforce("modify", "insurance:plan").unwrap_err();
    assert!(err.to_string().contains("insurance:plan"));

    let last = validator.history().pop().unwrap();
    assert!(!last.allowed);
    assert!(err.to_string().contains(&last.reason));
}
