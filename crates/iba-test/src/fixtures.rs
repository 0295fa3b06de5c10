//! Test fixtures for common types.

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use iba_intent::{
    API_CALLS_LIMIT, IntentDeclaration, IntentScope, IntentValidator, ManualClock,
    ValidatorConfig,
};

/// Fixed instant every fixture declaration is issued at: 2025-01-15 09:00 UTC.
///
/// # Panics
///
/// Never; the instant is a valid calendar time.
#[must_use]
pub fn fixed_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0)
        .single()
        .expect("fixture instant is unambiguous")
}

/// A manual clock starting at [`fixed_instant`].
#[must_use]
pub fn manual_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(fixed_instant()))
}

/// Scope of the dentist-booking assistant.
///
/// Allows calendar, healthcare search and booking; forbids medical records,
/// insurance and payment changes; caps API calls at 50.
#[must_use]
pub fn healthcare_scope() -> IntentScope {
    IntentScope::new()
        .allow("calendar:read")
        .allow("calendar:write")
        .allow("healthcare:search")
        .allow("booking:create")
        .forbid("medical_records:*")
        .forbid("insurance:*")
        .forbid("payment:modify")
        .limit(API_CALLS_LIMIT, 50)
}

/// A declaration over `scope`, issued at [`fixed_instant`] for one hour.
///
/// # Panics
///
/// Panics if `scope` carries a zero ceiling.
#[must_use]
pub fn test_declaration(scope: IntentScope) -> IntentDeclaration {
    IntentDeclaration::builder(
        "test-intent-001",
        "Integration test intent",
        "tester@example.com",
    )
    .scope(scope)
    .timestamp(fixed_instant())
    .build()
    .expect("fixture declaration is valid")
}

/// The healthcare declaration, issued at [`fixed_instant`] for one hour.
///
/// # Panics
///
/// Never; the fixture is valid.
#[must_use]
pub fn healthcare_declaration() -> IntentDeclaration {
    IntentDeclaration::builder(
        "healthcare-001",
        "Schedule dentist appointment for next Tuesday",
        "user@example.com",
    )
    .scope(healthcare_scope())
    .timestamp(fixed_instant())
    .build()
    .expect("fixture declaration is valid")
}

/// An allow-all declaration with `max_api_calls` capped at `ceiling`.
///
/// # Panics
///
/// Panics if `ceiling` is zero.
#[must_use]
pub fn limited_declaration(ceiling: u64) -> IntentDeclaration {
    test_declaration(IntentScope::new().allow("*").limit(API_CALLS_LIMIT, ceiling))
}

/// A validator with the default policy reading time from `clock`.
#[must_use]
pub fn validator_at(declaration: IntentDeclaration, clock: &Arc<ManualClock>) -> IntentValidator {
    IntentValidator::with_clock(declaration, ValidatorConfig::default(), clock.clone())
}
