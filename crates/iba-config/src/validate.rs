//! Post-merge configuration validation.
//!
//! Validates that deserialized [`Config`](crate::Config) values are within
//! acceptable ranges before any crate builds runtime objects from them.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Binding algorithms the binder crate knows how to construct.
pub const SUPPORTED_ALGORITHMS: &[&str] = &["hmac-sha256", "ed25519"];

/// Log output formats the telemetry crate accepts.
pub const SUPPORTED_LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_intent(config)?;
    validate_validator(config)?;
    validate_binder(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate_intent(config: &Config) -> ConfigResult<()> {
    if config.intent.default_ttl_secs == 0 {
        return Err(invalid(
            "intent.default_ttl_secs",
            "default_ttl_secs must be at least 1",
        ));
    }
    // Must fit in a signed chrono duration.
    if i64::try_from(config.intent.default_ttl_secs).is_err() {
        return Err(invalid(
            "intent.default_ttl_secs",
            "default_ttl_secs is too large",
        ));
    }
    Ok(())
}

fn validate_validator(config: &Config) -> ConfigResult<()> {
    let v = &config.validator;

    if v.drift_threshold == 0 {
        return Err(invalid(
            "validator.drift_threshold",
            "drift_threshold must be at least 1",
        ));
    }

    if v.drift_window != 0 && v.drift_window < v.drift_threshold {
        return Err(invalid(
            "validator.drift_window",
            format!(
                "drift_window {} can never contain {} violations; use 0 for the whole session",
                v.drift_window, v.drift_threshold
            ),
        ));
    }

    for (i, rule) in v.limit_rules.iter().enumerate() {
        if rule.limit.trim().is_empty() {
            return Err(invalid(
                format!("validator.limit_rules[{i}].limit"),
                "limit name must not be empty",
            ));
        }
        if rule.resources.iter().any(|r| r.is_empty()) {
            return Err(invalid(
                format!("validator.limit_rules[{i}].resources"),
                "resource patterns must not be empty",
            ));
        }
    }

    Ok(())
}

fn validate_binder(config: &Config) -> ConfigResult<()> {
    let b = &config.binder;

    if !SUPPORTED_ALGORITHMS.contains(&b.algorithm.as_str()) {
        return Err(invalid(
            "binder.algorithm",
            format!(
                "unsupported algorithm '{}'; expected one of: {}",
                b.algorithm,
                SUPPORTED_ALGORITHMS.join(", ")
            ),
        ));
    }

    if b.key_id.trim().is_empty() {
        return Err(invalid("binder.key_id", "key_id must not be empty"));
    }

    for (i, key) in b.trusted_keys.iter().enumerate() {
        if key.len() != 64 || !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid(
                format!("binder.trusted_keys[{i}]"),
                "trusted keys must be 32-byte Ed25519 public keys in hex",
            ));
        }
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if l.level.trim().is_empty() {
        return Err(invalid("logging.level", "level must not be empty"));
    }

    if !SUPPORTED_LOG_FORMATS.contains(&l.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: {}",
                l.format,
                SUPPORTED_LOG_FORMATS.join(", ")
            ),
        ));
    }

    Ok(())
}
