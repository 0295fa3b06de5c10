//! Configuration types.
//!
//! Every struct implements [`Default`] with the same values as the embedded
//! `defaults.toml`, so a bare `[section]` header produces a working config.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Defaults applied when declarations are built.
    pub intent: IntentSection,
    /// Session validator policy.
    pub validator: ValidatorSection,
    /// Binding algorithm and key material.
    pub binder: BinderSection,
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
}

/// Declaration defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentSection {
    /// Validity window applied when a declaration has no explicit expiration.
    pub default_ttl_secs: u64,
}

impl Default for IntentSection {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
        }
    }
}

impl IntentSection {
    /// The default validity window as a [`std::time::Duration`].
    #[must_use]
    pub fn default_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.default_ttl_secs)
    }
}

/// Drift detection and limit dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorSection {
    /// Number of denied actions that counts as drift.
    pub drift_threshold: usize,
    /// Only the most recent `drift_window` actions are inspected. `0` means
    /// the whole session.
    pub drift_window: usize,
    /// Which actions and resources count against which named limit.
    pub limit_rules: Vec<LimitRuleSection>,
}

impl Default for ValidatorSection {
    fn default() -> Self {
        Self {
            drift_threshold: 3,
            drift_window: 0,
            limit_rules: vec![LimitRuleSection::default()],
        }
    }
}

/// Maps a class of actions/resources to a named limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitRuleSection {
    /// Limit name as it appears in a scope's `resource_limits`.
    pub limit: String,
    /// Action names this rule counts. Empty matches every action.
    pub actions: Vec<String>,
    /// Resource patterns this rule counts. Empty matches every resource.
    pub resources: Vec<String>,
}

impl Default for LimitRuleSection {
    fn default() -> Self {
        Self {
            limit: "max_api_calls".to_owned(),
            actions: Vec::new(),
            resources: Vec::new(),
        }
    }
}

/// Binding algorithm and where its key material lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinderSection {
    /// `"hmac-sha256"` (shared secret) or `"ed25519"` (asymmetric).
    pub algorithm: String,
    /// Identifier recorded in issued tokens for the active key.
    pub key_id: String,
    /// File holding the HMAC secret. Created on first use.
    pub secret_path: Option<String>,
    /// File holding the Ed25519 secret seed. Created on first use.
    pub signing_key_path: Option<String>,
    /// Hex-encoded Ed25519 public keys accepted when verifying.
    pub trusted_keys: Vec<String>,
}

impl Default for BinderSection {
    fn default() -> Self {
        Self {
            algorithm: "hmac-sha256".to_owned(),
            key_id: "default".to_owned(),
            secret_path: None,
            signing_key_path: None,
            trusted_keys: Vec::new(),
        }
    }
}

/// Logging output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global level filter (`"trace"` .. `"error"`).
    pub level: String,
    /// `"pretty"`, `"compact"`, `"json"`, or `"full"`.
    pub format: String,
    /// Per-crate directives (e.g. `["iba_intent=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
