//! Shared-secret binder.
//!
//! [`SimpleIntentBinder`] signs with HMAC-SHA256. Anyone who can verify its
//! tokens holds the same secret and could mint them too, so it suits a
//! single trust domain. Use [`SignedIntentBinder`](crate::SignedIntentBinder)
//! when verifiers must not be able to sign.

use std::path::Path;
use std::sync::Arc;

use chrono::SubsecRound;
use iba_config::BinderSection;
use iba_crypto::{HmacKey, MacTag};
use iba_intent::{Clock, IntentDeclaration, SystemClock};

use crate::binder::{BindingVerifier, IntentBinder, check_principal, log_bound, verify_with};
use crate::error::{BinderError, BinderResult};
use crate::keys::HmacKeyring;
use crate::token::{BindingAlgorithm, BindingToken, signing_data};

/// Key id used when none is configured.
pub const DEFAULT_KEY_ID: &str = "default";

/// HMAC-SHA256 intent binder.
///
/// # Example
///
/// ```
/// use iba_binder::{BindingVerifier, IntentBinder, SimpleIntentBinder};
/// use iba_intent::{IntentDeclaration, IntentScope};
///
/// let mut intent = IntentDeclaration::new(
///     "test-012",
///     "Original purpose",
///     "user@test.com",
///     IntentScope::new().allow("test:read"),
/// )
/// .unwrap();
///
/// let binder = SimpleIntentBinder::generate();
/// let token = binder.bind_intent(&intent, "user@test.com").unwrap();
/// assert!(binder.verify_intent(&token, &intent));
///
/// intent.declared_purpose = "TAMPERED purpose".to_owned();
/// assert!(!binder.verify_intent(&token, &intent));
/// ```
#[derive(Debug, Clone)]
pub struct SimpleIntentBinder {
    keyring: HmacKeyring,
    clock: Arc<dyn Clock>,
}

impl SimpleIntentBinder {
    /// A binder with a fresh random secret under [`DEFAULT_KEY_ID`].
    ///
    /// Tokens it issues can only be verified by this instance.
    #[must_use]
    pub fn generate() -> Self {
        Self::with_keyring(HmacKeyring::generate(DEFAULT_KEY_ID))
    }

    /// A binder signing with `key` under `key_id`.
    #[must_use]
    pub fn new(key_id: impl Into<String>, key: HmacKey) -> Self {
        Self::with_keyring(HmacKeyring::new(key_id, key))
    }

    /// A binder over an existing keyring.
    #[must_use]
    pub fn with_keyring(keyring: HmacKeyring) -> Self {
        Self {
            keyring,
            clock: Arc::new(SystemClock),
        }
    }

    /// A binder whose secret lives at `path`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::Crypto`] if the key file cannot be read or
    /// created.
    pub fn from_key_file(key_id: impl Into<String>, path: impl AsRef<Path>) -> BinderResult<Self> {
        Ok(Self::new(key_id, HmacKey::load_or_generate(path)?))
    }

    /// Build from the `[binder]` config section.
    ///
    /// Without `secret_path` the secret is ephemeral and tokens will not
    /// verify after a restart.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::Config`] if the section selects another
    /// algorithm, and [`BinderError::Crypto`] if the secret cannot be loaded.
    pub fn from_section(section: &BinderSection) -> BinderResult<Self> {
        if section.algorithm != "hmac-sha256" {
            return Err(BinderError::Config(format!(
                "section selects '{}', not hmac-sha256",
                section.algorithm
            )));
        }
        match &section.secret_path {
            Some(path) => Self::from_key_file(section.key_id.clone(), path),
            None => {
                tracing::info!(
                    key_id = %section.key_id,
                    "no secret_path configured, using an ephemeral HMAC secret"
                );
                Ok(Self::new(section.key_id.clone(), HmacKey::generate()))
            },
        }
    }

    /// Use `clock` for `bound_at`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The keyring.
    #[must_use]
    pub fn keyring(&self) -> &HmacKeyring {
        &self.keyring
    }

    /// Mutable access for rotation and retirement.
    pub fn keyring_mut(&mut self) -> &mut HmacKeyring {
        &mut self.keyring
    }

    /// Shorthand for rotating the keyring to a new active key.
    pub fn rotate(&mut self, key_id: impl Into<String>, key: HmacKey) {
        self.keyring.rotate(key_id, key);
    }
}

impl Default for SimpleIntentBinder {
    fn default() -> Self {
        Self::generate()
    }
}

impl BindingVerifier for SimpleIntentBinder {
    fn verify_intent(&self, token: &BindingToken, declaration: &IntentDeclaration) -> bool {
        verify_with(token, declaration, BindingAlgorithm::HmacSha256, |data| {
            let Some(key) = self.keyring.get(&token.key_id) else {
                tracing::debug!(key_id = %token.key_id, "token signed with unknown key");
                return false;
            };
            MacTag::try_from_slice(&token.signature)
                .and_then(|tag| key.verify(data, &tag))
                .is_ok()
        })
    }
}

impl IntentBinder for SimpleIntentBinder {
    fn algorithm(&self) -> BindingAlgorithm {
        BindingAlgorithm::HmacSha256
    }

    fn bind_intent(
        &self,
        declaration: &IntentDeclaration,
        principal: &str,
    ) -> BinderResult<BindingToken> {
        check_principal(principal)?;
        let (key_id, key) = self.keyring.active()?;

        let intent_hash = declaration.get_deterministic_hash();
        let bound_at = self.clock.now().trunc_subsecs(0);
        let data = signing_data(
            BindingAlgorithm::HmacSha256,
            &intent_hash,
            principal,
            bound_at,
            key_id,
        );
        let tag = key.sign(&data)?;

        let token = BindingToken {
            intent_hash,
            algorithm: BindingAlgorithm::HmacSha256,
            signature: tag.as_bytes().to_vec(),
            bound_by: principal.to_owned(),
            bound_at,
            key_id: key_id.to_owned(),
        };
        log_bound(&token, declaration);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use iba_intent::{IntentScope, ManualClock};

    fn intent() -> IntentDeclaration {
        IntentDeclaration::new(
            "test-011",
            "Test binding",
            "user@test.com",
            IntentScope::new().allow("test:read"),
        )
        .unwrap()
    }

    #[test]
    fn test_bind_and_verify() {
        let binder = SimpleIntentBinder::default();
        let intent = intent();
        let token = binder.bind_intent(&intent, "user@test.com").unwrap();

        assert_eq!(token.intent_hash, intent.get_deterministic_hash());
        assert_eq!(token.algorithm.as_str(), "HMAC-SHA256");
        assert_eq!(token.key_id, DEFAULT_KEY_ID);
        assert!(binder.verify_intent(&token, &intent));
    }

    #[test]
    fn test_detect_tampering() {
        let binder = SimpleIntentBinder::generate();
        let mut intent = intent();
        let token = binder.bind_intent(&intent, "user@test.com").unwrap();

        intent.declared_purpose = "TAMPERED purpose".to_owned();
        assert!(!binder.verify_intent(&token, &intent));
    }

    #[test]
    fn test_bound_at_uses_clock() {
        let at = Utc.with_ymd_and_hms(2026, 7, 4, 15, 0, 0).unwrap();
        let binder = SimpleIntentBinder::generate().with_clock(Arc::new(ManualClock::new(at)));
        let token = binder.bind_intent(&intent(), "agent-7").unwrap();
        assert_eq!(token.bound_at, at);
        assert_eq!(token.bound_by, "agent-7");
    }

    #[test]
    fn test_bound_at_truncated_to_seconds() {
        let at = Utc.with_ymd_and_hms(2026, 7, 4, 15, 0, 0).unwrap();
        let clock = Arc::new(ManualClock::new(at + chrono::Duration::milliseconds(640)));
        let binder = SimpleIntentBinder::generate().with_clock(clock);
        let intent = intent();
        let mut token = binder.bind_intent(&intent, "agent-7").unwrap();
        assert_eq!(token.bound_at, at);

        token.bound_at += chrono::Duration::milliseconds(500);
        assert!(!binder.verify_intent(&token, &intent));
    }

    #[test]
    fn test_forged_token_fields_rejected() {
        let binder = SimpleIntentBinder::generate();
        let intent = intent();
        let token = binder.bind_intent(&intent, "user@test.com").unwrap();

        let mut forged = token.clone();
        forged.bound_by = "admin@test.com".to_owned();
        assert!(!binder.verify_intent(&forged, &intent));

        let mut forged = token.clone();
        forged.signature[0] ^= 0x01;
        assert!(!binder.verify_intent(&forged, &intent));

        let mut forged = token;
        forged.signature.truncate(10);
        assert!(!binder.verify_intent(&forged, &intent));
    }

    #[test]
    fn test_other_secret_rejects() {
        let intent = intent();
        let token = SimpleIntentBinder::generate()
            .bind_intent(&intent, "user@test.com")
            .unwrap();
        assert!(!SimpleIntentBinder::generate().verify_intent(&token, &intent));
    }

    #[test]
    fn test_rotation_keeps_old_tokens_valid_until_retired() {
        let mut binder = SimpleIntentBinder::new("k1", HmacKey::generate());
        let intent = intent();
        let old = binder.bind_intent(&intent, "user@test.com").unwrap();

        binder.rotate("k2", HmacKey::generate());
        let new = binder.bind_intent(&intent, "user@test.com").unwrap();
        assert_eq!(new.key_id, "k2");
        assert!(binder.verify_intent(&old, &intent));
        assert!(binder.verify_intent(&new, &intent));

        binder.keyring_mut().retire("k1").unwrap();
        assert!(!binder.verify_intent(&old, &intent));
        assert!(binder.verify_intent(&new, &intent));
    }

    #[test]
    fn test_empty_principal_rejected() {
        let result = SimpleIntentBinder::generate().bind_intent(&intent(), "");
        assert!(matches!(result, Err(BinderError::InvalidPrincipal)));
    }

    #[test]
    fn test_from_section_with_secret_file() {
        let dir = tempfile::tempdir().unwrap();
        let section = BinderSection {
            key_id: "ops".to_owned(),
            secret_path: Some(dir.path().join("hmac.key").display().to_string()),
            ..BinderSection::default()
        };

        let first = SimpleIntentBinder::from_section(&section).unwrap();
        let intent = intent();
        let token = first.bind_intent(&intent, "user@test.com").unwrap();
        assert_eq!(token.key_id, "ops");

        // A second binder over the same file shares the secret.
        let second = SimpleIntentBinder::from_section(&section).unwrap();
        assert!(second.verify_intent(&token, &intent));
    }

    #[test]
    fn test_from_section_rejects_other_algorithm() {
        let section = BinderSection {
            algorithm: "ed25519".to_owned(),
            ..BinderSection::default()
        };
        assert!(matches!(
            SimpleIntentBinder::from_section(&section),
            Err(BinderError::Config(_))
        ));
    }
}
