//! Asymmetric binder and verify-only counterpart.
//!
//! [`SignedIntentBinder`] signs with an Ed25519 key pair. Tokens carry the
//! signer's key id, so any party holding the public key can verify them
//! with an [`IntentVerifier`] and cannot forge new ones.

use std::path::Path;
use std::sync::Arc;

use chrono::SubsecRound;
use iba_config::BinderSection;
use iba_crypto::{KeyId, KeyPair, PublicKey, Signature, SignatureVerifier};
use iba_intent::{Clock, IntentDeclaration, SystemClock};

use crate::binder::{BindingVerifier, IntentBinder, check_principal, log_bound, verify_with};
use crate::error::{BinderError, BinderResult};
use crate::token::{BindingAlgorithm, BindingToken, signing_data};

fn parse_key_id(key_id: &str) -> Option<KeyId> {
    hex::decode(key_id).ok()?.try_into().ok()
}

fn trusted_from_section(section: &BinderSection) -> BinderResult<SignatureVerifier> {
    let mut verifier = SignatureVerifier::new();
    for key in &section.trusted_keys {
        verifier.add_trusted_key(PublicKey::from_hex(key)?);
    }
    Ok(verifier)
}

fn verify_ed25519(
    trusted: &SignatureVerifier,
    token: &BindingToken,
    declaration: &IntentDeclaration,
) -> bool {
    verify_with(token, declaration, BindingAlgorithm::Ed25519, |data| {
        let Some(key_id) = parse_key_id(&token.key_id) else {
            tracing::debug!(key_id = %token.key_id, "malformed Ed25519 key id");
            return false;
        };
        Signature::try_from_slice(&token.signature)
            .and_then(|sig| trusted.verify(&key_id, data, &sig))
            .is_ok()
    })
}

/// Ed25519 intent binder.
///
/// Verifies tokens from its own key and from any additionally trusted
/// public keys.
#[derive(Debug)]
pub struct SignedIntentBinder {
    keypair: KeyPair,
    trusted: SignatureVerifier,
    clock: Arc<dyn Clock>,
}

impl SignedIntentBinder {
    /// A binder with a freshly generated key pair.
    #[must_use]
    pub fn generate() -> Self {
        Self::new(KeyPair::generate())
    }

    /// A binder signing with `keypair`.
    #[must_use]
    pub fn new(keypair: KeyPair) -> Self {
        let mut trusted = SignatureVerifier::new();
        trusted.add_trusted_key(keypair.export_public_key());
        Self {
            keypair,
            trusted,
            clock: Arc::new(SystemClock),
        }
    }

    /// A binder whose secret key lives at `path`, created on first use.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::Crypto`] if the key file cannot be read or
    /// created.
    pub fn from_key_file(path: impl AsRef<Path>) -> BinderResult<Self> {
        Ok(Self::new(KeyPair::load_or_generate(path)?))
    }

    /// Build from the `[binder]` config section.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::Config`] if the section selects another
    /// algorithm, and [`BinderError::Crypto`] for unreadable key files or
    /// malformed trusted keys.
    pub fn from_section(section: &BinderSection) -> BinderResult<Self> {
        if section.algorithm != "ed25519" {
            return Err(BinderError::Config(format!(
                "section selects '{}', not ed25519",
                section.algorithm
            )));
        }
        let mut binder = match &section.signing_key_path {
            Some(path) => Self::from_key_file(path)?,
            None => {
                tracing::info!("no signing_key_path configured, using an ephemeral Ed25519 key");
                Self::generate()
            },
        };
        for key in &section.trusted_keys {
            binder.trust(PublicKey::from_hex(key)?);
        }
        Ok(binder)
    }

    /// Use `clock` for `bound_at`.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Also accept tokens signed by `key`.
    pub fn trust(&mut self, key: PublicKey) -> KeyId {
        self.trusted.add_trusted_key(key)
    }

    /// The public half of the signing key, for distribution to verifiers.
    #[must_use]
    pub fn public_key(&self) -> PublicKey {
        self.keypair.export_public_key()
    }

    /// A verify-only counterpart trusting the same keys.
    #[must_use]
    pub fn verifier(&self) -> IntentVerifier {
        IntentVerifier {
            trusted: self.trusted.clone(),
        }
    }
}

impl BindingVerifier for SignedIntentBinder {
    fn verify_intent(&self, token: &BindingToken, declaration: &IntentDeclaration) -> bool {
        verify_ed25519(&self.trusted, token, declaration)
    }
}

impl IntentBinder for SignedIntentBinder {
    fn algorithm(&self) -> BindingAlgorithm {
        BindingAlgorithm::Ed25519
    }

    fn bind_intent(
        &self,
        declaration: &IntentDeclaration,
        principal: &str,
    ) -> BinderResult<BindingToken> {
        check_principal(principal)?;

        let intent_hash = declaration.get_deterministic_hash();
        let bound_at = self.clock.now().trunc_subsecs(0);
        let key_id = self.keypair.key_id_hex();
        let data = signing_data(
            BindingAlgorithm::Ed25519,
            &intent_hash,
            principal,
            bound_at,
            &key_id,
        );
        let signature = self.keypair.sign(&data);

        let token = BindingToken {
            intent_hash,
            algorithm: BindingAlgorithm::Ed25519,
            signature: signature.as_bytes().to_vec(),
            bound_by: principal.to_owned(),
            bound_at,
            key_id,
        };
        log_bound(&token, declaration);
        Ok(token)
    }
}

/// Verifies Ed25519 binding tokens with public keys only.
///
/// ```
/// use iba_binder::{BindingVerifier, IntentBinder, IntentVerifier, SignedIntentBinder};
/// use iba_intent::{IntentDeclaration, IntentScope};
///
/// let intent = IntentDeclaration::new(
///     "payroll-9",
///     "Export March payslips",
///     "hr@example.com",
///     IntentScope::new().allow("payroll:read"),
/// )
/// .unwrap();
///
/// let issuer = SignedIntentBinder::generate();
/// let token = issuer.bind_intent(&intent, "hr@example.com").unwrap();
///
/// let mut verifier = IntentVerifier::new();
/// verifier.trust(issuer.public_key());
/// assert!(verifier.verify_intent(&token, &intent));
/// ```
#[derive(Debug, Clone, Default)]
pub struct IntentVerifier {
    trusted: SignatureVerifier,
}

impl IntentVerifier {
    /// A verifier that trusts no keys yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A verifier trusting the `trusted_keys` of the `[binder]` section.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::Crypto`] for a malformed key.
    pub fn from_section(section: &BinderSection) -> BinderResult<Self> {
        Ok(Self {
            trusted: trusted_from_section(section)?,
        })
    }

    /// Accept tokens signed by `key`.
    pub fn trust(&mut self, key: PublicKey) -> KeyId {
        self.trusted.add_trusted_key(key)
    }

    /// Stop accepting tokens signed by the key with this id.
    pub fn distrust(&mut self, key_id: &KeyId) -> bool {
        self.trusted.remove_trusted_key(key_id)
    }

    /// Number of trusted keys.
    #[must_use]
    pub fn trusted_key_count(&self) -> usize {
        self.trusted.trusted_key_count()
    }
}

impl BindingVerifier for IntentVerifier {
    fn verify_intent(&self, token: &BindingToken, declaration: &IntentDeclaration) -> bool {
        verify_ed25519(&self.trusted, token, declaration)
    }
}
