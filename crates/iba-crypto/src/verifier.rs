//! Registry of trusted Ed25519 public keys.
//!
//! Verify-only parties hold a [`SignatureVerifier`] instead of a key pair, so
//! they can check bindings without ever touching a secret.

use std::collections::HashMap;

use crate::error::{CryptoError, CryptoResult};
use crate::keypair::PublicKey;
use crate::signature::Signature;

/// Key identifier (first 8 bytes of the public key).
pub type KeyId = [u8; 8];

/// A set of trusted public keys indexed by [`KeyId`].
///
/// ```
/// use iba_crypto::{KeyPair, SignatureVerifier};
///
/// let keypair = KeyPair::generate();
/// let mut verifier = SignatureVerifier::new();
/// let key_id = verifier.add_trusted_key(keypair.export_public_key());
///
/// let signature = keypair.sign(b"intent");
/// assert!(verifier.verify(&key_id, b"intent", &signature).is_ok());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SignatureVerifier {
    trusted_keys: HashMap<KeyId, PublicKey>,
}

impl SignatureVerifier {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `key`, returning its id.
    pub fn add_trusted_key(&mut self, key: PublicKey) -> KeyId {
        let key_id = key.key_id();
        self.trusted_keys.insert(key_id, key);
        key_id
    }

    /// Stop trusting a key. Returns `true` if it was present.
    pub fn remove_trusted_key(&mut self, key_id: &KeyId) -> bool {
        self.trusted_keys.remove(key_id).is_some()
    }

    /// Number of trusted keys.
    #[must_use]
    pub fn trusted_key_count(&self) -> usize {
        self.trusted_keys.len()
    }

    /// Verify `signature` over `message` with the trusted key `key_id`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::UntrustedKey`] if the key is not trusted and
    /// [`CryptoError::SignatureVerificationFailed`] if the signature is bad.
    pub fn verify(
        &self,
        key_id: &KeyId,
        message: &[u8],
        signature: &Signature,
    ) -> CryptoResult<()> {
        let key = self
            .trusted_keys
            .get(key_id)
            .ok_or_else(|| CryptoError::UntrustedKey(hex::encode(key_id)))?;
        key.verify(message, signature)
    }
}
