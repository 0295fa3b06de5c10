//! HMAC-SHA256 shared-secret authentication.
//!
//! Used by the shared-secret binder: whoever holds the [`HmacKey`] can both
//! issue and check a [`MacTag`], so a tag proves possession of the secret
//! rather than the identity of a particular signer.

use std::fmt;
use std::path::Path;

use hmac::{Hmac, Mac};
use rand::RngCore;
use rand::rngs::OsRng;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{CryptoError, CryptoResult};
use crate::keyfile;

type HmacSha256 = Hmac<Sha256>;

/// Length of freshly generated secrets.
const GENERATED_SECRET_LEN: usize = 32;

/// Shortest secret accepted from callers.
const MIN_SECRET_LEN: usize = 16;

/// A shared HMAC secret. Zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct HmacKey(Vec<u8>);

impl HmacKey {
    /// Generate a random 32-byte secret.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; GENERATED_SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Wrap caller-provided secret bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SecretTooShort`] for secrets shorter than 16 bytes.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() < MIN_SECRET_LEN {
            return Err(CryptoError::SecretTooShort {
                minimum: MIN_SECRET_LEN,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// Load the secret stored at `path`, creating a random one if absent.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::KeyFile`] on I/O failure or when `path` is a
    /// symlink, and [`CryptoError::SecretTooShort`] if the file is too short.
    pub fn load_or_generate(path: impl AsRef<Path>) -> CryptoResult<Self> {
        let bytes = keyfile::load_or_create(path.as_ref(), || {
            Zeroizing::new(Self::generate().0.clone())
        })?;
        Self::from_bytes(&bytes)
    }

    fn mac(&self) -> CryptoResult<HmacSha256> {
        HmacSha256::new_from_slice(&self.0).map_err(|_| CryptoError::SecretTooShort {
            minimum: MIN_SECRET_LEN,
            actual: self.0.len(),
        })
    }

    /// Compute the tag for `message`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SecretTooShort`] if the MAC rejects the secret.
    pub fn sign(&self, message: &[u8]) -> CryptoResult<MacTag> {
        let mut mac = self.mac()?;
        mac.update(message);
        let mut tag = [0u8; 32];
        tag.copy_from_slice(&mac.finalize().into_bytes());
        Ok(MacTag(tag))
    }

    /// Check `tag` against `message` in constant time.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::MacVerificationFailed`] on mismatch.
    pub fn verify(&self, message: &[u8], tag: &MacTag) -> CryptoResult<()> {
        let mut mac = self.mac()?;
        mac.update(message);
        mac.verify_slice(&tag.0)
            .map_err(|_| CryptoError::MacVerificationFailed)
    }
}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HmacKey")
            .field("len", &self.0.len())
            .finish_non_exhaustive()
    }
}

/// An HMAC-SHA256 tag (32 bytes).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct MacTag([u8; 32]);

impl MacTag {
    /// Try to create from a slice.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidTagLength`] if the slice is not 32 bytes.
    pub fn try_from_slice(slice: &[u8]) -> CryptoResult<Self> {
        let bytes: [u8; 32] = slice
            .try_into()
            .map_err(|_| CryptoError::InvalidTagLength {
                expected: 32,
                actual: slice.len(),
            })?;
        Ok(Self(bytes))
    }

    /// Raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for MacTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacTag({}...)", &hex::encode(self.0)[..16])
    }
}

impl AsRef<[u8]> for MacTag {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rfc4231_case_2() {
        // RFC 4231 test case 2 uses a 4-byte key, below our accepted minimum,
        // so exercise the MAC directly through the same construction.
        let mut mac = HmacSha256::new_from_slice(b"Jefe").unwrap();
        mac.update(b"what do ya want for nothing?");
        assert_eq!(
            hex::encode(mac.finalize().into_bytes()),
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_sign_verify() {
        let key = HmacKey::generate();
        let tag = key.sign(b"intent-hash").unwrap();
        assert!(key.verify(b"intent-hash", &tag).is_ok());
        assert!(key.verify(b"intent-hash2", &tag).is_err());
    }

    #[test]
    fn test_different_secrets_disagree() {
        let a = HmacKey::generate();
        let b = HmacKey::generate();
        let tag = a.sign(b"m").unwrap();
        assert!(matches!(
            b.verify(b"m", &tag),
            Err(CryptoError::MacVerificationFailed)
        ));
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(matches!(
            HmacKey::from_bytes(b"short"),
            Err(CryptoError::SecretTooShort { minimum: 16, actual: 5 })
        ));
        assert!(HmacKey::from_bytes(b"sixteen-byte-key").is_ok());
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = HmacKey::from_bytes(b"super-secret-value-123").unwrap();
        let debug = format!("{key:?}");
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_tag_length_checked() {
        let err = MacTag::try_from_slice(&[0u8; 31]).unwrap_err();
        assert!(matches!(
            err,
            CryptoError::InvalidTagLength { expected: 32, actual: 31 }
        ));
        assert!(err.to_string().contains("HMAC tag"));

        let tag = HmacKey::generate().sign(b"m").unwrap();
        assert_eq!(MacTag::try_from_slice(tag.as_bytes()).unwrap(), tag);
    }

    #[test]
    fn test_load_or_generate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hmac.secret");

        let first = HmacKey::load_or_generate(&path).unwrap();
        let second = HmacKey::load_or_generate(&path).unwrap();
        let tag = first.sign(b"m").unwrap();
        assert!(second.verify(b"m", &tag).is_ok());
    }
}
