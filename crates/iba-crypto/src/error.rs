//! Errors from hashing, signing, MAC and key-file handling.

use thiserror::Error;

/// Errors raised by the crypto primitives.
///
/// Ed25519 and HMAC failures are kept apart so a caller can tell a bad
/// signature from a bad tag.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Ed25519 key material of the wrong length.
    #[error("Ed25519 key must be {expected} bytes, got {actual}")]
    InvalidKeyLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// An HMAC secret below the accepted minimum.
    #[error("HMAC secret must be at least {minimum} bytes, got {actual}")]
    SecretTooShort {
        /// Minimum length in bytes.
        minimum: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// An Ed25519 signature of the wrong length.
    #[error("Ed25519 signature must be {expected} bytes, got {actual}")]
    InvalidSignatureLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// An HMAC tag of the wrong length.
    #[error("HMAC tag must be {expected} bytes, got {actual}")]
    InvalidTagLength {
        /// Expected length in bytes.
        expected: usize,
        /// Actual length in bytes.
        actual: usize,
    },

    /// Public key bytes that are not a valid Ed25519 point.
    #[error("malformed Ed25519 public key: {0}")]
    MalformedPublicKey(String),

    /// No trusted key carries this id.
    #[error("no trusted key with id {0}")]
    UntrustedKey(String),

    /// Ed25519 signature did not verify.
    #[error("Ed25519 signature verification failed")]
    SignatureVerificationFailed,

    /// HMAC tag did not match.
    #[error("HMAC tag mismatch")]
    MacVerificationFailed,

    /// Invalid hex encoding.
    #[error("invalid hex encoding")]
    InvalidHexEncoding,

    /// A key file could not be created or read.
    #[error("key file {path}: {reason}")]
    KeyFile {
        /// The key file path.
        path: String,
        /// What went wrong.
        reason: String,
    },
}

/// Result type for cryptographic operations.
pub type CryptoResult<T> = Result<T, CryptoError>;
