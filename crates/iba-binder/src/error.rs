//! Binder error types.

use iba_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur while binding intents or managing binder keys.
///
/// Verification never returns these: a token that does not verify is a
/// `false`, not an error.
#[derive(Debug, Error)]
pub enum BinderError {
    /// The binding principal is empty.
    #[error("binding principal must not be empty")]
    InvalidPrincipal,

    /// No key with this id is held.
    #[error("unknown key id: {0}")]
    UnknownKey(String),

    /// The active signing key cannot be removed.
    #[error("cannot retire active key: {0}")]
    ActiveKeyRetirement(String),

    /// The binder section does not describe this binder.
    #[error("binder configuration error: {0}")]
    Config(String),

    /// Key material could not be loaded or used.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// A token could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for binder operations.
pub type BinderResult<T> = Result<T, BinderError>;
