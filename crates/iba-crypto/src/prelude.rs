//! Prelude module - commonly used types for convenient import.
//!
//! Use `use iba_crypto::prelude::*;` to import all essential types.

// Errors
pub use crate::{CryptoError, CryptoResult};

// Key types
pub use crate::{HmacKey, KeyId, KeyPair, PublicKey};

// Signatures and tags
pub use crate::{MacTag, Signature};

// Signature verification
pub use crate::SignatureVerifier;

// Hashing
pub use crate::ContentHash;
