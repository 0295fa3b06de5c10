//! IBA Crypto - Cryptographic primitives for intent-bound authorization.
//!
//! This crate provides:
//! - BLAKE3 content hashing for deterministic intent hashes
//! - Ed25519 key pairs and signatures for third-party-verifiable bindings
//! - HMAC-SHA256 keys and tags for shared-secret bindings
//! - A registry of trusted public keys for verify-only parties
//!
//! # Example
//!
//! ```
//! use iba_crypto::{ContentHash, HmacKey, KeyPair};
//!
//! let digest = ContentHash::hash_with_domain("example", b"declared purpose");
//!
//! let keypair = KeyPair::generate();
//! let signature = keypair.sign(digest.as_bytes());
//! assert!(keypair.verify(digest.as_bytes(), &signature).is_ok());
//!
//! let secret = HmacKey::generate();
//! let tag = secret.sign(digest.as_bytes()).unwrap();
//! assert!(secret.verify(digest.as_bytes(), &tag).is_ok());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod hash;
mod keyfile;
mod keypair;
mod mac;
mod signature;
mod verifier;

pub use error::{CryptoError, CryptoResult};
pub use hash::ContentHash;
pub use keypair::{KeyPair, PublicKey};
pub use mac::{HmacKey, MacTag};
pub use signature::Signature;
pub use verifier::{KeyId, SignatureVerifier};
