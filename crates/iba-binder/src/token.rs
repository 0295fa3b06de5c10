//! Binding tokens.
//!
//! A [`BindingToken`] commits to one declaration's deterministic hash on
//! behalf of a principal at a point in time. The token does not contain the
//! declaration; verifiers recompute the hash from the declaration they hold.

use std::fmt;

use chrono::{DateTime, Utc};
use iba_crypto::ContentHash;
use serde::{Deserialize, Serialize};

use crate::error::BinderResult;

/// Version of the token signing-data layout.
const SIGNING_DATA_VERSION: u8 = 0x01;

fn write_length_prefixed(data: &mut Vec<u8>, bytes: &[u8]) {
    data.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    data.extend_from_slice(bytes);
}

/// Signing scheme used for a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BindingAlgorithm {
    /// Shared-secret HMAC over SHA-256.
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
    /// Ed25519 signatures, verifiable with the public key alone.
    #[serde(rename = "Ed25519")]
    Ed25519,
}

impl BindingAlgorithm {
    /// Wire name of the algorithm.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HmacSha256 => "HMAC-SHA256",
            Self::Ed25519 => "Ed25519",
        }
    }
}

impl fmt::Display for BindingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tamper-evident binding of a declaration hash to a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingToken {
    /// Deterministic hash of the declaration at bind time (hex on the wire).
    pub intent_hash: ContentHash,
    /// Signing scheme.
    pub algorithm: BindingAlgorithm,
    /// MAC tag or signature over [`signing_data`](Self::signing_data)
    /// (base64 on the wire).
    #[serde(with = "base64_bytes")]
    pub signature: Vec<u8>,
    /// Principal the declaration was bound to.
    pub bound_by: String,
    /// When the binding was made.
    pub bound_at: DateTime<Utc>,
    /// Identifier of the key that produced the signature.
    pub key_id: String,
}

impl BindingToken {
    /// The exact bytes the signature covers.
    ///
    /// Layout: version byte, algorithm name, 32-byte intent hash, principal,
    /// `bound_at` as Unix seconds (i64 LE) and nanoseconds (u32 LE), key id.
    /// Strings are
    /// length-prefixed with a u64 LE.
    #[must_use]
    pub fn signing_data(&self) -> Vec<u8> {
        signing_data(
            self.algorithm,
            &self.intent_hash,
            &self.bound_by,
            self.bound_at,
            &self.key_id,
        )
    }

    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::Serialization`](crate::BinderError::Serialization)
    /// if encoding fails.
    pub fn to_json(&self) -> BinderResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::Serialization`](crate::BinderError::Serialization)
    /// for malformed input.
    pub fn from_json(json: &str) -> BinderResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

pub(crate) fn signing_data(
    algorithm: BindingAlgorithm,
    intent_hash: &ContentHash,
    bound_by: &str,
    bound_at: DateTime<Utc>,
    key_id: &str,
) -> Vec<u8> {
    let mut data = Vec::with_capacity(128);
    data.push(SIGNING_DATA_VERSION);
    write_length_prefixed(&mut data, algorithm.as_str().as_bytes());
    data.extend_from_slice(intent_hash.as_bytes());
    write_length_prefixed(&mut data, bound_by.as_bytes());
    data.extend_from_slice(&bound_at.timestamp().to_le_bytes());
    data.extend_from_slice(&bound_at.timestamp_subsec_nanos().to_le_bytes());
    write_length_prefixed(&mut data, key_id.as_bytes());
    data
}

mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(
        bytes: &[u8],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(s).map_err(serde::de::Error::custom)
    }
}
