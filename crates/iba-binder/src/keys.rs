//! Named HMAC secrets with rotation.
//!
//! Tokens record the id of the key that signed them. Rotating installs a new
//! active key while keeping older ones for verification, so tokens issued
//! before the rotation stay valid until their key is retired.

use std::collections::HashMap;
use std::fmt;

use iba_crypto::HmacKey;

use crate::error::{BinderError, BinderResult};

/// A set of named HMAC secrets, one of which signs new tokens.
#[derive(Clone)]
pub struct HmacKeyring {
    keys: HashMap<String, HmacKey>,
    active: String,
}

impl HmacKeyring {
    /// A keyring whose only and active key is `key`.
    #[must_use]
    pub fn new(key_id: impl Into<String>, key: HmacKey) -> Self {
        let key_id = key_id.into();
        let mut keys = HashMap::new();
        keys.insert(key_id.clone(), key);
        Self {
            keys,
            active: key_id,
        }
    }

    /// A keyring with a freshly generated active key.
    #[must_use]
    pub fn generate(key_id: impl Into<String>) -> Self {
        Self::new(key_id, HmacKey::generate())
    }

    /// Id of the key that signs new tokens.
    #[must_use]
    pub fn active_key_id(&self) -> &str {
        &self.active
    }

    /// The active key and its id.
    pub(crate) fn active(&self) -> BinderResult<(&str, &HmacKey)> {
        self.keys
            .get(&self.active)
            .map(|key| (self.active.as_str(), key))
            .ok_or_else(|| BinderError::UnknownKey(self.active.clone()))
    }

    /// Look up a key by id.
    #[must_use]
    pub fn get(&self, key_id: &str) -> Option<&HmacKey> {
        self.keys.get(key_id)
    }

    /// Hold `key` for verification without making it active.
    ///
    /// Replaces any key already held under `key_id`.
    pub fn insert(&mut self, key_id: impl Into<String>, key: HmacKey) {
        self.keys.insert(key_id.into(), key);
    }

    /// Make `key` the active signing key. The previous key is retained.
    pub fn rotate(&mut self, key_id: impl Into<String>, key: HmacKey) {
        let key_id = key_id.into();
        tracing::info!(
            previous = %self.active,
            active = %key_id,
            "rotating HMAC binding key"
        );
        self.keys.insert(key_id.clone(), key);
        self.active = key_id;
    }

    /// Drop a retained key. Tokens it signed no longer verify.
    ///
    /// # Errors
    ///
    /// Returns [`BinderError::ActiveKeyRetirement`] for the active key and
    /// [`BinderError::UnknownKey`] for an id that is not held.
    pub fn retire(&mut self, key_id: &str) -> BinderResult<()> {
        if key_id == self.active {
            return Err(BinderError::ActiveKeyRetirement(key_id.to_owned()));
        }
        self.keys
            .remove(key_id)
            .map(|_| ())
            .ok_or_else(|| BinderError::UnknownKey(key_id.to_owned()))
    }

    /// Number of keys held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; a keyring holds at least its active key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl fmt::Debug for HmacKeyring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<&String> = self.keys.keys().collect();
        ids.sort();
        f.debug_struct("HmacKeyring")
            .field("active", &self.active)
            .field("key_ids", &ids)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotate_retains_previous_key() {
        let mut ring = HmacKeyring::generate("k1");
        ring.rotate("k2", HmacKey::generate());

        assert_eq!(ring.active_key_id(), "k2");
        assert!(ring.get("k1").is_some());
        assert_eq!(ring.len(), 2);
        assert_eq!(ring.active().unwrap().0, "k2");
    }

    #[test]
    fn test_retire() {
        let mut ring = HmacKeyring::generate("k1");
        ring.rotate("k2", HmacKey::generate());

        assert!(matches!(
            ring.retire("k2"),
            Err(BinderError::ActiveKeyRetirement(_))
        ));
        assert!(ring.retire("k1").is_ok());
        assert!(matches!(ring.retire("k1"), Err(BinderError::UnknownKey(_))));
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn test_debug_lists_ids_only() {
        let key = HmacKey::from_bytes(b"super-secret-material").unwrap();
        let ring = HmacKeyring::new("prod", key);
        let debug = format!("{ring:?}");
        assert!(debug.contains("prod"));
        assert!(!debug.contains("super-secret-material"));
    }
}
