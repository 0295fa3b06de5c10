//! Intent declarations.
//!
//! An [`IntentDeclaration`] states who authorized an agent, for what purpose,
//! over which resources, and until when. Its [`deterministic hash`] is what a
//! binding token commits to, so every field that matters for authorization
//! feeds into it.
//!
//! [`deterministic hash`]: IntentDeclaration::get_deterministic_hash

use chrono::{DateTime, Duration, SubsecRound, Utc};
use iba_config::IntentSection;
use iba_crypto::ContentHash;
use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::error::{IntentError, IntentResult};
use crate::scope::{IntentScope, canonical_patterns};

/// BLAKE3 derive-key context for declaration hashes.
pub const HASH_DOMAIN: &str = "iba.intent-declaration.v1";

/// Version of the canonical hash encoding.
const HASH_ENCODING_VERSION: u8 = 0x01;

/// Validity window used when none is given.
pub const DEFAULT_TTL_SECS: i64 = 3600;

fn write_length_prefixed(data: &mut Vec<u8>, bytes: &[u8]) {
    data.extend_from_slice(&(bytes.len() as u64).to_le_bytes());
    data.extend_from_slice(bytes);
}

/// A declared, time-bounded purpose for an agent session.
///
/// Fields are public so transport layers can build and inspect declarations
/// directly. Any change to a hashed field after binding is detected by the
/// binder as tampering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DeclarationRecord", into = "DeclarationRecord")]
pub struct IntentDeclaration {
    /// Caller-supplied identifier. Uniqueness is the caller's concern.
    pub intent_id: String,
    /// Human-readable statement of purpose.
    pub declared_purpose: String,
    /// Principal who issued the declaration.
    pub authorized_by: String,
    /// Resources and limits governing the session.
    pub scope: IntentScope,
    /// Creation instant.
    pub timestamp: DateTime<Utc>,
    /// Instant from which the declaration is no longer valid.
    pub expiration: DateTime<Utc>,
}

impl IntentDeclaration {
    /// Create a declaration issued now and valid for one hour.
    ///
    /// # Errors
    ///
    /// Returns [`IntentError::InvalidIntent`] if a required field is empty or
    /// a limit ceiling is zero.
    pub fn new(
        intent_id: impl Into<String>,
        declared_purpose: impl Into<String>,
        authorized_by: impl Into<String>,
        scope: IntentScope,
    ) -> IntentResult<Self> {
        Self::builder(intent_id, declared_purpose, authorized_by)
            .scope(scope)
            .build()
    }

    /// Start building a declaration with explicit timing.
    #[must_use]
    pub fn builder(
        intent_id: impl Into<String>,
        declared_purpose: impl Into<String>,
        authorized_by: impl Into<String>,
    ) -> DeclarationBuilder {
        DeclarationBuilder {
            intent_id: intent_id.into(),
            declared_purpose: declared_purpose.into(),
            authorized_by: authorized_by.into(),
            scope: IntentScope::default(),
            timestamp: None,
            expiration: None,
            ttl: Duration::seconds(DEFAULT_TTL_SECS),
        }
    }

    /// Check the construction invariants.
    ///
    /// # Errors
    ///
    /// Returns [`IntentError::InvalidIntent`] naming the first offending field.
    pub fn validate(&self) -> IntentResult<()> {
        if self.intent_id.is_empty() {
            return Err(IntentError::invalid("intent_id", "must not be empty"));
        }
        if self.declared_purpose.is_empty() {
            return Err(IntentError::invalid("declared_purpose", "must not be empty"));
        }
        if self.authorized_by.is_empty() {
            return Err(IntentError::invalid("authorized_by", "must not be empty"));
        }
        if self.expiration <= self.timestamp {
            return Err(IntentError::invalid(
                "expiration",
                format!(
                    "expiration {} is not after timestamp {}",
                    self.expiration.to_rfc3339(),
                    self.timestamp.to_rfc3339()
                ),
            ));
        }
        if let Some((name, _)) = self.scope.resource_limits.iter().find(|(_, c)| **c == 0) {
            return Err(IntentError::invalid(
                "resource_limits",
                format!("limit '{name}' must have a positive ceiling"),
            ));
        }
        Ok(())
    }

    /// Whether the declaration has expired at `now`.
    ///
    /// The expiration instant itself counts as expired.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiration
    }

    /// Whether the declaration has expired according to the system clock.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(SystemClock.now())
    }

    /// Time left before expiration at `now`, or `None` once expired.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        (!self.is_expired_at(now)).then(|| self.expiration.signed_duration_since(now))
    }

    /// Hash of the canonical encoding of every authorization-relevant field.
    ///
    /// Pattern lists are sorted and de-duplicated and limits are taken in
    /// name order, so equal values always hash equally regardless of
    /// construction order. Instants are encoded as UTC Unix seconds plus
    /// nanoseconds, so even a sub-second change to the validity window
    /// changes the hash.
    #[must_use]
    pub fn get_deterministic_hash(&self) -> ContentHash {
        ContentHash::hash_with_domain(HASH_DOMAIN, &self.canonical_bytes())
    }

    fn canonical_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(256);
        data.push(HASH_ENCODING_VERSION);

        write_length_prefixed(&mut data, self.intent_id.as_bytes());
        write_length_prefixed(&mut data, self.declared_purpose.as_bytes());
        write_length_prefixed(&mut data, self.authorized_by.as_bytes());

        for patterns in [
            &self.scope.allowed_resources,
            &self.scope.forbidden_resources,
        ] {
            let canonical = canonical_patterns(patterns);
            data.extend_from_slice(&(canonical.len() as u64).to_le_bytes());
            for pattern in &canonical {
                write_length_prefixed(&mut data, pattern.as_bytes());
            }
        }

        // BTreeMap iterates in name order.
        data.extend_from_slice(&(self.scope.resource_limits.len() as u64).to_le_bytes());
        for (name, ceiling) in &self.scope.resource_limits {
            write_length_prefixed(&mut data, name.as_bytes());
            data.extend_from_slice(&ceiling.to_le_bytes());
        }

        for instant in [self.timestamp, self.expiration] {
            data.extend_from_slice(&instant.timestamp().to_le_bytes());
            data.extend_from_slice(&instant.timestamp_subsec_nanos().to_le_bytes());
        }
        data
    }

    /// The structural transport record for this declaration.
    #[must_use]
    pub fn to_record(&self) -> DeclarationRecord {
        DeclarationRecord::from(self.clone())
    }

    /// Rebuild a declaration from a transport record.
    ///
    /// # Errors
    ///
    /// Returns [`IntentError::InvalidIntent`] if the record violates any
    /// construction invariant.
    pub fn from_record(record: DeclarationRecord) -> IntentResult<Self> {
        Self::try_from(record)
    }

    /// Encode as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IntentError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> IntentResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode from JSON, re-running construction validation.
    ///
    /// # Errors
    ///
    /// Returns [`IntentError::Serialization`] for malformed JSON and
    /// [`IntentError::InvalidIntent`] for a record that fails validation.
    pub fn from_json(json: &str) -> IntentResult<Self> {
        let record: DeclarationRecord = serde_json::from_str(json)?;
        Self::from_record(record)
    }
}

/// Builder for [`IntentDeclaration`] with explicit timing.
///
/// ```
/// use chrono::{Duration, TimeZone, Utc};
/// use iba_intent::{IntentDeclaration, IntentScope};
///
/// let issued = Utc.with_ymd_and_hms(2026, 5, 4, 8, 0, 0).unwrap();
/// let intent = IntentDeclaration::builder("trip-7", "Book a flight", "alice@example.com")
///     .scope(IntentScope::new().allow("flights:*"))
///     .timestamp(issued)
///     .ttl(Duration::minutes(15))
///     .build()
///     .unwrap();
///
/// assert_eq!(intent.expiration, issued + Duration::minutes(15));
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct DeclarationBuilder {
    intent_id: String,
    declared_purpose: String,
    authorized_by: String,
    scope: IntentScope,
    timestamp: Option<DateTime<Utc>>,
    expiration: Option<DateTime<Utc>>,
    ttl: Duration,
}

impl DeclarationBuilder {
    /// Set the scope.
    pub fn scope(mut self, scope: IntentScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the creation instant. Defaults to now. Truncated to whole seconds.
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Take the creation instant from `clock`.
    pub fn issued_by(self, clock: &dyn Clock) -> Self {
        self.timestamp(clock.now())
    }

    /// Set an explicit expiration. Takes precedence over [`ttl`](Self::ttl).
    /// Truncated to whole seconds.
    pub fn expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Validity window used when no explicit expiration is set.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Use the configured default validity window.
    pub fn ttl_from_section(self, section: &IntentSection) -> Self {
        let ttl = Duration::from_std(section.default_ttl()).unwrap_or(Duration::MAX);
        self.ttl(ttl)
    }

    /// Validate and build.
    ///
    /// # Errors
    ///
    /// Returns [`IntentError::InvalidIntent`] if a required field is empty,
    /// the expiration is not after the timestamp, or a limit ceiling is zero.
    pub fn build(self) -> IntentResult<IntentDeclaration> {
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| SystemClock.now())
            .trunc_subsecs(0);
        let expiration = match self.expiration {
            Some(expiration) => expiration,
            None => timestamp.checked_add_signed(self.ttl).ok_or_else(|| {
                IntentError::invalid("expiration", "validity window overflows")
            })?,
        }
        .trunc_subsecs(0);

        let declaration = IntentDeclaration {
            intent_id: self.intent_id,
            declared_purpose: self.declared_purpose,
            authorized_by: self.authorized_by,
            scope: self.scope,
            timestamp,
            expiration,
        };
        declaration.validate()?;
        Ok(declaration)
    }
}

/// Transport shape of a declaration.
///
/// Instants are ISO-8601 UTC strings; scope patterns are their string forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationRecord {
    /// See [`IntentDeclaration::intent_id`].
    pub intent_id: String,
    /// See [`IntentDeclaration::declared_purpose`].
    pub declared_purpose: String,
    /// See [`IntentDeclaration::authorized_by`].
    pub authorized_by: String,
    /// See [`IntentDeclaration::scope`].
    pub scope: IntentScope,
    /// See [`IntentDeclaration::timestamp`].
    pub timestamp: DateTime<Utc>,
    /// See [`IntentDeclaration::expiration`].
    pub expiration: DateTime<Utc>,
}

impl From<IntentDeclaration> for DeclarationRecord {
    fn from(d: IntentDeclaration) -> Self {
        Self {
            intent_id: d.intent_id,
            declared_purpose: d.declared_purpose,
            authorized_by: d.authorized_by,
            scope: d.scope,
            timestamp: d.timestamp,
            expiration: d.expiration,
        }
    }
}

impl TryFrom<DeclarationRecord> for IntentDeclaration {
    type Error = IntentError;

    fn try_from(r: DeclarationRecord) -> IntentResult<Self> {
        let declaration = Self {
            intent_id: r.intent_id,
            declared_purpose: r.declared_purpose,
            authorized_by: r.authorized_by,
            scope: r.scope,
            timestamp: r.timestamp.trunc_subsecs(0),
            expiration: r.expiration.trunc_subsecs(0),
        };
        declaration.validate()?;
        Ok(declaration)
    }
}
