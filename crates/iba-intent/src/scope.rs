//! Resource patterns and intent scopes.
//!
//! Pattern grammar is deliberately small:
//! - `*` matches every resource
//! - `<prefix>:*` matches any resource starting with `<prefix>:`
//! - anything else matches only itself
//!
//! Matching is case-sensitive and there are no mid-string wildcards.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single allowed or forbidden resource pattern.
///
/// Only [`parse`](Self::parse) builds patterns, so the string form of a
/// pattern identifies it exactly: `"*"` is always the wildcard and
/// `"calendar:*"` is always a prefix, never a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ResourcePattern(Matcher);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Matcher {
    Any,
    /// Stored with its trailing colon.
    Prefix(String),
    Exact(String),
}

/// Shape of a [`ResourcePattern`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// `*`: every resource.
    Any,
    /// `<prefix>:*`: every resource starting with `<prefix>:`.
    Prefix,
    /// A literal resource identifier.
    Exact,
}

impl ResourcePattern {
    /// Parse a pattern string.
    ///
    /// ```
    /// use iba_intent::{PatternKind, ResourcePattern};
    ///
    /// assert_eq!(ResourcePattern::parse("*").kind(), PatternKind::Any);
    /// assert!(ResourcePattern::parse("calendar:*").matches("calendar:read"));
    /// assert!(!ResourcePattern::parse("calendar:read").matches("calendar:write"));
    /// ```
    #[must_use]
    pub fn parse(pattern: &str) -> Self {
        let matcher = if pattern == "*" {
            Matcher::Any
        } else if let Some(prefix) = pattern.strip_suffix('*').filter(|p| p.ends_with(':')) {
            Matcher::Prefix(prefix.to_owned())
        } else {
            Matcher::Exact(pattern.to_owned())
        };
        Self(matcher)
    }

    /// The wildcard pattern `*`.
    #[must_use]
    pub fn any() -> Self {
        Self(Matcher::Any)
    }

    /// Which of the three pattern forms this is.
    #[must_use]
    pub fn kind(&self) -> PatternKind {
        match self.0 {
            Matcher::Any => PatternKind::Any,
            Matcher::Prefix(_) => PatternKind::Prefix,
            Matcher::Exact(_) => PatternKind::Exact,
        }
    }

    /// Whether `resource` matches this pattern.
    #[must_use]
    pub fn matches(&self, resource: &str) -> bool {
        match &self.0 {
            Matcher::Any => true,
            Matcher::Prefix(prefix) => resource.starts_with(prefix.as_str()),
            Matcher::Exact(exact) => resource == exact,
        }
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Matcher::Any => f.write_str("*"),
            Matcher::Prefix(prefix) => write!(f, "{prefix}*"),
            Matcher::Exact(exact) => f.write_str(exact),
        }
    }
}

impl From<&str> for ResourcePattern {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for ResourcePattern {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ResourcePattern> for String {
    fn from(p: ResourcePattern) -> Self {
        p.to_string()
    }
}

/// What an intent may touch, what it must never touch, and how much.
///
/// Forbidden patterns always win over allowed ones; see [`permits`](Self::permits).
///
/// ```
/// use iba_intent::IntentScope;
///
/// let scope = IntentScope::new()
///     .allow("*")
///     .forbid("medical_records:*")
///     .limit("max_api_calls", 50);
///
/// assert!(scope.is_allowed("medical_records:x"));
/// assert!(scope.is_forbidden("medical_records:x"));
/// assert!(!scope.permits("medical_records:x"));
/// assert!(scope.permits("calendar:read"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentScope {
    /// Patterns the intent may act on.
    #[serde(default)]
    pub allowed_resources: Vec<ResourcePattern>,
    /// Patterns the intent must never act on.
    #[serde(default)]
    pub forbidden_resources: Vec<ResourcePattern>,
    /// Named usage ceilings (e.g. `max_api_calls`).
    #[serde(default)]
    pub resource_limits: BTreeMap<String, u64>,
}

impl IntentScope {
    /// An empty scope that permits nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an allowed pattern. Duplicates are ignored.
    #[must_use]
    pub fn allow(mut self, pattern: impl Into<ResourcePattern>) -> Self {
        push_unique(&mut self.allowed_resources, pattern.into());
        self
    }

    /// Add a forbidden pattern. Duplicates are ignored.
    #[must_use]
    pub fn forbid(mut self, pattern: impl Into<ResourcePattern>) -> Self {
        push_unique(&mut self.forbidden_resources, pattern.into());
        self
    }

    /// Set a named usage ceiling.
    #[must_use]
    pub fn limit(mut self, name: impl Into<String>, ceiling: u64) -> Self {
        self.resource_limits.insert(name.into(), ceiling);
        self
    }

    /// Whether some allowed pattern matches `resource`.
    ///
    /// This ignores forbidden patterns.
    #[must_use]
    pub fn is_allowed(&self, resource: &str) -> bool {
        self.allowed_resources.iter().any(|p| p.matches(resource))
    }

    /// Whether some forbidden pattern matches `resource`.
    #[must_use]
    pub fn is_forbidden(&self, resource: &str) -> bool {
        self.forbidden_match(resource).is_some()
    }

    /// The first forbidden pattern matching `resource`.
    #[must_use]
    pub fn forbidden_match(&self, resource: &str) -> Option<&ResourcePattern> {
        self.forbidden_resources.iter().find(|p| p.matches(resource))
    }

    /// Combined admission rule: allowed and not forbidden.
    #[must_use]
    pub fn permits(&self, resource: &str) -> bool {
        self.is_allowed(resource) && !self.is_forbidden(resource)
    }

    /// Ceiling for a named limit, if the scope sets one.
    #[must_use]
    pub fn ceiling(&self, limit: &str) -> Option<u64> {
        self.resource_limits.get(limit).copied()
    }
}

fn push_unique(patterns: &mut Vec<ResourcePattern>, pattern: ResourcePattern) {
    if !patterns.contains(&pattern) {
        patterns.push(pattern);
    }
}

/// Sorted, de-duplicated string forms of `patterns`.
pub(crate) fn canonical_patterns(patterns: &[ResourcePattern]) -> Vec<String> {
    let mut out: Vec<String> = patterns.iter().map(ToString::to_string).collect();
    out.sort_unstable();
    out.dedup();
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forms() {
        assert_eq!(ResourcePattern::parse("*"), ResourcePattern::any());
        assert_eq!(ResourcePattern::parse("calendar:*").kind(), PatternKind::Prefix);
        assert_eq!(ResourcePattern::parse("calendar:read").kind(), PatternKind::Exact);
        // A star without a colon before it is not a wildcard.
        assert_eq!(ResourcePattern::parse("calendar*").kind(), PatternKind::Exact);
        assert_eq!(ResourcePattern::parse("a:*b").kind(), PatternKind::Exact);
    }

    #[test]
    fn test_string_form_identifies_pattern() {
        let raws = ["*", "calendar:*", "calendar:read", "calendar*", "x:", "a:*b", ":*"];
        for raw in raws {
            let pattern = ResourcePattern::parse(raw);
            assert_eq!(ResourcePattern::parse(&pattern.to_string()), pattern);
        }
        for (i, a) in raws.iter().enumerate() {
            for b in raws.iter().skip(i + 1) {
                assert_ne!(
                    ResourcePattern::parse(a).to_string(),
                    ResourcePattern::parse(b).to_string()
                );
            }
        }
    }

    #[test]
    fn test_wildcard_looking_literal_stays_a_prefix_through_json() {
        let scope = IntentScope::new().allow("calendar:*").allow("*");
        let json = serde_json::to_string(&scope).unwrap();
        let back: IntentScope = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scope);
        assert_eq!(back.allowed_resources[0].kind(), PatternKind::Prefix);
        assert_eq!(back.allowed_resources[1].kind(), PatternKind::Any);
        assert!(back.is_allowed("calendar:read"));
    }

    #[test]
    fn test_display_reproduces_input() {
        for raw in ["*", "calendar:*", "calendar:read", "x*"] {
            assert_eq!(ResourcePattern::parse(raw).to_string(), raw);
        }
    }

    #[test]
    fn test_exact_match_allowed() {
        let scope = IntentScope::new().allow("calendar:read").allow("calendar:write");
        assert!(scope.is_allowed("calendar:read"));
        assert!(scope.is_allowed("calendar:write"));
        assert!(!scope.is_allowed("calendar:delete"));
    }

    #[test]
    fn test_prefix_wildcard() {
        let scope = IntentScope::new().allow("calendar:*");
        assert!(scope.is_allowed("calendar:read"));
        assert!(scope.is_allowed("calendar:delete"));
        assert!(scope.is_allowed("calendar:"));
        assert!(!scope.is_allowed("calendar"));
        assert!(!scope.is_allowed("medical:read"));
        assert!(!scope.is_allowed("calendarx:read"));
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let scope = IntentScope::new().allow("Calendar:*");
        assert!(!scope.is_allowed("calendar:read"));
    }

    #[test]
    fn test_forbidden_overrides_allowed() {
        let scope = IntentScope::new().allow("*").forbid("medical_records:*");
        assert!(scope.is_allowed("medical_records:patient_data"));
        assert!(scope.is_forbidden("medical_records:patient_data"));
        assert!(!scope.permits("medical_records:patient_data"));
        assert!(scope.permits("calendar:read"));
    }

    #[test]
    fn test_forbidden_match_reports_pattern() {
        let scope = IntentScope::new().forbid("insurance:*").forbid("payment:modify");
        assert_eq!(
            scope.forbidden_match("insurance:plan"),
            Some(&ResourcePattern::parse("insurance:*"))
        );
        assert!(scope.forbidden_match("payment:credit_card").is_none());
    }

    #[test]
    fn test_empty_scope_permits_nothing() {
        let scope = IntentScope::new();
        assert!(!scope.permits("anything"));
        assert!(!scope.is_forbidden("anything"));
    }

    #[test]
    fn test_builder_ignores_duplicates() {
        let scope = IntentScope::new().allow("a:*").allow("a:*").forbid("b").forbid("b");
        assert_eq!(scope.allowed_resources.len(), 1);
        assert_eq!(scope.forbidden_resources.len(), 1);
    }

    #[test]
    fn test_canonical_patterns_sorted_and_deduped() {
        let patterns = vec![
            ResourcePattern::parse("b:*"),
            ResourcePattern::parse("a"),
            ResourcePattern::parse("b:*"),
        ];
        assert_eq!(canonical_patterns(&patterns), vec!["a", "b:*"]);
    }

    #[test]
    fn test_scope_serializes_patterns_as_strings() {
        let scope = IntentScope::new()
            .allow("calendar:*")
            .forbid("payment:modify")
            .limit("max_api_calls", 5);
        let json = serde_json::to_value(&scope).unwrap();
        assert_eq!(json["allowed_resources"][0], "calendar:*");
        assert_eq!(json["forbidden_resources"][0], "payment:modify");
        assert_eq!(json["resource_limits"]["max_api_calls"], 5);

        let back: IntentScope = serde_json::from_value(json).unwrap();
        assert_eq!(back, scope);
    }
}
