//! Dispatch from actions to the named limits they count against.
//!
//! A scope names ceilings (`max_api_calls = 50`); a [`LimitRule`] says which
//! actions and resources consume each one. A limit set in the scope but not
//! covered by any rule is never charged.

use iba_config::LimitRuleSection;
use serde::{Deserialize, Serialize};

use crate::scope::ResourcePattern;

/// Name of the general-purpose call counter.
pub const API_CALLS_LIMIT: &str = "max_api_calls";

/// Which actions and resources count against a named limit.
///
/// Empty `actions` or `resources` match everything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitRule {
    /// Limit name as it appears in the scope's `resource_limits`.
    pub limit: String,
    /// Action names counted by this rule.
    #[serde(default)]
    pub actions: Vec<String>,
    /// Resource patterns counted by this rule.
    #[serde(default)]
    pub resources: Vec<ResourcePattern>,
}

impl LimitRule {
    /// A rule charging `limit` for every admitted action.
    #[must_use]
    pub fn all(limit: impl Into<String>) -> Self {
        Self {
            limit: limit.into(),
            actions: Vec::new(),
            resources: Vec::new(),
        }
    }

    /// Restrict the rule to these action names.
    #[must_use]
    pub fn for_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    /// Restrict the rule to resources matching these patterns.
    #[must_use]
    pub fn for_resources<I, P>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ResourcePattern>,
    {
        self.resources = resources.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this rule charges `action` on `resource`.
    #[must_use]
    pub fn applies(&self, action: &str, resource: &str) -> bool {
        (self.actions.is_empty() || self.actions.iter().any(|a| a == action))
            && (self.resources.is_empty() || self.resources.iter().any(|p| p.matches(resource)))
    }
}

impl Default for LimitRule {
    fn default() -> Self {
        Self::all(API_CALLS_LIMIT)
    }
}

impl From<&LimitRuleSection> for LimitRule {
    fn from(section: &LimitRuleSection) -> Self {
        Self {
            limit: section.limit.clone(),
            actions: section.actions.clone(),
            resources: section
                .resources
                .iter()
                .map(|r| ResourcePattern::parse(r))
                .collect(),
        }
    }
}

/// Distinct limit names charged for `action` on `resource`, in rule order.
pub(crate) fn applicable_limits<'a>(
    rules: &'a [LimitRule],
    action: &str,
    resource: &str,
) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for rule in rules.iter().filter(|r| r.applies(action, resource)) {
        if !out.contains(&rule.limit.as_str()) {
            out.push(&rule.limit);
        }
    }
    out
}
