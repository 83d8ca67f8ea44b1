//! The policy value type.
//!
//! A [`Policy`] scopes one entitlement rule to a (source, table) pair via
//! patterns, to a set of users via a [`Condition`], and orders itself
//! against other policies via a priority. The rule payload is an enum, so a
//! policy can never carry a payload that disagrees with its type.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt::Display,
};

use garnet_types::FilterOperator;
use serde::{Deserialize, Serialize};

use crate::{condition::Condition, mask::MaskKind};

// ============================================================================
// Policy taxonomy
// ============================================================================

/// The kind of entitlement a policy expresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyType {
    /// Grants or denies an entire table.
    #[serde(rename = "TABLE_ACCESS")]
    TableAccess,
    /// Row-level security: appends a row filter.
    #[serde(rename = "RLS")]
    RowLevelSecurity,
    /// Column-level security: removes or restricts columns.
    #[serde(rename = "CLS")]
    ColumnLevelSecurity,
    /// Masks one column's values.
    #[serde(rename = "MASK")]
    Masking,
}

impl Display for PolicyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::TableAccess => "TABLE_ACCESS",
            Self::RowLevelSecurity => "RLS",
            Self::ColumnLevelSecurity => "CLS",
            Self::Masking => "MASK",
        };
        write!(f, "{name}")
    }
}

/// Whether a table-access or column rule grants or revokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessAction {
    Allow,
    Deny,
}

// ============================================================================
// Row filters
// ============================================================================

/// A row predicate attached by an RLS policy.
///
/// The value may be a `${user.<attr>}` placeholder, resolved against the
/// requesting user before the filter reaches a connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowFilter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: String,
    /// The policy that contributed this filter, for audit trails.
    pub policy_id: String,
}

impl RowFilter {
    pub fn new(
        column: impl Into<String>,
        operator: FilterOperator,
        value: impl Into<String>,
    ) -> Self {
        Self {
            column: column.into(),
            operator,
            value: value.into(),
            policy_id: String::new(),
        }
    }

    /// Tags this filter with its owning policy (builder pattern).
    pub fn from_policy(mut self, policy_id: impl Into<String>) -> Self {
        self.policy_id = policy_id.into();
        self
    }

    /// Lowers this filter to a neutral predicate for the scan pipeline.
    ///
    /// The value is carried as a JSON string; placeholder resolution must
    /// already have happened.
    pub fn to_predicate(&self) -> garnet_types::Filter {
        garnet_types::Filter::new(
            self.column.clone(),
            self.operator,
            serde_json::Value::String(self.value.clone()),
        )
    }
}

impl Display for RowFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} '{}'", self.column, self.operator, self.value)
    }
}

// ============================================================================
// Policy rules
// ============================================================================

/// The payload of a policy, keyed by kind.
///
/// Holding the payload in an enum variant makes "a TABLE_ACCESS policy has
/// no columns, an RLS policy has exactly one filter" structurally true
/// rather than a runtime invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PolicyRule {
    TableAccess {
        action: AccessAction,
    },
    RowFilter(RowFilter),
    Columns {
        action: AccessAction,
        columns: BTreeSet<String>,
    },
    MaskColumn {
        column: String,
        mask: MaskKind,
    },
}

// ============================================================================
// Policy
// ============================================================================

/// One entitlement policy.
///
/// Immutable after construction: patterns, condition, and priority are set
/// with consuming `with_*` builders and never change afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    id: String,
    source_pattern: Option<String>,
    table_pattern: Option<String>,
    condition: Condition,
    priority: i32,
    rule: PolicyRule,
}

impl Policy {
    /// Creates a policy with no scoping: it matches every source and table
    /// and applies to every user, at priority 0.
    ///
    /// # Panics
    ///
    /// Panics if `id` is empty.
    pub fn new(id: impl Into<String>, rule: PolicyRule) -> Self {
        let id = id.into();
        assert!(!id.is_empty(), "Policy id must not be empty");
        Self {
            id,
            source_pattern: None,
            table_pattern: None,
            condition: Condition::Always,
            priority: 0,
            rule,
        }
    }

    /// Scopes this policy to sources matching `pattern` (builder pattern).
    pub fn with_source_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.source_pattern = Some(pattern.into());
        self
    }

    /// Scopes this policy to tables matching `pattern` (builder pattern).
    pub fn with_table_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.table_pattern = Some(pattern.into());
        self
    }

    /// Restricts this policy to users satisfying `condition`.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    /// Sets the evaluation priority. Higher priorities are evaluated first.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn rule(&self) -> &PolicyRule {
        &self.rule
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// The kind of entitlement this policy expresses, derived from its rule.
    pub fn policy_type(&self) -> PolicyType {
        match &self.rule {
            PolicyRule::TableAccess { .. } => PolicyType::TableAccess,
            PolicyRule::RowFilter(_) => PolicyType::RowLevelSecurity,
            PolicyRule::Columns { .. } => PolicyType::ColumnLevelSecurity,
            PolicyRule::MaskColumn { .. } => PolicyType::Masking,
        }
    }

    /// True if this policy's patterns cover the given source and table.
    ///
    /// An unset pattern and the literal `*` match anything; a pattern
    /// ending in `.*` matches by prefix; anything else matches exactly.
    pub fn matches(&self, source_id: &str, table_name: &str) -> bool {
        pattern_matches(self.source_pattern.as_deref(), source_id)
            && pattern_matches(self.table_pattern.as_deref(), table_name)
    }

    /// True if this policy's condition holds for the given user.
    pub fn applies_to(
        &self,
        roles: &HashSet<String>,
        attributes: &HashMap<String, String>,
    ) -> bool {
        self.condition.holds(roles, attributes)
    }
}

fn pattern_matches(pattern: Option<&str>, value: &str) -> bool {
    match pattern {
        None | Some("*") => true,
        Some(pattern) => match pattern.strip_suffix(".*") {
            Some(prefix) => value.starts_with(prefix),
            None => pattern == value,
        },
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    use super::*;

    #[test_case(None, "anything", true; "unset matches all")]
    #[test_case(Some("*"), "github", true; "star matches all")]
    #[test_case(Some("github"), "github", true; "exact match")]
    #[test_case(Some("github"), "jira", false; "exact mismatch")]
    #[test_case(Some("github.*"), "github.issues", true; "prefix match")]
    #[test_case(Some("github.*"), "github", true; "prefix matches bare prefix")]
    #[test_case(Some("github.*"), "jira.issues", false; "prefix mismatch")]
    fn test_pattern_matching(pattern: Option<&str>, value: &str, expected: bool) {
        assert_eq!(pattern_matches(pattern, value), expected);
    }

    #[test]
    fn test_policy_matches_requires_both_patterns() {
        let policy = Policy::new(
            "cls-1",
            PolicyRule::Columns {
                action: AccessAction::Deny,
                columns: BTreeSet::from(["email".to_string()]),
            },
        )
        .with_source_pattern("github")
        .with_table_pattern("issues");

        assert!(policy.matches("github", "issues"));
        assert!(!policy.matches("github", "pulls"));
        assert!(!policy.matches("jira", "issues"));
    }

    #[test]
    fn test_policy_type_follows_rule() {
        let table = Policy::new(
            "t",
            PolicyRule::TableAccess {
                action: AccessAction::Allow,
            },
        );
        assert_eq!(table.policy_type(), PolicyType::TableAccess);

        let rls = Policy::new(
            "r",
            PolicyRule::RowFilter(RowFilter::new(
                "assignee",
                FilterOperator::Equals,
                "${user.id}",
            )),
        );
        assert_eq!(rls.policy_type(), PolicyType::RowLevelSecurity);

        let mask = Policy::new(
            "m",
            PolicyRule::MaskColumn {
                column: "email".to_string(),
                mask: MaskKind::Hash,
            },
        );
        assert_eq!(mask.policy_type(), PolicyType::Masking);
    }

    #[test]
    fn test_builder_sets_condition_and_priority() {
        let policy = Policy::new(
            "p",
            PolicyRule::TableAccess {
                action: AccessAction::Deny,
            },
        )
        .with_condition(Condition::parse("user.role == 'AUDITOR'"))
        .with_priority(100);

        assert_eq!(policy.priority(), 100);
        let auditor: HashSet<String> = ["AUDITOR".to_string()].into();
        assert!(policy.applies_to(&auditor, &HashMap::new()));
        assert!(!policy.applies_to(&HashSet::new(), &HashMap::new()));
    }

    #[test]
    #[should_panic(expected = "Policy id must not be empty")]
    fn test_empty_policy_id_panics() {
        let _ = Policy::new(
            "",
            PolicyRule::TableAccess {
                action: AccessAction::Allow,
            },
        );
    }

    #[test]
    fn test_policy_serialization_round_trip() {
        let policy = Policy::new(
            "rls-assignee",
            PolicyRule::RowFilter(
                RowFilter::new("assignee", FilterOperator::Equals, "${user.id}")
                    .from_policy("rls-assignee"),
            ),
        )
        .with_source_pattern("github.*")
        .with_condition(Condition::parse("user.role != 'ADMIN'"))
        .with_priority(10);

        let encoded = serde_json::to_value(&policy).expect("serialize policy");
        let decoded: Policy = serde_json::from_value(encoded).expect("deserialize policy");
        assert_eq!(decoded, policy);
    }

    #[test]
    fn test_policy_type_serde_names() {
        assert_eq!(
            serde_json::to_value(PolicyType::RowLevelSecurity).unwrap(),
            json!("RLS")
        );
        assert_eq!(
            serde_json::to_value(PolicyType::TableAccess).unwrap(),
            json!("TABLE_ACCESS")
        );
    }

    proptest! {
        /// `*` never fails to match, and an exact pattern only matches itself.
        #[test]
        fn prop_pattern_star_and_exact(value in "[a-z_.]{0,16}", other in "[a-z_.]{1,16}") {
            prop_assert!(pattern_matches(Some("*"), &value));
            prop_assert!(pattern_matches(None, &value));
            prop_assert!(pattern_matches(Some(&value), &value));
            if value != other && !other.ends_with(".*") {
                prop_assert!(!pattern_matches(Some(&other), &value));
            }
        }

        /// A `prefix.*` pattern matches exactly the values starting with the prefix.
        #[test]
        fn prop_prefix_pattern(prefix in "[a-z]{1,8}", suffix in "[a-z.]{0,8}") {
            let pattern = format!("{prefix}.*");
            let matching = format!("{prefix}{suffix}");
            prop_assert!(pattern_matches(Some(&pattern), &matching));
        }
    }
}
