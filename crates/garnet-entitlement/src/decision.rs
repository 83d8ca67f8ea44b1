//! The outcome of one entitlement evaluation.

use std::collections::{BTreeMap, BTreeSet};

use garnet_policy::{MaskKind, RowFilter};
use serde::{Deserialize, Serialize};

/// What a user may do with one (source, table, columns) request.
///
/// Constructed by the decision engine and never mutated afterwards. A
/// denied decision carries only its reason: every grant field is empty, so
/// a caller that forgets to check `allowed` still gets nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementDecision {
    allowed: bool,
    denial_reason: Option<String>,
    allowed_columns: BTreeSet<String>,
    row_filters: Vec<RowFilter>,
    column_masks: BTreeMap<String, MaskKind>,
    applied_policies: Vec<String>,
}

impl EntitlementDecision {
    /// A denial. All grant fields stay empty.
    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            denial_reason: Some(reason.into()),
            allowed_columns: BTreeSet::new(),
            row_filters: Vec::new(),
            column_masks: BTreeMap::new(),
            applied_policies: Vec::new(),
        }
    }

    /// An approval carrying the computed grants.
    pub fn allow(
        allowed_columns: BTreeSet<String>,
        row_filters: Vec<RowFilter>,
        column_masks: BTreeMap<String, MaskKind>,
        applied_policies: Vec<String>,
    ) -> Self {
        Self {
            allowed: true,
            denial_reason: None,
            allowed_columns,
            row_filters,
            column_masks,
            applied_policies,
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.allowed
    }

    pub fn denial_reason(&self) -> Option<&str> {
        self.denial_reason.as_deref()
    }

    /// Columns the caller may read. Always a subset of the requested
    /// columns when `allowed` is true.
    pub fn allowed_columns(&self) -> &BTreeSet<String> {
        &self.allowed_columns
    }

    /// Row predicates to merge into the scan, placeholder-resolved.
    pub fn row_filters(&self) -> &[RowFilter] {
        &self.row_filters
    }

    /// Masks to apply to returned rows, keyed by column.
    pub fn column_masks(&self) -> &BTreeMap<String, MaskKind> {
        &self.column_masks
    }

    /// Ids of every matching policy whose condition held, whether or not
    /// it changed the outcome. Audit trail, not behavior.
    pub fn applied_policies(&self) -> &[String] {
        &self.applied_policies
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_decision_grants_nothing() {
        let decision = EntitlementDecision::deny("User not authenticated");
        assert!(!decision.is_allowed());
        assert_eq!(decision.denial_reason(), Some("User not authenticated"));
        assert!(decision.allowed_columns().is_empty());
        assert!(decision.row_filters().is_empty());
        assert!(decision.column_masks().is_empty());
        assert!(decision.applied_policies().is_empty());
    }

    #[test]
    fn test_allowed_decision_carries_grants() {
        let decision = EntitlementDecision::allow(
            BTreeSet::from(["id".to_string(), "title".to_string()]),
            Vec::new(),
            BTreeMap::new(),
            vec!["cls-1".to_string()],
        );
        assert!(decision.is_allowed());
        assert_eq!(decision.denial_reason(), None);
        assert_eq!(decision.allowed_columns().len(), 2);
        assert_eq!(decision.applied_policies(), ["cls-1"]);
    }
}
