//! The pure decision function.
//!
//! [`decide`] composes a policy list, a request context, and source-level
//! permissions into one [`EntitlementDecision`]. It reads everything and
//! mutates nothing, so concurrent requests can decide in parallel without
//! coordination.
//!
//! Evaluation order (the precedence rules live here, nowhere else):
//!
//! 1. Unauthenticated ⇒ deny.
//! 2. A matching TABLE_ACCESS/DENY whose condition holds ⇒ deny. Deny is
//!    checked before allow across the whole list, so no allow at any
//!    priority can shadow a deny.
//! 3. A matching TABLE_ACCESS/ALLOW whose condition holds ⇒ allow all
//!    requested columns and skip CLS/RLS/masking (administrative bypass).
//! 4. Source permissions gate the table; CLS policies prune columns; RLS
//!    policies contribute row filters; mask policies contribute masks.

use std::collections::{BTreeMap, BTreeSet};

use garnet_policy::{
    AccessAction, MaskKind, Policy, PolicyRule, RowFilter, SourcePermissions,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{context::EntitlementContext, decision::EntitlementDecision};

// ============================================================================
// Missing-permissions mode
// ============================================================================

/// What to do when the context carries no [`SourcePermissions`] for the
/// source being queried.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingPermissions {
    /// Synthesize a grant covering exactly the requested table and
    /// columns. Fail-open, but only to the shape of the request; kept as
    /// the default for deployments that never populate source permissions.
    #[default]
    AllowRequested,
    /// Deny the request outright.
    Deny,
}

// ============================================================================
// decide
// ============================================================================

/// Evaluates one access request against a pre-filtered, priority-sorted
/// policy list.
///
/// `policies` must already be restricted to enabled policies whose
/// patterns match `(source_id, table_name)`, sorted by priority descending
/// — the contract the policy store provides.
pub fn decide(
    policies: &[Policy],
    context: &EntitlementContext,
    source_id: &str,
    table_name: &str,
    requested_columns: &[String],
    missing_permissions: MissingPermissions,
) -> EntitlementDecision {
    // 1. Anonymous callers get nothing.
    if context.user_id().is_none() {
        return EntitlementDecision::deny("User not authenticated");
    }

    let holds =
        |policy: &Policy| policy.applies_to(context.roles(), context.attributes());

    // 2. Deny-first: scan the whole list for table denials before looking
    // at any allow, so priority ordering can never flip a deny.
    for policy in policies {
        if let PolicyRule::TableAccess {
            action: AccessAction::Deny,
        } = policy.rule()
            && holds(policy)
        {
            debug!(policy_id = %policy.id(), "table access denied by policy");
            return EntitlementDecision::deny(format!(
                "Access denied by policy: {}",
                policy.id()
            ));
        }
    }

    // 3. Administrative bypass: the first holding allow grants the full
    // request and skips CLS/RLS/masking entirely.
    for policy in policies {
        if let PolicyRule::TableAccess {
            action: AccessAction::Allow,
        } = policy.rule()
            && holds(policy)
        {
            debug!(policy_id = %policy.id(), "table access allowed by policy (bypass)");
            return EntitlementDecision::allow(
                requested_columns.iter().cloned().collect(),
                Vec::new(),
                BTreeMap::new(),
                vec![policy.id().to_string()],
            );
        }
    }

    // 4. Resolve source permissions, or synthesize per the configured mode.
    let synthesized;
    let source_perms = match context.source_permissions(source_id) {
        Some(perms) => perms,
        None => match missing_permissions {
            MissingPermissions::AllowRequested => {
                debug!(
                    source_id,
                    table_name,
                    "no source permissions recorded; granting the requested shape"
                );
                synthesized =
                    SourcePermissions::permissive(table_name, requested_columns.iter().cloned());
                &synthesized
            }
            MissingPermissions::Deny => {
                return EntitlementDecision::deny(format!(
                    "No source permissions recorded for source: {source_id}"
                ));
            }
        },
    };

    // 5. The source must grant the table at all.
    if !source_perms.can_read_table(table_name) {
        return EntitlementDecision::deny(format!(
            "User cannot access table: {table_name} in source: {source_id}"
        ));
    }

    // 6-8. Compose grants from the remaining policy kinds.
    let allowed_columns =
        compute_allowed_columns(policies, context, source_perms, table_name, requested_columns);
    let row_filters = compute_row_filters(policies, context);
    let column_masks = compute_column_masks(policies, context, requested_columns);

    // 9. Audit trail: every matching policy whose condition held.
    let applied_policies = policies
        .iter()
        .filter(|policy| holds(policy))
        .map(|policy| policy.id().to_string())
        .collect();

    EntitlementDecision::allow(allowed_columns, row_filters, column_masks, applied_policies)
}

/// Requested ∩ source grant (when the source records columns), then CLS
/// policies applied in priority order: deny removes, allow intersects.
fn compute_allowed_columns(
    policies: &[Policy],
    context: &EntitlementContext,
    source_perms: &SourcePermissions,
    table_name: &str,
    requested_columns: &[String],
) -> BTreeSet<String> {
    let mut allowed: BTreeSet<String> = requested_columns.iter().cloned().collect();

    if let Some(source_columns) = source_perms.columns_for_table(table_name)
        && !source_columns.is_empty()
    {
        allowed.retain(|column| source_columns.contains(column));
    }

    for policy in policies {
        let PolicyRule::Columns { action, columns } = policy.rule() else {
            continue;
        };
        if !policy.applies_to(context.roles(), context.attributes()) {
            continue;
        }
        match action {
            AccessAction::Deny => {
                allowed.retain(|column| !columns.contains(column));
                debug!(policy_id = %policy.id(), removed = ?columns, "CLS deny pruned columns");
            }
            AccessAction::Allow => {
                allowed.retain(|column| columns.contains(column));
                debug!(policy_id = %policy.id(), kept = ?columns, "CLS allow restricted columns");
            }
        }
    }

    allowed
}

/// RLS filters in priority order, with `${user.*}` placeholders resolved
/// against the context.
fn compute_row_filters(policies: &[Policy], context: &EntitlementContext) -> Vec<RowFilter> {
    let mut filters = Vec::new();
    for policy in policies {
        let PolicyRule::RowFilter(filter) = policy.rule() else {
            continue;
        };
        if !policy.applies_to(context.roles(), context.attributes()) {
            continue;
        }
        let resolved = substitute_placeholder(filter, context);
        debug!(policy_id = %policy.id(), filter = %resolved, "added RLS filter");
        filters.push(resolved);
    }
    filters
}

/// Masks for requested columns, later policies overwriting earlier ones
/// for the same column.
fn compute_column_masks(
    policies: &[Policy],
    context: &EntitlementContext,
    requested_columns: &[String],
) -> BTreeMap<String, MaskKind> {
    let mut masks = BTreeMap::new();
    for policy in policies {
        let PolicyRule::MaskColumn { column, mask } = policy.rule() else {
            continue;
        };
        if !policy.applies_to(context.roles(), context.attributes()) {
            continue;
        }
        if !requested_columns.iter().any(|requested| requested == column) {
            continue;
        }
        debug!(policy_id = %policy.id(), column, "added column mask");
        masks.insert(column.clone(), *mask);
    }
    masks
}

/// Resolves a whole-value `${user.<attr>}` placeholder against the context.
///
/// `user.id` and `user.email` read the principal fields; any other
/// `user.<attr>` reads the attribute map. A placeholder that resolves to
/// nothing is forwarded literally: it matches no real value downstream,
/// which fails closed, and the miss is logged for the policy author.
pub fn substitute_placeholder(filter: &RowFilter, context: &EntitlementContext) -> RowFilter {
    let value = filter.value.as_str();
    let Some(placeholder) = value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
    else {
        return filter.clone();
    };

    let resolved = match placeholder {
        "user.id" => context.user_id().map(|user| user.as_str().to_string()),
        "user.email" => context.email().map(str::to_string),
        other => other
            .strip_prefix("user.")
            .and_then(|attr| context.attribute(attr))
            .map(str::to_string),
    };

    match resolved {
        Some(resolved) => {
            let mut substituted = filter.clone();
            substituted.value = resolved;
            substituted
        }
        None => {
            warn!(
                placeholder = %value,
                policy_id = %filter.policy_id,
                "row filter placeholder did not resolve; forwarding literally"
            );
            filter.clone()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use garnet_policy::Condition;
    use garnet_types::{FilterOperator, TenantId, UserId};
    use proptest::prelude::*;
    use test_case::test_case;

    use super::*;

    fn context() -> EntitlementContext {
        EntitlementContext::new(TenantId::new("tenant1"), "issues")
            .with_user(UserId::new("john_doe"))
            .with_role("USER")
            .with_requested_columns(["id", "title", "email"])
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    fn table_access(id: &str, action: AccessAction) -> Policy {
        Policy::new(id, PolicyRule::TableAccess { action })
    }

    fn cls_deny(id: &str, denied: &[&str]) -> Policy {
        Policy::new(
            id,
            PolicyRule::Columns {
                action: AccessAction::Deny,
                columns: denied.iter().map(|column| (*column).to_string()).collect(),
            },
        )
    }

    fn decide_with(policies: &[Policy], context: &EntitlementContext, requested: &[&str]) -> EntitlementDecision {
        decide(
            policies,
            context,
            "github",
            "issues",
            &columns(requested),
            MissingPermissions::AllowRequested,
        )
    }

    #[test]
    fn test_anonymous_caller_is_denied() {
        let anonymous = EntitlementContext::new(TenantId::new("tenant1"), "issues");
        let decision = decide_with(&[], &anonymous, &["id"]);
        assert!(!decision.is_allowed());
        assert_eq!(decision.denial_reason(), Some("User not authenticated"));
    }

    #[test]
    fn test_no_policies_allows_requested_shape() {
        let decision = decide_with(&[], &context(), &["id", "title"]);
        assert!(decision.is_allowed());
        assert_eq!(
            decision.allowed_columns(),
            &BTreeSet::from(["id".to_string(), "title".to_string()])
        );
        assert!(decision.row_filters().is_empty());
        assert!(decision.column_masks().is_empty());
    }

    #[test]
    fn test_deny_wins_over_allow_at_any_priority() {
        // Allow outranks deny by priority; deny must still win.
        let policies = [
            table_access("allow-all", AccessAction::Allow).with_priority(1000),
            table_access("deny-all", AccessAction::Deny).with_priority(1),
        ];
        let decision = decide_with(&policies, &context(), &["id"]);
        assert!(!decision.is_allowed());
        assert_eq!(
            decision.denial_reason(),
            Some("Access denied by policy: deny-all")
        );
    }

    #[test]
    fn test_deny_with_failed_condition_is_skipped() {
        let policies = [
            table_access("deny-admins", AccessAction::Deny)
                .with_condition(Condition::parse("user.role == 'ADMIN'")),
        ];
        let decision = decide_with(&policies, &context(), &["id"]);
        assert!(decision.is_allowed());
    }

    #[test]
    fn test_allow_bypass_skips_cls_and_masks() {
        let policies = [
            table_access("admin-bypass", AccessAction::Allow),
            cls_deny("cls-email", &["email"]),
            Policy::new(
                "mask-email",
                PolicyRule::MaskColumn {
                    column: "email".to_string(),
                    mask: MaskKind::Hash,
                },
            ),
        ];
        let decision = decide_with(&policies, &context(), &["id", "email"]);
        assert!(decision.is_allowed());
        assert_eq!(
            decision.allowed_columns(),
            &BTreeSet::from(["id".to_string(), "email".to_string()])
        );
        assert!(decision.column_masks().is_empty());
        assert_eq!(decision.applied_policies(), ["admin-bypass"]);
    }

    #[test]
    fn test_missing_permissions_deny_mode() {
        let decision = decide(
            &[],
            &context(),
            "github",
            "issues",
            &columns(&["id"]),
            MissingPermissions::Deny,
        );
        assert!(!decision.is_allowed());
        assert_eq!(
            decision.denial_reason(),
            Some("No source permissions recorded for source: github")
        );
    }

    #[test]
    fn test_unreadable_table_is_denied() {
        let restricted = context().with_source_permissions(
            "github",
            SourcePermissions::new().with_table("pulls", ["id"]),
        );
        let decision = decide_with(&[], &restricted, &["id"]);
        assert!(!decision.is_allowed());
        assert_eq!(
            decision.denial_reason(),
            Some("User cannot access table: issues in source: github")
        );
    }

    #[test]
    fn test_source_columns_intersect_requested() {
        let granted = context().with_source_permissions(
            "github",
            SourcePermissions::new().with_table("issues", ["id", "title", "state"]),
        );
        let decision = decide_with(&[], &granted, &["id", "email"]);
        assert!(decision.is_allowed());
        assert_eq!(decision.allowed_columns(), &BTreeSet::from(["id".to_string()]));
    }

    #[test]
    fn test_empty_source_column_set_means_no_restriction() {
        let granted = context().with_source_permissions(
            "github",
            SourcePermissions::new().with_table("issues", Vec::<String>::new()),
        );
        let decision = decide_with(&[], &granted, &["id", "email"]);
        assert_eq!(decision.allowed_columns().len(), 2);
    }

    #[test]
    fn test_cls_deny_removes_listed_columns() {
        let policies = [cls_deny("cls-email", &["email"])];
        let decision = decide_with(&policies, &context(), &["id", "title", "email"]);
        assert!(decision.is_allowed());
        assert_eq!(
            decision.allowed_columns(),
            &BTreeSet::from(["id".to_string(), "title".to_string()])
        );
        assert_eq!(decision.applied_policies(), ["cls-email"]);
    }

    #[test]
    fn test_cls_allow_intersects() {
        let policies = [Policy::new(
            "cls-allow",
            PolicyRule::Columns {
                action: AccessAction::Allow,
                columns: BTreeSet::from(["id".to_string(), "state".to_string()]),
            },
        )];
        let decision = decide_with(&policies, &context(), &["id", "title"]);
        assert_eq!(decision.allowed_columns(), &BTreeSet::from(["id".to_string()]));
    }

    #[test]
    fn test_rls_filter_substitutes_user_id() {
        // The §8 scenario: USER role, condition excludes admins, filter
        // pinned to the requesting user.
        let policies = [Policy::new(
            "rls-own-rows",
            PolicyRule::RowFilter(
                RowFilter::new("assignee", FilterOperator::Equals, "${user.id}")
                    .from_policy("rls-own-rows"),
            ),
        )
        .with_condition(Condition::parse("user.role != 'ADMIN'"))];

        let decision = decide_with(&policies, &context(), &["id", "title"]);
        assert!(decision.is_allowed());
        assert_eq!(decision.row_filters().len(), 1);
        let filter = &decision.row_filters()[0];
        assert_eq!(filter.column, "assignee");
        assert_eq!(filter.operator, FilterOperator::Equals);
        assert_eq!(filter.value, "john_doe");
    }

    #[test]
    fn test_rls_filter_skipped_for_admins() {
        let policies = [Policy::new(
            "rls-own-rows",
            PolicyRule::RowFilter(RowFilter::new(
                "assignee",
                FilterOperator::Equals,
                "${user.id}",
            )),
        )
        .with_condition(Condition::parse("user.role != 'ADMIN'"))];

        let admin = context().with_role("ADMIN");
        let decision = decide_with(&policies, &admin, &["id"]);
        assert!(decision.row_filters().is_empty());
    }

    #[test_case("${user.email}", "john@example.com")]
    #[test_case("${user.region}", "eu")]
    #[test_case("${user.team}", "${user.team}"; "unresolvable stays literal")]
    #[test_case("id is ${user.id}", "id is ${user.id}"; "partial placeholder untouched")]
    fn test_placeholder_resolution_paths(value: &str, expected: &str) {
        let rich = context()
            .with_email("john@example.com")
            .with_attribute("region", "eu");

        let filter = RowFilter::new("owner", FilterOperator::Equals, value);
        assert_eq!(substitute_placeholder(&filter, &rich).value, expected);
    }

    #[test]
    fn test_masks_only_cover_requested_columns() {
        let mask = |id: &str, column: &str, kind: MaskKind| {
            Policy::new(
                id,
                PolicyRule::MaskColumn {
                    column: column.to_string(),
                    mask: kind,
                },
            )
        };
        let policies = [
            mask("mask-email", "email", MaskKind::Hash),
            mask("mask-phone", "phone", MaskKind::Partial),
        ];
        let decision = decide_with(&policies, &context(), &["id", "email"]);
        assert_eq!(decision.column_masks().len(), 1);
        assert_eq!(decision.column_masks().get("email"), Some(&MaskKind::Hash));
    }

    #[test]
    fn test_later_mask_overwrites_earlier_for_same_column() {
        let policies = [
            Policy::new(
                "mask-a",
                PolicyRule::MaskColumn {
                    column: "email".to_string(),
                    mask: MaskKind::Hash,
                },
            ),
            Policy::new(
                "mask-b",
                PolicyRule::MaskColumn {
                    column: "email".to_string(),
                    mask: MaskKind::Redact,
                },
            ),
        ];
        let decision = decide_with(&policies, &context(), &["email"]);
        assert_eq!(decision.column_masks().get("email"), Some(&MaskKind::Redact));
    }

    #[test]
    fn test_applied_policies_lists_every_holding_match() {
        let policies = [
            cls_deny("cls-email", &["email"]),
            Policy::new(
                "rls-own",
                PolicyRule::RowFilter(RowFilter::new(
                    "assignee",
                    FilterOperator::Equals,
                    "${user.id}",
                )),
            ),
            cls_deny("cls-admins-only", &["title"])
                .with_condition(Condition::parse("user.role == 'ADMIN'")),
        ];
        let decision = decide_with(&policies, &context(), &["id", "title", "email"]);
        // The admin-conditioned policy did not hold, so it is not listed.
        assert_eq!(decision.applied_policies(), ["cls-email", "rls-own"]);
    }

    proptest! {
        /// `allowed_columns ⊆ requested` no matter what CLS policies say.
        #[test]
        fn prop_allowed_columns_subset_of_requested(
            requested in proptest::collection::vec("[a-e]", 0..6),
            denied in proptest::collection::vec("[a-e]", 0..4),
            allowed in proptest::collection::vec("[a-e]", 0..4),
        ) {
            let policies = [
                cls_deny("cls-deny", &denied.iter().map(String::as_str).collect::<Vec<_>>()),
                Policy::new(
                    "cls-allow",
                    PolicyRule::Columns {
                        action: AccessAction::Allow,
                        columns: allowed.iter().cloned().collect(),
                    },
                ),
            ];
            let decision = decide(
                &policies,
                &context(),
                "github",
                "issues",
                &requested,
                MissingPermissions::AllowRequested,
            );
            prop_assert!(decision.is_allowed());
            for column in decision.allowed_columns() {
                prop_assert!(requested.contains(column));
                prop_assert!(!denied.contains(column));
            }
        }

        /// A holding table deny wins regardless of where it sits.
        #[test]
        fn prop_deny_always_wins(allow_priority in -100i32..100, deny_priority in -100i32..100) {
            let policies = [
                table_access("allow", AccessAction::Allow).with_priority(allow_priority),
                table_access("deny", AccessAction::Deny).with_priority(deny_priority),
            ];
            let decision = decide_with(&policies, &context(), &["id"]);
            prop_assert!(!decision.is_allowed());
        }
    }
}
