//! # garnet-entitlement: Entitlement Decision Engine
//!
//! Turns (policies, request context) into one [`EntitlementDecision`]:
//! may this user read this table, which columns, under which row filters,
//! with which values masked.
//!
//! The core is [`decide`], a pure function — no clocks, no I/O, no shared
//! state — which makes the precedence rules (deny before allow, bypass
//! before composition) testable in isolation and trivially parallel.
//! [`EntitlementEngine`] wraps it with policy loading and audit logging
//! for callers that hold a [`garnet_policy::PolicyStore`].
//!
//! ## Example
//!
//! ```
//! use garnet_entitlement::{EntitlementContext, MissingPermissions, decide};
//! use garnet_policy::{AccessAction, Condition, Policy, PolicyRule};
//! use garnet_types::{TenantId, UserId};
//!
//! let deny_contractors = Policy::new(
//!     "deny-audit",
//!     PolicyRule::TableAccess { action: AccessAction::Deny },
//! )
//! .with_table_pattern("audit_logs")
//! .with_condition(Condition::parse("user.role == 'CONTRACTOR'"));
//!
//! let context = EntitlementContext::new(TenantId::new("acme"), "audit_logs")
//!     .with_user(UserId::new("john_doe"))
//!     .with_role("CONTRACTOR");
//!
//! let decision = decide(
//!     &[deny_contractors],
//!     &context,
//!     "github",
//!     "audit_logs",
//!     &["id".to_string()],
//!     MissingPermissions::default(),
//! );
//! assert!(!decision.is_allowed());
//! ```

pub mod apply;
pub mod context;
pub mod decide;
pub mod decision;
pub mod engine;

pub use apply::{apply_column_masks, apply_row_filters};
pub use context::EntitlementContext;
pub use decide::{MissingPermissions, decide, substitute_placeholder};
pub use decision::EntitlementDecision;
pub use engine::EntitlementEngine;
