//! # garnet-policy: Entitlement Policy Model
//!
//! The policy vocabulary for `Garnet`'s entitlement engine: what a policy
//! is, whom it applies to, and what it does to a query.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                  PolicyDefinition (at rest)             │
//! │   type/action strings + JSON config, serde-friendly     │
//! └───────────────────────────┬─────────────────────────────┘
//!                             │ to_policy() — validates,
//!                             │ parses condition text once
//! ┌───────────────────────────▼─────────────────────────────┐
//! │                      Policy (in memory)                 │
//! │  id · patterns · Condition · priority · PolicyRule      │
//! │                                                         │
//! │  PolicyRule::TableAccess   allow/deny the whole table   │
//! │  PolicyRule::RowFilter     append a row predicate (RLS) │
//! │  PolicyRule::Columns       prune columns (CLS)          │
//! │  PolicyRule::MaskColumn    transform values (masking)   │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use garnet_policy::condition::Condition;
//! use garnet_policy::policy::{Policy, PolicyRule, AccessAction};
//! use std::collections::{HashMap, HashSet};
//!
//! // Contractors may not read audit logs, anywhere.
//! let policy = Policy::new(
//!     "deny-audit-contractors",
//!     PolicyRule::TableAccess { action: AccessAction::Deny },
//! )
//! .with_table_pattern("audit_logs")
//! .with_condition(Condition::parse("user.role == 'CONTRACTOR'"))
//! .with_priority(100);
//!
//! assert!(policy.matches("github", "audit_logs"));
//! let contractor: HashSet<String> = ["CONTRACTOR".to_string()].into();
//! assert!(policy.applies_to(&contractor, &HashMap::new()));
//! ```
//!
//! Policies scope, narrow, and transform; they never widen a grant beyond
//! what [`permissions::SourcePermissions`] allows. The decision engine that
//! composes them lives in `garnet-entitlement`.

pub mod condition;
pub mod definition;
pub mod mask;
pub mod permissions;
pub mod policy;
pub mod store;

pub use condition::{AttributePath, Comparator, Condition};
pub use definition::{DefinitionError, PolicyDefinition};
pub use mask::MaskKind;
pub use permissions::SourcePermissions;
pub use policy::{AccessAction, Policy, PolicyRule, PolicyType, RowFilter};
pub use store::{InMemoryPolicyStore, PolicyStore};
