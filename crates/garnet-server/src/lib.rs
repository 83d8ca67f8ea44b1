//! # garnet-server: Query orchestration and the caller-level service
//!
//! This crate ties the pipeline together:
//!
//! - [`QueryService`] — the front door: SQL in, [`QueryResult`] out
//! - [`QueryOrchestrator`] — drives one plan through entitlement,
//!   admission, and the connector
//! - [`sql`] — the SQL-to-plan adapter
//! - [`ExecutionLog`] — the per-attempt audit trail
//!
//! The pipeline never returns a transport-level error to callers: every
//! failure mode folds into the result payload under one of the stable
//! error codes defined in [`ServerError`].

pub mod error;
pub mod execution;
pub mod orchestrator;
pub mod plan;
pub mod result;
pub mod roles;
pub mod service;
pub mod sql;

pub use error::{Result, ServerError};
pub use execution::{ExecutionLog, InMemoryExecutionLog, QueryExecution, QueryState};
pub use orchestrator::QueryOrchestrator;
pub use plan::QueryPlan;
pub use result::{QueryResult, QueryStatus};
pub use roles::{InMemoryRoleProvider, RoleProvider};
pub use service::QueryService;
pub use sql::{ParsedQuery, parse_query};
