//! # Garnet
//!
//! Entitlement-enforcing SQL gateway for SaaS data sources.
//!
//! Garnet sits between callers and source systems (GitHub, Jira, ...),
//! accepts a SQL subset against virtual tables, and enforces per-tenant
//! policy before any row leaves the gateway:
//!
//! - **Row-level security** - RLS policies become connector predicates
//! - **Column-level security** - CLS policies prune the projection
//! - **Masking** - mask policies rewrite values gateway-side
//! - **Admission** - per-(tenant, user, connector) token buckets
//! - **Caching** - staleness-bounded result cache per principal
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Garnet                             │
//! │  ┌─────────┐   ┌─────────────┐   ┌───────────┐   ┌────────┐ │
//! │  │   SQL   │ → │ Entitlement │ → │ Admission │ → │  Scan  │ │
//! │  │ (parse) │   │ (decide)    │   │ (bucket)  │   │ (mask) │ │
//! │  └─────────┘   └─────────────┘   └───────────┘   └────────┘ │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use garnet::Gateway;
//!
//! let gateway = Gateway::new();
//! gateway.assign_roles("tenant1", "john_doe", vec!["USER".to_string()]);
//!
//! let result = gateway.query("SELECT id, title FROM github_issues", "tenant1", "john_doe");
//! assert!(result.is_success());
//! ```
//!
//! # Modules
//!
//! - **Assembly**: [`Gateway`] - default stack behind one constructor
//! - **Pipeline**: [`QueryService`], [`QueryOrchestrator`] - SQL in, result out
//! - **Policy**: [`PolicyDefinition`], [`EntitlementEngine`] - who sees what

mod gateway;

// Assembly helper
pub use gateway::Gateway;

// Re-export core identifiers and row values
pub use garnet_types::{ConnectorType, Filter, FilterOperator, Row, TenantId, TraceId, UserId};

// Re-export the policy model
pub use garnet_policy::{
    AccessAction, Condition, DefinitionError, InMemoryPolicyStore, MaskKind, Policy,
    PolicyDefinition, PolicyRule, PolicyStore, RowFilter, SourcePermissions,
};

// Re-export the decision engine
pub use garnet_entitlement::{
    EntitlementContext, EntitlementDecision, EntitlementEngine, MissingPermissions,
    apply_column_masks, apply_row_filters,
};

// Re-export admission control
pub use garnet_admission::{AdmissionController, AdmissionDecision, AdmissionKey, BucketConfig};

// Re-export the result cache
pub use garnet_cache::{CacheKey, ResultCache};

// Re-export the connector contract and mocks
pub use garnet_connector::{
    ConnectRequest, Connector, ConnectorError, ConnectorFactory, ConnectorHandle,
    GitHubMockConnector, JiraMockConnector, RowPage, ScanRequest,
};

// Re-export the pipeline
pub use garnet_server::{
    ExecutionLog, InMemoryExecutionLog, InMemoryRoleProvider, ParsedQuery, QueryExecution,
    QueryOrchestrator, QueryPlan, QueryResult, QueryService, QueryState, QueryStatus,
    RoleProvider, ServerError, parse_query,
};

// Re-export configuration
pub use garnet_config::{
    AdmissionConfig, CacheConfig, ConfigLoader, EntitlementConfig, GarnetConfig, ServerConfig,
};
