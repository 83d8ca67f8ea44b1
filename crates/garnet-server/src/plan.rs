//! Query plan value object.

use garnet_types::{ConnectorType, Filter, TenantId, TraceId, UserId};

/// Fully resolved description of one query, produced by the service layer
/// and consumed by the orchestrator. Immutable once built.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub trace_id: TraceId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    /// Original query text, kept for execution records and cache keys.
    pub sql: String,
    pub connector_type: ConnectorType,
    /// Connector-side resource name ("issues", "pulls", ...).
    pub resource: String,
    /// Columns the caller asked for. Empty means all columns.
    pub columns: Vec<String>,
    /// Predicates translated from the query's WHERE clause.
    pub predicates: Vec<Filter>,
    pub limit: u32,
    pub max_staleness_ms: u64,
}

impl QueryPlan {
    pub fn new(
        tenant_id: impl Into<TenantId>,
        user_id: impl Into<UserId>,
        sql: impl Into<String>,
        connector_type: ConnectorType,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            trace_id: TraceId::new(),
            tenant_id: tenant_id.into(),
            user_id: user_id.into(),
            sql: sql.into(),
            connector_type,
            resource: resource.into(),
            columns: Vec::new(),
            predicates: Vec::new(),
            limit: 100,
            max_staleness_ms: 60_000,
        }
    }

    #[must_use]
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn with_predicates(mut self, predicates: Vec<Filter>) -> Self {
        self.predicates = predicates;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_max_staleness_ms(mut self, max_staleness_ms: u64) -> Self {
        self.max_staleness_ms = max_staleness_ms;
        self
    }

    #[must_use]
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = trace_id;
        self
    }
}
