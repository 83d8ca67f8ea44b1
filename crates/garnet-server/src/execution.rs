//! Execution records and the audit log.
//!
//! Every query attempt leaves exactly one record behind, keyed by trace
//! id, walking a small state machine from `Pending` to a terminal state.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use garnet_types::{ConnectorType, TenantId, TraceId, UserId};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Lifecycle states of a query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryState {
    Pending,
    Validating,
    Executing,
    RateLimited,
    Completed,
    Failed,
    Cancelled,
}

impl QueryState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// One query attempt's audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryExecution {
    pub trace_id: TraceId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub sql: String,
    pub connector_type: ConnectorType,
    pub resource: String,
    pub state: QueryState,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub row_count: Option<u64>,
    pub execution_time_ms: Option<u64>,
    pub freshness_ms: Option<u64>,
    pub cache_hit: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl QueryExecution {
    pub fn new(
        trace_id: TraceId,
        tenant_id: TenantId,
        user_id: UserId,
        sql: impl Into<String>,
        connector_type: ConnectorType,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            trace_id,
            tenant_id,
            user_id,
            sql: sql.into(),
            connector_type,
            resource: resource.into(),
            state: QueryState::Pending,
            started_at: Utc::now(),
            completed_at: None,
            row_count: None,
            execution_time_ms: None,
            freshness_ms: None,
            cache_hit: false,
            error_code: None,
            error_message: None,
        }
    }
}

/// Sink for execution records.
///
/// Implementations must be safe to share across worker threads.
pub trait ExecutionLog: Send + Sync + std::fmt::Debug {
    fn create(&self, execution: QueryExecution);

    fn update_state(&self, trace_id: &TraceId, state: QueryState);

    /// Mark the record completed and stamp its outcome fields.
    fn complete(&self, trace_id: &TraceId, row_count: u64, execution_time_ms: u64, freshness_ms: u64, cache_hit: bool);

    /// Mark the record failed with a stable error code.
    fn fail(&self, trace_id: &TraceId, error_code: &str, error_message: &str, execution_time_ms: u64);

    fn get(&self, trace_id: &TraceId) -> Option<QueryExecution>;

    /// Most recent records for a tenant, newest first.
    fn recent(&self, tenant_id: &TenantId, limit: usize) -> Vec<QueryExecution>;

    fn by_state(&self, state: QueryState) -> Vec<QueryExecution>;
}

/// In-memory execution log backed by a mutexed map.
#[derive(Debug, Default)]
pub struct InMemoryExecutionLog {
    records: Mutex<HashMap<TraceId, QueryExecution>>,
}

impl InMemoryExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().expect("execution log lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update<F>(&self, trace_id: &TraceId, apply: F)
    where
        F: FnOnce(&mut QueryExecution),
    {
        let mut records = self.records.lock().expect("execution log lock poisoned");
        if let Some(record) = records.get_mut(trace_id) {
            apply(record);
        } else {
            warn!(trace_id = %trace_id, "update for unknown execution record");
        }
    }
}

impl ExecutionLog for InMemoryExecutionLog {
    fn create(&self, execution: QueryExecution) {
        self.records
            .lock()
            .expect("execution log lock poisoned")
            .insert(execution.trace_id, execution);
    }

    fn update_state(&self, trace_id: &TraceId, state: QueryState) {
        self.update(trace_id, |record| record.state = state);
    }

    fn complete(&self, trace_id: &TraceId, row_count: u64, execution_time_ms: u64, freshness_ms: u64, cache_hit: bool) {
        self.update(trace_id, |record| {
            record.state = QueryState::Completed;
            record.completed_at = Some(Utc::now());
            record.row_count = Some(row_count);
            record.execution_time_ms = Some(execution_time_ms);
            record.freshness_ms = Some(freshness_ms);
            record.cache_hit = cache_hit;
        });
    }

    fn fail(&self, trace_id: &TraceId, error_code: &str, error_message: &str, execution_time_ms: u64) {
        self.update(trace_id, |record| {
            record.state = QueryState::Failed;
            record.completed_at = Some(Utc::now());
            record.execution_time_ms = Some(execution_time_ms);
            record.error_code = Some(error_code.to_string());
            record.error_message = Some(error_message.to_string());
        });
    }

    fn get(&self, trace_id: &TraceId) -> Option<QueryExecution> {
        self.records
            .lock()
            .expect("execution log lock poisoned")
            .get(trace_id)
            .cloned()
    }

    fn recent(&self, tenant_id: &TenantId, limit: usize) -> Vec<QueryExecution> {
        let records = self.records.lock().expect("execution log lock poisoned");
        let mut matching: Vec<QueryExecution> = records
            .values()
            .filter(|record| &record.tenant_id == tenant_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        matching.truncate(limit);
        matching
    }

    fn by_state(&self, state: QueryState) -> Vec<QueryExecution> {
        self.records
            .lock()
            .expect("execution log lock poisoned")
            .values()
            .filter(|record| record.state == state)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(tenant: &str) -> QueryExecution {
        QueryExecution::new(
            TraceId::new(),
            TenantId::from(tenant),
            UserId::from("alice"),
            "SELECT * FROM github_issues",
            ConnectorType::GitHub,
            "issues",
        )
    }

    #[test]
    fn test_create_and_get() {
        let log = InMemoryExecutionLog::new();
        let execution = record("acme");
        let trace_id = execution.trace_id;
        log.create(execution);

        let fetched = log.get(&trace_id).expect("record should exist");
        assert_eq!(fetched.state, QueryState::Pending);
        assert_eq!(fetched.resource, "issues");
        assert!(fetched.completed_at.is_none());
    }

    #[test]
    fn test_complete_stamps_outcome() {
        let log = InMemoryExecutionLog::new();
        let execution = record("acme");
        let trace_id = execution.trace_id;
        log.create(execution);

        log.update_state(&trace_id, QueryState::Executing);
        log.complete(&trace_id, 8, 12, 0, false);

        let fetched = log.get(&trace_id).expect("record should exist");
        assert_eq!(fetched.state, QueryState::Completed);
        assert_eq!(fetched.row_count, Some(8));
        assert_eq!(fetched.execution_time_ms, Some(12));
        assert!(fetched.completed_at.is_some());
        assert!(fetched.state.is_terminal());
    }

    #[test]
    fn test_fail_stamps_error() {
        let log = InMemoryExecutionLog::new();
        let execution = record("acme");
        let trace_id = execution.trace_id;
        log.create(execution);

        log.fail(&trace_id, "ENTITLEMENT_DENIED", "Access denied: no table access", 3);

        let fetched = log.get(&trace_id).expect("record should exist");
        assert_eq!(fetched.state, QueryState::Failed);
        assert_eq!(fetched.error_code.as_deref(), Some("ENTITLEMENT_DENIED"));
        assert_eq!(fetched.execution_time_ms, Some(3));
        assert!(fetched.completed_at.is_some());
    }

    #[test]
    fn test_update_unknown_trace_is_noop() {
        let log = InMemoryExecutionLog::new();
        log.update_state(&TraceId::new(), QueryState::Executing);
        assert!(log.is_empty());
    }

    #[test]
    fn test_recent_filters_by_tenant_and_orders_newest_first() {
        let log = InMemoryExecutionLog::new();
        for _ in 0..3 {
            log.create(record("acme"));
        }
        log.create(record("globex"));

        let recent = log.recent(&TenantId::from("acme"), 2);
        assert_eq!(recent.len(), 2);
        assert!(recent.iter().all(|r| r.tenant_id == TenantId::from("acme")));
        assert!(recent[0].started_at >= recent[1].started_at);
    }

    #[test]
    fn test_by_state() {
        let log = InMemoryExecutionLog::new();
        let failing = record("acme");
        let failing_trace = failing.trace_id;
        log.create(failing);
        log.create(record("acme"));
        log.fail(&failing_trace, "EXECUTION_ERROR", "boom", 1);

        assert_eq!(log.by_state(QueryState::Failed).len(), 1);
        assert_eq!(log.by_state(QueryState::Pending).len(), 1);
        assert!(log.by_state(QueryState::Cancelled).is_empty());
    }
}
