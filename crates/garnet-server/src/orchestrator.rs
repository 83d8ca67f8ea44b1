//! Query orchestration.
//!
//! Drives one planned query through the full pipeline: audit record,
//! entitlement decision, admission, connector execution, and mask
//! application. Every attempt leaves exactly one execution record and
//! produces exactly one [`QueryResult`], whatever path it takes.

use std::sync::Arc;
use std::time::Instant;

use garnet_admission::{AdmissionController, AdmissionKey};
use garnet_connector::{ConnectRequest, ConnectorFactory, ScanRequest};
use garnet_entitlement::{
    EntitlementContext, EntitlementDecision, EntitlementEngine, apply_column_masks,
};
use garnet_policy::RowFilter;
use garnet_types::{Filter, Row};
use tracing::{debug, info};

use crate::error::{Result, ServerError};
use crate::execution::{ExecutionLog, QueryExecution, QueryState};
use crate::plan::QueryPlan;
use crate::result::QueryResult;

/// Drives planned queries end to end.
pub struct QueryOrchestrator {
    factory: Arc<ConnectorFactory>,
    engine: EntitlementEngine,
    admission: Arc<AdmissionController>,
    log: Arc<dyn ExecutionLog>,
}

impl QueryOrchestrator {
    pub fn new(
        factory: Arc<ConnectorFactory>,
        engine: EntitlementEngine,
        admission: Arc<AdmissionController>,
        log: Arc<dyn ExecutionLog>,
    ) -> Self {
        Self {
            factory,
            engine,
            admission,
            log,
        }
    }

    /// Executes one planned query for the given principal context.
    ///
    /// Pipeline order is load-bearing: the entitlement decision comes
    /// before admission so a denied caller never consumes quota, and the
    /// execution record is created before any step that can fail.
    pub fn execute(&self, plan: &QueryPlan, context: &EntitlementContext) -> QueryResult {
        let started = Instant::now();

        self.log.create(QueryExecution::new(
            plan.trace_id,
            plan.tenant_id.clone(),
            plan.user_id.clone(),
            plan.sql.clone(),
            plan.connector_type,
            plan.resource.clone(),
        ));
        self.log.update_state(&plan.trace_id, QueryState::Validating);

        // Entitlement
        let decision = self.engine.authorize(context, plan.connector_type.id());
        if !decision.is_allowed() {
            let reason = decision.denial_reason().unwrap_or("not permitted");
            let error = ServerError::EntitlementDenied(reason.to_string());
            return self.finish_failed(plan, started, &error);
        }

        // Admission
        let key = AdmissionKey::new(
            plan.tenant_id.clone(),
            plan.user_id.clone(),
            plan.connector_type,
        );
        let admitted = self.admission.admit(&key);
        if !admitted.allowed {
            let retry_after = admitted.retry_after_seconds.unwrap_or(0);
            let message = admitted.message.unwrap_or_else(|| {
                format!(
                    "Rate limit exceeded for {}. Please retry after {retry_after} seconds.",
                    plan.connector_type.display_name()
                )
            });
            let execution_time_ms = started.elapsed().as_millis() as u64;
            self.log.update_state(&plan.trace_id, QueryState::RateLimited);
            self.log
                .fail(&plan.trace_id, "RATE_LIMIT_EXCEEDED", &message, execution_time_ms);
            let result = QueryResult::rate_limited(retry_after, message)
                .with_trace_id(plan.trace_id.to_string())
                .with_execution_time_ms(execution_time_ms);
            self.emit_metrics(plan, &result);
            return result;
        }

        // Execution
        self.log.update_state(&plan.trace_id, QueryState::Executing);
        match self.execute_on_connector(plan, &decision) {
            Ok((rows, next_page_token, freshness_ms)) => {
                let execution_time_ms = started.elapsed().as_millis() as u64;
                self.log.complete(
                    &plan.trace_id,
                    rows.len() as u64,
                    execution_time_ms,
                    freshness_ms,
                    false,
                );
                let result = QueryResult::success(rows, next_page_token, freshness_ms)
                    .with_trace_id(plan.trace_id.to_string())
                    .with_execution_time_ms(execution_time_ms)
                    .with_remaining_requests(admitted.remaining);
                self.emit_metrics(plan, &result);
                result
            }
            Err(error) => self.finish_failed(plan, started, &error),
        }
    }

    fn execute_on_connector(
        &self,
        plan: &QueryPlan,
        decision: &EntitlementDecision,
    ) -> Result<(Vec<Row>, Option<String>, u64)> {
        // Handle closes the connection on drop, whatever exit path we take.
        let handle = self.factory.acquire(plan.connector_type, &plan.tenant_id)?;
        handle.connect(&ConnectRequest::new(plan.tenant_id.clone()))?;

        let mut predicates: Vec<Filter> = plan.predicates.clone();
        predicates.extend(decision.row_filters().iter().map(RowFilter::to_predicate));

        let columns = filter_columns(&plan.columns, decision);
        debug!(
            trace_id = %plan.trace_id,
            resource = %plan.resource,
            columns = columns.len(),
            predicates = predicates.len(),
            "scanning connector"
        );

        let request = ScanRequest::new(plan.tenant_id.clone(), plan.resource.clone())
            .with_columns(columns)
            .with_predicates(predicates)
            .with_limit(plan.limit)
            .with_max_staleness_ms(plan.max_staleness_ms);
        let page = handle.scan(&request)?;

        // Masking happens gateway-side so plaintext never reaches callers.
        let masked = apply_column_masks(page.rows, decision.column_masks());
        Ok((masked, page.next_page_token, page.freshness_ms))
    }

    fn finish_failed(&self, plan: &QueryPlan, started: Instant, error: &ServerError) -> QueryResult {
        let execution_time_ms = started.elapsed().as_millis() as u64;
        let message = error.to_string();
        self.log
            .fail(&plan.trace_id, error.error_code(), &message, execution_time_ms);
        let result = QueryResult::error(error.error_code(), message)
            .with_trace_id(plan.trace_id.to_string())
            .with_execution_time_ms(execution_time_ms);
        self.emit_metrics(plan, &result);
        result
    }

    /// One structured line per attempt, success or not.
    fn emit_metrics(&self, plan: &QueryPlan, result: &QueryResult) {
        info!(
            tenant_id = %plan.tenant_id,
            user_id = %plan.user_id,
            resource = %plan.resource,
            status = ?result.status,
            rows = result.rows.len(),
            execution_time_ms = result.execution_time_ms,
            "query finished"
        );
    }
}

/// Intersects the requested columns with the decision's allowed set.
///
/// An empty allowed set means the decision imposed no column restriction,
/// so the request passes through untouched.
fn filter_columns(requested: &[String], decision: &EntitlementDecision) -> Vec<String> {
    if decision.allowed_columns().is_empty() {
        return requested.to_vec();
    }
    requested
        .iter()
        .filter(|column| decision.allowed_columns().contains(*column))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    fn allow_with_columns(columns: &[&str]) -> EntitlementDecision {
        EntitlementDecision::allow(
            columns.iter().map(ToString::to_string).collect::<BTreeSet<_>>(),
            Vec::new(),
            std::collections::BTreeMap::new(),
            Vec::new(),
        )
    }

    #[test]
    fn test_filter_columns_with_no_restriction() {
        let requested = vec!["id".to_string(), "email".to_string()];
        let decision = allow_with_columns(&[]);
        assert_eq!(filter_columns(&requested, &decision), requested);
    }

    #[test]
    fn test_filter_columns_intersects() {
        let requested = vec!["id".to_string(), "email".to_string(), "ssn".to_string()];
        let decision = allow_with_columns(&["id", "email"]);
        assert_eq!(filter_columns(&requested, &decision), vec!["id", "email"]);
    }

    #[test]
    fn test_filter_columns_select_star_stays_unrestricted() {
        // SELECT * arrives as an empty request; with an empty allowed set
        // the scan keeps every column.
        let decision = allow_with_columns(&[]);
        assert!(filter_columns(&[], &decision).is_empty());
    }
}
