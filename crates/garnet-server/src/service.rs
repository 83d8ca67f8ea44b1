//! Caller-level query service.
//!
//! The entry point callers use: takes raw SQL plus a principal, resolves
//! roles, consults the result cache, translates the SQL into a plan, and
//! hands the plan to the orchestrator.

use std::sync::Arc;

use garnet_cache::{CacheKey, ResultCache};
use garnet_config::ServerConfig;
use garnet_entitlement::EntitlementContext;
use garnet_types::{ConnectorType, TenantId, UserId};
use tracing::debug;

use crate::error::ServerError;
use crate::orchestrator::QueryOrchestrator;
use crate::plan::QueryPlan;
use crate::result::QueryResult;
use crate::roles::RoleProvider;
use crate::sql::parse_query;

/// Virtual tables exposed to SQL, in the order error messages list them.
const TABLES: [(&str, ConnectorType); 4] = [
    ("github_issues", ConnectorType::GitHub),
    ("github_pulls", ConnectorType::GitHub),
    ("jira_issues", ConnectorType::Jira),
    ("jira_projects", ConnectorType::Jira),
];

/// Maps a virtual table name to its connector and resource.
///
/// The resource is the table name's suffix after the first underscore
/// ("github_issues" scans the "issues" resource).
fn resolve_table(table: &str) -> Option<(ConnectorType, &str)> {
    let connector = TABLES
        .iter()
        .find(|(name, _)| *name == table)
        .map(|(_, connector)| *connector)?;
    let resource = table.split_once('_').map_or(table, |(_, suffix)| suffix);
    Some((connector, resource))
}

fn available_tables() -> String {
    TABLES
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// SQL-in, result-out front door over the orchestrator.
pub struct QueryService {
    orchestrator: QueryOrchestrator,
    role_provider: Arc<dyn RoleProvider>,
    cache: Option<ResultCache<QueryResult>>,
    default_row_limit: u32,
    default_max_staleness_ms: u64,
}

impl QueryService {
    pub fn new(orchestrator: QueryOrchestrator, role_provider: Arc<dyn RoleProvider>) -> Self {
        Self {
            orchestrator,
            role_provider,
            cache: None,
            default_row_limit: 100,
            default_max_staleness_ms: 60_000,
        }
    }

    /// Enables result caching. Without a cache every query hits the
    /// connector.
    #[must_use]
    pub fn with_cache(mut self, cache: ResultCache<QueryResult>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Applies configured defaults for row limit and staleness tolerance.
    #[must_use]
    pub fn with_server_config(mut self, config: &ServerConfig) -> Self {
        self.default_row_limit = config.default_row_limit;
        self.default_max_staleness_ms = config.default_max_staleness_ms;
        self
    }

    /// Runs one SQL query for a principal.
    ///
    /// Never returns an `Err`: every failure mode is folded into the
    /// result payload with a stable error code.
    pub fn execute_sql(
        &self,
        sql: &str,
        tenant_id: impl Into<TenantId>,
        user_id: impl Into<UserId>,
        max_staleness_ms: Option<u64>,
    ) -> QueryResult {
        let tenant_id = tenant_id.into();
        let user_id = user_id.into();

        // Principal resolution comes first; an unknown user never reaches
        // parsing or the cache.
        let Some(roles) = self.role_provider.roles(&tenant_id, &user_id) else {
            return QueryResult::error(
                "AUTHENTICATION_FAILED",
                "User not found or not authorized for this tenant",
            );
        };

        let max_staleness_ms = max_staleness_ms.unwrap_or(self.default_max_staleness_ms);

        let key = CacheKey::for_query(&tenant_id, &user_id, sql);
        if let Some(cache) = &self.cache
            && let Some(hit) = cache.get(&key, max_staleness_ms)
        {
            debug!(tenant_id = %tenant_id, user_id = %user_id, "serving cached result");
            return hit;
        }

        let parsed = match parse_query(sql) {
            Ok(parsed) => parsed,
            Err(error) => {
                return QueryResult::error(error.error_code(), error.to_string());
            }
        };

        let Some((connector_type, resource)) = resolve_table(&parsed.table) else {
            let error = ServerError::InvalidTable {
                table: parsed.table.clone(),
                available: available_tables(),
            };
            return QueryResult::error(error.error_code(), error.to_string());
        };

        let plan = QueryPlan::new(
            tenant_id.clone(),
            user_id.clone(),
            sql,
            connector_type,
            resource,
        )
        .with_columns(parsed.columns.clone())
        .with_predicates(parsed.predicates)
        .with_limit(parsed.limit.unwrap_or(self.default_row_limit))
        .with_max_staleness_ms(max_staleness_ms);

        let context = EntitlementContext::new(tenant_id, resource)
            .with_user(user_id)
            .with_roles(roles)
            .with_requested_columns(parsed.columns);

        let result = self.orchestrator.execute(&plan, &context);

        if result.is_success()
            && let Some(cache) = &self.cache
        {
            cache.put(key, result.clone());
        }
        result
    }
}
