//! Default-stack assembly.
//!
//! [`Gateway`] wires the in-memory policy store, the mock connectors, and
//! the config-driven admission controller and cache into one value, so
//! examples and tests get a working gateway from a single constructor.

use std::sync::Arc;

use garnet_admission::AdmissionController;
use garnet_cache::ResultCache;
use garnet_config::GarnetConfig;
use garnet_connector::ConnectorFactory;
use garnet_entitlement::EntitlementEngine;
use garnet_policy::{DefinitionError, InMemoryPolicyStore, PolicyDefinition, PolicyStore};
use garnet_server::{
    ExecutionLog, InMemoryExecutionLog, InMemoryRoleProvider, QueryOrchestrator, QueryResult,
    QueryService, RoleProvider,
};
use garnet_types::{TenantId, UserId};

/// A fully wired gateway over the mock connectors.
///
/// Policies and role assignments are mutable at runtime; everything else
/// is fixed at construction from a [`GarnetConfig`].
pub struct Gateway {
    service: QueryService,
    policies: Arc<InMemoryPolicyStore>,
    roles: Arc<InMemoryRoleProvider>,
    log: Arc<InMemoryExecutionLog>,
}

impl Gateway {
    /// Builds a gateway with the built-in default configuration.
    pub fn new() -> Self {
        Self::with_config(&GarnetConfig::default())
    }

    /// Builds a gateway from an explicit configuration.
    pub fn with_config(config: &GarnetConfig) -> Self {
        let policies = Arc::new(InMemoryPolicyStore::new());
        let roles = Arc::new(InMemoryRoleProvider::new());
        let log = Arc::new(InMemoryExecutionLog::new());

        let engine = EntitlementEngine::new(Arc::clone(&policies) as Arc<dyn PolicyStore>)
            .with_missing_permissions(config.entitlement.missing_source_permissions);
        let admission = Arc::new(AdmissionController::new(
            config.admission.default_bucket(),
            config.admission.connector_buckets(),
        ));
        let orchestrator = QueryOrchestrator::new(
            Arc::new(ConnectorFactory::new()),
            engine,
            admission,
            Arc::clone(&log) as Arc<dyn ExecutionLog>,
        );

        let mut service =
            QueryService::new(orchestrator, Arc::clone(&roles) as Arc<dyn RoleProvider>)
                .with_server_config(&config.server);
        if config.cache.enabled {
            service = service.with_cache(ResultCache::with_shards(config.cache.shard_count));
        }

        Self {
            service,
            policies,
            roles,
            log,
        }
    }

    /// Inserts or replaces one policy. Fails if the definition does not
    /// convert to a valid policy.
    pub fn upsert_policy(&self, definition: &PolicyDefinition) -> Result<(), DefinitionError> {
        self.policies.upsert(definition)
    }

    /// Loads a batch of policies, skipping invalid definitions. Returns
    /// the number accepted.
    pub fn seed_policies<'a>(
        &self,
        definitions: impl IntoIterator<Item = &'a PolicyDefinition>,
    ) -> usize {
        self.policies.seed(definitions)
    }

    /// Removes one policy. Returns whether it existed.
    pub fn remove_policy(&self, tenant_id: &TenantId, policy_id: &str) -> bool {
        self.policies.remove(tenant_id, policy_id)
    }

    /// Registers a principal's roles within a tenant.
    pub fn assign_roles(
        &self,
        tenant_id: impl Into<TenantId>,
        user_id: impl Into<UserId>,
        roles: Vec<String>,
    ) {
        self.roles.assign(tenant_id, user_id, roles);
    }

    /// Runs one SQL query with the configured staleness default.
    pub fn query(
        &self,
        sql: &str,
        tenant_id: impl Into<TenantId>,
        user_id: impl Into<UserId>,
    ) -> QueryResult {
        self.service.execute_sql(sql, tenant_id, user_id, None)
    }

    /// Runs one SQL query with an explicit staleness tolerance.
    pub fn query_with_staleness(
        &self,
        sql: &str,
        tenant_id: impl Into<TenantId>,
        user_id: impl Into<UserId>,
        max_staleness_ms: u64,
    ) -> QueryResult {
        self.service
            .execute_sql(sql, tenant_id, user_id, Some(max_staleness_ms))
    }

    /// The execution audit trail.
    pub fn execution_log(&self) -> &InMemoryExecutionLog {
        &self.log
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}
