//! Policy storage.
//!
//! [`PolicyStore`] is the seam between the decision engine and wherever
//! policies actually live. The engine only ever asks one question: "which
//! enabled policies apply to this (tenant, source, table)?" — answered
//! pre-filtered and pre-sorted so the engine can evaluate in one pass.
//!
//! [`InMemoryPolicyStore`] is the development and test implementation,
//! seeded from [`PolicyDefinition`]s.

use std::{
    collections::HashMap,
    fmt::Debug,
    sync::Mutex,
};

use garnet_types::TenantId;
use tracing::{debug, warn};

use crate::{
    definition::{DefinitionError, PolicyDefinition},
    policy::Policy,
};

// ============================================================================
// PolicyStore trait
// ============================================================================

/// Read access to the policies of a tenant.
pub trait PolicyStore: Send + Sync + Debug {
    /// Returns the enabled policies whose patterns cover `(source_id,
    /// table_name)`, sorted by priority descending. Ties keep insertion
    /// order.
    fn load_applicable(
        &self,
        tenant_id: &TenantId,
        source_id: &str,
        table_name: &str,
    ) -> Vec<Policy>;
}

// ============================================================================
// InMemoryPolicyStore
// ============================================================================

struct Entry {
    enabled: bool,
    policy: Policy,
}

/// A policy store backed by a per-tenant map.
///
/// Definitions are converted to [`Policy`] values on insert, so condition
/// parsing happens once per policy rather than once per request.
#[derive(Default)]
pub struct InMemoryPolicyStore {
    entries: Mutex<HashMap<TenantId, Vec<Entry>>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces one policy. Replacement is keyed by policy id.
    pub fn upsert(&self, definition: &PolicyDefinition) -> Result<(), DefinitionError> {
        let policy = definition.to_policy()?;
        let mut entries = self.entries.lock().expect("policy store lock poisoned");
        let tenant_entries = entries.entry(definition.tenant_id.clone()).or_default();
        tenant_entries.retain(|entry| entry.policy.id() != definition.policy_id);
        tenant_entries.push(Entry {
            enabled: definition.enabled,
            policy,
        });
        Ok(())
    }

    /// Seeds the store with a batch of definitions.
    ///
    /// Definitions that fail conversion are logged and skipped; the return
    /// value is the number actually loaded.
    pub fn seed<'a>(
        &self,
        definitions: impl IntoIterator<Item = &'a PolicyDefinition>,
    ) -> usize {
        let mut loaded = 0;
        for definition in definitions {
            match self.upsert(definition) {
                Ok(()) => loaded += 1,
                Err(error) => {
                    warn!(
                        policy_id = %definition.policy_id,
                        tenant_id = %definition.tenant_id,
                        %error,
                        "skipping policy definition that failed to convert"
                    );
                }
            }
        }
        loaded
    }

    /// Removes a policy. Returns true if one was removed.
    pub fn remove(&self, tenant_id: &TenantId, policy_id: &str) -> bool {
        let mut entries = self.entries.lock().expect("policy store lock poisoned");
        let Some(tenant_entries) = entries.get_mut(tenant_id) else {
            return false;
        };
        let before = tenant_entries.len();
        tenant_entries.retain(|entry| entry.policy.id() != policy_id);
        tenant_entries.len() < before
    }

    /// Enables or disables a policy in place. Returns true if it existed.
    pub fn set_enabled(&self, tenant_id: &TenantId, policy_id: &str, enabled: bool) -> bool {
        let mut entries = self.entries.lock().expect("policy store lock poisoned");
        entries
            .get_mut(tenant_id)
            .and_then(|tenant_entries| {
                tenant_entries
                    .iter_mut()
                    .find(|entry| entry.policy.id() == policy_id)
            })
            .map(|entry| entry.enabled = enabled)
            .is_some()
    }

    /// Number of policies stored for a tenant, enabled or not.
    pub fn len_for_tenant(&self, tenant_id: &TenantId) -> usize {
        let entries = self.entries.lock().expect("policy store lock poisoned");
        entries.get(tenant_id).map_or(0, Vec::len)
    }
}

impl Debug for InMemoryPolicyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock().expect("policy store lock poisoned");
        let tenants = entries.len();
        let policies: usize = entries.values().map(Vec::len).sum();
        f.debug_struct("InMemoryPolicyStore")
            .field("tenants", &tenants)
            .field("policies", &policies)
            .finish()
    }
}

impl PolicyStore for InMemoryPolicyStore {
    fn load_applicable(
        &self,
        tenant_id: &TenantId,
        source_id: &str,
        table_name: &str,
    ) -> Vec<Policy> {
        let entries = self.entries.lock().expect("policy store lock poisoned");
        let mut applicable: Vec<Policy> = entries
            .get(tenant_id)
            .map(|tenant_entries| {
                tenant_entries
                    .iter()
                    .filter(|entry| entry.enabled && entry.policy.matches(source_id, table_name))
                    .map(|entry| entry.policy.clone())
                    .collect()
            })
            .unwrap_or_default();
        // Stable sort: equal priorities keep insertion order.
        applicable.sort_by(|a, b| b.priority().cmp(&a.priority()));
        debug!(
            tenant_id = %tenant_id,
            source_id,
            table_name,
            count = applicable.len(),
            "loaded applicable policies"
        );
        applicable
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn definition(policy_id: &str, table_pattern: &str, priority: i32) -> PolicyDefinition {
        PolicyDefinition {
            tenant_id: TenantId::new("tenant1"),
            policy_id: policy_id.to_string(),
            name: None,
            policy_type: "TABLE_ACCESS".to_string(),
            source_pattern: Some("github".to_string()),
            table_pattern: Some(table_pattern.to_string()),
            condition: None,
            action: "ALLOW".to_string(),
            config: Value::Null,
            priority,
            enabled: true,
        }
    }

    #[test]
    fn test_load_applicable_filters_and_sorts() {
        let store = InMemoryPolicyStore::new();
        store.upsert(&definition("low", "issues", 1)).unwrap();
        store.upsert(&definition("high", "issues", 100)).unwrap();
        store.upsert(&definition("other-table", "pulls", 50)).unwrap();
        store.upsert(&definition("wildcard", "*", 10)).unwrap();

        let tenant = TenantId::new("tenant1");
        let policies = store.load_applicable(&tenant, "github", "issues");
        let ids: Vec<&str> = policies.iter().map(Policy::id).collect();
        assert_eq!(ids, ["high", "wildcard", "low"]);
    }

    #[test]
    fn test_disabled_policies_are_skipped() {
        let store = InMemoryPolicyStore::new();
        let mut def = definition("p1", "issues", 1);
        def.enabled = false;
        store.upsert(&def).unwrap();

        let tenant = TenantId::new("tenant1");
        assert!(store.load_applicable(&tenant, "github", "issues").is_empty());

        assert!(store.set_enabled(&tenant, "p1", true));
        assert_eq!(store.load_applicable(&tenant, "github", "issues").len(), 1);
    }

    #[test]
    fn test_upsert_replaces_by_policy_id() {
        let store = InMemoryPolicyStore::new();
        store.upsert(&definition("p1", "issues", 1)).unwrap();
        store.upsert(&definition("p1", "issues", 99)).unwrap();

        let tenant = TenantId::new("tenant1");
        assert_eq!(store.len_for_tenant(&tenant), 1);
        let policies = store.load_applicable(&tenant, "github", "issues");
        assert_eq!(policies[0].priority(), 99);
    }

    #[test]
    fn test_tenants_are_isolated() {
        let store = InMemoryPolicyStore::new();
        store.upsert(&definition("p1", "issues", 1)).unwrap();

        let other = TenantId::new("tenant2");
        assert!(store.load_applicable(&other, "github", "issues").is_empty());
    }

    #[test]
    fn test_seed_skips_invalid_definitions() {
        let store = InMemoryPolicyStore::new();
        let good = definition("good", "issues", 1);
        let mut bad = definition("bad", "issues", 1);
        bad.policy_type = "QUOTA".to_string();
        let mut rls_missing_column = definition("bad-rls", "issues", 1);
        rls_missing_column.policy_type = "RLS".to_string();
        rls_missing_column.action = "FILTER".to_string();
        rls_missing_column.config = json!({"value": "x"});
        let empty_id = definition("", "issues", 1);
        let trailing = definition("trailing", "issues", 1);

        // The rest of the batch survives the bad rows, empty id included.
        let loaded = store.seed([&good, &bad, &rls_missing_column, &empty_id, &trailing]);
        assert_eq!(loaded, 2);
        assert_eq!(store.len_for_tenant(&TenantId::new("tenant1")), 2);
    }

    #[test]
    fn test_remove() {
        let store = InMemoryPolicyStore::new();
        store.upsert(&definition("p1", "issues", 1)).unwrap();
        let tenant = TenantId::new("tenant1");
        assert!(store.remove(&tenant, "p1"));
        assert!(!store.remove(&tenant, "p1"));
        assert_eq!(store.len_for_tenant(&tenant), 0);
    }
}
