//! Principal role resolution.

use std::collections::HashMap;
use std::sync::Mutex;

use garnet_types::{TenantId, UserId};

/// Resolves the roles a user holds within a tenant. A lookup failure means
/// the principal is unknown to the tenant, which the service surfaces as
/// an authentication failure.
pub trait RoleProvider: Send + Sync + std::fmt::Debug {
    fn roles(&self, tenant_id: &TenantId, user_id: &UserId) -> Option<Vec<String>>;
}

/// Role provider backed by a mutexed map, for tests and demos.
#[derive(Debug, Default)]
pub struct InMemoryRoleProvider {
    assignments: Mutex<HashMap<(TenantId, UserId), Vec<String>>>,
}

impl InMemoryRoleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn assign(
        &self,
        tenant_id: impl Into<TenantId>,
        user_id: impl Into<UserId>,
        roles: Vec<String>,
    ) {
        self.assignments
            .lock()
            .expect("role provider lock poisoned")
            .insert((tenant_id.into(), user_id.into()), roles);
    }

    pub fn revoke(&self, tenant_id: &TenantId, user_id: &UserId) {
        self.assignments
            .lock()
            .expect("role provider lock poisoned")
            .remove(&(tenant_id.clone(), user_id.clone()));
    }
}

impl RoleProvider for InMemoryRoleProvider {
    fn roles(&self, tenant_id: &TenantId, user_id: &UserId) -> Option<Vec<String>> {
        self.assignments
            .lock()
            .expect("role provider lock poisoned")
            .get(&(tenant_id.clone(), user_id.clone()))
            .cloned()
    }
}
