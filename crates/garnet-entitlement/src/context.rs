//! The request context an entitlement decision is made against.

use std::collections::{HashMap, HashSet};

use garnet_policy::SourcePermissions;
use garnet_types::{TenantId, UserId};
use serde::{Deserialize, Serialize};

/// Everything known about one access request at decision time.
///
/// Built once per request with the consuming `with_*` builders and then
/// read-only: the decision engine never mutates its input.
///
/// `user_id` is optional because the gateway may be asked to decide for an
/// unauthenticated caller; the engine answers deny without looking further.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitlementContext {
    user_id: Option<UserId>,
    tenant_id: TenantId,
    email: Option<String>,
    /// The table (connector resource) being queried.
    resource: String,
    requested_columns: Vec<String>,
    roles: HashSet<String>,
    scopes: HashSet<String>,
    /// Per-source grants, keyed by source id.
    source_permissions: HashMap<String, SourcePermissions>,
    /// Free-form user attributes referenced by policy conditions and
    /// `${user.<attr>}` placeholders.
    attributes: HashMap<String, String>,
}

impl EntitlementContext {
    pub fn new(tenant_id: TenantId, resource: impl Into<String>) -> Self {
        Self {
            user_id: None,
            tenant_id,
            email: None,
            resource: resource.into(),
            requested_columns: Vec::new(),
            roles: HashSet::new(),
            scopes: HashSet::new(),
            source_permissions: HashMap::new(),
            attributes: HashMap::new(),
        }
    }

    pub fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_requested_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requested_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scopes.insert(scope.into());
        self
    }

    pub fn with_source_permissions(
        mut self,
        source_id: impl Into<String>,
        permissions: SourcePermissions,
    ) -> Self {
        self.source_permissions.insert(source_id.into(), permissions);
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    pub fn requested_columns(&self) -> &[String] {
        &self.requested_columns
    }

    pub fn roles(&self) -> &HashSet<String> {
        &self.roles
    }

    pub fn scopes(&self) -> &HashSet<String> {
        &self.scopes
    }

    pub fn source_permissions(&self, source_id: &str) -> Option<&SourcePermissions> {
        self.source_permissions.get(source_id)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }
}
