//! The engine wrapper: policy loading + decision + audit logging.

use std::sync::Arc;

use garnet_policy::PolicyStore;
use tracing::{debug, info};

use crate::{
    context::EntitlementContext,
    decide::{MissingPermissions, decide},
    decision::EntitlementDecision,
};

/// Owns the policy store handle and turns requests into decisions.
///
/// The engine itself is stateless between calls; it exists so callers
/// hold one value instead of threading a store and a mode everywhere, and
/// so every decision leaves exactly one audit line.
#[derive(Debug, Clone)]
pub struct EntitlementEngine {
    store: Arc<dyn PolicyStore>,
    missing_permissions: MissingPermissions,
}

impl EntitlementEngine {
    pub fn new(store: Arc<dyn PolicyStore>) -> Self {
        Self {
            store,
            missing_permissions: MissingPermissions::default(),
        }
    }

    /// Sets the behavior for sources with no recorded permissions.
    pub fn with_missing_permissions(mut self, mode: MissingPermissions) -> Self {
        self.missing_permissions = mode;
        self
    }

    /// Decides one access request. The table is the context's resource;
    /// the requested columns come from the context as well.
    pub fn authorize(&self, context: &EntitlementContext, source_id: &str) -> EntitlementDecision {
        let table_name = context.resource();
        debug!(
            tenant_id = %context.tenant_id(),
            user_id = ?context.user_id(),
            source_id,
            table_name,
            "authorizing query"
        );

        let policies = self
            .store
            .load_applicable(context.tenant_id(), source_id, table_name);

        let decision = decide(
            &policies,
            context,
            source_id,
            table_name,
            context.requested_columns(),
            self.missing_permissions,
        );

        info!(
            tenant_id = %context.tenant_id(),
            allowed = decision.is_allowed(),
            filters = decision.row_filters().len(),
            masks = decision.column_masks().len(),
            policies = decision.applied_policies().len(),
            denial_reason = ?decision.denial_reason(),
            "authorization complete"
        );
        decision
    }
}
