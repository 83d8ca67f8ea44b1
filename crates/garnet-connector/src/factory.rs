//! Connector instantiation and pooling.
//!
//! The factory keeps one lazily-created connector per
//! `connectorType:tenantId` key. Callers get a [`ConnectorHandle`], a
//! scoped guard: the underlying connection is closed when the handle
//! drops, so an orchestration path cannot leak a session on any exit
//! route. The instance itself stays pooled and reconnects on next use.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use garnet_types::{ConnectorType, TenantId};
use tracing::debug;

use crate::{
    Connector,
    capabilities::{ConnectRequest, ConnectResult, RowPage, ScanRequest},
    error::{ConnectorError, Result},
    github::GitHubMockConnector,
    jira::JiraMockConnector,
};

type SharedConnector = Arc<Mutex<Box<dyn Connector>>>;

// ============================================================================
// ConnectorFactory
// ============================================================================

#[derive(Default)]
pub struct ConnectorFactory {
    active: Mutex<HashMap<String, SharedConnector>>,
}

impl ConnectorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets or creates the connector for `(connector_type, tenant_id)` and
    /// wraps it in a scoped handle.
    pub fn acquire(
        &self,
        connector_type: ConnectorType,
        tenant_id: &TenantId,
    ) -> Result<ConnectorHandle> {
        let key = format!("{}:{tenant_id}", connector_type.id());
        let mut active = self.active.lock().expect("connector registry lock poisoned");

        let connector = match active.get(&key) {
            Some(existing) => Arc::clone(existing),
            None => {
                let created: SharedConnector = Arc::new(Mutex::new(create(connector_type)?));
                debug!(key = %key, "created connector instance");
                active.insert(key, Arc::clone(&created));
                created
            }
        };

        Ok(ConnectorHandle { connector })
    }

    /// Closes and discards every pooled connector.
    pub fn close_all(&self) {
        let mut active = self.active.lock().expect("connector registry lock poisoned");
        for connector in active.values() {
            connector
                .lock()
                .expect("connector lock poisoned")
                .close();
        }
        active.clear();
    }
}

fn create(connector_type: ConnectorType) -> Result<Box<dyn Connector>> {
    match connector_type {
        ConnectorType::GitHub => Ok(Box::new(GitHubMockConnector::new())),
        ConnectorType::Jira => Ok(Box::new(JiraMockConnector::new())),
        other => Err(ConnectorError::invalid_request(
            other.id(),
            format!("{} connector not implemented", other.display_name()),
        )),
    }
}

// ============================================================================
// ConnectorHandle
// ============================================================================

/// Scoped access to one pooled connector.
///
/// Dropping the handle closes the connection, whatever path the caller
/// took to get there.
pub struct ConnectorHandle {
    connector: SharedConnector,
}

impl std::fmt::Debug for ConnectorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorHandle").finish_non_exhaustive()
    }
}

impl ConnectorHandle {
    pub fn connect(&self, request: &ConnectRequest) -> Result<ConnectResult> {
        self.connector
            .lock()
            .expect("connector lock poisoned")
            .connect(request)
    }

    pub fn scan(&self, request: &ScanRequest) -> Result<RowPage> {
        self.connector
            .lock()
            .expect("connector lock poisoned")
            .scan(request)
    }
}

impl Drop for ConnectorHandle {
    fn drop(&mut self) {
        self.connector
            .lock()
            .expect("connector lock poisoned")
            .close();
    }
}

// ============================================================================
// Tests
// ============================================================================
