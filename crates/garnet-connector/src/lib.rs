//! Source-system connectors.
//!
//! A [`Connector`] turns one external SaaS API into a scannable row
//! source: `connect` establishes a session and reports capabilities,
//! `scan` serves filtered, projected, paginated pages of rows, and
//! `close` releases the session. Production deployments would implement
//! the trait against real APIs; this crate ships in-memory mocks for
//! GitHub and Jira plus the [`ConnectorFactory`] that pools instances
//! per tenant.
//!
//! ```
//! use garnet_connector::{ConnectRequest, Connector, GitHubMockConnector, ScanRequest};
//! use garnet_types::TenantId;
//!
//! let tenant = TenantId::new("tenant1");
//! let mut connector = GitHubMockConnector::new();
//! connector.connect(&ConnectRequest::new(tenant.clone())).unwrap();
//! let page = connector.scan(&ScanRequest::new(tenant, "issues")).unwrap();
//! assert_eq!(page.rows.len(), 8);
//! ```

pub mod capabilities;
pub mod error;
pub mod factory;
pub mod github;
pub mod jira;
pub mod scan;

mod fixtures;

pub use capabilities::{Capabilities, ConnectRequest, ConnectResult, RowPage, ScanRequest};
pub use error::{ConnectorError, ErrorKind, Result};
pub use factory::{ConnectorFactory, ConnectorHandle};
pub use github::GitHubMockConnector;
pub use jira::JiraMockConnector;

/// One external data source.
///
/// `connect` must precede `scan`; scanning an unconnected instance is a
/// config-kind error. Implementations are owned behind a lock by the
/// factory, so `&mut self` on the state transitions is fine.
pub trait Connector: Send {
    /// Stable lowercase identifier, e.g. `"github"`.
    fn id(&self) -> &'static str;

    fn display_name(&self) -> &'static str;

    fn connect(&mut self, request: &ConnectRequest) -> Result<ConnectResult>;

    fn scan(&self, request: &ScanRequest) -> Result<RowPage>;

    fn close(&mut self);
}
