//! Request, result, and capability shapes shared by every connector.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use garnet_types::{Filter, Row, TenantId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Capabilities
// ============================================================================

/// What a connected source can serve.
///
/// `pushdown_fields` names the columns the source could evaluate
/// predicates on itself; the mocks never push down, but the descriptor is
/// part of the contract so planners can ask.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub resources: BTreeSet<String>,
    pub columns: BTreeMap<String, BTreeSet<String>>,
    pub pushdown_fields: BTreeMap<String, BTreeSet<String>>,
}

impl Capabilities {
    /// Column set for one resource, if the source serves it.
    pub fn columns_for(&self, resource: &str) -> Option<&BTreeSet<String>> {
        self.columns.get(resource)
    }

    pub fn serves(&self, resource: &str) -> bool {
        self.resources.contains(resource)
    }
}

// ============================================================================
// Connect
// ============================================================================

/// Input to [`crate::Connector::connect`].
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub tenant_id: TenantId,
    pub config: HashMap<String, String>,
}

impl ConnectRequest {
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            config: HashMap::new(),
        }
    }

    #[must_use]
    pub fn with_config_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }
}

/// Output of a successful connect.
///
/// `session` is opaque to the gateway: credentials for a real source,
/// decorative metadata for the mocks.
#[derive(Debug, Clone)]
pub struct ConnectResult {
    pub capabilities: Capabilities,
    pub allowed_resources: Vec<String>,
    pub session: BTreeMap<String, Value>,
}

// ============================================================================
// Scan
// ============================================================================

/// Input to [`crate::Connector::scan`].
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub tenant_id: TenantId,
    pub resource: String,
    /// Projection. Empty or containing `*` means all columns.
    pub columns: Vec<String>,
    pub predicates: Vec<Filter>,
    pub limit: Option<u32>,
    /// Opaque continuation token from a prior page.
    pub page_token: Option<String>,
    pub max_staleness_ms: u64,
}

impl ScanRequest {
    pub fn new(tenant_id: TenantId, resource: impl Into<String>) -> Self {
        Self {
            tenant_id,
            resource: resource.into(),
            columns: Vec::new(),
            predicates: Vec::new(),
            limit: None,
            page_token: None,
            max_staleness_ms: 0,
        }
    }

    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_predicates(mut self, predicates: Vec<Filter>) -> Self {
        self.predicates = predicates;
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = Some(page_token.into());
        self
    }

    #[must_use]
    pub fn with_max_staleness_ms(mut self, max_staleness_ms: u64) -> Self {
        self.max_staleness_ms = max_staleness_ms;
        self
    }
}

/// One page of scan output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowPage {
    pub rows: Vec<Row>,
    /// Present when more rows remain past this page.
    pub next_page_token: Option<String>,
    /// Age of the served data. The mocks always report 0.
    pub freshness_ms: u64,
}
