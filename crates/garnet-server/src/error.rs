//! Server failure taxonomy.
//!
//! Every failure the pipeline can produce maps to one stable error code
//! on the wire; nothing internal (trace formats, stack detail) leaks into
//! result payloads.

use garnet_connector::ConnectorError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, Clone, Error)]
pub enum ServerError {
    #[error("{0}")]
    AuthenticationFailed(String),

    #[error("Access denied: {0}")]
    EntitlementDenied(String),

    #[error("{message}")]
    RateLimitExceeded {
        retry_after_seconds: u64,
        message: String,
    },

    #[error("Connector execution failed: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Query execution failed: {0}")]
    Execution(String),

    #[error("Table not found: {table}. Available tables: {available}")]
    InvalidTable { table: String, available: String },

    #[error("Failed to parse or execute query: {0}")]
    QueryParse(String),
}

impl ServerError {
    /// Stable code surfaced in result payloads and execution records.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AuthenticationFailed(_) => "AUTHENTICATION_FAILED",
            Self::EntitlementDenied(_) => "ENTITLEMENT_DENIED",
            Self::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
            Self::Connector(_) => "CONNECTOR_ERROR",
            Self::Execution(_) => "EXECUTION_ERROR",
            Self::InvalidTable { .. } => "INVALID_TABLE",
            Self::QueryParse(_) => "QUERY_PARSE_ERROR",
        }
    }
}
