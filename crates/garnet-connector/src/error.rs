//! Connector failure taxonomy.
//!
//! Every failure crossing the connector boundary carries a [`ErrorKind`]
//! so the orchestrator can map it onto a stable wire code without parsing
//! message text.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConnectorError>;

/// Category of a connector failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Auth,
    RateLimit,
    Timeout,
    Unavailable,
    InvalidRequest,
    NotFound,
    StaleData,
    Config,
    Unknown,
}

impl ErrorKind {
    /// Stable sub-code surfaced alongside `CONNECTOR_ERROR` results.
    pub fn code(self) -> &'static str {
        match self {
            Self::Auth => "AUTHENTICATION_FAILED",
            Self::RateLimit => "RATE_LIMIT_EXHAUSTED",
            Self::Timeout => "SOURCE_TIMEOUT",
            Self::Unavailable => "SOURCE_UNAVAILABLE",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::NotFound => "RESOURCE_NOT_FOUND",
            Self::StaleData => "STALE_DATA",
            Self::Config => "CONFIGURATION_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A categorized connector failure, tagged with the connector it came from.
#[derive(Debug, Clone, Error)]
#[error("{kind} from {connector}: {message}")]
pub struct ConnectorError {
    pub kind: ErrorKind,
    pub connector: String,
    pub message: String,
}

impl ConnectorError {
    pub fn new(kind: ErrorKind, connector: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            connector: connector.into(),
            message: message.into(),
        }
    }

    pub fn config(connector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, connector, message)
    }

    pub fn invalid_request(connector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidRequest, connector, message)
    }

    pub fn not_found(connector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, connector, message)
    }

    pub fn unknown(connector: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, connector, message)
    }
}
