//! Caller-facing query result payload.

use garnet_types::Row;
use serde::{Deserialize, Serialize};

/// Terminal status of a query attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStatus {
    Success,
    Error,
    RateLimitExceeded,
}

/// The single payload shape every query attempt produces, success or not.
/// Serialized with camelCase field names for wire compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub status: QueryStatus,
    #[serde(default)]
    pub rows: Vec<Row>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    pub freshness_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_requests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// Successful result. Column order comes from the first row's keys.
    pub fn success(rows: Vec<Row>, next_page_token: Option<String>, freshness_ms: u64) -> Self {
        let columns = rows
            .first()
            .map(|row| row.keys().cloned().collect())
            .unwrap_or_default();
        Self {
            status: QueryStatus::Success,
            rows,
            columns,
            next_page_token,
            freshness_ms,
            rate_limit_status: Some("RATE_LIMIT_OK".to_string()),
            remaining_requests: None,
            retry_after_seconds: None,
            error_code: None,
            error_message: None,
            trace_id: None,
            execution_time_ms: 0,
        }
    }

    pub fn error(error_code: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            status: QueryStatus::Error,
            rows: Vec::new(),
            columns: Vec::new(),
            next_page_token: None,
            freshness_ms: 0,
            rate_limit_status: None,
            remaining_requests: None,
            retry_after_seconds: None,
            error_code: Some(error_code.into()),
            error_message: Some(error_message.into()),
            trace_id: None,
            execution_time_ms: 0,
        }
    }

    pub fn rate_limited(retry_after_seconds: u64, message: impl Into<String>) -> Self {
        Self {
            status: QueryStatus::RateLimitExceeded,
            rows: Vec::new(),
            columns: Vec::new(),
            next_page_token: None,
            freshness_ms: 0,
            rate_limit_status: Some("RATE_LIMIT_EXCEEDED".to_string()),
            remaining_requests: Some(0),
            retry_after_seconds: Some(retry_after_seconds),
            error_code: Some("RATE_LIMIT_EXCEEDED".to_string()),
            error_message: Some(message.into()),
            trace_id: None,
            execution_time_ms: 0,
        }
    }

    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    #[must_use]
    pub fn with_execution_time_ms(mut self, execution_time_ms: u64) -> Self {
        self.execution_time_ms = execution_time_ms;
        self
    }

    #[must_use]
    pub fn with_remaining_requests(mut self, remaining: u32) -> Self {
        self.remaining_requests = Some(remaining);
        self
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }
}
