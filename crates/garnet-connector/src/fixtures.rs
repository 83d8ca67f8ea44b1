//! Shared helpers for the mock datasets.

use chrono::{Duration, Utc};
use serde_json::{Value, json};

/// An ISO-8601 timestamp offset from now by whole days. Negative offsets
/// date fixture rows into the past.
pub(crate) fn timestamp(days_offset: i64) -> Value {
    let time = Utc::now() + Duration::days(days_offset);
    json!(time.format("%Y-%m-%dT%H:%M:%S").to_string())
}
