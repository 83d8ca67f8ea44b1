//! # garnet-types: Core types for `Garnet`
//!
//! This crate contains shared types used across the `Garnet` system:
//! - Principal IDs ([`TenantId`], [`UserId`])
//! - Request correlation ([`TraceId`])
//! - Data source kinds ([`ConnectorType`])
//! - Row values ([`Row`])
//! - Neutral predicates ([`Filter`], [`FilterOperator`])
//!
//! The predicate types are the lingua franca of the pipeline: the SQL
//! adapter produces them, entitlement row filters are translated into them,
//! and connectors evaluate them. Keeping [`Filter::matches`] here means
//! every consumer agrees on operator semantics.

use std::{
    cmp::Ordering,
    collections::BTreeMap,
    fmt::{Debug, Display},
    str::FromStr,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ============================================================================
// Principal IDs - Clone (opaque strings issued by the control plane)
// ============================================================================

/// Unique identifier for a tenant (organization/customer).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TenantId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TenantId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<TenantId> for String {
    fn from(id: TenantId) -> Self {
        id.0
    }
}

/// Unique identifier for a user within a tenant.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

// ============================================================================
// Trace ID - Copy (16-byte UUID correlating one query end to end)
// ============================================================================

/// Correlates one query execution across logs, the execution record, and the
/// result payload. Freshly generated (v4) per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(Uuid);

impl TraceId {
    /// Generates a new random trace ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parses a trace ID from its hyphenated string form.
    pub fn parse(text: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(text).map(Self)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for TraceId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

// ============================================================================
// Connector Types - Copy (closed set of supported data sources)
// ============================================================================

/// The kinds of SaaS data sources the gateway can talk to.
///
/// Each kind has a stable lowercase id used in configuration, admission
/// keys, and entitlement source patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorType {
    GitHub,
    Jira,
    Salesforce,
    Zendesk,
    Slack,
    Notion,
}

impl ConnectorType {
    pub const ALL: [ConnectorType; 6] = [
        ConnectorType::GitHub,
        ConnectorType::Jira,
        ConnectorType::Salesforce,
        ConnectorType::Zendesk,
        ConnectorType::Slack,
        ConnectorType::Notion,
    ];

    /// Stable identifier used in config keys and admission keys.
    pub fn id(self) -> &'static str {
        match self {
            Self::GitHub => "github",
            Self::Jira => "jira",
            Self::Salesforce => "salesforce",
            Self::Zendesk => "zendesk",
            Self::Slack => "slack",
            Self::Notion => "notion",
        }
    }

    /// Human-readable name for messages and logs.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::GitHub => "GitHub",
            Self::Jira => "Jira",
            Self::Salesforce => "Salesforce",
            Self::Zendesk => "Zendesk",
            Self::Slack => "Slack",
            Self::Notion => "Notion",
        }
    }

    /// Looks up a connector type by its id, case-insensitively.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.id().eq_ignore_ascii_case(id.trim()))
    }
}

impl Display for ConnectorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

// ============================================================================
// Rows - the unit of data flowing back from connectors
// ============================================================================

/// One row of connector output: column name to JSON value.
///
/// A `BTreeMap` keeps column order deterministic, which keeps result
/// payloads and cache entries stable across runs.
pub type Row = BTreeMap<String, Value>;

// ============================================================================
// Filter Operators - Copy (closed comparison vocabulary)
// ============================================================================

/// Comparison operators understood by the predicate pipeline.
///
/// The SQL adapter, entitlement row filters, and connector scans all share
/// this vocabulary; `symbol` is the canonical SQL-ish rendering and
/// [`FromStr`] accepts it back (plus `<>` as an alias for `!=`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterOrEqual,
    LessThan,
    LessOrEqual,
    Like,
    NotLike,
    In,
    NotIn,
    IsNull,
    IsNotNull,
    Between,
}

impl FilterOperator {
    /// Canonical SQL rendering of this operator.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Equals => "=",
            Self::NotEquals => "!=",
            Self::GreaterThan => ">",
            Self::GreaterOrEqual => ">=",
            Self::LessThan => "<",
            Self::LessOrEqual => "<=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::Between => "BETWEEN",
        }
    }

    /// True for operators that test presence rather than compare a value.
    pub fn is_unary(self) -> bool {
        matches!(self, Self::IsNull | Self::IsNotNull)
    }
}

impl Display for FilterOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Error returned when parsing an operator symbol fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown filter operator: {0}")]
pub struct UnknownOperator(pub String);

impl FromStr for FilterOperator {
    type Err = UnknownOperator;

    fn from_str(symbol: &str) -> Result<Self, Self::Err> {
        match symbol.trim().to_uppercase().as_str() {
            "=" | "==" => Ok(Self::Equals),
            "!=" | "<>" => Ok(Self::NotEquals),
            ">" => Ok(Self::GreaterThan),
            ">=" => Ok(Self::GreaterOrEqual),
            "<" => Ok(Self::LessThan),
            "<=" => Ok(Self::LessOrEqual),
            "LIKE" => Ok(Self::Like),
            "NOT LIKE" => Ok(Self::NotLike),
            "IN" => Ok(Self::In),
            "NOT IN" => Ok(Self::NotIn),
            "IS NULL" => Ok(Self::IsNull),
            "IS NOT NULL" => Ok(Self::IsNotNull),
            "BETWEEN" => Ok(Self::Between),
            _ => Err(UnknownOperator(symbol.trim().to_string())),
        }
    }
}

// ============================================================================
// Filters - Clone (one predicate over one column)
// ============================================================================

/// A single predicate over one column of a row.
///
/// For `In`/`NotIn` the value is a JSON array of candidates; for `Between`
/// a two-element array `[low, high]`. `Like` matching is case-insensitive
/// substring containment with `%` wildcards stripped from the pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub operator: FilterOperator,
    pub value: Value,
}

impl Filter {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: Value) -> Self {
        Self {
            column: column.into(),
            operator,
            value,
        }
    }

    /// Convenience constructor for the common equality case.
    pub fn equals(column: impl Into<String>, value: Value) -> Self {
        Self::new(column, FilterOperator::Equals, value)
    }

    /// Evaluates this predicate against one row.
    ///
    /// A missing or JSON-null cell satisfies only `IsNull`; every binary
    /// operator treats it as a non-match. Equality compares scalar
    /// renderings so `1` and `"1"` compare equal; ordering operators
    /// require both sides to be numeric.
    pub fn matches(&self, row: &Row) -> bool {
        let cell = row.get(&self.column).filter(|value| !value.is_null());
        match (self.operator, cell) {
            (FilterOperator::IsNull, found) => found.is_none(),
            (FilterOperator::IsNotNull, found) => found.is_some(),
            (_, None) => false,
            (FilterOperator::Equals, Some(value)) => text_eq(value, &self.value),
            (FilterOperator::NotEquals, Some(value)) => !text_eq(value, &self.value),
            (FilterOperator::GreaterThan, Some(value)) => {
                numeric_cmp(value, &self.value).is_some_and(Ordering::is_gt)
            }
            (FilterOperator::GreaterOrEqual, Some(value)) => {
                numeric_cmp(value, &self.value).is_some_and(Ordering::is_ge)
            }
            (FilterOperator::LessThan, Some(value)) => {
                numeric_cmp(value, &self.value).is_some_and(Ordering::is_lt)
            }
            (FilterOperator::LessOrEqual, Some(value)) => {
                numeric_cmp(value, &self.value).is_some_and(Ordering::is_le)
            }
            (FilterOperator::Like, Some(value)) => like_contains(value, &self.value),
            (FilterOperator::NotLike, Some(value)) => !like_contains(value, &self.value),
            (FilterOperator::In, Some(value)) => in_set(value, &self.value),
            (FilterOperator::NotIn, Some(value)) => {
                self.value.as_array().is_some_and(|options| {
                    !options.iter().any(|option| text_eq(value, option))
                })
            }
            (FilterOperator::Between, Some(value)) => between(value, &self.value),
        }
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.operator.is_unary() {
            write!(f, "{} {}", self.column, self.operator)
        } else {
            write!(f, "{} {} {}", self.column, self.operator, self.value)
        }
    }
}

/// Scalar rendering used for equality and LIKE: strings compare by content,
/// everything else by its JSON text.
fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn text_eq(left: &Value, right: &Value) -> bool {
    left == right || scalar_text(left) == scalar_text(right)
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn numeric_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    as_number(left)?.partial_cmp(&as_number(right)?)
}

fn like_contains(value: &Value, pattern: &Value) -> bool {
    let needle = scalar_text(pattern).replace('%', "").to_lowercase();
    scalar_text(value).to_lowercase().contains(&needle)
}

fn in_set(value: &Value, options: &Value) -> bool {
    options
        .as_array()
        .is_some_and(|options| options.iter().any(|option| text_eq(value, option)))
}

fn between(value: &Value, bounds: &Value) -> bool {
    let Some([low, high]) = bounds.as_array().map(Vec::as_slice) else {
        return false;
    };
    matches!(
        (numeric_cmp(value, low), numeric_cmp(value, high)),
        (
            Some(Ordering::Greater | Ordering::Equal),
            Some(Ordering::Less | Ordering::Equal)
        )
    )
}
