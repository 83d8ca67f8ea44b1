//! Column value masking.
//!
//! Masking transforms a value instead of removing it, so result shapes stay
//! stable while sensitive content is hidden.
//!
//! | Kind    | Output                                   | Reversible |
//! |---------|------------------------------------------|------------|
//! | Full    | `****`                                   | No         |
//! | Partial | `***-***-<last4>` (short values: `****`) | No         |
//! | Hash    | base64(SHA-256(value))                   | No         |
//! | Redact  | `[REDACTED]`                             | No         |
//! | Null    | JSON null                                | No         |
//!
//! ## Examples
//!
//! ```
//! use garnet_policy::mask::MaskKind;
//! use serde_json::json;
//!
//! assert_eq!(MaskKind::Partial.mask(&json!("555-867-5309")), json!("***-***-5309"));
//! assert_eq!(MaskKind::Redact.mask(&json!("internal notes")), json!("[REDACTED]"));
//! assert_eq!(MaskKind::Null.mask(&json!("anything")), serde_json::Value::Null);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// MaskKind
// ============================================================================

/// Strategy used to mask a column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaskKind {
    /// Replace the whole value with `****`.
    Full,
    /// Keep the last four characters: `***-***-5309`.
    Partial,
    /// One-way SHA-256, base64-encoded. Deterministic, so equal inputs
    /// stay joinable after masking.
    Hash,
    /// Replace with the literal `[REDACTED]`.
    Redact,
    /// Replace with JSON null.
    Null,
}

impl MaskKind {
    /// Parses a mask kind name, case-insensitively.
    ///
    /// Unrecognized names fall back to `Full`, the most restrictive kind.
    pub fn parse_or_full(name: &str) -> Self {
        match name.trim().to_uppercase().as_str() {
            "PARTIAL" => Self::Partial,
            "HASH" => Self::Hash,
            "REDACT" => Self::Redact,
            "NULL" => Self::Null,
            _ => Self::Full,
        }
    }

    /// Applies this mask to one value.
    ///
    /// Null input stays null for every kind. Non-string values are masked
    /// through their scalar rendering (the JSON text), so a masked number
    /// comes back as a masked string.
    pub fn mask(self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        let text = match value {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        match self {
            Self::Full => Value::String("****".to_string()),
            Self::Partial => Value::String(partial(&text)),
            Self::Hash => Value::String(hash(&text)),
            Self::Redact => Value::String("[REDACTED]".to_string()),
            Self::Null => Value::Null,
        }
    }
}

/// Keeps the last four characters; values of four characters or fewer are
/// fully masked so nothing short leaks whole.
fn partial(text: &str) -> String {
    let count = text.chars().count();
    if count <= 4 {
        return "****".to_string();
    }
    let tail: String = text.chars().skip(count - 4).collect();
    format!("***-***-{tail}")
}

fn hash(text: &str) -> String {
    use base64::Engine;
    use sha2::Digest;

    let digest = sha2::Sha256::digest(text.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(digest)
}

// ============================================================================
// Tests
// ============================================================================
