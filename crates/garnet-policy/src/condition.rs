//! Policy condition expressions.
//!
//! A condition restricts a policy to users with a given role or attribute,
//! written as a single equality check such as `user.role == 'ADMIN'` or
//! `user.department != "finance"`. Conditions are parsed once when the
//! policy is constructed; evaluation is a fixed lookup, never a re-parse.
//!
//! Parsing is deliberately forgiving in one direction only: text that does
//! not fit the grammar produces a condition that never holds. A typo in a
//! policy condition can therefore suppress that policy's effect, but can
//! never widen it.

use std::{
    collections::{HashMap, HashSet},
    fmt::Display,
};

use serde::{Deserialize, Serialize};
use tracing::warn;

// ============================================================================
// Attribute Paths
// ============================================================================

/// The user attributes a condition may reference.
///
/// `Role` checks membership in the user's role set; the rest look up the
/// attribute map under the key returned by [`AttributePath::attribute_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributePath {
    Role,
    Department,
    Region,
    UserType,
}

impl AttributePath {
    /// Parses a `user.<attr>` path. Unrecognized paths yield `None`.
    pub fn parse(path: &str) -> Option<Self> {
        match path.trim() {
            "user.role" => Some(Self::Role),
            "user.department" => Some(Self::Department),
            "user.region" => Some(Self::Region),
            "user.type" => Some(Self::UserType),
            _ => None,
        }
    }

    /// The canonical `user.<attr>` rendering of this path.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Role => "user.role",
            Self::Department => "user.department",
            Self::Region => "user.region",
            Self::UserType => "user.type",
        }
    }

    /// The key used to look this path up in the attribute map.
    ///
    /// Returns `None` for `Role`, which reads the role set instead.
    pub fn attribute_key(self) -> Option<&'static str> {
        match self {
            Self::Role => None,
            Self::Department => Some("department"),
            Self::Region => Some("region"),
            Self::UserType => Some("type"),
        }
    }
}

impl Display for AttributePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Comparator
// ============================================================================

/// Equality or inequality between an attribute and a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparator {
    Eq,
    Ne,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }
}

// ============================================================================
// Condition
// ============================================================================

/// A parsed policy condition.
///
/// - [`Condition::Always`]: empty condition text; the policy applies to
///   every user.
/// - [`Condition::Check`]: one attribute comparison.
/// - [`Condition::Never`]: text that failed to parse; the policy never
///   applies. The original text is retained for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    Always,
    Check {
        path: AttributePath,
        comparator: Comparator,
        literal: String,
    },
    Never {
        raw: String,
    },
}

impl Condition {
    /// Parses condition text.
    ///
    /// Grammar: `<user-path> (== | != | =) <literal>`, with the literal
    /// optionally quoted (all `'` and `"` characters are stripped).
    /// Anything else parses to [`Condition::Never`] and logs a warning.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Self::Always;
        }

        // `!=` before `==` before `=`: the longer symbols contain the
        // shorter one, so order matters.
        let (comparator, symbol) = if trimmed.contains("!=") {
            (Comparator::Ne, "!=")
        } else if trimmed.contains("==") {
            (Comparator::Eq, "==")
        } else if trimmed.contains('=') {
            (Comparator::Eq, "=")
        } else {
            return Self::never(trimmed, "no comparison operator");
        };

        let parts: Vec<&str> = trimmed.split(symbol).collect();
        if parts.len() != 2 {
            return Self::never(trimmed, "expected exactly one comparison");
        }

        let Some(path) = AttributePath::parse(parts[0]) else {
            return Self::never(trimmed, "unrecognized attribute path");
        };

        let literal = parts[1].trim().replace(['\'', '"'], "");
        Self::Check {
            path,
            comparator,
            literal,
        }
    }

    fn never(raw: &str, reason: &str) -> Self {
        warn!(condition = %raw, reason, "condition failed to parse; it will never match");
        Self::Never {
            raw: raw.to_string(),
        }
    }

    /// Evaluates this condition against a user's roles and attributes.
    ///
    /// For `Ne`, an absent attribute compares unequal, so the condition
    /// holds: `user.department != 'finance'` matches users with no
    /// department at all.
    pub fn holds(&self, roles: &HashSet<String>, attributes: &HashMap<String, String>) -> bool {
        match self {
            Self::Always => true,
            Self::Never { .. } => false,
            Self::Check {
                path,
                comparator,
                literal,
            } => {
                let equal = match path.attribute_key() {
                    None => roles.contains(literal),
                    Some(key) => attributes.get(key).is_some_and(|value| value == literal),
                };
                match comparator {
                    Comparator::Eq => equal,
                    Comparator::Ne => !equal,
                }
            }
        }
    }

    /// True if this condition can never hold.
    pub fn is_never(&self) -> bool {
        matches!(self, Self::Never { .. })
    }
}

impl Default for Condition {
    fn default() -> Self {
        Self::Always
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Always => write!(f, "<always>"),
            Self::Never { raw } => write!(f, "<never: {raw}>"),
            Self::Check {
                path,
                comparator,
                literal,
            } => write!(f, "{path} {} '{literal}'", comparator.symbol()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(names: &[&str]) -> HashSet<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    fn attributes(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect()
    }

    #[test]
    fn test_empty_condition_always_holds() {
        assert_eq!(Condition::parse(""), Condition::Always);
        assert_eq!(Condition::parse("   "), Condition::Always);
        assert!(Condition::Always.holds(&roles(&[]), &attributes(&[])));
    }

    #[test]
    fn test_role_equality() {
        let condition = Condition::parse("user.role == 'ADMIN'");
        assert!(condition.holds(&roles(&["ADMIN", "USER"]), &attributes(&[])));
        assert!(!condition.holds(&roles(&["USER"]), &attributes(&[])));
    }

    #[test]
    fn test_single_equals_and_double_quotes() {
        let condition = Condition::parse("user.department = \"engineering\"");
        assert_eq!(
            condition,
            Condition::Check {
                path: AttributePath::Department,
                comparator: Comparator::Eq,
                literal: "engineering".to_string(),
            }
        );
        assert!(condition.holds(&roles(&[]), &attributes(&[("department", "engineering")])));
        assert!(!condition.holds(&roles(&[]), &attributes(&[("department", "sales")])));
    }

    #[test]
    fn test_inequality_negates() {
        let condition = Condition::parse("user.role != 'ADMIN'");
        assert!(!condition.holds(&roles(&["ADMIN"]), &attributes(&[])));
        assert!(condition.holds(&roles(&["USER"]), &attributes(&[])));
    }

    #[test]
    fn test_inequality_holds_for_missing_attribute() {
        // No department attribute at all: `!=` still matches.
        let condition = Condition::parse("user.department != 'finance'");
        assert!(condition.holds(&roles(&[]), &attributes(&[])));
        assert!(!condition.holds(&roles(&[]), &attributes(&[("department", "finance")])));
    }

    #[test]
    fn test_region_and_type_lookups() {
        let region = Condition::parse("user.region == 'eu'");
        assert!(region.holds(&roles(&[]), &attributes(&[("region", "eu")])));

        let user_type = Condition::parse("user.type == 'service'");
        assert!(user_type.holds(&roles(&[]), &attributes(&[("type", "service")])));
        assert!(!user_type.holds(&roles(&[]), &attributes(&[])));
    }

    #[test]
    fn test_unrecognized_path_never_holds() {
        let condition = Condition::parse("user.clearance == '5'");
        assert!(condition.is_never());
        assert!(!condition.holds(&roles(&["ADMIN"]), &attributes(&[("clearance", "5")])));

        // Even under `!=`: an unknown path is a parse failure, not a
        // missing attribute.
        let negated = Condition::parse("user.clearance != '5'");
        assert!(negated.is_never());
        assert!(!negated.holds(&roles(&[]), &attributes(&[])));
    }

    #[test]
    fn test_malformed_conditions_never_hold() {
        for text in ["user.role", "== 'x' ==", "a == b == c", "role ADMIN"] {
            let condition = Condition::parse(text);
            assert!(condition.is_never(), "{text:?} should never hold");
        }
    }

    #[test]
    fn test_quotes_are_stripped_anywhere_in_literal() {
        let condition = Condition::parse("user.role == 'AD'MIN'");
        assert_eq!(
            condition,
            Condition::Check {
                path: AttributePath::Role,
                comparator: Comparator::Eq,
                literal: "ADMIN".to_string(),
            }
        );
    }

    #[test]
    fn test_display_round_trips_check() {
        let condition = Condition::parse("user.role == 'ADMIN'");
        assert_eq!(condition.to_string(), "user.role == 'ADMIN'");
        assert_eq!(Condition::parse(&condition.to_string()), condition);
    }
}
