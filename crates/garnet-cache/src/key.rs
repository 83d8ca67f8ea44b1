//! Cache key derivation.
//!
//! Two principals must never observe each other's cached rows, so the key
//! embeds tenant and user alongside the query digest. The query text is
//! normalized before hashing so cosmetic differences (case, whitespace)
//! land on the same entry.

use garnet_types::{TenantId, UserId};

/// An opaque, deterministic cache key.
///
/// Equal inputs always produce equal keys; the query portion is a BLAKE3
/// digest of the normalized text, so keys stay fixed-width regardless of
/// query length.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Derives the key for one (tenant, user, query) triple.
    pub fn for_query(tenant_id: &TenantId, user_id: &UserId, query: &str) -> Self {
        let digest = blake3::hash(normalize(query).as_bytes());
        Self(format!("{tenant_id}:{user_id}:{}", digest.to_hex()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trim, collapse whitespace runs to single spaces, lowercase.
fn normalize(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tenant: &str, user: &str, query: &str) -> CacheKey {
        CacheKey::for_query(&TenantId::new(tenant), &UserId::new(user), query)
    }

    #[test]
    fn test_normalization_folds_case_and_whitespace() {
        let canonical = key("tenant1", "john_doe", "select * from github_issues");
        assert_eq!(
            key("tenant1", "john_doe", "  SELECT *\n  FROM   github_issues  "),
            canonical
        );
    }

    #[test]
    fn test_distinct_queries_get_distinct_keys() {
        assert_ne!(
            key("tenant1", "john_doe", "SELECT * FROM github_issues"),
            key("tenant1", "john_doe", "SELECT * FROM jira_issues")
        );
    }

    #[test]
    fn test_keys_are_scoped_to_principal() {
        let query = "SELECT * FROM github_issues";
        let johns = key("tenant1", "john_doe", query);
        assert_ne!(key("tenant1", "jane_smith", query), johns);
        assert_ne!(key("tenant2", "john_doe", query), johns);
    }

    #[test]
    fn test_key_embeds_tenant_and_user_verbatim() {
        let key = key("tenant1", "john_doe", "SELECT 1");
        assert!(key.as_str().starts_with("tenant1:john_doe:"));
    }
}
