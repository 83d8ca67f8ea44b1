//! Configuration management for Garnet
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. Environment variables (GRN_* prefix, highest precedence)
//! 2. garnet.local.toml (gitignored, local overrides)
//! 3. garnet.toml (git-tracked, project config)
//! 4. ~/.config/garnet/config.toml (user defaults)
//! 5. Built-in defaults (lowest precedence)

use std::collections::HashMap;

use garnet_admission::BucketConfig;
use garnet_entitlement::MissingPermissions;
use garnet_types::ConnectorType;
use serde::{Deserialize, Serialize};

mod error;
mod loader;
mod paths;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use paths::Paths;

/// Main Garnet configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GarnetConfig {
    pub server: ServerConfig,
    pub admission: AdmissionConfig,
    pub cache: CacheConfig,
    pub entitlement: EntitlementConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Row limit applied when a query carries none.
    pub default_row_limit: u32,
    /// Staleness tolerance applied when a caller gives none.
    pub default_max_staleness_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            default_row_limit: 100,
            default_max_staleness_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Requests admitted per period for connectors without an override.
    pub capacity: u32,
    pub period_seconds: u64,
    /// Per-connector overrides, keyed by connector id ("github", "jira", ...).
    pub overrides: HashMap<String, BucketConfig>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            period_seconds: 60,
            overrides: HashMap::new(),
        }
    }
}

impl AdmissionConfig {
    pub fn default_bucket(&self) -> BucketConfig {
        BucketConfig::new(self.capacity, self.period_seconds)
    }

    /// Overrides resolved against the known connector types. Entries whose
    /// key is not a recognized connector id are dropped.
    pub fn connector_buckets(&self) -> HashMap<ConnectorType, BucketConfig> {
        self.overrides
            .iter()
            .filter_map(|(id, bucket)| Some((ConnectorType::from_id(id)?, *bucket)))
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub shard_count: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            shard_count: 16,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitlementConfig {
    /// Behavior when a context has no source permissions for the queried
    /// source: "allow-requested" (default) or "deny".
    pub missing_source_permissions: MissingPermissions,
}
