//! The keyed admission controller.
//!
//! One bucket per (tenant, user, connector) key, each behind its own
//! lock. The registry lock is held only long enough to clone the per-key
//! handle out, so unrelated keys never serialize on each other; only two
//! requests for the *same* key contend, which is exactly the ordering the
//! bucket needs anyway.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Instant,
};

use garnet_types::{ConnectorType, TenantId, UserId};
use tracing::{debug, warn};

use crate::bucket::{AdmissionDecision, BucketConfig, TokenBucket};

// ============================================================================
// AdmissionKey
// ============================================================================

/// The unit of rate-limit isolation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AdmissionKey {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub connector: ConnectorType,
}

impl AdmissionKey {
    pub fn new(tenant_id: TenantId, user_id: UserId, connector: ConnectorType) -> Self {
        Self {
            tenant_id,
            user_id,
            connector,
        }
    }
}

impl std::fmt::Display for AdmissionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.tenant_id, self.user_id, self.connector)
    }
}

// ============================================================================
// AdmissionController
// ============================================================================

/// Owns every bucket in the process.
///
/// Per-connector configs come from configuration at construction; keys
/// for connectors without an explicit config use the default.
#[derive(Debug)]
pub struct AdmissionController {
    configs: HashMap<ConnectorType, BucketConfig>,
    default_config: BucketConfig,
    buckets: Mutex<HashMap<AdmissionKey, Arc<Mutex<TokenBucket>>>>,
}

impl AdmissionController {
    pub fn new(
        default_config: BucketConfig,
        configs: HashMap<ConnectorType, BucketConfig>,
    ) -> Self {
        Self {
            configs,
            default_config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Admits or rejects one request for the given key.
    pub fn admit(&self, key: &AdmissionKey) -> AdmissionDecision {
        self.admit_at(key, Instant::now())
    }

    /// Clock-injected variant of [`AdmissionController::admit`].
    pub fn admit_at(&self, key: &AdmissionKey, now: Instant) -> AdmissionDecision {
        let bucket = self.bucket_for(key, now);
        let mut bucket = bucket.lock().expect("token bucket lock poisoned");
        let decision = bucket.admit_at(now, key.connector.id());

        if decision.allowed {
            debug!(key = %key, remaining = decision.remaining, "admission ok");
        } else {
            warn!(
                key = %key,
                retry_after_seconds = ?decision.retry_after_seconds,
                "admission rejected"
            );
        }
        decision
    }

    /// Tokens left for a key without consuming one. A key never seen
    /// before reports its full capacity.
    pub fn remaining(&self, key: &AdmissionKey) -> u32 {
        let now = Instant::now();
        let bucket = self.bucket_for(key, now);
        let mut bucket = bucket.lock().expect("token bucket lock poisoned");
        bucket.available_at(now)
    }

    /// Drops every bucket, resetting all quotas.
    pub fn reset(&self) {
        self.buckets
            .lock()
            .expect("bucket registry lock poisoned")
            .clear();
    }

    fn config_for(&self, connector: ConnectorType) -> BucketConfig {
        self.configs
            .get(&connector)
            .copied()
            .unwrap_or(self.default_config)
    }

    fn bucket_for(&self, key: &AdmissionKey, now: Instant) -> Arc<Mutex<TokenBucket>> {
        let mut buckets = self.buckets.lock().expect("bucket registry lock poisoned");
        buckets
            .entry(key.clone())
            .or_insert_with(|| {
                Arc::new(Mutex::new(TokenBucket::new(
                    self.config_for(key.connector),
                    now,
                )))
            })
            .clone()
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(BucketConfig::default(), HashMap::new())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn key(tenant: &str, user: &str, connector: ConnectorType) -> AdmissionKey {
        AdmissionKey::new(TenantId::new(tenant), UserId::new(user), connector)
    }

    fn controller(capacity: u32, period_seconds: u64) -> AdmissionController {
        AdmissionController::new(BucketConfig::new(capacity, period_seconds), HashMap::new())
    }

    #[test]
    fn test_distinct_keys_have_independent_buckets() {
        let controller = controller(1, 60);
        let now = Instant::now();

        let john = key("tenant1", "john_doe", ConnectorType::GitHub);
        assert!(controller.admit_at(&john, now).allowed);
        assert!(!controller.admit_at(&john, now).allowed);

        // Different user, different tenant, different connector: all fresh.
        assert!(controller.admit_at(&key("tenant1", "jane_smith", ConnectorType::GitHub), now).allowed);
        assert!(controller.admit_at(&key("tenant2", "john_doe", ConnectorType::GitHub), now).allowed);
        assert!(controller.admit_at(&key("tenant1", "john_doe", ConnectorType::Jira), now).allowed);
    }

    #[test]
    fn test_per_connector_config_overrides_default() {
        let controller = AdmissionController::new(
            BucketConfig::new(100, 60),
            HashMap::from([(ConnectorType::GitHub, BucketConfig::new(1, 60))]),
        );
        let now = Instant::now();

        let github = key("tenant1", "john_doe", ConnectorType::GitHub);
        assert!(controller.admit_at(&github, now).allowed);
        assert!(!controller.admit_at(&github, now).allowed);

        let jira = key("tenant1", "john_doe", ConnectorType::Jira);
        assert_eq!(controller.remaining(&jira), 100);
    }

    #[test]
    fn test_key_recovers_after_period() {
        let controller = controller(1, 1);
        let start = Instant::now();
        let john = key("tenant1", "john_doe", ConnectorType::GitHub);

        assert!(controller.admit_at(&john, start).allowed);
        let rejected = controller.admit_at(&john, start);
        assert!(!rejected.allowed);
        assert_eq!(rejected.retry_after_seconds, Some(1));

        assert!(controller.admit_at(&john, start + Duration::from_secs(2)).allowed);
    }

    #[test]
    fn test_reset_restores_all_quotas() {
        let controller = controller(1, 3600);
        let now = Instant::now();
        let john = key("tenant1", "john_doe", ConnectorType::GitHub);

        assert!(controller.admit_at(&john, now).allowed);
        assert!(!controller.admit_at(&john, now).allowed);

        controller.reset();
        assert!(controller.admit_at(&john, now).allowed);
    }

    #[test]
    fn test_concurrent_admissions_never_exceed_capacity() {
        use std::sync::atomic::{AtomicU32, Ordering};

        let controller = Arc::new(controller(50, 3600));
        let admitted = Arc::new(AtomicU32::new(0));
        let john = key("tenant1", "john_doe", ConnectorType::GitHub);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let controller = Arc::clone(&controller);
                let admitted = Arc::clone(&admitted);
                let john = john.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        if controller.admit(&john).allowed {
                            admitted.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("admission thread panicked");
        }

        assert_eq!(admitted.load(Ordering::Relaxed), 50);
    }
}
