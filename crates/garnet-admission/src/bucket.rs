//! The token bucket itself.
//!
//! Refill is a coarse periodic reset rather than a proportional trickle:
//! once a full period elapses the bucket snaps back to capacity. That
//! matches source-system quota windows ("100 calls per minute") more
//! closely than a leaky bucket would, and keeps the arithmetic exact.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

// ============================================================================
// BucketConfig
// ============================================================================

/// Capacity and refill period for one bucket class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketConfig {
    /// Requests admitted per period.
    pub capacity: u32,
    /// Seconds until the bucket resets to capacity.
    pub period_seconds: u64,
}

impl BucketConfig {
    pub const fn new(capacity: u32, period_seconds: u64) -> Self {
        Self {
            capacity,
            period_seconds,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_seconds)
    }
}

impl Default for BucketConfig {
    /// 100 requests per 60 seconds, the stock source-API quota.
    fn default() -> Self {
        Self::new(100, 60)
    }
}

// ============================================================================
// AdmissionDecision
// ============================================================================

/// Whether one request may proceed, and what to tell the caller if not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionDecision {
    pub allowed: bool,
    /// Tokens left after this decision.
    pub remaining: u32,
    /// Seconds until the bucket refills. Present only on rejection.
    pub retry_after_seconds: Option<u64>,
    /// Human-readable rejection message. Present only on rejection.
    pub message: Option<String>,
}

impl AdmissionDecision {
    fn admitted(remaining: u32) -> Self {
        Self {
            allowed: true,
            remaining,
            retry_after_seconds: None,
            message: None,
        }
    }

    fn rejected(retry_after_seconds: u64, message: String) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            retry_after_seconds: Some(retry_after_seconds),
            message: Some(message),
        }
    }
}

// ============================================================================
// TokenBucket
// ============================================================================

/// One bucket: capacity, current tokens, and the last reset instant.
///
/// Not internally synchronized; the controller holds each bucket behind
/// its own lock. All time-dependent methods take an explicit `now` so
/// tests drive the clock instead of sleeping.
#[derive(Debug)]
pub struct TokenBucket {
    config: BucketConfig,
    tokens: u32,
    last_refill: Instant,
}

impl TokenBucket {
    /// A fresh bucket starts full.
    pub fn new(config: BucketConfig, now: Instant) -> Self {
        Self {
            config,
            tokens: config.capacity,
            last_refill: now,
        }
    }

    /// Refill-then-consume, as one step.
    pub fn admit_at(&mut self, now: Instant, connector_name: &str) -> AdmissionDecision {
        self.refill(now);
        if self.tokens > 0 {
            self.tokens -= 1;
            AdmissionDecision::admitted(self.tokens)
        } else {
            let retry_after = self.retry_after_seconds(now);
            AdmissionDecision::rejected(
                retry_after,
                format!(
                    "Rate limit exceeded for {connector_name}. Please retry after {retry_after} seconds."
                ),
            )
        }
    }

    /// Tokens currently available, after any due refill.
    pub fn available_at(&mut self, now: Instant) -> u32 {
        self.refill(now);
        self.tokens
    }

    fn refill(&mut self, now: Instant) {
        if now.duration_since(self.last_refill) >= self.config.period() {
            self.tokens = self.config.capacity;
            self.last_refill = now;
        }
    }

    fn retry_after_seconds(&self, now: Instant) -> u64 {
        let elapsed = now.duration_since(self.last_refill).as_secs();
        self.config.period_seconds.saturating_sub(elapsed)
    }
}

// ============================================================================
// Tests
// ============================================================================
