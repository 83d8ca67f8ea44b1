//! Admission control for connector-bound queries.
//!
//! Source systems meter their APIs, so the gateway meters itself first:
//! every query consumes one token from a bucket keyed by
//! (tenant, user, connector), and a drained bucket turns the query away
//! with a retry hint instead of letting the source return a 429.
//!
//! Buckets refill by periodic reset, not proportional trickle. See
//! [`bucket`] for the mechanics and [`controller`] for the keyed registry.

pub mod bucket;
pub mod controller;

pub use bucket::{AdmissionDecision, BucketConfig, TokenBucket};
pub use controller::{AdmissionController, AdmissionKey};
