//! Result caching for the query gateway.
//!
//! Callers declare how stale a result they will tolerate per lookup
//! (`maxStalenessMs` in the wire vocabulary); the cache serves anything
//! younger and silently evicts anything older. Keys are derived from
//! (tenant, user, normalized query), so no entry ever crosses a principal
//! boundary.

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::ResultCache;
