//! Cache layer for upstream responses
//!
//! Provides an in-memory TTL cache with explicit keys, injected into the
//! location resolver and the sensor fetcher.

mod key;
mod ttl;

pub use key::{CacheKey, CacheKeyBuilder};
pub use ttl::{TtlCache, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
