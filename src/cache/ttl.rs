//! In-memory TTL cache for idempotent upstream calls

use super::key::CacheKey;
use crate::metrics;
use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Default time-to-live for cached upstream responses (30 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(1800);

/// Default bound on live entries per cache
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

/// Process-wide memoization of costly, idempotent calls
///
/// Expiry is absolute: an entry older than the TTL is treated as absent no
/// matter how often it was read. Expired entries are evicted by moka's
/// housekeeping, and the entry count is bounded, so the key space of a
/// long-running server cannot grow without limit.
pub struct TtlCache<V> {
    name: &'static str,
    ttl: Duration,
    inner: Cache<CacheKey, Arc<V>>,
}

impl<V> TtlCache<V>
where
    V: Send + Sync + 'static,
{
    /// Create a cache; `name` labels its metrics and logs
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self::with_capacity(name, ttl, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_capacity(name: &'static str, ttl: Duration, max_entries: u64) -> Self {
        let inner = Cache::builder()
            .name(name)
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { name, ttl, inner }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a non-expired entry
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<V>> {
        self.inner.get(key).await
    }

    /// Store a value stamped with the current time, replacing any previous entry
    pub async fn insert(&self, key: CacheKey, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.inner.insert(key, Arc::clone(&value)).await;
        value
    }

    /// Return the cached value for `key`, or run `compute` and cache its result
    ///
    /// Concurrent misses on the same key share one computation.
    pub async fn get_or_compute<F, Fut>(&self, key: CacheKey, compute: F) -> Arc<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let entry = self
            .inner
            .entry(key)
            .or_insert_with(async move { Arc::new(compute().await) })
            .await;
        self.record(entry.key(), !entry.is_fresh());
        entry.into_value()
    }

    /// Fallible variant of [`TtlCache::get_or_compute`]; errors are never cached
    ///
    /// The error reaches the caller as `compute` produced it.
    pub async fn try_get_or_compute<F, Fut, E>(
        &self,
        key: CacheKey,
        compute: F,
    ) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.inner.get(&key).await {
            self.record(&key, true);
            return Ok(hit);
        }
        self.record(&key, false);
        let value = compute().await?;
        Ok(self.insert(key, value).await)
    }

    fn record(&self, key: &CacheKey, hit: bool) {
        if hit {
            tracing::trace!(cache = self.name, key = %key, "Cache hit");
            metrics::record_cache_hit(self.name);
        } else {
            tracing::trace!(cache = self.name, key = %key, "Cache miss");
            metrics::record_cache_miss(self.name);
        }
    }

    /// Number of live entries, after pending evictions are applied
    pub async fn len(&self) -> u64 {
        self.inner.run_pending_tasks().await;
        self.inner.entry_count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}
