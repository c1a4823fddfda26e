//! In-memory entity caches
//!
//! One `StructCache` per entity type sits in front of the database.
//! Reads go through the cache (populated on miss), writes go to the
//! database first and only then into the cache. Uses Moka, whose entry
//! API collapses concurrent loads of the same key into one.

use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{AppError, Result};

const KEY_SEPARATOR: &str = "\u{1f}";

/// Key of one cache index: the lookup name plus the joined key parts
///
/// Example: `("Username.Domain", ["alice", "remote.example"])`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    lookup: &'static str,
    key: String,
}

impl CacheKey {
    pub fn new(lookup: &'static str, parts: &[&str]) -> Self {
        Self {
            lookup,
            key: parts.join(KEY_SEPARATOR),
        }
    }
}

/// A value that can be indexed by a `StructCache`
pub trait Cacheable: Clone + Send + Sync + 'static {
    /// Every key this value can be found under, primary key first.
    fn cache_keys(&self) -> Vec<CacheKey>;
}

/// Read-through / write-through cache for one entity type
pub struct StructCache<T: Cacheable> {
    name: &'static str,
    entries: Cache<CacheKey, Arc<T>>,
}

impl<T: Cacheable> StructCache<T> {
    /// Create new cache
    ///
    /// # Arguments
    /// * `name` - Label used for metrics and logs
    /// * `max_items` - Maximum number of index entries
    /// * `ttl` - Time-to-live of each entry
    pub fn new(name: &'static str, max_items: u64, ttl: Duration) -> Self {
        let entries = Cache::builder()
            .name(name)
            .max_capacity(max_items)
            .time_to_live(ttl)
            .build();

        Self { name, entries }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Load a value, calling `loader` only on a cache miss
    ///
    /// Concurrent callers asking for the same missing key wait on a single
    /// `loader` invocation. A successful result is indexed under all of the
    /// value's keys. Errors (including not-found) are returned to every
    /// waiter and never cached.
    pub async fn load<F, Fut>(
        &self,
        lookup: &'static str,
        loader: F,
        key_parts: &[&str],
    ) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = CacheKey::new(lookup, key_parts);

        let entry = self
            .entries
            .entry(key.clone())
            .or_try_insert_with(async move { loader().await.map(Arc::new) })
            .await
            .map_err(AppError::from_shared)?;

        use crate::metrics::{CACHE_HITS_TOTAL, CACHE_MISSES_TOTAL};
        if !entry.is_fresh() {
            CACHE_HITS_TOTAL.with_label_values(&[self.name]).inc();
            return Ok(entry.into_value());
        }

        CACHE_MISSES_TOTAL.with_label_values(&[self.name]).inc();
        let value = entry.into_value();
        for other in value.cache_keys().into_iter().filter(|k| *k != key) {
            self.entries.insert(other, value.clone()).await;
        }
        self.record_size();

        Ok(value)
    }

    /// Persist a value, then cache it
    ///
    /// Nothing is cached when `persist` fails. Any previously cached version
    /// is dropped from all of its indexes first, so stale secondary keys do
    /// not outlive an update.
    pub async fn store<Fut>(&self, value: &T, persist: Fut) -> Result<()>
    where
        Fut: Future<Output = Result<()>>,
    {
        persist.await?;

        let value = Arc::new(value.clone());
        let keys = value.cache_keys();

        if let Some(primary) = keys.first() {
            if let Some(previous) = self.entries.get(primary).await {
                self.drop_indexes(&previous).await;
            }
        }

        for key in keys {
            self.entries.insert(key, value.clone()).await;
        }
        self.record_size();

        Ok(())
    }

    /// Drop the value cached under the given key from all of its indexes
    pub async fn invalidate(&self, lookup: &'static str, key_parts: &[&str]) {
        let key = CacheKey::new(lookup, key_parts);

        if let Some(value) = self.entries.get(&key).await {
            self.drop_indexes(&value).await;
        }
        self.entries.invalidate(&key).await;

        tracing::trace!(cache = self.name, lookup, "invalidated cache entry");
    }

    /// Cached value for a key, without loading
    pub async fn get(&self, lookup: &'static str, key_parts: &[&str]) -> Option<Arc<T>> {
        self.entries.get(&CacheKey::new(lookup, key_parts)).await
    }

    async fn drop_indexes(&self, value: &T) {
        for key in value.cache_keys() {
            self.entries.invalidate(&key).await;
        }
    }

    /// Apply pending evictions, then publish the entry count
    pub async fn sync_size(&self) {
        self.entries.run_pending_tasks().await;
        self.record_size();
    }

    fn record_size(&self) {
        use crate::metrics::CACHE_SIZE;
        CACHE_SIZE
            .with_label_values(&[self.name])
            .set(self.entries.entry_count() as i64);
    }
}
