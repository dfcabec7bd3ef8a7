use anyhow::Result;
use dashmap::DashMap;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Thread-safe in-memory TTL cache for upstream AI results.
/// Expiry is lazy: detected on read, plus the periodic `cleanup` sweep the
/// host runs. There is no capacity bound.
#[derive(Clone)]
pub struct CacheManager<V> {
    storage: Arc<DashMap<String, CacheEntry<V>>>,
    ttl: Duration,
}

impl<V: Clone + Send + Sync + 'static> CacheManager<V> {
    pub fn new(ttl: Duration) -> Self {
        info!("Initializing cache manager (ttl: {:?})", ttl);
        Self {
            storage: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Store a value, unconditionally overwriting any existing entry.
    pub fn set(&self, key: &str, value: V) {
        self.storage.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: Instant::now() + self.ttl,
            },
        );
        debug!("Cached entry for key {}", key);
    }

    /// Returns the value if present and unexpired. An expired entry is
    /// evicted as a side effect and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let entry = self.storage.get(key)?;
        if entry.is_expired() {
            drop(entry); // Release read lock before removal
            self.storage.remove(key);
            debug!("Cache entry {} expired, removed", key);
            return None;
        }
        Some(entry.value.clone())
    }

    /// Cached value on hit; on miss, awaits `fetch`, stores its result and
    /// returns it. A failed fetch propagates unchanged and populates nothing.
    ///
    /// Concurrent misses for the same key are not coalesced: two simultaneous
    /// callers may both invoke `fetch`. Known limitation carried over from
    /// the original bookkeeping, kept to preserve observable timing.
    pub async fn get_or_fetch<F, Fut>(&self, key: &str, fetch: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(key) {
            debug!("Cache hit for key {}", key);
            return Ok(value);
        }

        debug!("Cache miss for key {}, fetching", key);
        let value = fetch().await?;
        self.set(key, value.clone());
        Ok(value)
    }

    /// Sweep expired entries. Returns the number removed. Must be driven by
    /// the host's periodic sweeper task.
    pub fn cleanup(&self) -> usize {
        let before = self.storage.len();
        self.storage.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.storage.len());
        if removed > 0 {
            info!("Cleaned up {} expired cache entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

/// Deterministic cache key: `prefix:sha256(canonical json of params)`.
///
/// serde_json's default map is BTreeMap-backed, so object keys serialize in
/// sorted order and two logically identical parameter sets always produce
/// the same digest.
///
/// Unserializable params get a unique one-off key instead of a shared
/// fallback, so they can never alias each other in the cache.
pub fn cache_key<P: Serialize>(prefix: &str, params: &P) -> String {
    match serde_json::to_value(params) {
        Ok(value) => {
            let digest = Sha256::digest(value.to_string().as_bytes());
            format!("{}:{}", prefix, hex::encode(digest))
        }
        Err(e) => {
            warn!("Cache key params failed to serialize: {}", e);
            format!("{}:uncacheable:{}", prefix, uuid::Uuid::new_v4())
        }
    }
}
