//! `TtlCache` — key/value entries with an absolute expiry instant.
//!
//! An entry is expired once `now >= expires_at`, so a zero TTL stores an
//! entry that is already a miss. Expired and absent keys look the same to
//! callers: both return `None`.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

/// TTL applied by [`TtlCache::insert`] unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Stand-in expiry for TTLs too large to add to an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            expires_at: now
                .checked_add(ttl)
                .or_else(|| now.checked_add(FAR_FUTURE))
                .unwrap_or(now),
        }
    }

    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Thread-safe cache handle. Clones share the same entries.
#[derive(Debug, Clone)]
pub struct TtlCache<K, V> {
    entries: Arc<Mutex<HashMap<K, CacheEntry<V>>>>,
    default_ttl: Duration,
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self::with_default_ttl(DEFAULT_TTL)
    }

    pub fn with_default_ttl(default_ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Value for `key` if present and unexpired. An expired entry is evicted.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut entries = self.entries.lock();
        let expired = entries.get(key)?.is_expired(Instant::now());
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.value.clone())
    }

    /// Store `value` under `key` until `now + ttl`, replacing any prior entry.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        self.entries.lock().insert(key, CacheEntry::new(value, ttl));
        debug!(ttl_ms = ttl.as_millis() as u64, "cache entry set");
    }

    /// [`set`](Self::set) with the cache's default TTL.
    pub fn insert(&self, key: K, value: V) {
        self.set(key, value, self.default_ttl);
    }

    /// Remove `key` if present.
    pub fn delete<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.lock().remove(key);
    }

    /// Remove every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let count = entries.len();
        entries.clear();
        debug!(count, "cache cleared");
    }

    /// Evict every expired entry, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, remaining = entries.len(), "expired cache entries evicted");
        }
        evicted
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read through the cache, computing and storing the value on a miss.
    ///
    /// `compute` runs without the cache lock held, so concurrent misses on
    /// the same key may each compute; the last write wins.
    pub fn get_or_insert_with<F>(&self, key: K, ttl: Duration, compute: F) -> V
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(&key) {
            return value;
        }
        let value = compute();
        self.set(key, value.clone(), ttl);
        value
    }

    /// Fallible [`get_or_insert_with`](Self::get_or_insert_with). Errors are
    /// returned to the caller and nothing is cached.
    pub fn try_get_or_insert_with<F, E>(&self, key: K, ttl: Duration, compute: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = compute()?;
        self.set(key, value.clone(), ttl);
        Ok(value)
    }
}
