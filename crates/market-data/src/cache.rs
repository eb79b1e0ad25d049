//! TTL + LRU freshness cache.
//!
//! Bounded key-value store where every entry carries a time-to-live.
//! Expired entries are dropped lazily on read and proactively by a
//! periodic sweep; capacity is enforced by evicting the single
//! least-recently-accessed entry on insert.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Time source for expiry checks. Swappable so tests control the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall-clock time
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct Entry<V> {
    value: V,
    written_at: Instant,
    ttl: Duration,
    /// Monotonic access stamp used for LRU ordering
    last_access: u64,
}

struct Inner<V> {
    entries: HashMap<String, Entry<V>>,
    access_counter: u64,
}

/// Freshness cache with string keys.
///
/// Values are cloned out on read; market data values are small and
/// already reference-counted where it matters.
pub struct TtlCache<V> {
    inner: Mutex<Inner<V>>,
    capacity: usize,
    default_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        Self::with_clock(capacity, default_ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(capacity: usize, default_ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                access_counter: 0,
            }),
            capacity: capacity.max(1),
            default_ttl,
            clock,
        }
    }

    /// Insert with the cache's default TTL
    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    /// Insert with an explicit TTL, evicting the least-recently-accessed
    /// entry first when at capacity
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.capacity {
            if let Some(victim) = inner
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_access)
                .map(|(k, _)| k.clone())
            {
                trace!(key = %victim, "Evicting least-recently-used entry");
                inner.entries.remove(&victim);
            }
        }

        inner.access_counter += 1;
        let stamp = inner.access_counter;
        inner.entries.insert(
            key,
            Entry {
                value,
                written_at: now,
                ttl,
                last_access: stamp,
            },
        );
    }

    /// Fresh value for `key`, or `None`. Expired entries are removed
    /// here rather than waiting for the sweep.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();

        let expired = match inner.entries.get(key) {
            Some(entry) => now.duration_since(entry.written_at) > entry.ttl,
            None => return None,
        };

        if expired {
            inner.entries.remove(key);
            return None;
        }

        inner.access_counter += 1;
        let stamp = inner.access_counter;
        let entry = inner.entries.get_mut(key)?;
        entry.last_access = stamp;
        Some(entry.value.clone())
    }

    /// Whether a fresh value exists, without touching access order
    pub fn has(&self, key: &str) -> bool {
        let now = self.clock.now();
        let inner = self.inner.lock();
        inner
            .entries
            .get(key)
            .is_some_and(|e| now.duration_since(e.written_at) <= e.ttl)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.inner.lock().entries.remove(key).is_some()
    }

    /// Remove every entry whose key starts with `prefix`; returns the
    /// number removed
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner.entries.retain(|k, _| !k.starts_with(prefix));
        let removed = before - inner.entries.len();
        if removed > 0 {
            debug!(prefix, removed, "Invalidated cache entries by prefix");
        }
        removed
    }

    /// Drop all expired entries; returns the number removed.
    /// Called periodically by the orchestrator's sweep task.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        inner
            .entries
            .retain(|_, e| now.duration_since(e.written_at) <= e.ttl);
        let removed = before - inner.entries.len();
        if removed > 0 {
            debug!(removed, "Swept expired cache entries");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
