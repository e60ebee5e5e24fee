/// Expiring, single-flight snapshot cache.
///
/// Entries live for a fixed TTL and the map is bounded, evicting the
/// oldest entry when full. Computation is coalesced per key: concurrent
/// callers asking for the same key wait for the first caller's result
/// instead of each hitting the upstreams.
///
/// Callers that need deterministic expiry pass `now` explicitly (`get`,
/// `insert`); `get_or_compute` reads the clock itself.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Hit,
    Miss,
}

struct CacheEntry<V> {
    value: V,
    stored_at: Instant,
}

pub struct SnapshotCache<V> {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// A poisoned lock only means another computation panicked; the map
/// itself is still consistent.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<V: Clone> SnapshotCache<V> {
    /// A zero `ttl` or `max_entries` disables storage; coalescing still
    /// applies.
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: Mutex::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    fn enabled(&self) -> bool {
        !self.ttl.is_zero() && self.max_entries > 0
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.stored_at) < self.ttl
    }

    pub fn get(&self, key: &str, now: Instant) -> Option<V> {
        if !self.enabled() {
            return None;
        }
        let entries = lock(&self.entries);
        entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.value.clone())
    }

    pub fn insert(&self, key: String, value: V, now: Instant) {
        if !self.enabled() {
            return;
        }
        let mut entries = lock(&self.entries);
        entries.retain(|_, entry| now.saturating_duration_since(entry.stored_at) < self.ttl);
        if entries.len() >= self.max_entries && !entries.contains_key(&key) {
            if let Some(victim) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&victim);
            }
        }
        entries.insert(key, CacheEntry { value, stored_at: now });
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cached value for `key`, computing and storing it on a
    /// miss. At most one `compute` runs per key at a time.
    pub fn get_or_compute<F>(&self, key: &str, compute: F) -> (V, CacheOutcome)
    where
        F: FnOnce() -> V,
    {
        if let Some(value) = self.get(key, Instant::now()) {
            return (value, CacheOutcome::Hit);
        }

        let key_lock = {
            let mut inflight = lock(&self.inflight);
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        let result = {
            let _guard = lock(&key_lock);
            // A caller we waited on may have filled the entry.
            match self.get(key, Instant::now()) {
                Some(value) => (value, CacheOutcome::Hit),
                None => {
                    let value = compute();
                    self.insert(key.to_string(), value.clone(), Instant::now());
                    (value, CacheOutcome::Miss)
                }
            }
        };

        self.release(key, key_lock);
        result
    }

    /// Drops the key lock from the in-flight map once nobody else holds it.
    /// Clones are taken and released only under the in-flight lock, so the
    /// count is exact.
    fn release(&self, key: &str, key_lock: Arc<Mutex<()>>) {
        let mut inflight = lock(&self.inflight);
        if Arc::strong_count(&key_lock) <= 2 {
            inflight.remove(key);
        }
        drop(key_lock);
    }
}
