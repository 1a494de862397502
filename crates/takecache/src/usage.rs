// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-key hit and miss accounting.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};

const HITS_SUFFIX: &str = "_hits_total";
const MISSES_SUFFIX: &str = "_misses_total";

#[derive(Debug, Default)]
struct KeyCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

/// A registry of hit and miss counters, one pair per cache key.
///
/// Counters are created the first time a key is charged and live as long as the registry.
/// A registry is usually shared between a [`CacheNode`](crate::CacheNode) and whatever exports
/// its numbers.
///
/// # Examples
///
/// ```
/// use takecache::Usage;
///
/// let usage = Usage::new();
/// usage.incr_miss("user:1");
/// usage.incr_hit("user:1");
///
/// assert_eq!(usage.hit_count("user:1"), 1);
/// assert_eq!(usage.miss_count("user:1"), 1);
/// assert_eq!(usage.hit_ratio("user:1"), 0);
/// ```
#[derive(Debug, Default)]
pub struct Usage {
    counters: RwLock<HashMap<String, Arc<KeyCounters>>>,
    registration: Mutex<()>,
}

impl Usage {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a cache hit for `key`.
    pub fn incr_hit(&self, key: &str) {
        self.counters_for(key).hits.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a cache miss for `key`.
    pub fn incr_miss(&self, key: &str) {
        self.counters_for(key).misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of hits recorded for `key`.
    #[must_use]
    pub fn hit_count(&self, key: &str) -> u64 {
        self.read(key, |c| c.hits.load(Ordering::Relaxed))
    }

    /// Returns the number of misses recorded for `key`.
    #[must_use]
    pub fn miss_count(&self, key: &str) -> u64 {
        self.read(key, |c| c.misses.load(Ordering::Relaxed))
    }

    /// Returns `hits / (hits + misses)` for `key` in integer arithmetic, or zero when nothing was
    /// recorded.
    ///
    /// The result is `1` only when every lookup hit; any miss truncates it to `0`.
    #[must_use]
    pub fn hit_ratio(&self, key: &str) -> u64 {
        let hits = self.hit_count(key);
        let total = hits.saturating_add(self.miss_count(key));
        hits.checked_div(total).unwrap_or(0)
    }

    /// Returns every key with registered counters, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.counters.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    /// Captures the current value of every counter.
    #[must_use]
    pub fn snapshot(&self) -> UsageSnapshot {
        let counters = self.counters.read();
        let values = counters
            .iter()
            .flat_map(|(key, c)| {
                [
                    (hits_name(key), c.hits.load(Ordering::Relaxed)),
                    (misses_name(key), c.misses.load(Ordering::Relaxed)),
                ]
            })
            .collect();
        UsageSnapshot { values }
    }

    fn read(&self, key: &str, f: impl FnOnce(&KeyCounters) -> u64) -> u64 {
        self.counters.read().get(key).map_or(0, |c| f(c.as_ref()))
    }

    fn counters_for(&self, key: &str) -> Arc<KeyCounters> {
        if let Some(counters) = self.counters.read().get(key) {
            return Arc::clone(counters);
        }

        let _registration = self.registration.lock();
        if let Some(counters) = self.counters.read().get(key) {
            return Arc::clone(counters);
        }

        tracing::trace!(cache.key = key, "registering usage counters");
        let counters = Arc::new(KeyCounters::default());
        self.counters.write().insert(key.to_owned(), Arc::clone(&counters));
        counters
    }
}

/// A point-in-time copy of a [`Usage`] registry, keyed by counter name.
///
/// Counter names are `{key}_hits_total` and `{key}_misses_total`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSnapshot {
    values: BTreeMap<String, u64>,
}

impl UsageSnapshot {
    /// Returns the value of a counter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }

    /// Iterates over `(counter name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Returns the number of counters captured.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no counters were captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Returns the hit counter name for `key`.
#[must_use]
pub fn hits_name(key: &str) -> String {
    format!("{key}{HITS_SUFFIX}")
}

/// Returns the miss counter name for `key`.
#[must_use]
pub fn misses_name(key: &str) -> String {
    format!("{key}{MISSES_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn unknown_key_reads_zero() {
        let usage = Usage::new();
        assert_eq!(usage.hit_count("missing"), 0);
        assert_eq!(usage.miss_count("missing"), 0);
        assert_eq!(usage.hit_ratio("missing"), 0);
        assert!(usage.keys().is_empty());
    }

    #[test]
    fn ratio_uses_integer_division() {
        let usage = Usage::new();
        usage.incr_hit("a");
        assert_eq!(usage.hit_ratio("a"), 1);

        usage.incr_hit("a");
        usage.incr_miss("a");
        assert_eq!(usage.hit_ratio("a"), 0);

        usage.incr_miss("b");
        assert_eq!(usage.hit_ratio("b"), 0);
    }

    #[test]
    fn keys_are_sorted() {
        let usage = Usage::new();
        usage.incr_miss("b");
        usage.incr_hit("a");
        usage.incr_hit("a");
        assert_eq!(usage.keys(), ["a", "b"]);
    }

    #[test]
    fn snapshot_uses_counter_names() {
        let usage = Usage::new();
        usage.incr_hit("user:1");
        usage.incr_miss("user:1");
        usage.incr_miss("user:1");

        let snapshot = usage.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.get("user:1_hits_total"), Some(1));
        assert_eq!(snapshot.get("user:1_misses_total"), Some(2));
        assert_eq!(snapshot.get("user:2_hits_total"), None);

        let names: Vec<_> = snapshot.iter().map(|(name, _)| name).collect();
        assert_eq!(names, ["user:1_hits_total", "user:1_misses_total"]);
    }

    #[test]
    fn concurrent_increments_are_not_lost() {
        let usage = Arc::new(Usage::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let usage = Arc::clone(&usage);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        usage.incr_hit("shared");
                        usage.incr_miss("shared");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(usage.hit_count("shared"), 8000);
        assert_eq!(usage.miss_count("shared"), 8000);
        assert_eq!(usage.keys().len(), 1);
    }
}
