//! Keyed artifact caches: independent LRU stores with single-flight builds.
//!
//! Each artifact kind (palette, choropleth, detail panel, summary panel) gets
//! its own store with its own lock, so a miss on one kind never blocks
//! readers of another. Concurrent misses on one key run exactly one build;
//! the other callers wait and receive the same `Arc`. Failed builds are
//! never inserted, so the next request simply retries.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

/// Host-facing cache knobs: the global switch plus one capacity per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// When false every request rebuilds; used for diagnosing staleness.
    pub enabled: bool,
    pub palette_entries: usize,
    pub choropleth_entries: usize,
    pub detail_entries: usize,
    pub summary_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            palette_entries: 16,
            choropleth_entries: 50,
            detail_entries: 100,
            summary_entries: 10,
        }
    }
}

/// Diagnostic counters of one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub name: &'static str,
    pub hits: u64,
    pub builds: u64,
    pub entries: usize,
}

// ── LRU bookkeeping ───────────────────────────────────────────────────────────

struct LruEntry<V> {
    value: V,
    last_used: u64,
}

struct Lru<K, V> {
    capacity: usize,
    tick: u64,
    entries: HashMap<K, LruEntry<V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> Lru<K, V> {
    fn new(capacity: usize) -> Self {
        Self { capacity, tick: 0, entries: HashMap::new() }
    }

    fn get(&mut self, key: &K) -> Option<V> {
        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(key).map(|e| {
            e.last_used = tick;
            e.value.clone()
        })
    }

    fn insert(&mut self, key: K, value: V) {
        self.tick += 1;
        self.entries.insert(key, LruEntry { value, last_used: self.tick });
        while self.entries.len() > self.capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.last_used)
                .map(|(k, _)| k.clone())
            else {
                break;
            };
            self.entries.remove(&oldest);
        }
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ── Single-flight store ───────────────────────────────────────────────────────

struct FlightState<K, V> {
    lru: Lru<K, Arc<V>>,
    in_flight: HashSet<K>,
}

/// A keyed get-or-build store. `V` is stored behind `Arc` so every caller of
/// one build observes the same object.
pub struct FlightCache<K, V> {
    name: &'static str,
    enabled: bool,
    state: Mutex<FlightState<K, V>>,
    done: Condvar,
    hits: AtomicU64,
    builds: AtomicU64,
}

impl<K: Eq + Hash + Clone, V> FlightCache<K, V> {
    pub fn new(name: &'static str, capacity: usize, enabled: bool) -> Self {
        Self {
            name,
            enabled,
            state: Mutex::new(FlightState { lru: Lru::new(capacity), in_flight: HashSet::new() }),
            done: Condvar::new(),
            hits: AtomicU64::new(0),
            builds: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FlightState<K, V>> {
        // A panicking builder never holds this lock, so a poisoned state is
        // still internally consistent; keep serving.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached artifact or build it. Exactly one build runs per key
    /// at a time; concurrent callers for that key block until it completes
    /// and then share its result. A failed build leaves no trace.
    pub fn get_or_build<E>(
        &self,
        key: K,
        build: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if !self.enabled {
            self.builds.fetch_add(1, Ordering::Relaxed);
            return build().map(Arc::new);
        }

        let mut state = self.lock();
        loop {
            if let Some(hit) = state.lru.get(&key) {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(cache = self.name, "hit");
                return Ok(hit);
            }
            if state.in_flight.contains(&key) {
                state = self.done.wait(state).unwrap_or_else(PoisonError::into_inner);
                continue;
            }
            break;
        }
        state.in_flight.insert(key.clone());
        drop(state);

        // The guard clears the in-flight marker on every exit path, including
        // a panicking builder, so waiters can take over instead of blocking
        // forever.
        let _flight = FlightGuard { cache: self, key: key.clone() };

        self.builds.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(cache = self.name, "miss, building");
        match build() {
            Ok(value) => {
                let value = Arc::new(value);
                self.lock().lru.insert(key, Arc::clone(&value));
                Ok(value)
            }
            Err(e) => {
                tracing::debug!(cache = self.name, "build failed, not cached");
                Err(e)
            }
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            name: self.name,
            hits: self.hits.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            entries: self.lock().lru.len(),
        }
    }

    /// Total builds so far; the instrumentation hook for single-flight tests.
    pub fn builds(&self) -> u64 {
        self.builds.load(Ordering::Relaxed)
    }
}

struct FlightGuard<'a, K: Eq + Hash + Clone, V> {
    cache: &'a FlightCache<K, V>,
    key: K,
}

impl<K: Eq + Hash + Clone, V> Drop for FlightGuard<'_, K, V> {
    fn drop(&mut self) {
        let mut state = self.cache.lock();
        state.in_flight.remove(&self.key);
        drop(state);
        self.cache.done.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::Barrier;
    use std::time::Duration;

    fn ok(v: u32) -> impl FnOnce() -> Result<u32, Infallible> {
        move || Ok(v)
    }

    #[test]
    fn second_get_hits_the_cache() {
        let cache: FlightCache<&str, u32> = FlightCache::new("t", 4, true);
        let a = cache.get_or_build("k", ok(1)).unwrap();
        let b = cache.get_or_build("k", ok(2)).unwrap();
        assert!(Arc::ptr_eq(&a, &b), "second caller must reuse the built Arc");
        assert_eq!(*b, 1, "cached value must win over the new builder");
        assert_eq!(cache.builds(), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[test]
    fn evicts_least_recently_accessed_entry() {
        let cache: FlightCache<&str, u32> = FlightCache::new("t", 2, true);
        cache.get_or_build("a", ok(1)).unwrap();
        cache.get_or_build("b", ok(2)).unwrap();
        // Touch "a" so "b" becomes the eviction candidate.
        cache.get_or_build("a", ok(0)).unwrap();
        cache.get_or_build("c", ok(3)).unwrap();

        assert_eq!(cache.stats().entries, 2);
        cache.get_or_build("a", ok(9)).unwrap();
        assert_eq!(cache.builds(), 3, "\"a\" must still be cached");
        cache.get_or_build("b", ok(9)).unwrap();
        assert_eq!(cache.builds(), 4, "\"b\" must have been evicted");
    }

    #[test]
    fn disabled_cache_rebuilds_every_time() {
        let cache: FlightCache<&str, u32> = FlightCache::new("t", 4, false);
        let a = cache.get_or_build("k", ok(1)).unwrap();
        let b = cache.get_or_build("k", ok(2)).unwrap();
        assert_eq!((*a, *b), (1, 2));
        assert_eq!(cache.builds(), 2);
    }

    #[test]
    fn failed_build_is_not_cached() {
        let cache: FlightCache<&str, u32> = FlightCache::new("t", 4, true);
        let err = cache.get_or_build("k", || Err::<u32, &str>("boom")).unwrap_err();
        assert_eq!(err, "boom");
        // The failure left no poisoned entry; the retry builds and caches.
        let v = cache.get_or_build("k", ok(7)).unwrap();
        assert_eq!(*v, 7);
        assert_eq!(cache.builds(), 2);
        let again = cache.get_or_build("k", ok(8)).unwrap();
        assert!(Arc::ptr_eq(&v, &again));
    }

    #[test]
    fn concurrent_first_requests_build_exactly_once() {
        const THREADS: usize = 8;
        let cache: FlightCache<&str, u32> = FlightCache::new("t", 4, true);
        let barrier = Barrier::new(THREADS);

        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..THREADS)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        cache
                            .get_or_build("k", || {
                                // Hold the flight open long enough for every
                                // other thread to arrive and wait.
                                std::thread::sleep(Duration::from_millis(30));
                                Ok::<u32, Infallible>(42)
                            })
                            .unwrap()
                    })
                })
                .collect();
            let results: Vec<Arc<u32>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
            for r in &results {
                assert!(Arc::ptr_eq(r, &results[0]), "all callers must share one result");
            }
        });

        assert_eq!(cache.builds(), 1, "single-flight must collapse concurrent builds");
    }

    #[test]
    fn panicking_builder_does_not_strand_the_key() {
        let cache: FlightCache<&str, u32> = FlightCache::new("t", 4, true);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            cache.get_or_build("k", || -> Result<u32, Infallible> { panic!("builder died") })
        }));
        assert!(result.is_err());
        // The in-flight marker must be gone; this call builds instead of hanging.
        let v = cache.get_or_build("k", ok(5)).unwrap();
        assert_eq!(*v, 5);
    }

    #[test]
    fn independent_keys_do_not_wait_on_each_other() {
        let cache: FlightCache<&str, u32> = FlightCache::new("t", 4, true);
        let barrier = Barrier::new(2);
        std::thread::scope(|scope| {
            let a = scope.spawn(|| {
                barrier.wait();
                cache.get_or_build("a", ok(1)).unwrap()
            });
            let b = scope.spawn(|| {
                barrier.wait();
                cache.get_or_build("b", ok(2)).unwrap()
            });
            assert_eq!(*a.join().unwrap(), 1);
            assert_eq!(*b.join().unwrap(), 2);
        });
        assert_eq!(cache.builds(), 2);
    }
}
