//! Bounded, thread-safe memo of extraction results.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

const DEFAULT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

/// LRU map from a normalized text key to an extracted record. Least recently
/// used entries are evicted once `capacity` is reached.
pub struct ExtractionCache<V> {
    entries: Mutex<LruCache<String, V>>,
    stats: Mutex<(u64, u64)>,
}

impl<V: Clone> ExtractionCache<V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self { entries: Mutex::new(LruCache::new(capacity)), stats: Mutex::new((0, 0)) }
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let found = self.entries.lock().get(key).cloned();
        let mut stats = self.stats.lock();
        if found.is_some() {
            stats.0 += 1;
        } else {
            stats.1 += 1;
        }
        found
    }

    pub fn insert(&self, key: String, value: V) {
        self.entries.lock().put(key, value);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn stats(&self) -> CacheStats {
        let (hits, misses) = *self.stats.lock();
        CacheStats { hits, misses, entries: self.len() }
    }
}

impl<V: Clone> Default for ExtractionCache<V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
