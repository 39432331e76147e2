//! In-process content cache implementations.

use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::ContentCache;

/// Content cache held in a concurrent map, with hit/miss statistics.
///
/// Statistics are process-local and only meant for diagnostics and tests.
#[derive(Debug, Default)]
pub struct MemoryContentCache {
    entries: DashMap<(String, String), Value>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryContentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get cache statistics as `(hits, misses)`.
    pub fn stats(&self) -> (usize, usize) {
        (self.hits.load(Ordering::Relaxed), self.misses.load(Ordering::Relaxed))
    }

    /// Number of successful writes since creation.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let (hits, misses) = self.stats();
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            (hits as f64 / total as f64) * 100.0
        }
    }

    /// Number of entries currently held in an area.
    pub fn area_len(&self, area: &str) -> usize {
        self.entries.iter().filter(|e| e.key().0 == area).count()
    }

    /// Clear all entries and statistics.
    pub fn clear(&self) {
        self.entries.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.writes.store(0, Ordering::Relaxed);
    }
}

impl ContentCache for MemoryContentCache {
    fn get(&self, area: &str, key: &str) -> Option<Value> {
        match self.entries.get(&(area.to_string(), key.to_string())) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    fn set(&self, area: &str, key: &str, value: Value) {
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.entries.insert((area.to_string(), key.to_string()), value);
    }

    fn delete(&self, area: &str, key: &str) {
        self.entries.remove(&(area.to_string(), key.to_string()));
    }

    fn purge_area(&self, area: &str) {
        self.entries.retain(|(a, _), _| a != area);
    }

    fn has(&self, area: &str, key: &str) -> bool {
        self.entries.contains_key(&(area.to_string(), key.to_string()))
    }
}

/// Cache that stores nothing; used when caching is switched off in configuration.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopContentCache;

impl ContentCache for NoopContentCache {
    fn get(&self, _area: &str, _key: &str) -> Option<Value> {
        None
    }

    fn set(&self, _area: &str, _key: &str, _value: Value) {}

    fn delete(&self, _area: &str, _key: &str) {}

    fn purge_area(&self, _area: &str) {}
}
