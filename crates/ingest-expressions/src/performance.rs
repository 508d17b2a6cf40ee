//! Caching of parsed expressions
//!
//! Function configurations reuse the same handful of expression strings for
//! every incoming event, so the engine keeps parsed trees keyed by source text.

use crate::parser::ParsedExpression;
use dashmap::DashMap;
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Performance configuration for expression evaluation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Setters)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Cache parsed expressions by source text
    pub cache_enabled: bool,
    /// Maximum number of cached expressions
    pub cache_size: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_size: 1000,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    expression: Arc<ParsedExpression>,
    /// Value of the cache clock at the last access
    last_accessed: AtomicU64,
}

/// Snapshot of cache counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct CacheStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_inserts: u64,
    /// Entries dropped to make room; explicit removals are not counted
    pub cache_evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    evictions: AtomicU64,
}

/// Concurrent, capacity-bounded cache of parsed expressions with
/// least-recently-used eviction
#[derive(Debug)]
pub struct ExpressionCache {
    entries: DashMap<String, CacheEntry>,
    capacity: usize,
    clock: AtomicU64,
    counters: Counters,
}

impl ExpressionCache {
    /// Create a cache holding at most `capacity` expressions
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
            clock: AtomicU64::new(0),
            counters: Counters::default(),
        }
    }

    pub fn with_config(config: &PerformanceConfig) -> Self {
        let capacity = if config.cache_enabled {
            config.cache_size
        } else {
            0
        };
        Self::new(capacity)
    }

    /// Whether the cache stores anything at all
    pub fn is_enabled(&self) -> bool {
        self.capacity > 0
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Get a cached expression
    pub fn get(&self, source: &str) -> Option<Arc<ParsedExpression>> {
        match self.entries.get(source) {
            Some(entry) => {
                entry.last_accessed.store(self.tick(), Ordering::Relaxed);
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(Arc::clone(&entry.expression))
            }
            None => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert an expression, evicting the least recently used entry when full
    pub fn insert(&self, expression: Arc<ParsedExpression>) {
        if !self.is_enabled() {
            return;
        }

        let source = expression.source().to_string();
        if !self.entries.contains_key(&source) {
            while self.entries.len() >= self.capacity {
                if !self.evict_lru() {
                    break;
                }
            }
        }

        let entry = CacheEntry {
            expression,
            last_accessed: AtomicU64::new(self.tick()),
        };
        self.entries.insert(source, entry);
        self.counters.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Remove an expression from the cache
    pub fn remove(&self, source: &str) -> Option<Arc<ParsedExpression>> {
        self.entries.remove(source).map(|(_, entry)| entry.expression)
    }

    /// Clear the entire cache
    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            cache_hits: self.counters.hits.load(Ordering::Relaxed),
            cache_misses: self.counters.misses.load(Ordering::Relaxed),
            cache_inserts: self.counters.inserts.load(Ordering::Relaxed),
            cache_evictions: self.counters.evictions.load(Ordering::Relaxed),
        }
    }

    fn evict_lru(&self) -> bool {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().last_accessed.load(Ordering::Relaxed))
            .map(|entry| entry.key().clone());

        match oldest {
            Some(source) => {
                tracing::debug!(expression = %source, "evicting cached expression");
                let evicted = self.entries.remove(&source).is_some();
                if evicted {
                    self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                }
                evicted
            }
            None => false,
        }
    }
}

impl Default for ExpressionCache {
    fn default() -> Self {
        Self::with_config(&PerformanceConfig::default())
    }
}
