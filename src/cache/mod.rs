//! Kernel column cache
//!
//! Holds full kernel columns k(·, x_j) over the training set, keyed by the
//! training index j. A cache lives inside one center-selection run and is
//! dropped with it.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// LRU cache of kernel columns
pub struct KernelCache {
    cache: LruCache<usize, Arc<Vec<f64>>>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Create a cache holding at most `capacity` columns
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Create a cache sized for `memory_bytes` worth of columns of `column_len` values
    pub fn with_memory_limit(memory_bytes: usize, column_len: usize) -> Self {
        // 8 bytes per value plus a small per-entry overhead
        let per_column = column_len * std::mem::size_of::<f64>() + 64;
        Self::new(memory_bytes / per_column)
    }

    /// Look up column `j`
    pub fn get(&mut self, j: usize) -> Option<Arc<Vec<f64>>> {
        match self.cache.get(&j) {
            Some(column) => {
                self.hits += 1;
                Some(Arc::clone(column))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store column `j`, evicting the least recently used column if full
    pub fn put(&mut self, j: usize, column: Arc<Vec<f64>>) {
        self.cache.put(j, column);
    }

    /// Remove column `j` and return it if present
    pub fn take(&mut self, j: usize) -> Option<Arc<Vec<f64>>> {
        self.cache.pop(&j)
    }

    /// Get cache hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }

    /// Clear the cache
    pub fn clear(&mut self) {
        self.cache.clear();
        self.hits = 0;
        self.misses = 0;
    }
}

/// Cache statistics
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}
