//! In-memory LRU image cache implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::{CacheKey, ImageSource, LoadedImage};
use crate::domain::ports::ImageCachePort;

/// Default maximum number of images to cache in memory.
pub const DEFAULT_COUNT_LIMIT: usize = 150;

/// Default maximum total decoded size (100 MB).
pub const DEFAULT_COST_LIMIT: usize = 100 * 1024 * 1024;

/// Count and byte-cost bounds for the memory tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLimits {
    /// Maximum number of entries.
    pub max_count: usize,
    /// Maximum sum of entry costs in bytes.
    pub max_cost: usize,
}

impl MemoryLimits {
    /// Creates limits.
    #[must_use]
    pub const fn new(max_count: usize, max_cost: usize) -> Self {
        Self {
            max_count,
            max_cost,
        }
    }

    /// Divides both limits by `factor`, never going below 1.
    #[must_use]
    pub fn divided_by(self, factor: usize) -> Self {
        let factor = factor.max(1);
        Self {
            max_count: (self.max_count / factor).max(1),
            max_cost: (self.max_cost / factor).max(1),
        }
    }
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self::new(DEFAULT_COUNT_LIMIT, DEFAULT_COST_LIMIT)
    }
}

struct Entry {
    image: Arc<image::DynamicImage>,
    cost: usize,
}

struct Inner {
    entries: LruCache<CacheKey, Entry>,
    total_cost: usize,
    limits: MemoryLimits,
}

impl Inner {
    /// Drops least recently used entries until both limits hold.
    fn evict_to_fit(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.limits.max_count || self.total_cost > self.limits.max_cost
        {
            let Some((key, entry)) = self.entries.pop_lru() else {
                break;
            };
            self.total_cost -= entry.cost;
            evicted += 1;
            trace!(key = %key, cost = entry.cost, "Evicted LRU image");
        }
        evicted
    }
}

/// Bounded, cost-aware LRU cache for decoded images.
/// Thread-safe; no operation performs I/O.
pub struct MemoryImageCache {
    inner: Mutex<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl MemoryImageCache {
    /// Creates a new cache with the given limits.
    #[must_use]
    pub fn new(limits: MemoryLimits) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: LruCache::unbounded(),
                total_cost: 0,
                limits,
            }),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Creates a new cache with the default limits.
    #[must_use]
    pub fn with_default_limits() -> Self {
        Self::new(MemoryLimits::default())
    }

    /// Peeks at an image without promoting it in the LRU.
    pub fn peek(&self, key: &CacheKey) -> Option<Arc<image::DynamicImage>> {
        self.inner.lock().entries.peek(key).map(|e| e.image.clone())
    }

    /// Returns the current limits.
    #[must_use]
    pub fn limits(&self) -> MemoryLimits {
        self.inner.lock().limits
    }

    /// Replaces the limits, evicting as needed.
    pub fn set_limits(&self, limits: MemoryLimits) {
        let mut inner = self.inner.lock();
        inner.limits = limits;
        let evicted = inner.evict_to_fit();
        debug!(
            max_count = limits.max_count,
            max_cost = limits.max_cost,
            evicted,
            "Updated memory cache limits"
        );
    }

    /// Divides both limits by `factor` and evicts down to the new bounds.
    pub fn shrink(&self, factor: usize) {
        let mut inner = self.inner.lock();
        inner.limits = inner.limits.divided_by(factor);
        let evicted = inner.evict_to_fit();
        debug!(
            factor,
            max_count = inner.limits.max_count,
            max_cost = inner.limits.max_cost,
            evicted,
            "Shrunk memory cache"
        );
    }

    /// Removes every entry. Limits are unchanged.
    pub fn remove_all(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.total_cost = 0;
        debug!("Cleared memory image cache");
    }

    /// Sum of the costs of all cached entries.
    #[must_use]
    pub fn total_cost(&self) -> usize {
        self.inner.lock().total_cost
    }

    /// Returns cache statistics.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 {
            (hits as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let inner = self.inner.lock();
        CacheStats {
            hits,
            misses,
            hit_rate,
            size: inner.entries.len(),
            total_cost: inner.total_cost,
            limits: inner.limits,
        }
    }
}

impl Default for MemoryImageCache {
    fn default() -> Self {
        Self::with_default_limits()
    }
}

impl std::fmt::Debug for MemoryImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryImageCache")
            .field("stats", &self.stats())
            .finish()
    }
}

/// Statistics about cache performance.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Hit rate as a percentage.
    pub hit_rate: f64,
    /// Current number of cached images.
    pub size: usize,
    /// Current total cost in bytes.
    pub total_cost: usize,
    /// Limits in force.
    pub limits: MemoryLimits,
}

impl std::fmt::Display for CacheStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Cache: {}/{} images, {}/{} bytes, {:.1}% hit rate ({} hits, {} misses)",
            self.size,
            self.limits.max_count,
            self.total_cost,
            self.limits.max_cost,
            self.hit_rate,
            self.hits,
            self.misses
        )
    }
}

impl ImageCachePort for MemoryImageCache {
    fn get(&self, key: &CacheKey) -> Option<LoadedImage> {
        let mut inner = self.inner.lock();
        if let Some(entry) = inner.entries.get(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache hit");
            Some(LoadedImage {
                key: key.clone(),
                image: entry.image.clone(),
                cost: entry.cost,
                source: ImageSource::MemoryCache,
            })
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(key = %key, "Memory cache miss");
            None
        }
    }

    fn put(&self, key: CacheKey, image: Arc<image::DynamicImage>, cost: usize) {
        let mut inner = self.inner.lock();

        if let Some(old) = inner.entries.pop(&key) {
            inner.total_cost -= old.cost;
        }

        if cost > inner.limits.max_cost {
            debug!(key = %key, cost, max_cost = inner.limits.max_cost, "Image too large for memory cache");
            return;
        }

        debug!(key = %key, cost, "Storing image in memory cache");
        inner.total_cost += cost;
        inner.entries.put(key, Entry { image, cost });
        inner.evict_to_fit();
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }
}
