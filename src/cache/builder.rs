//! Assembles a standard decorator chain around a base cache.
//!
//! Chain order, innermost first: `PerpetualCache`, eviction decorator,
//! `ScheduledCache` (if an interval is set), `LoggingCache`, and
//! `BlockingCache` outermost (if enabled). The transactional layer is not
//! built here; the executor wraps a shared chain per unit of work.

use std::sync::Arc;
use std::time::Duration;

use crate::cache::{
    BlockingCache, FifoCache, LoggingCache, LruCache, PerpetualCache, ScheduledCache, SharedCache,
    SoftCache,
};

/// Eviction decorator applied directly over the base cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictionPolicy {
    /// Least-recently-used, bounded by entry count.
    Lru,
    /// Insertion-order, bounded by entry count.
    Fifo,
    /// Soft budget with pinned recent reads.
    Soft,
    /// No eviction; the base cache grows unbounded.
    None,
}

/// Builder for a [`SharedCache`] chain in the standard order.
pub struct CacheBuilder {
    id: String,
    policy: EvictionPolicy,
    size: Option<usize>,
    clear_interval: Option<Duration>,
    logging: bool,
    blocking: bool,
    lock_timeout: Duration,
}

impl CacheBuilder {
    /// Starts a builder for a cache with the given identifier.
    ///
    /// Defaults: LRU eviction, logging on, no scheduled clear, not blocking.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            policy: EvictionPolicy::Lru,
            size: None,
            clear_interval: None,
            logging: true,
            blocking: false,
            lock_timeout: Duration::ZERO,
        }
    }

    /// Selects the eviction decorator.
    pub fn eviction(mut self, policy: EvictionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Entry bound for the eviction decorator (policy default when unset).
    pub fn size(mut self, size: usize) -> Self {
        self.size = Some(size);
        self
    }

    /// Enables interval-based clearing.
    pub fn clear_interval(mut self, interval: Duration) -> Self {
        self.clear_interval = Some(interval);
        self
    }

    /// Toggles the hit-ratio logging layer.
    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Adds a blocking layer as the outermost decorator.
    ///
    /// `lock_timeout` of zero waits indefinitely.
    pub fn blocking(mut self, lock_timeout: Duration) -> Self {
        self.blocking = true;
        self.lock_timeout = lock_timeout;
        self
    }

    /// Builds the chain.
    pub fn build(self) -> SharedCache {
        let mut cache: SharedCache = Arc::new(PerpetualCache::new(self.id));

        cache = match (self.policy, self.size) {
            (EvictionPolicy::Lru, Some(size)) => Arc::new(LruCache::with_size(cache, size)),
            (EvictionPolicy::Lru, None) => Arc::new(LruCache::new(cache)),
            (EvictionPolicy::Fifo, Some(size)) => Arc::new(FifoCache::with_size(cache, size)),
            (EvictionPolicy::Fifo, None) => Arc::new(FifoCache::new(cache)),
            (EvictionPolicy::Soft, Some(size)) => {
                Arc::new(SoftCache::with_capacities(cache, size, 256))
            },
            (EvictionPolicy::Soft, None) => Arc::new(SoftCache::new(cache)),
            (EvictionPolicy::None, _) => cache,
        };

        if let Some(interval) = self.clear_interval {
            cache = Arc::new(ScheduledCache::with_interval(cache, interval));
        }
        if self.logging {
            cache = Arc::new(LoggingCache::new(cache));
        }
        if self.blocking {
            cache = Arc::new(BlockingCache::with_timeout(cache, self.lock_timeout));
        }
        cache
    }
}
