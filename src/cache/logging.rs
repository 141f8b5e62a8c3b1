//! Hit-ratio logging decorator.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::cache::{Cache, CacheValue, SharedCache};
use crate::error::CacheError;
use crate::key::CacheKey;

/// Counts requests and hits on `get` and logs the running hit ratio.
pub struct LoggingCache {
    delegate: SharedCache,
    requests: AtomicU64,
    hits: AtomicU64,
}

impl LoggingCache {
    /// Wraps `delegate` with zeroed counters.
    pub fn new(delegate: SharedCache) -> Self {
        Self {
            delegate,
            requests: AtomicU64::new(0),
            hits: AtomicU64::new(0),
        }
    }

    /// Fraction of `get` calls that hit; 0.0 before any request.
    pub fn hit_ratio(&self) -> f64 {
        let requests = self.requests.load(Ordering::Relaxed);
        if requests == 0 {
            return 0.0;
        }
        self.hits.load(Ordering::Relaxed) as f64 / requests as f64
    }

    /// Total `get` calls observed.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }
}

impl Cache for LoggingCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.delegate.put(key, value);
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let value = self.delegate.get(key)?;
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        debug!(
            cache_id = self.delegate.id(),
            hit_ratio = self.hit_ratio(),
            "cache lookup"
        );
        Ok(value)
    }

    fn remove(&self, key: &CacheKey) {
        self.delegate.remove(key);
    }

    fn clear(&self) {
        self.delegate.clear();
    }
}
