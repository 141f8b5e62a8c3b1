//! Interval-based clear decorator.
//!
//! No background task: each operation first checks whether the configured
//! interval has elapsed since the last clear and, if so, clears the delegate
//! before proceeding.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::{Cache, CacheValue, SharedCache};
use crate::error::CacheError;
use crate::key::CacheKey;

const DEFAULT_CLEAR_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Clears the wrapped cache whenever `clear_interval` has elapsed.
pub struct ScheduledCache {
    delegate: SharedCache,
    clear_interval: Duration,
    last_clear: Mutex<Instant>,
}

impl ScheduledCache {
    /// Wraps `delegate` with the default interval of one hour.
    pub fn new(delegate: SharedCache) -> Self {
        Self::with_interval(delegate, DEFAULT_CLEAR_INTERVAL)
    }

    /// Wraps `delegate` with an explicit clear interval.
    pub fn with_interval(delegate: SharedCache, clear_interval: Duration) -> Self {
        Self {
            delegate,
            clear_interval,
            last_clear: Mutex::new(Instant::now()),
        }
    }

    fn clear_when_stale(&self) {
        let mut last_clear = self.last_clear.lock();
        if last_clear.elapsed() > self.clear_interval {
            *last_clear = Instant::now();
            debug!(cache_id = self.delegate.id(), "scheduled cache clear");
            self.delegate.clear();
        }
    }
}

impl Cache for ScheduledCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.clear_when_stale();
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.clear_when_stale();
        self.delegate.put(key, value);
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        self.clear_when_stale();
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) {
        self.clear_when_stale();
        self.delegate.remove(key);
    }

    fn clear(&self) {
        *self.last_clear.lock() = Instant::now();
        self.delegate.clear();
    }
}
