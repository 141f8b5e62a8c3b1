//! Unbounded in-memory base cache.
//!
//! The innermost implementation every decorator chain wraps: an unordered
//! key/value map with no eviction. Entry lifetime is governed entirely by the
//! decorators above it.

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::cache::{Cache, CacheValue};
use crate::error::CacheError;
use crate::key::CacheKey;

/// In-memory, unordered key/value store with no eviction.
pub struct PerpetualCache {
    id: String,
    entries: Mutex<FxHashMap<CacheKey, CacheValue>>,
}

impl PerpetualCache {
    /// Creates an empty cache with the given identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: Mutex::new(FxHashMap::default()),
        }
    }
}

impl Cache for PerpetualCache {
    fn id(&self) -> &str {
        &self.id
    }

    fn size(&self) -> usize {
        self.entries.lock().len()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.entries.lock().insert(key, value);
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn remove(&self, key: &CacheKey) {
        self.entries.lock().remove(key);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}
