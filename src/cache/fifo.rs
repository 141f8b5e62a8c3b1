//! First-in-first-out eviction decorator.
//!
//! Insertion order only; `get` never reorders. Companion to [`LruCache`] for
//! workloads where predictable eviction beats temporal locality.
//!
//! [`LruCache`]: crate::cache::LruCache

use std::collections::VecDeque;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::cache::{Cache, CacheValue, SharedCache};
use crate::error::CacheError;
use crate::key::CacheKey;

const DEFAULT_SIZE: usize = 1024;

struct KeyQueue {
    order: VecDeque<CacheKey>,
    tracked: FxHashSet<CacheKey>,
    capacity: usize,
}

/// Bounds a wrapped cache to `size` entries, evicting oldest-inserted first.
pub struct FifoCache {
    delegate: SharedCache,
    queue: Mutex<KeyQueue>,
}

impl FifoCache {
    /// Wraps `delegate` with the default capacity of 1024 keys.
    pub fn new(delegate: SharedCache) -> Self {
        Self::with_size(delegate, DEFAULT_SIZE)
    }

    /// Wraps `delegate`, bounding it to `size` entries.
    pub fn with_size(delegate: SharedCache, size: usize) -> Self {
        Self {
            delegate,
            queue: Mutex::new(KeyQueue {
                order: VecDeque::new(),
                tracked: FxHashSet::default(),
                capacity: size.max(1),
            }),
        }
    }
}

impl Cache for FifoCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        let evicted = {
            let mut queue = self.queue.lock();
            // Overwrites keep their original queue position.
            if queue.tracked.insert(key.clone()) {
                queue.order.push_back(key.clone());
            }
            if queue.order.len() > queue.capacity {
                let eldest = queue.order.pop_front();
                if let Some(eldest) = &eldest {
                    queue.tracked.remove(eldest);
                }
                eldest
            } else {
                None
            }
        };
        self.delegate.put(key, value);
        if let Some(eldest) = evicted {
            self.delegate.remove(&eldest);
        }
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) {
        {
            let mut queue = self.queue.lock();
            if queue.tracked.remove(key) {
                queue.order.retain(|tracked| tracked != key);
            }
        }
        self.delegate.remove(key);
    }

    fn clear(&self) {
        self.delegate.clear();
        let mut queue = self.queue.lock();
        queue.order.clear();
        queue.tracked.clear();
    }
}
