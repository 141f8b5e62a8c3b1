//! Least-recently-used eviction decorator.
//!
//! ## Architecture
//!
//! Recency lives outside the delegate: a tick map (key -> last-touch tick)
//! and a `BTreeMap` ordered by tick. `get` touches recency without altering
//! delegate content; `put` records the key as most recently used and, once
//! the tracked set exceeds capacity, evicts the least-recently-touched key
//! from the delegate. Single-entry eviction per insertion, never batch.
//!
//! Invariant: the recency map's key set is always a subset of the delegate's
//! key set, so `remove` and `clear` untrack as well.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::cache::{Cache, CacheValue, SharedCache};
use crate::error::CacheError;
use crate::key::CacheKey;

const DEFAULT_SIZE: usize = 1024;

struct Recency {
    ticks: FxHashMap<CacheKey, u64>,
    order: BTreeMap<u64, CacheKey>,
    next_tick: u64,
    capacity: usize,
}

impl Recency {
    fn touch(&mut self, key: &CacheKey) {
        if let Some(tick) = self.ticks.get_mut(key) {
            self.order.remove(tick);
            *tick = self.next_tick;
            self.order.insert(self.next_tick, key.clone());
            self.next_tick += 1;
        }
    }

    fn record(&mut self, key: CacheKey) -> Option<CacheKey> {
        if let Some(old) = self.ticks.insert(key.clone(), self.next_tick) {
            self.order.remove(&old);
        }
        self.order.insert(self.next_tick, key);
        self.next_tick += 1;

        if self.ticks.len() > self.capacity {
            let (tick, eldest) = self
                .order
                .pop_first()
                .expect("recency order cannot be empty while over capacity");
            debug_assert_eq!(self.ticks.get(&eldest), Some(&tick));
            self.ticks.remove(&eldest);
            return Some(eldest);
        }
        None
    }

    fn forget(&mut self, key: &CacheKey) {
        if let Some(tick) = self.ticks.remove(key) {
            self.order.remove(&tick);
        }
    }
}

/// Bounds a wrapped cache to `size` entries, evicting least-recently-used.
pub struct LruCache {
    delegate: SharedCache,
    recency: Mutex<Recency>,
}

impl LruCache {
    /// Wraps `delegate` with the default capacity of 1024 keys.
    pub fn new(delegate: SharedCache) -> Self {
        Self::with_size(delegate, DEFAULT_SIZE)
    }

    /// Wraps `delegate`, bounding it to `size` entries.
    pub fn with_size(delegate: SharedCache, size: usize) -> Self {
        Self {
            delegate,
            recency: Mutex::new(Recency {
                ticks: FxHashMap::default(),
                order: BTreeMap::new(),
                next_tick: 0,
                capacity: size.max(1),
            }),
        }
    }
}

impl Cache for LruCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.delegate.put(key.clone(), value);
        let evicted = self.recency.lock().record(key);
        if let Some(eldest) = evicted {
            self.delegate.remove(&eldest);
        }
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        self.recency.lock().touch(key);
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) {
        self.recency.lock().forget(key);
        self.delegate.remove(key);
    }

    fn clear(&self) {
        self.delegate.clear();
        let mut recency = self.recency.lock();
        recency.ticks.clear();
        recency.order.clear();
    }
}
