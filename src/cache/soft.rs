//! Reclaim-under-pressure decorator with pinned recent reads.
//!
//! ## Architecture
//!
//! In a garbage-collected runtime this policy stores values behind
//! collector-reclaimable references tied to a notification queue. Rust has
//! no ambient collector, so the same policy is expressed explicitly: the
//! layer carries a soft budget of resident entries (default 4096) and lazily
//! purges the oldest-inserted entries from the delegate whenever the budget
//! is exceeded, on the next write or `size` call. This is a deliberate
//! behavioral substitution, not an emulation of collector semantics.
//!
//! What stays the same: a bounded FIFO of hard links to the most recently
//! read values (default 256). A pinned value can never be purged, so at
//! least the last N reads survive pressure. Purged entries read as absent,
//! and a read of a purged key tidies this layer's bookkeeping in the same
//! pass.

use std::collections::VecDeque;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::cache::{Cache, CacheValue, SharedCache};
use crate::error::CacheError;
use crate::key::CacheKey;

const DEFAULT_SOFT_CAPACITY: usize = 4096;
const DEFAULT_HARD_LINKS: usize = 256;

struct SoftState {
    /// Keys this layer believes are resident in the delegate.
    resident: FxHashSet<CacheKey>,
    /// Insertion order; may hold stale keys, skipped during purge.
    insertion: VecDeque<CacheKey>,
    /// Hard links to the most recent reads, front = newest.
    hard_links: VecDeque<(CacheKey, CacheValue)>,
    /// How many hard links currently pin each key.
    pinned: FxHashMap<CacheKey, usize>,
    soft_capacity: usize,
    hard_capacity: usize,
}

impl SoftState {
    /// Collects keys to evict until the resident set fits the soft budget.
    /// Pinned keys are rotated to the back of the insertion queue instead.
    fn purge(&mut self) -> Vec<CacheKey> {
        let mut evicted = Vec::new();
        let mut rotations = self.insertion.len();
        while self.resident.len() > self.soft_capacity {
            let Some(eldest) = self.insertion.pop_front() else {
                break;
            };
            if !self.resident.contains(&eldest) {
                continue; // stale queue entry, already removed
            }
            if self.pinned.contains_key(&eldest) {
                self.insertion.push_back(eldest);
                if rotations == 0 {
                    break; // everything left is pinned
                }
                rotations -= 1;
                continue;
            }
            self.resident.remove(&eldest);
            evicted.push(eldest);
        }
        evicted
    }

    fn pin(&mut self, key: CacheKey, value: CacheValue) {
        *self.pinned.entry(key.clone()).or_insert(0) += 1;
        self.hard_links.push_front((key, value));
        while self.hard_links.len() > self.hard_capacity {
            if let Some((unpinned, _)) = self.hard_links.pop_back() {
                if let Some(count) = self.pinned.get_mut(&unpinned) {
                    *count -= 1;
                    if *count == 0 {
                        self.pinned.remove(&unpinned);
                    }
                }
            }
        }
    }
}

/// Lets the runtime shed entries under pressure while pinning the most
/// recently read values against reclamation.
pub struct SoftCache {
    delegate: SharedCache,
    state: Mutex<SoftState>,
}

impl SoftCache {
    /// Wraps `delegate` with the default budgets (4096 soft, 256 hard links).
    pub fn new(delegate: SharedCache) -> Self {
        Self::with_capacities(delegate, DEFAULT_SOFT_CAPACITY, DEFAULT_HARD_LINKS)
    }

    /// Wraps `delegate` with explicit soft and hard-link budgets.
    pub fn with_capacities(
        delegate: SharedCache,
        soft_capacity: usize,
        hard_links: usize,
    ) -> Self {
        Self {
            delegate,
            state: Mutex::new(SoftState {
                resident: FxHashSet::default(),
                insertion: VecDeque::new(),
                hard_links: VecDeque::new(),
                pinned: FxHashMap::default(),
                soft_capacity: soft_capacity.max(1),
                hard_capacity: hard_links.max(1),
            }),
        }
    }

    fn purge_over_budget(&self) {
        let evicted = self.state.lock().purge();
        for key in evicted {
            self.delegate.remove(&key);
        }
    }
}

impl Cache for SoftCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.purge_over_budget();
        self.delegate.size()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.purge_over_budget();
        {
            let mut state = self.state.lock();
            if state.resident.insert(key.clone()) {
                state.insertion.push_back(key.clone());
            }
        }
        self.delegate.put(key, value);
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        match self.delegate.get(key)? {
            Some(value) => {
                self.state.lock().pin(key.clone(), value.clone());
                Ok(Some(value))
            },
            None => {
                // Purged (or never stored) beneath us: drop the stale claim.
                self.state.lock().resident.remove(key);
                Ok(None)
            },
        }
    }

    fn remove(&self, key: &CacheKey) {
        self.purge_over_budget();
        self.state.lock().resident.remove(key);
        self.delegate.remove(key);
    }

    fn clear(&self) {
        {
            let mut state = self.state.lock();
            state.hard_links.clear();
            state.pinned.clear();
            state.resident.clear();
            state.insertion.clear();
        }
        self.delegate.clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::cache::PerpetualCache;

    fn key(n: u64) -> CacheKey {
        let mut key = CacheKey::new();
        key.update(&n);
        key
    }

    fn soft(soft_capacity: usize, hard_links: usize) -> SoftCache {
        SoftCache::with_capacities(
            Arc::new(PerpetualCache::new("soft")),
            soft_capacity,
            hard_links,
        )
    }

    #[test]
    fn stays_within_soft_budget() {
        let cache = soft(4, 2);
        for n in 0..10 {
            cache.put(key(n), CacheValue::of(n));
        }
        // size() purges lazily before reporting.
        assert_eq!(cache.size(), 4);
    }

    #[test]
    fn oldest_unpinned_entries_are_purged_first() {
        let cache = soft(2, 8);
        for n in 0..4 {
            cache.put(key(n), CacheValue::of(n));
        }
        cache.size();
        assert!(cache.get(&key(0)).unwrap().is_none());
        assert!(cache.get(&key(3)).unwrap().is_some());
    }

    #[test]
    fn recently_read_values_are_pinned_against_purge() {
        let cache = soft(2, 8);
        cache.put(key(0), CacheValue::of(0u64));
        cache.put(key(1), CacheValue::of(1u64));
        // Pin key(0) with a read, then overflow the soft budget.
        assert!(cache.get(&key(0)).unwrap().is_some());
        for n in 2..6 {
            cache.put(key(n), CacheValue::of(n));
        }
        cache.size();
        assert!(cache.get(&key(0)).unwrap().is_some());
        assert!(cache.get(&key(1)).unwrap().is_none());
    }

    #[test]
    fn hard_link_fifo_unpins_from_the_back() {
        let cache = soft(2, 1);
        cache.put(key(0), CacheValue::of(0u64));
        cache.put(key(1), CacheValue::of(1u64));
        assert!(cache.get(&key(0)).unwrap().is_some());
        // Second read evicts key(0)'s hard link (capacity 1).
        assert!(cache.get(&key(1)).unwrap().is_some());
        for n in 2..6 {
            cache.put(key(n), CacheValue::of(n));
        }
        cache.size();
        assert!(cache.get(&key(0)).unwrap().is_none());
        assert!(cache.get(&key(1)).unwrap().is_some());
    }

    #[test]
    fn clear_drops_pins_and_content() {
        let cache = soft(4, 4);
        cache.put(key(0), CacheValue::of(0u64));
        cache.get(&key(0)).unwrap();
        cache.clear();
        assert_eq!(cache.size(), 0);
        assert!(cache.get(&key(0)).unwrap().is_none());
    }
}
