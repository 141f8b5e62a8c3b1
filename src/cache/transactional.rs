//! Unit-of-work buffer over a shared cache chain.
//!
//! Holds every entry destined for the shared cache during one transaction.
//! Entries reach the delegate only on `commit`; `rollback` discards them.
//! Because a blocking layer below treats `put` as its release signal, every
//! `get` that missed is flushed as an explicit null on commit, and `remove`d
//! on rollback, so no latch is left behind by the unit of work.
//!
//! One instance models one transaction. Interior locking only makes the type
//! satisfy the `Cache` contract; sharing a single instance between threads
//! is a caller error, not a supported mode.

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::cache::{Cache, CacheValue, SharedCache};
use crate::error::CacheError;
use crate::key::CacheKey;

#[derive(Default)]
struct TxState {
    clear_on_commit: bool,
    pending: FxHashMap<CacheKey, CacheValue>,
    missed: FxHashSet<CacheKey>,
}

/// Buffers writes and observed misses for the duration of a unit of work.
pub struct TransactionalCache {
    delegate: SharedCache,
    state: Mutex<TxState>,
}

impl TransactionalCache {
    /// Starts an empty unit of work over `delegate`.
    pub fn new(delegate: SharedCache) -> Self {
        Self {
            delegate,
            state: Mutex::new(TxState::default()),
        }
    }

    /// Atomically flushes the unit of work into the delegate.
    ///
    /// Order matters: an optional delegate clear, then buffered entries, then
    /// an explicit null for every miss that was never overwritten — the null
    /// both records the miss and releases any blocking latch below.
    pub fn commit(&self) {
        let state = {
            let mut guard = self.state.lock();
            std::mem::take(&mut *guard)
        };
        if state.clear_on_commit {
            self.delegate.clear();
        }
        for (key, value) in &state.pending {
            self.delegate.put(key.clone(), value.clone());
        }
        for key in &state.missed {
            if !state.pending.contains_key(key) {
                self.delegate.put(key.clone(), CacheValue::Null);
            }
        }
    }

    /// Discards the unit of work, releasing blocking latches for every miss.
    pub fn rollback(&self) {
        let state = {
            let mut guard = self.state.lock();
            std::mem::take(&mut *guard)
        };
        for key in &state.missed {
            self.delegate.remove(key);
        }
    }
}

impl Cache for TransactionalCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    /// Buffers only; the delegate is untouched until `commit`.
    fn put(&self, key: CacheKey, value: CacheValue) {
        self.state.lock().pending.insert(key, value);
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        let value = match self.delegate.get(key) {
            Ok(value) => value,
            Err(err) => {
                // A timed-out latch is still a miss for rollback purposes.
                self.state.lock().missed.insert(key.clone());
                warn!(cache_id = self.delegate.id(), "lock timeout during unit of work");
                return Err(err);
            },
        };
        let mut state = self.state.lock();
        if value.is_none() {
            state.missed.insert(key.clone());
        }
        if state.clear_on_commit {
            return Ok(None);
        }
        Ok(value)
    }

    /// No-op on content; buffered state is only undone by `rollback`.
    fn remove(&self, _key: &CacheKey) {}

    /// Defers the clear to commit time and drops the write buffer.
    ///
    /// The missed-key set survives so latches still get released.
    fn clear(&self) {
        let mut state = self.state.lock();
        state.clear_on_commit = true;
        state.pending.clear();
    }
}
