//! Blocking decorator: serializes concurrent misses on the same key.
//!
//! ## Latch protocol
//!
//! Every `get` acquires the key's latch before delegating. On a delegate hit
//! the latch is released immediately, so reads of an already-populated key
//! never serialize. On a miss the latch stays held by the calling thread:
//! the first caller computes and stores the value while all others block, and
//! they unblock to a hit once that `put` lands. `remove` releases without
//! storing and never deletes cache content.
//!
//! Latch entries are created lazily and never removed; the table is bounded
//! only by key cardinality over the cache's lifetime. A caller that misses
//! and then neither `put`s nor `remove`s leaks its latch by design — the
//! miss path must run inside a guaranteed-cleanup block.

use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;

use crate::cache::{Cache, CacheValue, SharedCache};
use crate::error::CacheError;
use crate::key::CacheKey;

/// Serializes concurrent misses so only one caller populates a given key.
pub struct BlockingCache {
    delegate: SharedCache,
    timeout: Option<Duration>,
    latches: Mutex<FxHashMap<CacheKey, Option<ThreadId>>>,
    released: Condvar,
}

impl BlockingCache {
    /// Wraps `delegate` with no acquisition timeout (wait indefinitely).
    pub fn new(delegate: SharedCache) -> Self {
        Self::with_timeout(delegate, Duration::ZERO)
    }

    /// Wraps `delegate` with an acquisition timeout; zero waits indefinitely.
    pub fn with_timeout(delegate: SharedCache, timeout: Duration) -> Self {
        Self {
            delegate,
            timeout: (!timeout.is_zero()).then_some(timeout),
            latches: Mutex::new(FxHashMap::default()),
            released: Condvar::new(),
        }
    }

    /// Configured timeout; zero means wait indefinitely.
    pub fn timeout(&self) -> Duration {
        self.timeout.unwrap_or(Duration::ZERO)
    }

    fn acquire(&self, key: &CacheKey) -> Result<(), CacheError> {
        let me = thread::current().id();
        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut latches = self.latches.lock();
        loop {
            {
                let holder = latches.entry(key.clone()).or_insert(None);
                match *holder {
                    None => {
                        *holder = Some(me);
                        return Ok(());
                    },
                    // Reentrant: the holder may re-enter without waiting.
                    Some(owner) if owner == me => return Ok(()),
                    Some(_) => {},
                }
            }
            match deadline {
                Some(deadline) => {
                    if self.released.wait_until(&mut latches, deadline).timed_out() {
                        return Err(CacheError::LockTimeout {
                            cache_id: self.delegate.id().to_string(),
                            key: format!("{:?}", key),
                            waited: self.timeout.unwrap_or(Duration::ZERO),
                        });
                    }
                },
                None => self.released.wait(&mut latches),
            }
        }
    }

    fn release(&self, key: &CacheKey) {
        let me = thread::current().id();
        let mut latches = self.latches.lock();
        if let Some(holder) = latches.get_mut(key) {
            if *holder == Some(me) {
                *holder = None;
                self.released.notify_all();
            }
        }
    }
}

impl Cache for BlockingCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    /// Stores the value and releases the caller's latch on this key.
    fn put(&self, key: CacheKey, value: CacheValue) {
        self.delegate.put(key.clone(), value);
        self.release(&key);
    }

    fn get(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError> {
        self.acquire(key)?;
        let value = self.delegate.get(key)?;
        if value.is_some() {
            self.release(key);
        }
        Ok(value)
    }

    /// Despite the name, this only releases the caller's latch; content is
    /// never deleted through this layer.
    fn remove(&self, key: &CacheKey) {
        self.release(key);
    }

    fn clear(&self) {
        self.delegate.clear();
    }
}
