//! Result cache: base store plus a closed set of composable decorators.
//!
//! ## Architecture
//!
//! ```text
//!   caller ──► BlockingCache ──► LoggingCache ──► ScheduledCache ──► LruCache ──► PerpetualCache
//!              (per-key latch)   (hit ratio)      (timed clear)      (eviction)   (FxHashMap)
//! ```
//!
//! Each decorator implements [`Cache`] and holds only an `Arc` to the next
//! layer; a miss flows outward-to-inward, a hit is filtered back
//! inward-to-outward (blocking unlocks, soft pins a hard link, LRU touches
//! recency). [`TransactionalCache`] wraps a shared chain per unit of work and
//! is applied by the executor, not by [`CacheBuilder`].
//!
//! ## Key Components
//! - [`Cache`] / [`SharedCache`]: the uniform capability contract.
//! - [`CacheValue`]: opaque stored value with an explicit null sentinel.
//! - [`PerpetualCache`]: unbounded in-memory base store.
//! - [`LruCache`], [`FifoCache`], [`SoftCache`]: eviction decorators.
//! - [`BlockingCache`]: serializes concurrent misses per key.
//! - [`ScheduledCache`], [`LoggingCache`]: timed clear and hit-ratio logging.
//! - [`TransactionalCache`]: unit-of-work write buffer.
//! - [`CacheBuilder`]: assembles the standard chain order.

mod blocking;
mod builder;
mod fifo;
mod logging;
mod lru;
mod perpetual;
mod scheduled;
mod soft;
mod transactional;

pub use blocking::BlockingCache;
pub use builder::{CacheBuilder, EvictionPolicy};
pub use fifo::FifoCache;
pub use logging::LoggingCache;
pub use lru::LruCache;
pub use perpetual::PerpetualCache;
pub use scheduled::ScheduledCache;
pub use soft::SoftCache;
pub use transactional::TransactionalCache;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::CacheError;
use crate::key::CacheKey;

/// Opaque value stored in a cache.
///
/// `Null` is an explicit sentinel distinct from absence: the transactional
/// decorator flushes it for observed misses so a blocking layer below can
/// release its latch, and readers can distinguish "query ran, found nothing"
/// from "never cached".
#[derive(Clone)]
pub enum CacheValue {
    /// Explicit null result.
    Null,
    /// A cached result object.
    Value(Arc<dyn Any + Send + Sync>),
}

impl CacheValue {
    /// Wraps an arbitrary result object.
    pub fn of<T: Any + Send + Sync>(value: T) -> Self {
        CacheValue::Value(Arc::new(value))
    }

    /// Returns `true` for the explicit null sentinel.
    pub fn is_null(&self) -> bool {
        matches!(self, CacheValue::Null)
    }

    /// Downcasts a stored value back to its concrete type.
    ///
    /// Returns `None` for the null sentinel or a type mismatch.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            CacheValue::Null => None,
            CacheValue::Value(value) => value.downcast_ref::<T>(),
        }
    }
}

impl fmt::Debug for CacheValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheValue::Null => f.write_str("CacheValue::Null"),
            CacheValue::Value(_) => f.write_str("CacheValue::Value(..)"),
        }
    }
}

/// Uniform contract across the base cache and every decorator.
///
/// Implementations use interior mutability; one chain may be shared across
/// threads behind an `Arc`. Only `get` is fallible, and the only error is
/// [`CacheError::LockTimeout`] from a blocking layer.
pub trait Cache: Send + Sync {
    /// Stable identifier, passed through unchanged by every decorator.
    fn id(&self) -> &str;

    /// Count of live entries as observed through this layer.
    ///
    /// May trigger a lazy purge first (see [`SoftCache`]).
    fn size(&self) -> usize;

    /// Stores `value` under `key`. Never fails for a well-formed key.
    fn put(&self, key: CacheKey, value: CacheValue);

    /// Three-valued read: `Ok(None)` is absence, `Ok(Some(CacheValue::Null))`
    /// is an explicit cached null.
    fn get(&self, key: &CacheKey) -> Result<Option<CacheValue>, CacheError>;

    /// Removes the entry if present.
    ///
    /// Decorators may repurpose this signal: on [`BlockingCache`] it releases
    /// the key's latch without deleting content.
    fn remove(&self, key: &CacheKey);

    /// Removes all entries.
    fn clear(&self);
}

/// A cache chain shared between sessions and threads.
pub type SharedCache = Arc<dyn Cache>;
