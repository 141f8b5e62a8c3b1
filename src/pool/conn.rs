//! Pooled connection proxy.
//!
//! [`PooledConnection`] is the handle callers hold; dropping it checks the
//! physical connection back into the pool instead of closing it. The shared
//! [`ConnInner`] record carries the physical connection, the validity flag,
//! the connection-type fingerprint, and the timestamps the pool's overdue
//! and idle-validation logic reads.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};

use crate::error::PoolError;
use crate::pool::data_source::PoolShared;
use crate::pool::driver::PhysicalConnection;

struct Timestamps {
    last_used_at: Instant,
    checked_out_at: Instant,
}

/// Shared record for one pooled physical connection.
///
/// A proxy is in exactly one of {idle, active} or invalidated. Invalidated
/// records keep their slot in no list and reject all further use.
pub(crate) struct ConnInner {
    real: Mutex<Option<Box<dyn PhysicalConnection>>>,
    valid: AtomicBool,
    type_code: AtomicU64,
    created_at: Instant,
    times: Mutex<Timestamps>,
}

impl ConnInner {
    /// Wraps a freshly opened physical connection.
    pub(crate) fn new(real: Box<dyn PhysicalConnection>) -> Self {
        let now = Instant::now();
        Self {
            real: Mutex::new(Some(real)),
            valid: AtomicBool::new(true),
            type_code: AtomicU64::new(0),
            created_at: now,
            times: Mutex::new(Timestamps {
                last_used_at: now,
                checked_out_at: now,
            }),
        }
    }

    /// Re-wraps a physical connection taken from a superseded record,
    /// preserving its created and last-used timestamps.
    pub(crate) fn rewrap(
        real: Box<dyn PhysicalConnection>,
        created_at: Instant,
        last_used_at: Instant,
    ) -> Self {
        Self {
            real: Mutex::new(Some(real)),
            valid: AtomicBool::new(true),
            type_code: AtomicU64::new(0),
            created_at,
            times: Mutex::new(Timestamps {
                last_used_at,
                checked_out_at: Instant::now(),
            }),
        }
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    pub(crate) fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    pub(crate) fn type_code(&self) -> u64 {
        self.type_code.load(Ordering::Relaxed)
    }

    pub(crate) fn set_type_code(&self, code: u64) {
        self.type_code.store(code, Ordering::Relaxed);
    }

    pub(crate) fn created_at(&self) -> Instant {
        self.created_at
    }

    pub(crate) fn last_used_at(&self) -> Instant {
        self.times.lock().last_used_at
    }

    /// Time since this record was stamped as checked out.
    pub(crate) fn checkout_elapsed(&self) -> std::time::Duration {
        self.times.lock().checked_out_at.elapsed()
    }

    /// Time since the connection last did work for a caller.
    pub(crate) fn idle_elapsed(&self) -> std::time::Duration {
        self.times.lock().last_used_at.elapsed()
    }

    /// Marks the moment of checkout; last-used moves with it.
    pub(crate) fn stamp_checkout(&self) {
        let now = Instant::now();
        let mut times = self.times.lock();
        times.checked_out_at = now;
        times.last_used_at = now;
    }

    /// Steals the physical connection, leaving the record empty.
    pub(crate) fn take_real(&self) -> Option<Box<dyn PhysicalConnection>> {
        self.real.lock().take()
    }

    pub(crate) fn lock_real(&self) -> MutexGuard<'_, Option<Box<dyn PhysicalConnection>>> {
        self.real.lock()
    }
}

/// Caller-facing handle to one checked-out connection.
///
/// Dropping the handle returns the connection to the pool. A handle whose
/// record was invalidated (force-close, overdue reclamation, check-in)
/// rejects all further use with [`PoolError::InvalidConnection`].
pub struct PooledConnection {
    inner: Arc<ConnInner>,
    pool: Arc<PoolShared>,
}

impl PooledConnection {
    pub(crate) fn new(inner: Arc<ConnInner>, pool: Arc<PoolShared>) -> Self {
        Self { inner, pool }
    }

    /// Whether this handle may still be used.
    pub fn is_valid(&self) -> bool {
        self.inner.is_valid()
    }

    /// Exclusive access to the underlying physical connection.
    pub fn raw(&self) -> Result<MappedMutexGuard<'_, dyn PhysicalConnection>, PoolError> {
        if !self.inner.is_valid() {
            return Err(PoolError::InvalidConnection);
        }
        MutexGuard::try_map(self.inner.lock_real(), |slot| match slot {
            Some(real) => Some(real.as_mut()),
            None => None,
        })
        .map_err(|_| PoolError::InvalidConnection)
    }
}

impl fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("valid", &self.inner.is_valid())
            .field("type_code", &self.inner.type_code())
            .finish_non_exhaustive()
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.pool.push_connection(Arc::clone(&self.inner));
    }
}
