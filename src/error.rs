//! Error types for the sqlkit library.
//!
//! ## Key Components
//!
//! - [`CacheError`]: Returned by the cache chain; the only variant is a
//!   per-key lock timeout raised by the blocking decorator.
//! - [`PoolError`]: Returned by the connection pool when no usable connection
//!   can be produced, or when a caller touches an invalidated proxy.
//! - [`DriverError`]: Opaque fault reported by a database driver. The pool
//!   either swallows these (rollback/close on a connection being discarded)
//!   or wraps them in [`PoolError::DatabaseUnavailable`].
//!
//! Transient validation failures never surface as errors: the pool discards
//! the bad connection and retries up to its local tolerance before escalating.

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// CacheError
// ---------------------------------------------------------------------------

/// Error raised by the cache decorator chain.
///
/// Every cache operation except `get` is total; `get` fails only when the
/// blocking decorator cannot acquire the per-key latch in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// The per-key latch could not be acquired within the configured timeout.
    ///
    /// Not retried internally; surfaced to the caller.
    LockTimeout {
        /// Identifier of the cache whose latch timed out.
        cache_id: String,
        /// Rendered form of the key being locked.
        key: String,
        /// How long the caller waited before giving up.
        waited: Duration,
    },
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::LockTimeout {
                cache_id,
                key,
                waited,
            } => write!(
                f,
                "couldn't get a lock in {}ms for the key {} at the cache {}",
                waited.as_millis(),
                key,
                cache_id
            ),
        }
    }
}

impl std::error::Error for CacheError {}

// ---------------------------------------------------------------------------
// PoolError
// ---------------------------------------------------------------------------

/// Error raised by the connection pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// No connection could be obtained: the pool is at capacity, no
    /// connection became idle within the wait window, and the oldest active
    /// connection is not overdue.
    Exhausted,

    /// Repeated validation failures exceeded the local bad-connection
    /// tolerance, or the driver could not open a physical connection.
    DatabaseUnavailable(String),

    /// A caller used a proxy that was invalidated by check-in, force-close,
    /// or overdue reclamation.
    InvalidConnection,
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::Exhausted => {
                f.write_str("pool exhausted: no connection became available within the wait window")
            },
            PoolError::DatabaseUnavailable(reason) => {
                write!(f, "could not get a good connection to the database: {}", reason)
            },
            PoolError::InvalidConnection => {
                f.write_str("connection proxy has been invalidated and may no longer be used")
            },
        }
    }
}

impl std::error::Error for PoolError {}

// ---------------------------------------------------------------------------
// DriverError
// ---------------------------------------------------------------------------

/// Opaque fault reported by a database driver.
///
/// Carries a human-readable description only; the pool treats the physical
/// connection as an opaque resource and never inspects driver failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverError(String);

impl DriverError {
    /// Creates a new `DriverError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for DriverError {}

impl From<DriverError> for PoolError {
    fn from(err: DriverError) -> Self {
        PoolError::DatabaseUnavailable(err.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
