//! Driver boundary: how the pool opens and operates physical connections.
//!
//! The pool never speaks a wire protocol itself. It asks a [`Driver`] for
//! physical connections and manages them through the narrow
//! [`PhysicalConnection`] surface: liveness, transaction disposition,
//! rollback, close, and statement execution for the ping query.

use crate::error::DriverError;

/// One actual database connection, owned by the pool or a checked-out proxy.
pub trait PhysicalConnection: Send {
    /// Whether the connection still considers itself usable.
    fn is_open(&self) -> bool;

    /// Whether the connection commits each statement implicitly.
    fn auto_commit(&self) -> bool;

    /// Rolls back any in-flight transaction.
    fn rollback(&mut self) -> Result<(), DriverError>;

    /// Closes the physical connection. Further use is undefined.
    fn close(&mut self) -> Result<(), DriverError>;

    /// Executes a statement, discarding any result. Used for the ping query.
    fn execute(&mut self, sql: &str) -> Result<(), DriverError>;
}

/// Opens physical connections for a given URL and credential pair.
pub trait Driver: Send + Sync {
    fn open(
        &self,
        url: &str,
        username: &str,
        password: &str,
    ) -> Result<Box<dyn PhysicalConnection>, DriverError>;
}
