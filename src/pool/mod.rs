//! Synchronous connection pooling.
//!
//! ## Key Components
//!
//! - [`Driver`] / [`PhysicalConnection`]: the boundary to an actual database
//!   client library.
//! - [`PooledDataSource`]: the pool; hands out [`PooledConnection`] handles
//!   whose `Drop` checks the physical connection back in.
//! - [`PoolStats`]: activity counters for monitoring.
//!
//! Physical connections outlive the handles that carry them: a returned
//! connection is re-wrapped in a fresh record and parked idle, while the old
//! handle is invalidated so stale use fails fast.

mod conn;
mod data_source;
mod driver;
mod state;

pub use conn::PooledConnection;
pub use data_source::{PoolConfig, PooledDataSource};
pub use driver::{Driver, PhysicalConnection};
pub use state::PoolStats;
