//! Convenience re-exports for typical use.
//!
//! ```
//! use sqlkit::prelude::*;
//! ```

pub use crate::cache::{
    Cache, CacheBuilder, CacheValue, EvictionPolicy, SharedCache, TransactionalCache,
};
pub use crate::error::{CacheError, DriverError, PoolError};
pub use crate::key::CacheKey;
pub use crate::pool::{
    Driver, PhysicalConnection, PoolConfig, PoolStats, PooledConnection, PooledDataSource,
};
