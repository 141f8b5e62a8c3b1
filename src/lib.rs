//! # sqlkit
//!
//! Result-cache decorator chain and synchronous connection pool for a
//! SQL-mapping runtime.
//!
//! ## Key Components
//!
//! - [`cache`]: a base in-memory cache plus stackable decorators (LRU, FIFO,
//!   soft-budget, scheduled clear, logging, blocking, transactional) behind
//!   one uniform [`cache::Cache`] contract.
//! - [`pool`]: a synchronous connection pool with overdue reclamation,
//!   validation pings, and drop-based check-in.
//! - [`key`]: the deterministic fingerprint key query results are cached
//!   under.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use sqlkit::cache::{CacheBuilder, CacheValue, EvictionPolicy};
//! use sqlkit::key::CacheKey;
//!
//! let cache = CacheBuilder::new("dept-mapper")
//!     .eviction(EvictionPolicy::Lru)
//!     .size(512)
//!     .build();
//!
//! let key = CacheKey::for_statement("findById", 0, 1, "SELECT * FROM dept");
//! cache.put(key.clone(), CacheValue::of(vec![1u32, 2, 3]));
//! assert!(cache.get(&key).unwrap().is_some());
//! ```

pub mod cache;
pub mod error;
pub mod key;
pub mod pool;
pub mod prelude;
