//! Deterministic fingerprint keys for cached query results.
//!
//! ## Key Components
//! - [`CacheKey`]: an ordered sequence of part hashes plus a running combined
//!   hash. The query-execution layer builds one from the statement id, the
//!   pagination bounds, the SQL text, and every bound parameter value.
//!
//! ## Core Operations
//! - [`CacheKey::update`]: append one part to the fingerprint.
//! - [`CacheKey::for_statement`]: seed a key with the statement-level parts.
//!
//! Two keys are equal iff they were built from the same parts in the same
//! order. The combined hash feeds `Hash`; equality compares the full part
//! list so hash collisions cannot alias distinct queries.

use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

const HASH_MULTIPLIER: u64 = 37;
const HASH_SEED: u64 = 17;

/// Composite fingerprint identifying one query execution.
#[derive(Clone, PartialEq, Eq)]
pub struct CacheKey {
    parts: Vec<u64>,
    combined: u64,
}

impl Default for CacheKey {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheKey {
    /// Creates an empty key with no parts.
    pub fn new() -> Self {
        Self {
            parts: Vec::new(),
            combined: HASH_SEED,
        }
    }

    /// Seeds a key with the statement-level parts of the fingerprint.
    ///
    /// Bound parameter values are appended afterwards with [`update`], one
    /// call per parameter, in binding order.
    ///
    /// [`update`]: CacheKey::update
    pub fn for_statement(statement_id: &str, offset: u64, limit: u64, sql: &str) -> Self {
        let mut key = Self::new();
        key.update(&statement_id);
        key.update(&offset);
        key.update(&limit);
        key.update(&sql);
        key
    }

    /// Appends one part to the fingerprint.
    pub fn update<T: Hash + ?Sized>(&mut self, part: &T) {
        let mut hasher = FxHasher::default();
        part.hash(&mut hasher);
        let part_hash = hasher.finish();

        self.parts.push(part_hash);
        self.combined = self
            .combined
            .wrapping_mul(HASH_MULTIPLIER)
            .wrapping_add(part_hash);
    }

    /// Number of parts appended so far.
    pub fn part_count(&self) -> usize {
        self.parts.len()
    }
}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.combined);
    }
}

impl std::fmt::Debug for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "CacheKey({:#018x}:{})",
            self.combined,
            self.parts.len()
        )
    }
}
