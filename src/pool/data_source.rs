//! Synchronous connection pool.
//!
//! ## Key Components
//!
//! - [`PoolConfig`]: sizing, wait, reclamation, and validation knobs.
//! - [`PooledDataSource`]: the pool itself. `get_connection` runs the
//!   checkout protocol; dropping the returned handle runs check-in.
//!
//! ## Architecture
//!
//! Pool State is a single monitor: one mutex over the idle/active lists and
//! counters, with a condition variable for waiters. Checkout loops under
//! that lock: idle head, else mint below the active cap, else reclaim the
//! oldest active connection when it is overdue, else wait one window. Each
//! candidate is validated before it is handed out; bad candidates are
//! discarded and retried up to a per-call tolerance. Check-in re-wraps a
//! still-valid connection in a fresh record (invalidating the old handle) and
//! parks it idle when there is room and the pool's connection-type
//! fingerprint still matches; otherwise it closes the connection physically.
//!
//! Configuration setters force-close everything, so outstanding handles fail
//! fast instead of writing through stale connections.

use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHasher;
use tracing::{debug, warn};

use crate::error::PoolError;
use crate::pool::conn::{ConnInner, PooledConnection};
use crate::pool::driver::Driver;
use crate::pool::state::{PoolInner, PoolStats};

/// Tuning options for [`PooledDataSource`].
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound on checked-out connections.
    pub max_active_connections: usize,
    /// Upper bound on parked idle connections.
    pub max_idle_connections: usize,
    /// Checkout duration after which an active connection may be reclaimed.
    pub max_checkout_time: Duration,
    /// How long one checkout attempt blocks before reassessing.
    pub time_to_wait: Duration,
    /// Bad connections tolerated per checkout beyond `max_idle_connections`.
    pub bad_connection_tolerance: u32,
    /// Statement executed to validate a connection.
    pub ping_query: String,
    /// Whether the ping query is ever executed.
    pub ping_enabled: bool,
    /// Idle duration beyond which validation runs the ping query.
    pub ping_connections_not_used_for: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_active_connections: 10,
            max_idle_connections: 5,
            max_checkout_time: Duration::from_secs(20),
            time_to_wait: Duration::from_secs(20),
            bad_connection_tolerance: 3,
            ping_query: "NO PING QUERY SET".to_string(),
            ping_enabled: false,
            ping_connections_not_used_for: Duration::ZERO,
        }
    }
}

struct ConnectionOptions {
    url: String,
    username: String,
    password: String,
}

/// Everything the pool and its outstanding handles share.
pub(crate) struct PoolShared {
    driver: Arc<dyn Driver>,
    options: Mutex<ConnectionOptions>,
    config: Mutex<PoolConfig>,
    inner: Mutex<PoolInner>,
    available: Condvar,
}

/// A pool of reusable physical connections behind caller-held handles.
pub struct PooledDataSource {
    shared: Arc<PoolShared>,
}

fn connection_type_code(url: &str, username: &str, password: &str) -> u64 {
    let mut hasher = FxHasher::default();
    url.hash(&mut hasher);
    username.hash(&mut hasher);
    password.hash(&mut hasher);
    hasher.finish()
}

impl PooledDataSource {
    /// Creates a pool over `driver` with default [`PoolConfig`].
    pub fn new(
        driver: Arc<dyn Driver>,
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::with_config(driver, url, username, password, PoolConfig::default())
    }

    /// Creates a pool with explicit configuration.
    pub fn with_config(
        driver: Arc<dyn Driver>,
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        config: PoolConfig,
    ) -> Self {
        Self {
            shared: Arc::new(PoolShared {
                driver,
                options: Mutex::new(ConnectionOptions {
                    url: url.into(),
                    username: username.into(),
                    password: password.into(),
                }),
                config: Mutex::new(config),
                inner: Mutex::new(PoolInner::default()),
                available: Condvar::new(),
            }),
        }
    }

    /// Checks out a connection using the pool's configured credentials.
    pub fn get_connection(&self) -> Result<PooledConnection, PoolError> {
        let (username, password) = {
            let options = self.shared.options.lock();
            (options.username.clone(), options.password.clone())
        };
        self.shared.pop_connection(&username, &password)
    }

    /// Checks out a connection authenticating with explicit credentials.
    pub fn get_connection_as(
        &self,
        username: &str,
        password: &str,
    ) -> Result<PooledConnection, PoolError> {
        self.shared.pop_connection(username, password)
    }

    /// Snapshot of the pool's activity counters.
    pub fn pool_stats(&self) -> PoolStats {
        self.shared.inner.lock().stats()
    }

    /// Current configuration.
    pub fn config(&self) -> PoolConfig {
        self.shared.config.lock().clone()
    }

    /// Invalidates and physically closes every active and idle connection.
    pub fn force_close_all(&self) {
        self.shared.force_close_all();
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.shared.options.lock().url = url.into();
        self.shared.force_close_all();
    }

    pub fn set_username(&self, username: impl Into<String>) {
        self.shared.options.lock().username = username.into();
        self.shared.force_close_all();
    }

    pub fn set_password(&self, password: impl Into<String>) {
        self.shared.options.lock().password = password.into();
        self.shared.force_close_all();
    }

    pub fn set_max_active_connections(&self, max: usize) {
        self.shared.config.lock().max_active_connections = max;
        self.shared.force_close_all();
    }

    pub fn set_max_idle_connections(&self, max: usize) {
        self.shared.config.lock().max_idle_connections = max;
        self.shared.force_close_all();
    }

    pub fn set_max_checkout_time(&self, max: Duration) {
        self.shared.config.lock().max_checkout_time = max;
        self.shared.force_close_all();
    }

    pub fn set_time_to_wait(&self, time_to_wait: Duration) {
        self.shared.config.lock().time_to_wait = time_to_wait;
        self.shared.force_close_all();
    }

    pub fn set_bad_connection_tolerance(&self, tolerance: u32) {
        self.shared.config.lock().bad_connection_tolerance = tolerance;
        self.shared.force_close_all();
    }

    pub fn set_ping_query(&self, query: impl Into<String>) {
        self.shared.config.lock().ping_query = query.into();
        self.shared.force_close_all();
    }

    pub fn set_ping_enabled(&self, enabled: bool) {
        self.shared.config.lock().ping_enabled = enabled;
        self.shared.force_close_all();
    }

    pub fn set_ping_connections_not_used_for(&self, idle_for: Duration) {
        self.shared.config.lock().ping_connections_not_used_for = idle_for;
        self.shared.force_close_all();
    }
}

impl Drop for PooledDataSource {
    fn drop(&mut self) {
        self.shared.force_close_all();
    }
}

impl PoolShared {
    /// Checkout protocol. Loops under the pool monitor until a validated
    /// connection is produced or a terminal condition is hit.
    fn pop_connection(
        self: &Arc<Self>,
        username: &str,
        password: &str,
    ) -> Result<PooledConnection, PoolError> {
        let started = Instant::now();
        let config = self.config.lock().clone();
        let (url, type_code) = {
            let options = self.options.lock();
            (
                options.url.clone(),
                connection_type_code(&options.url, username, password),
            )
        };
        // A zero cap would make the pool unable to mint at all; treat it as
        // a cap of one, like the cache decorators clamp their sizes.
        let max_active = config.max_active_connections.max(1);
        let mut local_bad: u32 = 0;
        let mut counted_wait = false;
        let mut waited_full_window = false;

        let mut inner = self.inner.lock();
        loop {
            let candidate: Arc<ConnInner>;
            if !inner.idle.is_empty() {
                candidate = inner.idle.remove(0);
                debug!(pool.idle = inner.idle.len(), "checked out connection from pool");
            } else if inner.active.len() < max_active {
                let real = self.driver.open(&url, username, password)?;
                candidate = Arc::new(ConnInner::new(real));
                debug!("created new connection");
            } else {
                let oldest = Arc::clone(&inner.active[0]);
                let overdue_for = oldest.checkout_elapsed();
                if overdue_for > config.max_checkout_time {
                    inner.claimed_overdue_connection_count += 1;
                    inner.accumulated_checkout_time_of_overdue_connections += overdue_for;
                    inner.accumulated_checkout_time += overdue_for;
                    inner.active.remove(0);
                    oldest.invalidate();
                    let Some(mut real) = oldest.take_real() else {
                        continue;
                    };
                    if !real.auto_commit() {
                        if let Err(err) = real.rollback() {
                            debug!(error = %err, "bad connection, could not roll back");
                        }
                    }
                    candidate = Arc::new(ConnInner::rewrap(
                        real,
                        oldest.created_at(),
                        oldest.last_used_at(),
                    ));
                    debug!("claimed overdue connection");
                } else {
                    if waited_full_window {
                        return Err(PoolError::Exhausted);
                    }
                    if !counted_wait {
                        inner.had_to_wait_count += 1;
                        counted_wait = true;
                    }
                    debug!(
                        wait_ms = config.time_to_wait.as_millis() as u64,
                        "waiting for a returned connection"
                    );
                    let wait_started = Instant::now();
                    let timed_out = self
                        .available
                        .wait_for(&mut inner, config.time_to_wait)
                        .timed_out();
                    inner.accumulated_wait_time += wait_started.elapsed();
                    waited_full_window = timed_out;
                    continue;
                }
            }

            // A candidate was produced, so the pool could still supply
            // something; an earlier timed-out window no longer counts.
            waited_full_window = false;

            if self.ping(&candidate, &config) {
                candidate.set_type_code(type_code);
                candidate.stamp_checkout();
                inner.active.push(Arc::clone(&candidate));
                inner.request_count += 1;
                inner.accumulated_request_time += started.elapsed();
                return Ok(PooledConnection::new(candidate, Arc::clone(self)));
            }

            // Validation already closed the physical connection if it was
            // still open; the record is just dropped.
            inner.bad_connection_count += 1;
            local_bad += 1;
            candidate.invalidate();
            drop(candidate.take_real());
            if local_bad > config.max_idle_connections as u32 + config.bad_connection_tolerance {
                warn!("could not get a good connection to the database");
                return Err(PoolError::DatabaseUnavailable(
                    "bad connection tolerance exceeded".to_string(),
                ));
            }
            debug!("a bad connection was discarded, getting another");
        }
    }

    /// Check-in protocol, run when a [`PooledConnection`] handle drops.
    pub(crate) fn push_connection(self: &Arc<Self>, conn: Arc<ConnInner>) {
        let config = self.config.lock().clone();
        let expected = {
            let options = self.options.lock();
            connection_type_code(&options.url, &options.username, &options.password)
        };

        let mut inner = self.inner.lock();
        if let Some(pos) = inner.active.iter().position(|c| Arc::ptr_eq(c, &conn)) {
            inner.active.remove(pos);
        }

        if !conn.is_valid() {
            // Already handled by force-close or reclamation.
            debug!("a bad connection attempted to return to the pool");
            inner.bad_connection_count += 1;
            return;
        }

        inner.accumulated_checkout_time += conn.checkout_elapsed();
        if inner.idle.len() < config.max_idle_connections
            && conn.type_code() == expected
            && self.ping(&conn, &config)
        {
            self.rollback_if_needed(&conn);
            let created_at = conn.created_at();
            let last_used_at = conn.last_used_at();
            let code = conn.type_code();
            conn.invalidate();
            let Some(real) = conn.take_real() else {
                inner.bad_connection_count += 1;
                return;
            };
            let fresh = Arc::new(ConnInner::rewrap(real, created_at, last_used_at));
            fresh.set_type_code(code);
            inner.idle.push(fresh);
            debug!(pool.idle = inner.idle.len(), "returned connection to pool");
            self.available.notify_one();
        } else {
            conn.invalidate();
            if let Some(mut real) = conn.take_real() {
                // Validation may have closed the connection already.
                if real.is_open() {
                    if !real.auto_commit() {
                        if let Err(err) = real.rollback() {
                            debug!(error = %err, "could not roll back returned connection");
                        }
                    }
                    if let Err(err) = real.close() {
                        debug!(error = %err, "could not close returned connection");
                    }
                }
            }
            debug!("closed returned connection");
        }
    }

    /// A connection is good if it reports itself open and, when ping is
    /// enabled and the connection has sat idle past the threshold, the ping
    /// query executes cleanly. Any fault forces a physical close.
    fn ping(&self, conn: &ConnInner, config: &PoolConfig) -> bool {
        let idle_for = conn.idle_elapsed();
        let mut slot = conn.lock_real();
        let Some(real) = slot.as_mut() else {
            return false;
        };
        if !real.is_open() {
            return false;
        }
        if config.ping_enabled && idle_for > config.ping_connections_not_used_for {
            debug!(query = %config.ping_query, "testing connection");
            let pinged = real
                .execute(&config.ping_query)
                .and_then(|()| real.rollback());
            if let Err(err) = pinged {
                warn!(error = %err, "execution of ping query failed");
                let _ = real.close();
                return false;
            }
        }
        true
    }

    fn rollback_if_needed(&self, conn: &ConnInner) {
        let mut slot = conn.lock_real();
        if let Some(real) = slot.as_mut() {
            if !real.auto_commit() {
                if let Err(err) = real.rollback() {
                    debug!(error = %err, "could not roll back returned connection");
                }
            }
        }
    }

    pub(crate) fn force_close_all(&self) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        let drained: Vec<Arc<ConnInner>> = inner
            .active
            .drain(..)
            .chain(inner.idle.drain(..))
            .collect();
        for conn in drained {
            conn.invalidate();
            if let Some(mut real) = conn.take_real() {
                if !real.auto_commit() {
                    if let Err(err) = real.rollback() {
                        debug!(error = %err, "rollback failed during forced close");
                    }
                }
                if let Err(err) = real.close() {
                    debug!(error = %err, "close failed during forced close");
                }
            }
        }
        debug!("forcefully closed all connections");
        // Waiters must reassess: capacity is available again.
        self.available.notify_all();
    }
}
