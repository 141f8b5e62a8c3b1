// ==============================================
// CONNECTION POOL TESTS (integration)
// ==============================================
//
// Checkout, check-in, reclamation, and validation exercised against a
// scriptable in-memory driver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use sqlkit::error::{DriverError, PoolError};
use sqlkit::pool::{Driver, PhysicalConnection, PoolConfig, PooledDataSource};

// ==============================================
// Scriptable Mock Driver
// ==============================================

#[derive(Default)]
struct MockStats {
    opened: AtomicUsize,
    closed: AtomicUsize,
    rollbacks: AtomicUsize,
    executed: Mutex<Vec<String>>,
}

struct MockConnection {
    id: usize,
    open: bool,
    auto_commit: bool,
    fail_ping: bool,
    stats: Arc<MockStats>,
}

impl PhysicalConnection for MockConnection {
    fn is_open(&self) -> bool {
        self.open
    }

    fn auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        self.stats.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.open = false;
        self.stats.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn execute(&mut self, sql: &str) -> Result<(), DriverError> {
        self.stats.executed.lock().push(sql.to_string());
        if self.fail_ping {
            Err(DriverError::new(format!("connection {} refused", self.id)))
        } else {
            Ok(())
        }
    }
}

#[derive(Default)]
struct MockDriver {
    stats: Arc<MockStats>,
    /// The first N opens hand back already-closed connections.
    broken_opens: usize,
    /// Connections whose ping query fails, by open order.
    fail_ping_ids: Vec<usize>,
    auto_commit: bool,
}

impl MockDriver {
    fn good() -> Self {
        Self {
            auto_commit: true,
            ..Self::default()
        }
    }
}

impl Driver for MockDriver {
    fn open(
        &self,
        _url: &str,
        _username: &str,
        _password: &str,
    ) -> Result<Box<dyn PhysicalConnection>, DriverError> {
        let id = self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            id,
            open: id >= self.broken_opens,
            auto_commit: self.auto_commit,
            fail_ping: self.fail_ping_ids.contains(&id),
            stats: Arc::clone(&self.stats),
        }))
    }
}

fn pool_with(driver: MockDriver, config: PoolConfig) -> (PooledDataSource, Arc<MockStats>) {
    let stats = Arc::clone(&driver.stats);
    let pool = PooledDataSource::with_config(
        Arc::new(driver),
        "db://primary",
        "root",
        "secret",
        config,
    );
    (pool, stats)
}

// ==============================================
// Reuse and Capacity
// ==============================================

#[test]
fn returned_connection_is_reused_not_reopened() {
    let (pool, stats) = pool_with(MockDriver::good(), PoolConfig::default());

    let first = pool.get_connection().unwrap();
    assert!(first.is_valid());
    drop(first);

    let second = pool.get_connection().unwrap();
    second.raw().unwrap().execute("SELECT 1").unwrap();
    drop(second);

    assert_eq!(stats.opened.load(Ordering::SeqCst), 1);
    assert_eq!(stats.closed.load(Ordering::SeqCst), 0);
    let snapshot = pool.pool_stats();
    assert_eq!(snapshot.request_count, 2);
    assert_eq!(snapshot.idle_connection_count, 1);
    assert_eq!(snapshot.active_connection_count, 0);
}

#[test]
fn handle_debug_reports_validity() {
    let (pool, _stats) = pool_with(MockDriver::good(), PoolConfig::default());
    let conn = pool.get_connection().unwrap();

    let rendered = format!("{:?}", conn);
    assert!(rendered.contains("PooledConnection"));
    assert!(rendered.contains("valid: true"));

    pool.force_close_all();
    assert!(format!("{:?}", conn).contains("valid: false"));
}

#[test]
fn zero_active_cap_is_clamped_to_one() {
    let config = PoolConfig {
        max_active_connections: 0,
        ..PoolConfig::default()
    };
    let (pool, stats) = pool_with(MockDriver::good(), config);

    // An empty pool with a zero cap must still mint, not panic or stall.
    let conn = pool.get_connection().unwrap();
    assert!(conn.is_valid());
    assert_eq!(stats.opened.load(Ordering::SeqCst), 1);
    assert_eq!(pool.pool_stats().active_connection_count, 1);
}

#[test]
fn idle_list_overflow_closes_physically() {
    let config = PoolConfig {
        max_idle_connections: 1,
        ..PoolConfig::default()
    };
    let (pool, stats) = pool_with(MockDriver::good(), config);

    let a = pool.get_connection().unwrap();
    let b = pool.get_connection().unwrap();
    drop(a); // parks idle
    drop(b); // no idle room, closed

    assert_eq!(stats.closed.load(Ordering::SeqCst), 1);
    assert_eq!(pool.pool_stats().idle_connection_count, 1);
}

#[test]
fn checkout_waits_for_a_returned_connection() {
    let config = PoolConfig {
        max_active_connections: 2,
        time_to_wait: Duration::from_secs(2),
        ..PoolConfig::default()
    };
    let (pool, stats) = pool_with(MockDriver::good(), config);
    let pool = Arc::new(pool);

    let first = pool.get_connection().unwrap();
    let _second = pool.get_connection().unwrap();

    let barrier = Arc::new(Barrier::new(2));
    let waiter = {
        let pool = Arc::clone(&pool);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            pool.get_connection().map(|conn| conn.is_valid())
        })
    };

    barrier.wait();
    // Let the waiter park before the handle comes back.
    thread::sleep(Duration::from_millis(50));
    drop(first);

    assert_eq!(waiter.join().unwrap(), Ok(true));
    assert_eq!(stats.opened.load(Ordering::SeqCst), 2);
    assert_eq!(pool.pool_stats().had_to_wait_count, 1);
}

#[test]
fn full_pool_with_no_returns_reports_exhausted() {
    let config = PoolConfig {
        max_active_connections: 1,
        time_to_wait: Duration::from_millis(40),
        max_checkout_time: Duration::from_secs(60),
        ..PoolConfig::default()
    };
    let (pool, _stats) = pool_with(MockDriver::good(), config);

    let _held = pool.get_connection().unwrap();
    let err = pool.get_connection().unwrap_err();
    assert_eq!(err, PoolError::Exhausted);
}

// ==============================================
// Overdue Reclamation
// ==============================================

#[test]
fn overdue_connection_is_reclaimed_and_old_handle_invalidated() {
    let config = PoolConfig {
        max_active_connections: 1,
        max_checkout_time: Duration::from_millis(30),
        ..PoolConfig::default()
    };
    let (pool, stats) = pool_with(MockDriver::good(), config);

    let slow = pool.get_connection().unwrap();
    thread::sleep(Duration::from_millis(60));

    let reclaimed = pool.get_connection().unwrap();
    assert!(reclaimed.is_valid());
    assert!(!slow.is_valid());
    assert_eq!(slow.raw().err(), Some(PoolError::InvalidConnection));

    // Same physical connection, never reopened.
    assert_eq!(stats.opened.load(Ordering::SeqCst), 1);
    let snapshot = pool.pool_stats();
    assert_eq!(snapshot.claimed_overdue_connection_count, 1);

    drop(slow); // invalid return counts as a bad connection
    assert_eq!(pool.pool_stats().bad_connection_count, 1);
}

#[test]
fn timed_out_wait_retries_after_discarding_a_bad_reclaimed_candidate() {
    let config = PoolConfig {
        max_active_connections: 1,
        max_checkout_time: Duration::from_millis(30),
        time_to_wait: Duration::from_millis(40),
        ping_enabled: true,
        ping_query: "SELECT 1".to_string(),
        ping_connections_not_used_for: Duration::from_millis(10),
        ..PoolConfig::default()
    };
    let driver = MockDriver {
        fail_ping_ids: vec![0],
        auto_commit: true,
        ..MockDriver::default()
    };
    let (pool, stats) = pool_with(driver, config);

    let slow = pool.get_connection().unwrap();

    // The second checkout waits a full window, then reclaims the now
    // overdue connection, whose ping fails. Producing that candidate must
    // restart the exhaustion accounting: the call mints a replacement
    // instead of giving up with Exhausted.
    let conn = pool.get_connection().unwrap();
    assert!(conn.is_valid());
    assert!(!slow.is_valid());

    assert_eq!(stats.opened.load(Ordering::SeqCst), 2);
    let snapshot = pool.pool_stats();
    assert_eq!(snapshot.had_to_wait_count, 1);
    assert_eq!(snapshot.claimed_overdue_connection_count, 1);
    assert_eq!(snapshot.bad_connection_count, 1);
}

// ==============================================
// Validation
// ==============================================

#[test]
fn bad_connection_tolerance_bounds_retries() {
    let config = PoolConfig {
        max_idle_connections: 1,
        bad_connection_tolerance: 1,
        ..PoolConfig::default()
    };

    // Every open is broken: budget is max_idle + tolerance, so the
    // third bad candidate escalates.
    let driver = MockDriver {
        broken_opens: usize::MAX,
        auto_commit: true,
        ..MockDriver::default()
    };
    let (pool, stats) = pool_with(driver, config.clone());
    let err = pool.get_connection().unwrap_err();
    assert!(matches!(err, PoolError::DatabaseUnavailable(_)));
    assert_eq!(stats.opened.load(Ordering::SeqCst), 3);

    // One fewer failure than the budget allows still succeeds.
    let driver = MockDriver {
        broken_opens: 2,
        auto_commit: true,
        ..MockDriver::default()
    };
    let (pool, stats) = pool_with(driver, config);
    let conn = pool.get_connection().unwrap();
    assert!(conn.is_valid());
    assert_eq!(stats.opened.load(Ordering::SeqCst), 3);
    assert_eq!(pool.pool_stats().bad_connection_count, 2);
}

#[test]
fn stale_idle_connection_is_ping_checked_on_reuse() {
    let config = PoolConfig {
        ping_enabled: true,
        ping_query: "SELECT 1".to_string(),
        ping_connections_not_used_for: Duration::from_millis(10),
        ..PoolConfig::default()
    };
    let (pool, stats) = pool_with(MockDriver::good(), config);

    drop(pool.get_connection().unwrap()); // fresh, parked without a ping
    thread::sleep(Duration::from_millis(30));

    let conn = pool.get_connection().unwrap();
    assert!(conn.is_valid());
    assert_eq!(stats.opened.load(Ordering::SeqCst), 1);
    assert!(stats.executed.lock().contains(&"SELECT 1".to_string()));
    // The ping transaction is rolled back after it runs.
    assert!(stats.rollbacks.load(Ordering::SeqCst) >= 1);
}

#[test]
fn failed_ping_discards_the_idle_connection() {
    let config = PoolConfig {
        ping_enabled: true,
        ping_query: "SELECT 1".to_string(),
        ping_connections_not_used_for: Duration::from_millis(10),
        ..PoolConfig::default()
    };
    let driver = MockDriver {
        fail_ping_ids: vec![0],
        auto_commit: true,
        ..MockDriver::default()
    };
    let (pool, stats) = pool_with(driver, config);

    drop(pool.get_connection().unwrap());
    thread::sleep(Duration::from_millis(30));

    // The stale idle connection fails its ping and a fresh one is minted.
    let conn = pool.get_connection().unwrap();
    assert!(conn.is_valid());
    assert_eq!(stats.opened.load(Ordering::SeqCst), 2);
    assert_eq!(stats.closed.load(Ordering::SeqCst), 1);
    assert_eq!(pool.pool_stats().bad_connection_count, 1);
}

// ==============================================
// Configuration Changes and Shutdown
// ==============================================

#[test]
fn force_close_all_invalidates_outstanding_handles() {
    let (pool, stats) = pool_with(MockDriver::good(), PoolConfig::default());

    let held = pool.get_connection().unwrap();
    drop(pool.get_connection().unwrap()); // one parked idle
    pool.force_close_all();

    assert!(!held.is_valid());
    assert_eq!(held.raw().err(), Some(PoolError::InvalidConnection));
    assert_eq!(stats.closed.load(Ordering::SeqCst), 2);

    let snapshot = pool.pool_stats();
    assert_eq!(snapshot.active_connection_count, 0);
    assert_eq!(snapshot.idle_connection_count, 0);

    // The pool itself keeps working after a forced close.
    assert!(pool.get_connection().unwrap().is_valid());
}

#[test]
fn setter_change_force_closes_the_pool() {
    let (pool, stats) = pool_with(MockDriver::good(), PoolConfig::default());
    drop(pool.get_connection().unwrap());
    assert_eq!(pool.pool_stats().idle_connection_count, 1);

    pool.set_username("analyst");

    assert_eq!(pool.pool_stats().idle_connection_count, 0);
    assert_eq!(stats.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn mismatched_credentials_are_not_parked_idle() {
    let (pool, stats) = pool_with(MockDriver::good(), PoolConfig::default());

    // Checked out under different credentials than the pool's own: the
    // fingerprint no longer matches at check-in, so it is closed.
    drop(pool.get_connection_as("analyst", "pw").unwrap());

    assert_eq!(pool.pool_stats().idle_connection_count, 0);
    assert_eq!(stats.closed.load(Ordering::SeqCst), 1);
}

#[test]
fn dropping_the_pool_closes_everything() {
    let (pool, stats) = pool_with(MockDriver::good(), PoolConfig::default());
    drop(pool.get_connection().unwrap());
    drop(pool);
    assert_eq!(stats.closed.load(Ordering::SeqCst), 1);
}
