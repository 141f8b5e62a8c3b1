//! Shared pool bookkeeping and its public statistics snapshot.

use std::sync::Arc;
use std::time::Duration;

use crate::pool::conn::ConnInner;

/// Mutable pool record, guarded by the pool's single monitor.
#[derive(Default)]
pub(crate) struct PoolInner {
    pub(crate) idle: Vec<Arc<ConnInner>>,
    pub(crate) active: Vec<Arc<ConnInner>>,
    pub(crate) request_count: u64,
    pub(crate) accumulated_request_time: Duration,
    pub(crate) accumulated_checkout_time: Duration,
    pub(crate) claimed_overdue_connection_count: u64,
    pub(crate) accumulated_checkout_time_of_overdue_connections: Duration,
    pub(crate) accumulated_wait_time: Duration,
    pub(crate) had_to_wait_count: u64,
    pub(crate) bad_connection_count: u64,
}

impl PoolInner {
    pub(crate) fn stats(&self) -> PoolStats {
        PoolStats {
            idle_connection_count: self.idle.len(),
            active_connection_count: self.active.len(),
            request_count: self.request_count,
            accumulated_request_time: self.accumulated_request_time,
            accumulated_checkout_time: self.accumulated_checkout_time,
            claimed_overdue_connection_count: self.claimed_overdue_connection_count,
            accumulated_checkout_time_of_overdue_connections: self
                .accumulated_checkout_time_of_overdue_connections,
            accumulated_wait_time: self.accumulated_wait_time,
            had_to_wait_count: self.had_to_wait_count,
            bad_connection_count: self.bad_connection_count,
        }
    }
}

/// Point-in-time snapshot of pool activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections currently parked in the idle list.
    pub idle_connection_count: usize,
    /// Connections currently checked out.
    pub active_connection_count: usize,
    /// Total checkout requests served or failed.
    pub request_count: u64,
    /// Total time spent inside checkout calls.
    pub accumulated_request_time: Duration,
    /// Total time connections spent checked out.
    pub accumulated_checkout_time: Duration,
    /// Overdue connections forcibly reclaimed from slow callers.
    pub claimed_overdue_connection_count: u64,
    /// Checkout time accumulated by reclaimed overdue connections.
    pub accumulated_checkout_time_of_overdue_connections: Duration,
    /// Total time callers spent blocked waiting for a connection.
    pub accumulated_wait_time: Duration,
    /// Number of checkouts that had to wait at least once.
    pub had_to_wait_count: u64,
    /// Connections discarded as bad, at checkout or check-in.
    pub bad_connection_count: u64,
}

impl PoolStats {
    /// Mean time per checkout request; zero before any request.
    pub fn average_request_time(&self) -> Duration {
        Self::average(self.accumulated_request_time, self.request_count)
    }

    /// Mean blocked time per waiting checkout; zero if none waited.
    pub fn average_wait_time(&self) -> Duration {
        Self::average(self.accumulated_wait_time, self.had_to_wait_count)
    }

    /// Mean checkout duration per request; zero before any request.
    pub fn average_checkout_time(&self) -> Duration {
        Self::average(self.accumulated_checkout_time, self.request_count)
    }

    /// Mean checkout duration of reclaimed overdue connections.
    pub fn average_overdue_checkout_time(&self) -> Duration {
        Self::average(
            self.accumulated_checkout_time_of_overdue_connections,
            self.claimed_overdue_connection_count,
        )
    }

    fn average(total: Duration, count: u64) -> Duration {
        if count == 0 {
            Duration::ZERO
        } else {
            total / count as u32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_are_zero_before_activity() {
        let stats = PoolInner::default().stats();
        assert_eq!(stats.average_request_time(), Duration::ZERO);
        assert_eq!(stats.average_wait_time(), Duration::ZERO);
        assert_eq!(stats.average_overdue_checkout_time(), Duration::ZERO);
    }

    #[test]
    fn averages_divide_by_their_own_counters() {
        let mut inner = PoolInner::default();
        inner.request_count = 4;
        inner.accumulated_request_time = Duration::from_millis(200);
        inner.had_to_wait_count = 2;
        inner.accumulated_wait_time = Duration::from_millis(100);

        let stats = inner.stats();
        assert_eq!(stats.average_request_time(), Duration::from_millis(50));
        assert_eq!(stats.average_wait_time(), Duration::from_millis(50));
    }
}
