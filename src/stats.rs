use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Boundary counters for the health and performance endpoints.
///
/// Every field is an atomic; reads are consistent per counter only, which is
/// all the endpoints promise. Rates are stored as `f64` bit patterns the same
/// way `std::sync::atomic` lacks an `AtomicF64`.
pub struct ServiceStats {
    started_at: Instant,
    total_requests: AtomicU64,
    orders_accepted: AtomicU64,
    current_ops: AtomicU64,
    peak_ops: AtomicU64,
}

impl ServiceStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            orders_accepted: AtomicU64::new(0),
            current_ops: AtomicU64::new(0f64.to_bits()),
            peak_ops: AtomicU64::new(0f64.to_bits()),
        }
    }

    /// Counts every inbound request, accepted or not.
    pub fn record_request(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts an order handed to the engine and refreshes the derived rates.
    pub fn record_accepted(&self) {
        self.orders_accepted.fetch_add(1, Ordering::Relaxed);
        self.refresh_rates();
    }

    fn refresh_rates(&self) {
        let uptime = self.uptime_seconds();
        if uptime == 0 {
            return;
        }
        let rate = self.orders_accepted.load(Ordering::Relaxed) as f64 / uptime as f64;
        self.current_ops.store(rate.to_bits(), Ordering::Relaxed);
        if rate > f64::from_bits(self.peak_ops.load(Ordering::Relaxed)) {
            self.peak_ops.store(rate.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn orders_accepted(&self) -> u64 {
        self.orders_accepted.load(Ordering::Relaxed)
    }

    /// Cumulative orders per second since start.
    pub fn current_ops(&self) -> f64 {
        f64::from_bits(self.current_ops.load(Ordering::Relaxed))
    }

    /// Highest cumulative rate observed so far.
    pub fn peak_ops(&self) -> f64 {
        f64::from_bits(self.peak_ops.load(Ordering::Relaxed))
    }
}

impl Default for ServiceStats {
    fn default() -> Self {
        Self::new()
    }
}
