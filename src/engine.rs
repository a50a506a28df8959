use crate::{
    orderbook::OrderBook,
    orders::Order,
    queue::{INTAKE_CAPACITY, IntakeQueue},
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicI64, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info};

/// Back-off when the intake queue is empty.
const IDLE_SLEEP: Duration = Duration::from_micros(100);

/// Owns the single matcher thread, the intake queue feeding it, and (through
/// the thread) the order book.
///
/// `submit` may be called from any number of threads; all book mutation
/// happens on the one consumer thread, which pops orders and runs them
/// through [`OrderBook::match_order`]. Submission never waits on matching: a
/// full queue spin-yields, an accepted order is matched later.
pub struct MatchingEngine {
    queue: Arc<IntakeQueue>,
    stop: Arc<AtomicBool>,
    traded_volume: Arc<AtomicI64>,
    matcher: Mutex<Option<JoinHandle<OrderBook>>>,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self::with_capacity(INTAKE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let queue = Arc::new(IntakeQueue::with_capacity(capacity));
        let stop = Arc::new(AtomicBool::new(false));
        let traded_volume = Arc::new(AtomicI64::new(0));

        let matcher = thread::spawn({
            let queue = Arc::clone(&queue);
            let stop = Arc::clone(&stop);
            let traded_volume = Arc::clone(&traded_volume);
            move || match_loop(&queue, &stop, &traded_volume)
        });

        Self {
            queue,
            stop,
            traded_volume,
            matcher: Mutex::new(Some(matcher)),
        }
    }

    /// Enqueues an order for matching and returns its id as the acceptance
    /// acknowledgement. Spin-yields while the queue is full; never drops the
    /// order and never waits for the match itself.
    pub fn submit(&self, order: Order) -> u64 {
        let id = order.id();
        let mut order = order;
        while let Err(bounced) = self.queue.try_push(order) {
            order = bounced;
            thread::yield_now();
        }
        id
    }

    /// Orders currently waiting in the intake queue.
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Cumulative quantity filled across all matches so far.
    pub fn traded_volume(&self) -> i64 {
        self.traded_volume.load(Ordering::Relaxed)
    }

    /// Stops the matcher and hands back the final book.
    ///
    /// The stop flag is observed at iteration boundaries, so an in-progress
    /// match always runs to completion; shutdown is bounded by one match plus
    /// the idle back-off. Orders still sitting in the queue are drained and
    /// dropped unmatched. Returns `None` if the engine was already shut down.
    pub fn shutdown(&self) -> Option<OrderBook> {
        self.stop.store(true, Ordering::Release);
        let handle = self.matcher.lock().ok()?.take()?;
        let book = handle.join().ok()?;
        let mut discarded = 0usize;
        while self.queue.pop().is_some() {
            discarded += 1;
        }
        if discarded > 0 {
            info!(discarded, "dropped unmatched orders at shutdown");
        }
        Some(book)
    }
}

impl Default for MatchingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for MatchingEngine {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn match_loop(queue: &IntakeQueue, stop: &AtomicBool, traded_volume: &AtomicI64) -> OrderBook {
    debug!("matcher thread started");
    let mut book = OrderBook::new();
    while !stop.load(Ordering::Acquire) {
        match queue.pop() {
            Some(order) => {
                let trades = book.match_order(order);
                let filled: i64 = trades.iter().map(|t| t.quantity).sum();
                traded_volume.fetch_add(filled, Ordering::Relaxed);
            }
            None => thread::sleep(IDLE_SLEEP),
        }
    }
    debug!("matcher thread stopping");
    book
}
