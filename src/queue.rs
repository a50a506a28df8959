use crate::orders::Order;
use crossbeam::queue::ArrayQueue;

/// Fixed capacity of the intake queue (power of two).
pub const INTAKE_CAPACITY: usize = 1024;

/// Bounded, lock-free handoff between the submitting threads and the matcher.
///
/// Many producers may call [`IntakeQueue::try_push`] concurrently; `pop` must
/// only be called by the single consumer thread that owns the book. The queue
/// owns every order from a successful push until the matching pop; each
/// pushed order is consumed exactly once, and pushes from one producer are
/// observed in program order.
pub struct IntakeQueue {
    inner: ArrayQueue<Order>,
}

impl IntakeQueue {
    pub fn new() -> Self {
        Self::with_capacity(INTAKE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: ArrayQueue::new(capacity),
        }
    }

    /// Non-blocking push. A full queue hands the order back so the caller can
    /// yield and retry; nothing is ever dropped here.
    pub fn try_push(&self, order: Order) -> Result<(), Order> {
        self.inner.push(order)
    }

    /// Non-blocking pop for the single consumer. `None` when empty.
    pub fn pop(&self) -> Option<Order> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl Default for IntakeQueue {
    fn default() -> Self {
        Self::new()
    }
}
