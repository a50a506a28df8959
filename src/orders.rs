use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Prices are fixed-point ticks: a `u64` holding the wire price scaled by
/// [`TICK_SCALE`]. Two wire prices that round to the same tick share a price
/// level. The book treats ticks as opaque ordered keys and does no arithmetic
/// on them.
pub type Price = u64;

/// Ticks per whole price unit (4 decimal places).
pub const TICK_SCALE: f64 = 10_000.0;

/// Converts a wire price to ticks, rounding to the nearest tick.
///
/// Returns `None` for negative or non-finite prices; those never reach the
/// book.
pub fn price_from_f64(price: f64) -> Option<Price> {
    if !price.is_finite() || price < 0.0 {
        return None;
    }
    Some((price * TICK_SCALE).round() as Price)
}

/// Converts ticks back to the wire representation.
pub fn price_to_f64(ticks: Price) -> f64 {
    ticks as f64 / TICK_SCALE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderKind {
    Market,
    #[default]
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
    Rejected,
}

/// Client category an order was submitted under. Carried opaquely; matching
/// never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    QuantLongTerm,
    HighFrequency,
    HedgeFund,
    Algorithmic,
    InvestmentBank,
    PensionFund,
    Insurance,
    #[default]
    Other,
}

static NEXT_ORDER_ID: AtomicU64 = AtomicU64::new(1);

fn next_order_id() -> u64 {
    NEXT_ORDER_ID.fetch_add(1, Ordering::Relaxed)
}

/// A single order. Identity (`id`, `side`, `kind`, `created_at`) is fixed at
/// construction; `quantity` is the live residual and only ever decreases
/// while the order sits on the book.
#[derive(Debug, Clone)]
pub struct Order {
    id: u64,
    strategy: Strategy,
    side: Side,
    kind: OrderKind,
    price: Price,
    quantity: i64,
    status: OrderStatus,
    created_at: SystemTime,
}

impl Order {
    /// Builds an order with a fresh process-wide id. Ids come from a single
    /// atomic counter, so they are unique and strictly monotonic no matter
    /// which thread constructs the order.
    pub fn new(
        strategy: Strategy,
        quantity: i64,
        price: Price,
        side: Side,
        kind: OrderKind,
    ) -> Self {
        Self {
            id: next_order_id(),
            strategy,
            side,
            kind,
            price,
            quantity,
            status: OrderStatus::Pending,
            created_at: SystemTime::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn kind(&self) -> OrderKind {
        self.kind
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// The only mutator matching uses.
    pub fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
    }

    pub fn set_price(&mut self, price: Price) {
        self.price = price;
    }

    pub fn set_kind(&mut self, kind: OrderKind) {
        self.kind = kind;
    }

    pub fn set_status(&mut self, status: OrderStatus) {
        self.status = status;
    }
}
