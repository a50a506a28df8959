use crate::{
    errors::BookError,
    orders::{Order, OrderKind, Price, Side},
    trade::Trade,
};
use std::{
    collections::{BTreeMap, VecDeque},
    time::SystemTime,
};
use tracing::trace;

/// FIFO of resting orders sharing one price on one side. Head-of-queue is the
/// next order to trade; residuals join at the tail.
pub type PriceLevel = VecDeque<Order>;

/// An [`OrderBook`] stores **resting** buy and sell limit orders in two
/// separate [`BTreeMap`]s keyed by price in ticks:
/// - `bids`: best bid is the *last* key (highest price)
/// - `asks`: best ask is the *first* key (lowest price)
///
/// Each price level is a [`PriceLevel`] FIFO, giving price-time priority.
/// The book is a single-threaded resource: only the matcher thread touches it.
#[derive(Clone)]
pub struct OrderBook {
    pub bids: BTreeMap<Price, PriceLevel>,
    pub asks: BTreeMap<Price, PriceLevel>,
}

impl OrderBook {
    pub fn new() -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
        }
    }

    /// Rests a **limit** order on its side of the book, at the tail of its
    /// price level. Fails with [`BookError::InvalidOrder`] for market orders
    /// and non-positive quantities; those never rest.
    pub fn add_order(&mut self, order: Order) -> Result<(), BookError> {
        if order.kind() != OrderKind::Limit {
            return Err(BookError::InvalidOrder("only limit orders can rest"));
        }
        if order.quantity() <= 0 {
            return Err(BookError::InvalidOrder("quantity must be positive"));
        }
        self.rest(order);
        Ok(())
    }

    /// Unconditional insert used by the match path once the preconditions are
    /// already established.
    fn rest(&mut self, order: Order) {
        let book_side = match order.side() {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };
        book_side
            .entry(order.price())
            .or_default()
            .push_back(order);
    }

    /// Removes the first order on either side whose id matches. Linear in the
    /// depth of the scanned levels. Empty levels are pruned so the
    /// no-empty-levels invariant holds. Unknown ids are a no-op.
    pub fn cancel_order(&mut self, order_id: u64) -> bool {
        for book_side in [&mut self.bids, &mut self.asks] {
            let mut price_to_prune: Option<Price> = None;
            let mut found = false;
            for (price, queue) in book_side.iter_mut() {
                if let Some(pos) = queue.iter().position(|o| o.id() == order_id) {
                    queue.remove(pos);
                    found = true;
                    if queue.is_empty() {
                        price_to_prune = Some(*price);
                    }
                    break;
                }
            }
            if found {
                if let Some(price) = price_to_prune {
                    book_side.remove(&price);
                }
                return true;
            }
        }
        false
    }

    /// Highest resting buy price.
    pub fn best_bid(&self) -> Result<Price, BookError> {
        self.bids
            .keys()
            .next_back()
            .copied()
            .ok_or(BookError::EmptyBook(Side::Buy))
    }

    /// Lowest resting sell price.
    pub fn best_ask(&self) -> Result<Price, BookError> {
        self.asks
            .keys()
            .next()
            .copied()
            .ok_or(BookError::EmptyBook(Side::Sell))
    }

    /// Snapshot of the orders resting at one price level, front first. Empty
    /// when no such level exists.
    pub fn orders_at(&self, side: Side, price: Price) -> Vec<Order> {
        let book_side = match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        };
        book_side
            .get(&price)
            .map(|level| level.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Crosses an incoming order against the opposite side with price-time
    /// priority, then rests any unfilled limit residual.
    ///
    /// - A buy consumes asks from the lowest price up; a sell consumes bids
    ///   from the highest price down.
    /// - A limit order stops as soon as the best opposite price no longer
    ///   crosses its own (equality crosses). A market order walks the whole
    ///   opposite side if it has to.
    /// - Each fill trades `min(incoming, resting)` and decrements both sides;
    ///   exhausted resting orders pop from the level head, emptied levels are
    ///   erased.
    /// - A limit residual rests at the tail of its own level with its
    ///   original id and timestamp. A market residual is discarded: the book
    ///   had no liquidity left at any price.
    ///
    /// Never fails; a non-positive incoming quantity leaves the book
    /// untouched and produces no trades.
    pub fn match_order(&mut self, mut incoming: Order) -> Vec<Trade> {
        trace!(
            id = incoming.id(),
            side = ?incoming.side(),
            kind = ?incoming.kind(),
            price = incoming.price(),
            quantity = incoming.quantity(),
            "matching incoming order"
        );
        let mut trades = Vec::new();

        while incoming.quantity() > 0 {
            let best = match incoming.side() {
                Side::Buy => self.asks.keys().next().copied(),
                Side::Sell => self.bids.keys().next_back().copied(),
            };
            let Some(best) = best else { break };

            if incoming.kind() == OrderKind::Limit {
                let crosses = match incoming.side() {
                    Side::Buy => incoming.price() >= best,
                    Side::Sell => incoming.price() <= best,
                };
                if !crosses {
                    break;
                }
            }

            let opposite = match incoming.side() {
                Side::Buy => &mut self.asks,
                Side::Sell => &mut self.bids,
            };
            let Some(level) = opposite.get_mut(&best) else {
                break;
            };

            while let Some(resting) = level.front_mut() {
                let traded = incoming.quantity().min(resting.quantity());
                incoming.set_quantity(incoming.quantity() - traded);
                resting.set_quantity(resting.quantity() - traded);

                trades.push(Trade {
                    price: best,
                    quantity: traded,
                    maker_id: resting.id(),
                    taker_id: incoming.id(),
                    timestamp: SystemTime::now(),
                });

                if resting.quantity() == 0 {
                    level.pop_front();
                }
                if incoming.quantity() == 0 {
                    break;
                }
            }

            if level.is_empty() {
                opposite.remove(&best);
            }
        }

        if incoming.quantity() > 0 && incoming.kind() == OrderKind::Limit {
            trace!(
                id = incoming.id(),
                residual = incoming.quantity(),
                "resting unfilled limit residual"
            );
            self.rest(incoming);
        }

        trades
    }
}

impl Default for OrderBook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::{Strategy, price_from_f64};

    fn px(price: f64) -> Price {
        price_from_f64(price).unwrap()
    }

    fn limit(side: Side, price: f64, quantity: i64) -> Order {
        Order::new(Strategy::Other, quantity, px(price), side, OrderKind::Limit)
    }

    fn market(side: Side, quantity: i64) -> Order {
        Order::new(Strategy::Other, quantity, 0, side, OrderKind::Market)
    }

    fn assert_not_crossed(ob: &OrderBook) {
        if let (Ok(bid), Ok(ask)) = (ob.best_bid(), ob.best_ask()) {
            assert!(bid < ask, "book is crossed: bid {bid} >= ask {ask}");
        }
    }

    #[test]
    fn best_bid_is_the_maximum() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Buy, 50.0, 100));
        ob.match_order(limit(Side::Buy, 49.0, 200));

        assert_eq!(ob.best_bid().unwrap(), px(50.0));
    }

    #[test]
    fn best_ask_is_the_minimum() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Sell, 51.0, 150));
        ob.match_order(limit(Side::Sell, 52.0, 75));

        assert_eq!(ob.best_ask().unwrap(), px(51.0));
    }

    #[test]
    fn best_of_empty_side_is_an_error() {
        let ob = OrderBook::new();
        assert_eq!(ob.best_bid(), Err(BookError::EmptyBook(Side::Buy)));
        assert_eq!(ob.best_ask(), Err(BookError::EmptyBook(Side::Sell)));
    }

    #[test]
    fn market_buy_partially_consumes_best_ask() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Sell, 51.0, 150));

        let trades = ob.match_order(market(Side::Buy, 100));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 100);
        assert_eq!(trades[0].price, px(51.0));
        let level = ob.orders_at(Side::Sell, px(51.0));
        assert_eq!(level.len(), 1);
        assert_eq!(level[0].quantity(), 50);
    }

    #[test]
    fn market_buy_exhausts_a_level_and_walks_to_the_next() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Sell, 51.0, 100));
        ob.match_order(limit(Side::Sell, 52.0, 50));

        let trades = ob.match_order(market(Side::Buy, 130));

        let filled: i64 = trades.iter().map(|t| t.quantity).sum();
        assert_eq!(filled, 130);
        assert!(ob.orders_at(Side::Sell, px(51.0)).is_empty());
        let level = ob.orders_at(Side::Sell, px(52.0));
        assert_eq!(level.len(), 1);
        assert_eq!(level[0].quantity(), 20);
        assert_eq!(ob.best_ask().unwrap(), px(52.0));
    }

    #[test]
    fn limit_buy_that_does_not_cross_rests() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Sell, 51.0, 100));

        let trades = ob.match_order(limit(Side::Buy, 50.5, 50));

        assert!(trades.is_empty());
        assert_eq!(ob.orders_at(Side::Sell, px(51.0))[0].quantity(), 100);
        assert_eq!(ob.best_bid().unwrap(), px(50.5));
        assert_not_crossed(&ob);
    }

    #[test]
    fn limit_buy_at_equal_price_crosses_then_rests_residual() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Sell, 51.0, 30));

        let incoming = limit(Side::Buy, 51.0, 100);
        let incoming_id = incoming.id();
        let trades = ob.match_order(incoming);

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 30);
        assert!(ob.asks.is_empty());
        let level = ob.orders_at(Side::Buy, px(51.0));
        assert_eq!(level.len(), 1);
        assert_eq!(level[0].quantity(), 70);
        // the residual is the same logical order, not a re-issue
        assert_eq!(level[0].id(), incoming_id);
    }

    #[test]
    fn cancel_removes_exactly_the_targeted_order() {
        let mut ob = OrderBook::new();
        let first = limit(Side::Buy, 50.0, 100);
        let second = limit(Side::Buy, 50.0, 100);
        let first_id = first.id();
        let second_id = second.id();
        ob.match_order(first);
        ob.match_order(second);

        assert!(ob.cancel_order(first_id));

        let level = ob.orders_at(Side::Buy, px(50.0));
        assert_eq!(level.len(), 1);
        assert_eq!(level[0].id(), second_id);
        assert_eq!(level[0].quantity(), 100);
        assert_eq!(ob.best_bid().unwrap(), px(50.0));
    }

    #[test]
    fn cancel_prunes_an_emptied_level() {
        let mut ob = OrderBook::new();
        let order = limit(Side::Sell, 99.0, 5);
        let id = order.id();
        ob.match_order(order);

        assert!(ob.cancel_order(id));
        assert!(!ob.asks.contains_key(&px(99.0)));
        assert!(ob.asks.is_empty());
    }

    #[test]
    fn cancel_nonexistent_order_is_a_no_op() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Sell, 99.0, 5));

        assert!(!ob.cancel_order(u64::MAX));
        assert_eq!(ob.orders_at(Side::Sell, px(99.0)).len(), 1);
    }

    #[test]
    fn add_then_cancel_round_trips_to_an_empty_book() {
        let mut ob = OrderBook::new();
        let order = limit(Side::Buy, 48.0, 10);
        let id = order.id();
        ob.add_order(order).unwrap();

        assert!(ob.cancel_order(id));
        assert!(ob.bids.is_empty());
        assert!(ob.asks.is_empty());
    }

    #[test]
    fn market_order_into_empty_book_changes_nothing() {
        let mut ob = OrderBook::new();
        let trades = ob.match_order(market(Side::Buy, 10));

        assert!(trades.is_empty());
        assert!(ob.bids.is_empty());
        assert!(ob.asks.is_empty());
    }

    #[test]
    fn zero_quantity_order_is_a_no_op() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Sell, 51.0, 100));

        let trades = ob.match_order(limit(Side::Buy, 60.0, 0));

        assert!(trades.is_empty());
        assert_eq!(ob.orders_at(Side::Sell, px(51.0))[0].quantity(), 100);
        assert!(ob.bids.is_empty());
    }

    #[test]
    fn negative_quantity_order_is_a_no_op() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Sell, 51.0, 100));

        let trades = ob.match_order(market(Side::Buy, -5));

        assert!(trades.is_empty());
        assert_eq!(ob.orders_at(Side::Sell, px(51.0))[0].quantity(), 100);
    }

    #[test]
    fn add_order_rejects_market_orders() {
        let mut ob = OrderBook::new();
        let err = ob.add_order(market(Side::Buy, 10)).unwrap_err();
        assert!(matches!(err, BookError::InvalidOrder(_)));
        assert!(ob.bids.is_empty());
    }

    #[test]
    fn add_order_rejects_non_positive_quantity() {
        let mut ob = OrderBook::new();
        let err = ob.add_order(limit(Side::Buy, 50.0, 0)).unwrap_err();
        assert!(matches!(err, BookError::InvalidOrder(_)));
    }

    #[test]
    fn fifo_priority_within_a_level() {
        let mut ob = OrderBook::new();
        let first = limit(Side::Sell, 100.0, 4);
        let second = limit(Side::Sell, 100.0, 6);
        let first_id = first.id();
        let second_id = second.id();
        ob.match_order(first);
        ob.match_order(second);

        let trades = ob.match_order(market(Side::Buy, 9));

        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].maker_id, first_id);
        assert_eq!(trades[0].quantity, 4);
        assert_eq!(trades[1].maker_id, second_id);
        assert_eq!(trades[1].quantity, 5);

        let remaining = ob.orders_at(Side::Sell, px(100.0));
        assert_eq!(remaining[0].id(), second_id);
        assert_eq!(remaining[0].quantity(), 1);
    }

    #[test]
    fn crossing_limit_sell_fills_at_the_bid_price() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Buy, 100.0, 5));

        let trades = ob.match_order(limit(Side::Sell, 90.0, 4));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, px(100.0));
        assert_eq!(trades[0].quantity, 4);
        assert_eq!(ob.orders_at(Side::Buy, px(100.0))[0].quantity(), 1);
        assert!(!ob.asks.contains_key(&px(90.0)));
    }

    #[test]
    fn book_is_never_crossed_after_matching() {
        let mut ob = OrderBook::new();
        let script = [
            (Side::Sell, 52.0, 10),
            (Side::Buy, 48.0, 10),
            (Side::Buy, 53.0, 5),
            (Side::Sell, 47.0, 8),
            (Side::Buy, 50.0, 3),
            (Side::Sell, 50.0, 3),
        ];
        for (side, price, quantity) in script {
            ob.match_order(limit(side, price, quantity));
            assert_not_crossed(&ob);
        }
    }

    #[test]
    fn no_empty_levels_survive_matching() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Sell, 51.0, 10));
        ob.match_order(limit(Side::Sell, 52.0, 10));
        ob.match_order(market(Side::Buy, 15));

        for (price, level) in ob.bids.iter().chain(ob.asks.iter()) {
            assert!(!level.is_empty(), "empty level left at {price}");
        }
    }

    #[test]
    fn matching_conserves_quantity() {
        let mut ob = OrderBook::new();
        ob.match_order(limit(Side::Sell, 51.0, 40));
        ob.match_order(limit(Side::Sell, 52.0, 40));

        let trades = ob.match_order(limit(Side::Buy, 52.0, 100));

        let traded: i64 = trades.iter().map(|t| t.quantity).sum();
        let resting_bids: i64 = ob
            .bids
            .values()
            .flat_map(|level| level.iter().map(|o| o.quantity()))
            .sum();
        assert_eq!(traded, 80);
        // 100 submitted = 80 traded away + 20 residual resting
        assert_eq!(resting_bids, 100 - traded);
        assert!(ob.asks.is_empty());
    }
}
