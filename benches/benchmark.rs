use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use matchbook::orderbook::OrderBook;
use matchbook::orders::{Order, OrderKind, Side, Strategy, price_from_f64};

fn setup_order_book(depth: u64, orders_per_level: u64) -> OrderBook {
    let mut ob = OrderBook::new();
    for level in 1..=depth {
        let ask = price_from_f64(100.0 + level as f64).unwrap();
        let bid = price_from_f64(100.0 - level as f64).unwrap();
        for _ in 0..orders_per_level {
            ob.add_order(Order::new(Strategy::Other, 1, ask, Side::Sell, OrderKind::Limit))
                .unwrap();
            ob.add_order(Order::new(Strategy::Other, 1, bid, Side::Buy, OrderKind::Limit))
                .unwrap();
        }
    }
    ob
}

fn bench_match_order(c: &mut Criterion) {
    let depth = 100;
    let orders_per_level = 10;
    let ob = setup_order_book(depth, orders_per_level);

    c.bench_function("match 1 market order", |b| {
        b.iter_batched(
            || ob.clone(),
            |mut ob| {
                let market_buy = Order::new(
                    Strategy::Other,
                    (depth * orders_per_level / 2) as i64,
                    0,
                    Side::Buy,
                    OrderKind::Market,
                );
                ob.match_order(market_buy)
            },
            BatchSize::SmallInput,
        )
    });

    c.bench_function("match 1 crossing limit order", |b| {
        b.iter_batched(
            || ob.clone(),
            |mut ob| {
                let limit_sell = Order::new(
                    Strategy::Other,
                    50,
                    price_from_f64(95.0).unwrap(),
                    Side::Sell,
                    OrderKind::Limit,
                );
                ob.match_order(limit_sell)
            },
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, bench_match_order);
criterion_main!(benches);
