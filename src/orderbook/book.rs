use chrono::Utc;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::orderbook::error::{PlatformError, PlatformResult};
use crate::orderbook::limit::Limit;
use crate::orderbook::types::{
    BookSnapshot, Match, Order, OrderbookStats, Price, Quantity, Side, TradingPair,
};

/// One market's two-sided book.
///
/// Each side is a `BTreeMap<Price, Limit>`; the map is both the price index
/// and the matching-priority view. Asks are matched in ascending key order,
/// bids in descending key order. Empty limits are never kept in either map.
#[derive(Debug, Clone)]
pub struct Orderbook {
    market: TradingPair,
    asks: BTreeMap<Price, Limit>,
    bids: BTreeMap<Price, Limit>,
}

impl Orderbook {
    pub fn new(market: TradingPair) -> Self {
        debug!("Creating new order book for market: {}", market);

        Self {
            market,
            asks: BTreeMap::new(),
            bids: BTreeMap::new(),
        }
    }

    pub fn market(&self) -> &TradingPair {
        &self.market
    }

    /// Rest a limit order at `price`. Limit orders never cross on arrival.
    ///
    /// Returns a copy of the resting order (with its price set), which is
    /// what a caller later hands back to [`Orderbook::cancel_order`].
    pub fn place_limit_order(&mut self, price: Price, order: Order) -> PlatformResult<Order> {
        self.check_size(&order)?;
        debug!(
            "{}: placing {} limit order {} for {} at {}",
            self.market, order.side, order.id, order.size, price
        );

        let placed = self
            .side_mut(order.side)
            .entry(price)
            .or_insert_with(|| Limit::new(price))
            .add_order(order)
            .clone();
        Ok(placed)
    }

    /// Execute a market order against the opposite side, best price first.
    ///
    /// Rejected with [`PlatformError::InsufficientVolume`] before anything is
    /// touched when the opposite side cannot fill it completely, and with
    /// [`PlatformError::InvalidSize`] when the size is not positive.
    pub fn place_market_order(&mut self, order: &mut Order) -> PlatformResult<Vec<Match>> {
        self.check_size(order)?;

        let available = self.total_volume(order.side.opposite());
        if available < order.size {
            warn!(
                "{}: rejecting {} market order {}: {} available, {} requested",
                self.market, order.side, order.id, available, order.size
            );
            return Err(PlatformError::InsufficientVolume {
                available,
                requested: order.size,
            });
        }

        let mut matches = Vec::new();
        let limits = match order.side {
            Side::Bid => &mut self.asks,
            Side::Ask => &mut self.bids,
        };

        while !order.is_filled() {
            let best = match order.side {
                Side::Bid => limits.first_entry(),
                Side::Ask => limits.last_entry(),
            };
            let Some(mut entry) = best else {
                break;
            };

            matches.extend(entry.get_mut().match_order(order));

            if entry.get().is_empty() {
                entry.remove();
            }
        }

        debug!(
            "{}: market order {} generated {} matches",
            self.market,
            order.id,
            matches.len()
        );
        Ok(matches)
    }

    /// Remove a resting order, dropping its limit if that empties it.
    ///
    /// The owning limit is found through the order's side and price. Orders
    /// that are not resting (never placed, already filled or cancelled) are
    /// ignored and `None` is returned.
    pub fn cancel_order(&mut self, order: &Order) -> Option<Order> {
        let Some(price) = order.price else {
            debug!("{}: order {} is not resting", self.market, order.id);
            return None;
        };

        let limits = self.side_mut(order.side);
        let limit = limits.get_mut(&price)?;
        let removed = limit.remove_order(&order.id);

        if limit.is_empty() {
            limits.remove(&price);
        }

        match &removed {
            Some(cancelled) => debug!(
                "{}: order {} cancelled, {} remaining",
                self.market, cancelled.id, cancelled.size
            ),
            None => debug!("{}: order {} not found at {}", self.market, order.id, price),
        }

        removed
    }

    /// Lowest ask limit
    pub fn best_ask(&self) -> Option<&Limit> {
        self.asks.values().next()
    }

    /// Highest bid limit
    pub fn best_bid(&self) -> Option<&Limit> {
        self.bids.values().next_back()
    }

    /// Ask limits, lowest price first.
    pub fn asks(&self) -> Vec<&Limit> {
        self.asks.values().collect()
    }

    /// Bid limits, highest price first.
    pub fn bids(&self) -> Vec<&Limit> {
        self.bids.values().rev().collect()
    }

    pub fn limit(&self, side: Side, price: Price) -> Option<&Limit> {
        self.side(side).get(&price)
    }

    pub fn total_bid_volume(&self) -> Quantity {
        self.total_volume(Side::Bid)
    }

    pub fn total_ask_volume(&self) -> Quantity {
        self.total_volume(Side::Ask)
    }

    pub fn total_volume(&self, side: Side) -> Quantity {
        self.side(side).values().map(Limit::total_volume).sum()
    }

    /// Best ask minus best bid, when the book is not crossed
    pub fn spread(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) if ask.price() > bid.price() => {
                Some(ask.price() - bid.price())
            }
            _ => None,
        }
    }

    /// Number of resting orders on both sides
    pub fn total_orders(&self) -> usize {
        self.asks
            .values()
            .chain(self.bids.values())
            .map(Limit::len)
            .sum()
    }

    pub fn stats(&self) -> OrderbookStats {
        OrderbookStats {
            market: self.market.clone(),
            total_orders: self.total_orders(),
            bid_levels: self.bids.len(),
            ask_levels: self.asks.len(),
            best_bid: self.best_bid().map(Limit::price),
            best_ask: self.best_ask().map(Limit::price),
            spread: self.spread(),
            total_bid_volume: self.total_bid_volume(),
            total_ask_volume: self.total_ask_volume(),
        }
    }

    /// Owned copy of the whole book for display and serialization.
    pub fn snapshot(&self) -> BookSnapshot {
        BookSnapshot {
            market: self.market.clone(),
            timestamp: Utc::now(),
            asks: self.asks().into_iter().cloned().collect(),
            bids: self.bids().into_iter().cloned().collect(),
        }
    }

    fn check_size(&self, order: &Order) -> PlatformResult<()> {
        if order.size <= Quantity::ZERO {
            warn!(
                "{}: rejecting {} order {} with size {}",
                self.market, order.side, order.id, order.size
            );
            return Err(PlatformError::InvalidSize(order.size));
        }
        Ok(())
    }

    fn side(&self, side: Side) -> &BTreeMap<Price, Limit> {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut BTreeMap<Price, Limit> {
        match side {
            Side::Bid => &mut self.bids,
            Side::Ask => &mut self.asks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn dec(value: i64) -> Decimal {
        Decimal::from(value)
    }

    fn test_book() -> Orderbook {
        Orderbook::new(TradingPair::new("BTC", "USD"))
    }

    fn prices(limits: &[&Limit]) -> Vec<Price> {
        limits.iter().map(|l| l.price()).collect()
    }

    #[test]
    fn test_empty_book() {
        let book = test_book();
        assert!(book.asks().is_empty());
        assert!(book.bids().is_empty());
        assert!(book.best_ask().is_none());
        assert!(book.best_bid().is_none());
        assert_eq!(book.spread(), None);
        assert_eq!(book.total_orders(), 0);
    }

    #[test]
    fn test_place_limit_orders() {
        let mut book = test_book();

        let buy = book.place_limit_order(dec(250), Order::new(Side::Bid, dec(5))).unwrap();
        assert_eq!(buy.price, Some(dec(250)));
        book.place_limit_order(dec(120), Order::new(Side::Ask, dec(5))).unwrap();

        assert_eq!(book.bids().len(), 1);
        assert_eq!(book.asks().len(), 1);
        assert_eq!(book.limit(Side::Bid, dec(250)).unwrap().orders()[0].id, buy.id);
        assert_eq!(book.total_orders(), 2);
    }

    #[test]
    fn test_limit_orders_do_not_cross() {
        let mut book = test_book();
        book.place_limit_order(dec(100), Order::new(Side::Ask, dec(5))).unwrap();
        book.place_limit_order(dec(150), Order::new(Side::Bid, dec(5))).unwrap();

        assert_eq!(book.total_ask_volume(), dec(5));
        assert_eq!(book.total_bid_volume(), dec(5));
        assert_eq!(book.spread(), None);
    }

    #[test]
    fn test_priority_views() {
        let mut book = test_book();
        for price in [300, 100, 200] {
            book.place_limit_order(dec(price), Order::new(Side::Ask, dec(1))).unwrap();
            book.place_limit_order(dec(price), Order::new(Side::Bid, dec(1))).unwrap();
        }

        assert_eq!(prices(&book.asks()), vec![dec(100), dec(200), dec(300)]);
        assert_eq!(prices(&book.bids()), vec![dec(300), dec(200), dec(100)]);
        assert_eq!(book.best_ask().unwrap().price(), dec(100));
        assert_eq!(book.best_bid().unwrap().price(), dec(300));
    }

    #[test]
    fn test_market_order_price_priority() {
        let mut book = test_book();
        book.place_limit_order(dec(250), Order::new(Side::Ask, dec(8))).unwrap();
        book.place_limit_order(dec(240), Order::new(Side::Ask, dec(2))).unwrap();

        let mut order = Order::new(Side::Bid, dec(3));
        let matches = book.place_market_order(&mut order).unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].price, dec(240));
        assert_eq!(matches[0].size_filled, dec(2));
        assert_eq!(matches[1].price, dec(250));
        assert_eq!(matches[1].size_filled, dec(1));

        assert_eq!(book.asks().len(), 1);
        let remaining = book.best_ask().unwrap();
        assert_eq!(remaining.price(), dec(250));
        assert_eq!(remaining.total_volume(), dec(7));
        assert_eq!(order.size, Decimal::ZERO);
    }

    #[test]
    fn test_market_ask_drains_highest_bid_first() {
        let mut book = test_book();
        book.place_limit_order(dec(90), Order::new(Side::Bid, dec(5))).unwrap();
        book.place_limit_order(dec(110), Order::new(Side::Bid, dec(5))).unwrap();
        book.place_limit_order(dec(100), Order::new(Side::Bid, dec(5))).unwrap();

        let mut order = Order::new(Side::Ask, dec(12));
        let matches = book.place_market_order(&mut order).unwrap();

        let fills: Vec<_> = matches.iter().map(|m| (m.price, m.size_filled)).collect();
        assert_eq!(
            fills,
            vec![(dec(110), dec(5)), (dec(100), dec(5)), (dec(90), dec(2))]
        );
        assert!(matches.iter().all(|m| m.ask.id == order.id));
        assert_eq!(prices(&book.bids()), vec![dec(90)]);
        assert_eq!(book.total_bid_volume(), dec(3));
    }

    #[test]
    fn test_market_order_insufficient_volume() {
        let mut book = test_book();
        let resting = book.place_limit_order(dec(240), Order::new(Side::Ask, dec(2))).unwrap();
        book.place_limit_order(dec(250), Order::new(Side::Ask, dec(8))).unwrap();

        let mut order = Order::new(Side::Bid, dec(11));
        let err = book.place_market_order(&mut order).unwrap_err();

        assert_eq!(
            err,
            PlatformError::InsufficientVolume {
                available: dec(10),
                requested: dec(11),
            }
        );
        assert_eq!(order.size, dec(11));
        assert_eq!(book.total_ask_volume(), dec(10));
        assert_eq!(prices(&book.asks()), vec![dec(240), dec(250)]);
        assert_eq!(book.best_ask().unwrap().orders()[0], resting);
    }

    #[test]
    fn test_market_order_consumes_everything() {
        let mut book = test_book();
        book.place_limit_order(dec(10), Order::new(Side::Ask, dec(3))).unwrap();
        book.place_limit_order(dec(11), Order::new(Side::Ask, dec(4))).unwrap();

        let mut order = Order::new(Side::Bid, dec(7));
        let matches = book.place_market_order(&mut order).unwrap();

        assert_eq!(matches.len(), 2);
        assert!(book.asks().is_empty());
        assert!(book.best_ask().is_none());
        assert!(book.limit(Side::Ask, dec(10)).is_none());
        assert!(order.is_filled());
    }

    #[test]
    fn test_negative_market_order_rejected() {
        let mut book = test_book();
        let resting = book
            .place_limit_order(dec(100), Order::new(Side::Ask, dec(5)))
            .unwrap();

        let mut order = Order::new(Side::Bid, dec(-3));
        let err = book.place_market_order(&mut order).unwrap_err();

        assert_eq!(err, PlatformError::InvalidSize(dec(-3)));
        assert_eq!(err.status_code(), 400);
        assert_eq!(order.size, dec(-3));
        assert_eq!(book.total_ask_volume(), dec(5));
        assert_eq!(book.best_ask().unwrap().orders()[0], resting);
    }

    #[test]
    fn test_non_positive_limit_order_rejected() {
        let mut book = test_book();

        let zero = book.place_limit_order(dec(100), Order::new(Side::Ask, Decimal::ZERO));
        assert_eq!(zero.unwrap_err(), PlatformError::InvalidSize(Decimal::ZERO));
        let negative = book.place_limit_order(dec(100), Order::new(Side::Bid, dec(-1)));
        assert_eq!(negative.unwrap_err(), PlatformError::InvalidSize(dec(-1)));
        assert_eq!(book.total_orders(), 0);
        assert!(book.limit(Side::Ask, dec(100)).is_none());

        book.place_limit_order(dec(101), Order::new(Side::Ask, dec(2))).unwrap();
        let mut order = Order::new(Side::Bid, dec(1));
        let matches = book.place_market_order(&mut order).unwrap();

        let fills: Vec<_> = matches.iter().map(|m| (m.price, m.size_filled)).collect();
        assert_eq!(fills, vec![(dec(101), dec(1))]);
    }

    #[test]
    fn test_cancel_order() {
        let mut book = test_book();
        let first = book.place_limit_order(dec(250), Order::new(Side::Bid, dec(5))).unwrap();
        let second = book.place_limit_order(dec(250), Order::new(Side::Bid, dec(8))).unwrap();

        let cancelled = book.cancel_order(&first).unwrap();
        assert_eq!(cancelled.id, first.id);
        assert_eq!(cancelled.price, None);
        assert_eq!(book.total_bid_volume(), dec(8));

        book.cancel_order(&second);
        assert!(book.bids().is_empty());
        assert!(book.limit(Side::Bid, dec(250)).is_none());
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut book = test_book();
        let placed = book.place_limit_order(dec(100), Order::new(Side::Ask, dec(4))).unwrap();
        book.place_limit_order(dec(100), Order::new(Side::Ask, dec(1))).unwrap();

        assert!(book.cancel_order(&placed).is_some());
        assert!(book.cancel_order(&placed).is_none());
        assert_eq!(book.total_ask_volume(), dec(1));

        let never_placed = Order::new(Side::Ask, dec(4));
        assert!(book.cancel_order(&never_placed).is_none());
        assert_eq!(book.total_orders(), 1);
    }

    #[test]
    fn test_cancel_filled_order_is_noop() {
        let mut book = test_book();
        let placed = book.place_limit_order(dec(100), Order::new(Side::Ask, dec(4))).unwrap();
        let mut taker = Order::new(Side::Bid, dec(4));
        book.place_market_order(&mut taker).unwrap();

        assert!(book.cancel_order(&placed).is_none());
        assert!(book.asks().is_empty());
    }

    #[test]
    fn test_place_then_cancel_round_trip() {
        let mut book = test_book();
        book.place_limit_order(dec(100), Order::new(Side::Bid, dec(3))).unwrap();
        let before = book.stats();

        let placed = book.place_limit_order(dec(105), Order::new(Side::Bid, dec(6))).unwrap();
        book.cancel_order(&placed);

        assert_eq!(book.stats(), before);
        assert_eq!(prices(&book.bids()), vec![dec(100)]);
    }

    #[test]
    fn test_stats_and_snapshot() {
        let mut book = test_book();
        book.place_limit_order(dec(101), Order::new(Side::Ask, dec(2))).unwrap();
        book.place_limit_order(dec(103), Order::new(Side::Ask, dec(2))).unwrap();
        book.place_limit_order(dec(99), Order::new(Side::Bid, dec(4))).unwrap();

        let stats = book.stats();
        assert_eq!(stats.ask_levels, 2);
        assert_eq!(stats.bid_levels, 1);
        assert_eq!(stats.best_ask, Some(dec(101)));
        assert_eq!(stats.best_bid, Some(dec(99)));
        assert_eq!(stats.spread, Some(dec(2)));
        assert_eq!(stats.total_orders, 3);

        let snapshot = book.snapshot();
        assert_eq!(snapshot.market, TradingPair::new("BTC", "USD"));
        assert_eq!(snapshot.asks[0].price(), dec(101));
        assert_eq!(snapshot.asks[1].price(), dec(103));

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["market"]["base"], "BTC");
        assert_eq!(json["bids"][0]["orders"][0]["side"], "bid");
        assert!(json["asks"][0]["total_volume"].is_string());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Limit(bool, i64, i64),
        Market(bool, i64),
        Cancel(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (any::<bool>(), 90i64..110, 1i64..20).prop_map(|(bid, p, s)| Op::Limit(bid, p, s)),
            (any::<bool>(), 1i64..40).prop_map(|(bid, s)| Op::Market(bid, s)),
            (0usize..32).prop_map(Op::Cancel),
        ]
    }

    fn side_of(bid: bool) -> Side {
        if bid {
            Side::Bid
        } else {
            Side::Ask
        }
    }

    proptest! {
        #[test]
        fn prop_book_stays_consistent(ops in prop::collection::vec(op_strategy(), 1..80)) {
            let mut book = test_book();
            let mut placed: Vec<Order> = Vec::new();

            for op in ops {
                match op {
                    Op::Limit(bid, price, size) => {
                        let order = Order::new(side_of(bid), dec(size));
                        placed.push(book.place_limit_order(dec(price), order).unwrap());
                    }
                    Op::Market(bid, size) => {
                        let side = side_of(bid);
                        let available = book.total_volume(side.opposite());
                        let mut order = Order::new(side, dec(size));
                        match book.place_market_order(&mut order) {
                            Ok(matches) => {
                                let filled: Quantity = matches.iter().map(|m| m.size_filled).sum();
                                prop_assert_eq!(filled, dec(size));
                                prop_assert_eq!(book.total_volume(side.opposite()), available - filled);
                                prop_assert!(order.is_filled());
                                // fills never get better as the walk proceeds
                                for pair in matches.windows(2) {
                                    match side {
                                        Side::Bid => {
                                            prop_assert!(pair[0].price <= pair[1].price);
                                        }
                                        Side::Ask => {
                                            prop_assert!(pair[0].price >= pair[1].price);
                                        }
                                    }
                                }
                            }
                            Err(_) => {
                                prop_assert!(available < dec(size));
                                prop_assert_eq!(order.size, dec(size));
                                prop_assert_eq!(book.total_volume(side.opposite()), available);
                            }
                        }
                    }
                    Op::Cancel(idx) => {
                        if let Some(order) = placed.get(idx) {
                            book.cancel_order(order);
                        }
                    }
                }

                for limit in book.asks().into_iter().chain(book.bids()) {
                    prop_assert!(!limit.is_empty());
                    let sum: Quantity = limit.orders().iter().map(|o| o.size).sum();
                    prop_assert_eq!(sum, limit.total_volume());
                }
                let ask_prices = prices(&book.asks());
                prop_assert!(ask_prices.windows(2).all(|w| w[0] < w[1]));
                let bid_prices = prices(&book.bids());
                prop_assert!(bid_prices.windows(2).all(|w| w[0] > w[1]));
            }
        }
    }
}
