use crate::orderbook::types::{Match, Order, OrderId, Price, Quantity, Side};
use serde::Serialize;
use std::collections::VecDeque;

/// All orders resting at one price on one side of a market.
/// Orders keep time priority (FIFO by creation timestamp).
#[derive(Debug, Clone, Serialize)]
pub struct Limit {
    price: Price,
    total_volume: Quantity,
    orders: VecDeque<Order>,
}

impl Limit {
    pub fn new(price: Price) -> Self {
        Self {
            price,
            total_volume: Quantity::ZERO,
            orders: VecDeque::new(),
        }
    }

    pub fn price(&self) -> Price {
        self.price
    }

    /// Sum of the remaining sizes of every resting order.
    pub fn total_volume(&self) -> Quantity {
        self.total_volume
    }

    /// Resting orders, oldest first.
    pub fn orders(&self) -> &VecDeque<Order> {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Rest an order at this level.
    ///
    /// The order goes behind every resting order created at or before its
    /// own timestamp, which for freshly created orders is the tail.
    pub fn add_order(&mut self, mut order: Order) -> &Order {
        order.price = Some(self.price);
        self.total_volume += order.size;

        let idx = self
            .orders
            .partition_point(|resting| resting.timestamp <= order.timestamp);
        self.orders.insert(idx, order);
        &self.orders[idx]
    }

    /// Remove an order by id and return it detached (price cleared).
    pub fn remove_order(&mut self, order_id: &OrderId) -> Option<Order> {
        let pos = self.orders.iter().position(|o| &o.id == order_id)?;
        let mut order = self.orders.remove(pos)?;

        self.total_volume -= order.size;
        order.price = None;
        Some(order)
    }

    /// Match an incoming order against this level, oldest resting order first.
    ///
    /// Fully filled resting orders are removed. Stops as soon as the incoming
    /// order is filled or the level runs out of orders.
    pub fn match_order(&mut self, incoming: &mut Order) -> Vec<Match> {
        let price = self.price;
        let mut matches = Vec::new();

        while !incoming.is_filled() {
            let Some(resting) = self.orders.front_mut() else {
                break;
            };

            let fill = Self::fill_orders(price, resting, incoming);
            let resting_done = resting.is_filled();

            self.total_volume -= fill.size_filled;
            matches.push(fill);

            if resting_done {
                self.orders.pop_front();
            }
        }

        matches
    }

    /// Fill `min(resting.size, incoming.size)` from both orders at `price`.
    /// The incoming order's side decides which of the two is the bid.
    pub fn fill_orders(price: Price, resting: &mut Order, incoming: &mut Order) -> Match {
        let size_filled = resting.size.min(incoming.size);
        resting.size -= size_filled;
        incoming.size -= size_filled;

        let (ask, bid) = match incoming.side {
            Side::Bid => (resting.clone(), incoming.clone()),
            Side::Ask => (incoming.clone(), resting.clone()),
        };

        Match {
            ask,
            bid,
            size_filled,
            price,
        }
    }
}
