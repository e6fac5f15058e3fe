use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::metrics::PlatformMetrics;
use crate::orderbook::book::Orderbook;
use crate::orderbook::error::{PlatformError, PlatformResult};
use crate::orderbook::types::{BookSnapshot, Match, Order, Price, TradingPair};

/// Handle to one market's book. Every mutation and every consistent read of
/// the book goes through its mutex.
pub type SharedOrderbook = Arc<Mutex<Orderbook>>;

/// Registry of markets and the single entry point for order flow.
///
/// Locking is two-level: the registry map sits behind a `RwLock` that is only
/// held long enough to resolve or register a pair, and each book has its own
/// `Mutex`. Orders on different pairs never contend with each other.
#[derive(Debug, Default)]
pub struct TradingPlatform {
    orderbooks: RwLock<HashMap<TradingPair, SharedOrderbook>>,
    metrics: PlatformMetrics,
}

impl TradingPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an empty book for `pair`.
    ///
    /// An existing book for the same pair is replaced and its resting orders
    /// are dropped.
    pub fn add_new_market(&self, pair: TradingPair) -> SharedOrderbook {
        let book = Arc::new(Mutex::new(Orderbook::new(pair.clone())));

        let previous = {
            let mut orderbooks = self.orderbooks.write();
            let previous = orderbooks.insert(pair.clone(), Arc::clone(&book));
            self.metrics.set_markets(orderbooks.len());
            previous
        };

        if previous.is_some() {
            warn!("Market {} re-registered, previous book discarded", pair);
        } else {
            info!("Registered market {}", pair);
        }

        book
    }

    /// Drop every registered market and its resting orders. Returns how many
    /// markets were removed.
    ///
    /// Handles obtained from [`TradingPlatform::get_order_book`] before the
    /// reset keep working but are no longer reachable through the registry.
    pub fn reset(&self) -> usize {
        let removed = {
            let mut orderbooks = self.orderbooks.write();
            let removed = orderbooks.len();
            orderbooks.clear();
            self.metrics.set_markets(0);
            removed
        };

        info!("Reset platform, {} markets removed", removed);
        removed
    }

    pub fn get_order_book(&self, pair: &TradingPair) -> PlatformResult<SharedOrderbook> {
        self.orderbooks
            .read()
            .get(pair)
            .cloned()
            .ok_or_else(|| PlatformError::OrderbookNotFound(pair.clone()))
    }

    pub fn has_market(&self, pair: &TradingPair) -> bool {
        self.orderbooks.read().contains_key(pair)
    }

    /// Registered pairs, sorted.
    pub fn markets(&self) -> Vec<TradingPair> {
        let mut pairs: Vec<_> = self.orderbooks.read().keys().cloned().collect();
        pairs.sort();
        pairs
    }

    pub fn market_count(&self) -> usize {
        self.orderbooks.read().len()
    }

    /// Rest a limit order in the book for `pair`.
    pub fn place_limit_order(
        &self,
        pair: &TradingPair,
        price: Price,
        order: Order,
    ) -> PlatformResult<Order> {
        let book = self.get_order_book(pair)?;

        let placed = self
            .metrics
            .time_limit_order(|| book.lock().place_limit_order(price, order))?;
        self.metrics.increment_limit_orders();

        Ok(placed)
    }

    /// Fill a market order in the book for `pair`, or reject it whole.
    pub fn place_market_order(
        &self,
        pair: &TradingPair,
        order: &mut Order,
    ) -> PlatformResult<Vec<Match>> {
        let book = self.get_order_book(pair)?;

        let result = self
            .metrics
            .time_market_order(|| book.lock().place_market_order(order));

        match &result {
            Ok(matches) => {
                let volume = matches.iter().map(|m| m.size_filled).sum();
                self.metrics.record_market_fill(matches.len(), volume);
            }
            Err(e) => {
                debug!("Market order on {} rejected: {}", pair, e);
                self.metrics.increment_market_rejections();
            }
        }

        result
    }

    /// Cancel a resting order on `pair`. Orders that are no longer resting
    /// are ignored.
    pub fn cancel_order(
        &self,
        pair: &TradingPair,
        order: &Order,
    ) -> PlatformResult<Option<Order>> {
        let book = self.get_order_book(pair)?;

        let cancelled = self
            .metrics
            .time_cancel_order(|| book.lock().cancel_order(order));
        if cancelled.is_some() {
            self.metrics.increment_orders_cancelled();
        }

        Ok(cancelled)
    }

    /// Consistent copy of one market's book.
    pub fn snapshot(&self, pair: &TradingPair) -> PlatformResult<BookSnapshot> {
        let book = self.get_order_book(pair)?;
        let snapshot = book.lock().snapshot();
        Ok(snapshot)
    }

    pub fn metrics(&self) -> &PlatformMetrics {
        &self.metrics
    }
}
