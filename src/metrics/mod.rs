use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use parking_lot::Mutex;
use rust_decimal::prelude::ToPrimitive;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::info;

use crate::orderbook::platform::TradingPlatform;
use crate::orderbook::types::Quantity;
use crate::utils::time::LatencyTimer;

/// Counters and latencies for platform operations.
///
/// Every update is kept locally (for the periodic log line) and mirrored to
/// the `metrics` facade, which is a no-op unless an exporter is installed.
#[derive(Debug)]
pub struct PlatformMetrics {
    // Latency tracking
    limit_order_latency: LatencyTracker,
    market_order_latency: LatencyTracker,
    cancel_order_latency: LatencyTracker,

    // Throughput counters
    limit_orders: AtomicU64,
    market_orders: AtomicU64,
    market_rejections: AtomicU64,
    orders_cancelled: AtomicU64,
    matches: AtomicU64,

    // Volume tracking
    matched_volume: Mutex<Quantity>,
}

impl PlatformMetrics {
    pub fn new() -> Self {
        describe_counter!("exchange_orders_total", "Orders accepted by the platform");
        describe_counter!(
            "exchange_market_rejections_total",
            "Market orders rejected before matching"
        );
        describe_counter!("exchange_matches_total", "Fills produced by market orders");
        describe_histogram!(
            "exchange_operation_duration_seconds",
            "Duration of platform operations"
        );
        describe_histogram!("exchange_market_order_volume", "Volume filled per market order");
        describe_gauge!("exchange_markets", "Registered markets");

        Self {
            limit_order_latency: LatencyTracker::new("limit_order"),
            market_order_latency: LatencyTracker::new("market_order"),
            cancel_order_latency: LatencyTracker::new("cancel_order"),
            limit_orders: AtomicU64::new(0),
            market_orders: AtomicU64::new(0),
            market_rejections: AtomicU64::new(0),
            orders_cancelled: AtomicU64::new(0),
            matches: AtomicU64::new(0),
            matched_volume: Mutex::new(Quantity::ZERO),
        }
    }

    // Latency measurement methods
    pub fn time_limit_order<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.limit_order_latency.time(f)
    }

    pub fn time_market_order<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.market_order_latency.time(f)
    }

    pub fn time_cancel_order<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        self.cancel_order_latency.time(f)
    }

    // Counter methods
    pub fn increment_limit_orders(&self) {
        self.limit_orders.fetch_add(1, Ordering::Relaxed);
        counter!("exchange_orders_total", "type" => "limit").increment(1);
    }

    pub fn record_market_fill(&self, match_count: usize, volume: Quantity) {
        self.market_orders.fetch_add(1, Ordering::Relaxed);
        self.matches.fetch_add(match_count as u64, Ordering::Relaxed);
        *self.matched_volume.lock() += volume;

        counter!("exchange_orders_total", "type" => "market").increment(1);
        counter!("exchange_matches_total").increment(match_count as u64);
        histogram!("exchange_market_order_volume").record(volume.to_f64().unwrap_or_default());
    }

    pub fn increment_market_rejections(&self) {
        self.market_rejections.fetch_add(1, Ordering::Relaxed);
        counter!("exchange_market_rejections_total").increment(1);
    }

    pub fn increment_orders_cancelled(&self) {
        self.orders_cancelled.fetch_add(1, Ordering::Relaxed);
        counter!("exchange_orders_total", "type" => "cancel").increment(1);
    }

    // Gauge methods
    pub fn set_markets(&self, count: usize) {
        gauge!("exchange_markets").set(count as f64);
    }

    // Getters for current values
    pub fn get_limit_orders(&self) -> u64 {
        self.limit_orders.load(Ordering::Relaxed)
    }

    pub fn get_market_orders(&self) -> u64 {
        self.market_orders.load(Ordering::Relaxed)
    }

    pub fn get_market_rejections(&self) -> u64 {
        self.market_rejections.load(Ordering::Relaxed)
    }

    pub fn get_orders_cancelled(&self) -> u64 {
        self.orders_cancelled.load(Ordering::Relaxed)
    }

    pub fn get_matches(&self) -> u64 {
        self.matches.load(Ordering::Relaxed)
    }

    pub fn get_matched_volume(&self) -> Quantity {
        *self.matched_volume.lock()
    }

    pub fn get_latency_stats(&self) -> LatencyStats {
        LatencyStats {
            limit_order: self.limit_order_latency.get_stats(),
            market_order: self.market_order_latency.get_stats(),
            cancel_order: self.cancel_order_latency.get_stats(),
        }
    }
}

impl Default for PlatformMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Latency tracker for individual operations
#[derive(Debug)]
struct LatencyTracker {
    operation: &'static str,
    samples: AtomicU64,
    total_nanos: AtomicU64,
    min_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl LatencyTracker {
    fn new(operation: &'static str) -> Self {
        Self {
            operation,
            samples: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            min_nanos: AtomicU64::new(u64::MAX),
            max_nanos: AtomicU64::new(0),
        }
    }

    fn time<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let timer = LatencyTimer::start();
        let result = f();
        self.record_latency(timer.stop());
        result
    }

    fn record_latency(&self, duration: Duration) {
        let nanos = duration.as_nanos() as u64;

        self.samples.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.min_nanos.fetch_min(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);

        histogram!("exchange_operation_duration_seconds", "operation" => self.operation)
            .record(duration.as_secs_f64());
    }

    fn get_stats(&self) -> OperationLatencyStats {
        let samples = self.samples.load(Ordering::Relaxed);
        let total = self.total_nanos.load(Ordering::Relaxed);
        let min = self.min_nanos.load(Ordering::Relaxed);
        let max = self.max_nanos.load(Ordering::Relaxed);

        let avg = if samples > 0 { total / samples } else { 0 };

        OperationLatencyStats {
            operation: self.operation,
            samples,
            avg_nanos: avg,
            min_nanos: if min == u64::MAX { 0 } else { min },
            max_nanos: max,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LatencyStats {
    pub limit_order: OperationLatencyStats,
    pub market_order: OperationLatencyStats,
    pub cancel_order: OperationLatencyStats,
}

#[derive(Debug, Clone)]
pub struct OperationLatencyStats {
    pub operation: &'static str,
    pub samples: u64,
    pub avg_nanos: u64,
    pub min_nanos: u64,
    pub max_nanos: u64,
}

impl OperationLatencyStats {
    pub fn avg_micros(&self) -> f64 {
        self.avg_nanos as f64 / 1_000.0
    }

    pub fn max_micros(&self) -> f64 {
        self.max_nanos as f64 / 1_000.0
    }
}

/// Background reporter that logs platform counters and per-market depth.
pub struct MetricsReporter {
    platform: Arc<TradingPlatform>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(platform: Arc<TradingPlatform>, interval: Duration) -> Self {
        Self { platform, interval }
    }

    pub async fn run(&self) {
        let mut interval = interval(self.interval);

        loop {
            interval.tick().await;
            self.report();
        }
    }

    pub fn report(&self) {
        let metrics = self.platform.metrics();
        let stats = metrics.get_latency_stats();

        info!(
            "Platform - Orders: limit={} market={} rejected={} cancelled={} | Matches: {} ({} filled) | Latency (μs): limit={:.2} market={:.2} cancel={:.2}",
            metrics.get_limit_orders(),
            metrics.get_market_orders(),
            metrics.get_market_rejections(),
            metrics.get_orders_cancelled(),
            metrics.get_matches(),
            metrics.get_matched_volume(),
            stats.limit_order.avg_micros(),
            stats.market_order.avg_micros(),
            stats.cancel_order.avg_micros(),
        );

        for pair in self.platform.markets() {
            let Ok(book) = self.platform.get_order_book(&pair) else {
                continue;
            };
            let stats = book.lock().stats();
            info!(
                "{} | Orders: {} | Bid: {:?} | Ask: {:?} | Spread: {:?} | Depth: {} / {}",
                pair,
                stats.total_orders,
                stats.best_bid,
                stats.best_ask,
                stats.spread,
                stats.total_bid_volume,
                stats.total_ask_volume
            );
        }
    }
}
