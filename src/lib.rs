//! In-memory Exchange Core
//!
//! A multi-market limit order book with price-time priority matching. A
//! [`TradingPlatform`] maps each [`TradingPair`] to its own [`Orderbook`] and is
//! the single entry point for order flow.
//!
//! # Features
//!
//! - **Price-Time Priority**: best price first, strict FIFO within a price level
//! - **Resting Limit Orders**: limit orders always rest, they never cross on arrival
//! - **All-or-Nothing Market Orders**: rejected whole when the opposite side is too thin
//! - **Per-Market Locking**: registry behind a `RwLock`, every book behind its own `Mutex`
//! - **Exact Arithmetic**: prices and sizes are `rust_decimal::Decimal`
//!
//! # Quick Start
//!
//! ```rust
//! use exchange_core::{Order, Side, TradingPair, TradingPlatform};
//! use rust_decimal::Decimal;
//!
//! let platform = TradingPlatform::new();
//! let pair = TradingPair::new("BTC", "USD");
//! platform.add_new_market(pair.clone());
//!
//! // Rest some liquidity
//! platform.place_limit_order(&pair, Decimal::from(240), Order::new(Side::Ask, Decimal::from(2)))?;
//! platform.place_limit_order(&pair, Decimal::from(250), Order::new(Side::Ask, Decimal::from(8)))?;
//!
//! // Take it with a market order
//! let mut order = Order::new(Side::Bid, Decimal::from(3));
//! let matches = platform.place_market_order(&pair, &mut order)?;
//! assert_eq!(matches.len(), 2);
//! assert!(order.is_filled());
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! 1. **Limits**: a `VecDeque<Order>` per price with a running total volume
//! 2. **Books**: one `BTreeMap<Price, Limit>` per side, the map order is the matching order
//! 3. **Platform**: `RwLock<HashMap<TradingPair, Arc<Mutex<Orderbook>>>>`
//!
//! The [`accounting`] ledger and the [`seeds`] loader sit beside the engine;
//! matching never touches account balances.

pub mod accounting;
pub mod config;
pub mod metrics;
pub mod orderbook;
pub mod seeds;
pub mod utils;

// Re-export commonly used types
pub use orderbook::{
    error::{PlatformError, PlatformResult},
    types::{Match, Order, OrderId, Price, Quantity, Side, TradingPair},
    Limit, Orderbook, SharedOrderbook, TradingPlatform,
};

pub use crate::metrics::PlatformMetrics;
