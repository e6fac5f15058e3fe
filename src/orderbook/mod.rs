//! Core order book implementation module
//!
//! Price levels ([`Limit`]), single-market books ([`Orderbook`]) and the
//! multi-market registry ([`TradingPlatform`]).

pub mod book;
pub mod error;
pub mod limit;
pub mod platform;
pub mod types;

// Re-export main types for convenience
pub use book::Orderbook;
pub use error::{PlatformError, PlatformResult};
pub use limit::Limit;
pub use platform::{SharedOrderbook, TradingPlatform};
pub use types::{
    BookSnapshot, Match, Order, OrderId, OrderbookStats, Price, Quantity, Side, TradingPair,
};
