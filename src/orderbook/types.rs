use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::orderbook::limit::Limit;

pub type OrderId = Uuid;
pub type Price = Decimal;
pub type Quantity = Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Bid => Side::Ask,
            Side::Ask => Side::Bid,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

/// A unit of trading intent.
///
/// `price` is `None` until the order rests in a [`Limit`]; the limit sets it
/// on insertion and clears it again when the order is detached (cancelled or
/// fully filled). Together with `side` it is the key used to find the owning
/// limit on cancel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub side: Side,
    pub price: Option<Price>,
    pub size: Quantity,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    pub fn new(side: Side, size: Quantity) -> Self {
        Self {
            id: Uuid::new_v4(),
            side,
            price: None,
            size,
            timestamp: Utc::now(),
        }
    }

    /// True while the order is held by a limit.
    pub fn is_resting(&self) -> bool {
        self.price.is_some()
    }

    pub fn is_filled(&self) -> bool {
        self.size.is_zero()
    }
}

/// Record of a single fill between an ask and a bid.
///
/// Both orders are captured immediately after the fill, so their `size`
/// fields show what remained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub ask: Order,
    pub bid: Order,
    pub size_filled: Quantity,
    pub price: Price,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TradingPair {
    pub base: String,
    pub quote: String,
}

impl TradingPair {
    pub fn new(base: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid trading pair {0:?}, expected BASE/QUOTE")]
pub struct ParseTradingPairError(pub String);

impl FromStr for TradingPair {
    type Err = ParseTradingPairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((base, quote))
                if !base.is_empty() && !quote.is_empty() && !quote.contains('/') =>
            {
                Ok(TradingPair::new(base.trim(), quote.trim()))
            }
            _ => Err(ParseTradingPairError(s.to_string())),
        }
    }
}

/// Full view of one market, limits in matching-priority order.
#[derive(Debug, Clone, Serialize)]
pub struct BookSnapshot {
    pub market: TradingPair,
    pub timestamp: DateTime<Utc>,
    pub asks: Vec<Limit>,
    pub bids: Vec<Limit>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderbookStats {
    pub market: TradingPair,
    pub total_orders: usize,
    pub bid_levels: usize,
    pub ask_levels: usize,
    pub best_bid: Option<Price>,
    pub best_ask: Option<Price>,
    pub spread: Option<Price>,
    pub total_bid_volume: Quantity,
    pub total_ask_volume: Quantity,
}
