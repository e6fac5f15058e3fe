use thiserror::Error;

use crate::orderbook::types::{Quantity, TradingPair};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// No order book is registered for the pair
    #[error("MarketNotFound: {0}")]
    OrderbookNotFound(TradingPair),

    /// Opposite side cannot absorb the whole market order
    #[error("InsufficientVolume: {available} < {requested}")]
    InsufficientVolume {
        available: Quantity,
        requested: Quantity,
    },

    /// Order sizes must be strictly positive
    #[error("InvalidSize: {0}")]
    InvalidSize(Quantity),
}

impl PlatformError {
    /// HTTP status the API layer reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            PlatformError::OrderbookNotFound(_) => 404,
            PlatformError::InsufficientVolume { .. } | PlatformError::InvalidSize(_) => 400,
        }
    }
}

/// Result type for platform and order book operations
pub type PlatformResult<T> = Result<T, PlatformError>;
