//! Startup seed data: one CSV file per market.
//!
//! Every file starts with a header row. Each following row holds
//! `ask_price,ask_size,bid_price,bid_size` and becomes one resting ask and one
//! resting bid, inserted in that order.

use rayon::prelude::*;
use rust_decimal::Decimal;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

use crate::accounting::Accounts;
use crate::orderbook::error::PlatformError;
use crate::orderbook::platform::TradingPlatform;
use crate::orderbook::types::{Order, Price, Quantity, Side, TradingPair};

/// Markets seeded at startup and the file each one is read from.
pub const DEFAULT_MARKETS: [(&str, &str, &str); 4] = [
    ("ETH", "USD", "eth_usd_order_book.csv"),
    ("ETH", "GBP", "eth_gbp_order_book.csv"),
    ("BTC", "USD", "btc_usd_order_book.csv"),
    ("BTC", "GBP", "btc_gbp_order_book.csv"),
];

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read seed data: {0}")]
    Io(#[from] io::Error),

    #[error("seed data has no header row")]
    MissingHeader,

    #[error("line {line}: {reason}")]
    MalformedRow { line: usize, reason: String },

    #[error("seed order rejected: {0}")]
    Rejected(#[from] PlatformError),
}

pub type SeedResult<T> = Result<T, SeedError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedRow {
    pub ask_price: Price,
    pub ask_size: Quantity,
    pub bid_price: Price,
    pub bid_size: Quantity,
}

impl SeedRow {
    /// Parse one data row; `line` is 1-based and only used in errors.
    pub fn parse(text: &str, line: usize) -> SeedResult<Self> {
        let fields: Vec<&str> = text.split(',').map(str::trim).collect();
        if fields.len() != 4 {
            return Err(SeedError::MalformedRow {
                line,
                reason: format!("expected 4 fields, found {}", fields.len()),
            });
        }

        let number = |idx: usize| -> SeedResult<Decimal> {
            let raw = fields[idx];
            Decimal::from_str(raw)
                .or_else(|_| Decimal::from_scientific(raw))
                .map_err(|_| SeedError::MalformedRow {
                    line,
                    reason: format!("field {} is not a number: {:?}", idx + 1, raw),
                })
        };

        let size = |idx: usize| -> SeedResult<Quantity> {
            let value = number(idx)?;
            if value <= Quantity::ZERO {
                return Err(SeedError::MalformedRow {
                    line,
                    reason: format!("field {} is not a positive size: {}", idx + 1, value),
                });
            }
            Ok(value)
        };

        Ok(Self {
            ask_price: number(0)?,
            ask_size: size(1)?,
            bid_price: number(2)?,
            bid_size: size(3)?,
        })
    }
}

/// Read every row of a seed file. Blank lines are skipped.
pub fn read_rows<R: BufRead>(reader: R) -> SeedResult<Vec<SeedRow>> {
    let mut lines = reader.lines();
    match lines.next() {
        Some(header) => {
            header?;
        }
        None => return Err(SeedError::MissingHeader),
    }

    let mut rows = Vec::new();
    for (idx, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // header is line 1
        rows.push(SeedRow::parse(&line, idx + 2)?);
    }
    Ok(rows)
}

/// Register `pair` and fill its book from `reader`.
///
/// The whole input is parsed before the market is registered, so a malformed
/// file leaves the platform untouched. Returns the number of rows inserted.
pub fn seed_market<R: BufRead>(
    platform: &TradingPlatform,
    pair: &TradingPair,
    reader: R,
) -> SeedResult<usize> {
    let rows = read_rows(reader)?;

    let book = platform.add_new_market(pair.clone());
    let mut book = book.lock();
    for row in &rows {
        book.place_limit_order(row.ask_price, Order::new(Side::Ask, row.ask_size))?;
        book.place_limit_order(row.bid_price, Order::new(Side::Bid, row.bid_size))?;
    }

    info!("Seeded {} rows for {}", rows.len(), pair);
    Ok(rows.len())
}

pub fn seed_market_file(
    platform: &TradingPlatform,
    pair: &TradingPair,
    path: &Path,
) -> SeedResult<usize> {
    info!("Seeding data for {} from {}", pair, path.display());

    let file = File::open(path).map_err(|source| SeedError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    seed_market(platform, pair, BufReader::new(file))
}

/// The default market list resolved against `dir`.
pub fn default_seed_files(dir: &Path) -> Vec<(TradingPair, PathBuf)> {
    DEFAULT_MARKETS
        .iter()
        .map(|(base, quote, file)| (TradingPair::new(*base, *quote), dir.join(file)))
        .collect()
}

/// Seed several markets in parallel, one book per task. Returns the total
/// number of rows inserted, or the first error encountered.
pub fn seed_all(platform: &TradingPlatform, files: &[(TradingPair, PathBuf)]) -> SeedResult<usize> {
    info!("Seeding {} markets...", files.len());

    let counts = files
        .par_iter()
        .map(|(pair, path)| seed_market_file(platform, pair, path))
        .collect::<SeedResult<Vec<usize>>>()?;

    info!("Seeding data complete!");
    Ok(counts.into_iter().sum())
}

/// Return the platform to its startup state: every market and account is
/// dropped and the markets in `files` are seeded again.
pub fn reseed(
    platform: &TradingPlatform,
    accounts: &Accounts,
    files: &[(TradingPair, PathBuf)],
) -> SeedResult<usize> {
    platform.reset();
    accounts.clear();
    seed_all(platform, files)
}
