//! Portfolio type definitions with strong typing

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Asset class tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Etf,
    Crypto,
    Bond,
    Commodity,
    Cash,
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AssetClass::Stock => "stock",
            AssetClass::Etf => "etf",
            AssetClass::Crypto => "crypto",
            AssetClass::Bond => "bond",
            AssetClass::Commodity => "commodity",
            AssetClass::Cash => "cash",
        };
        write!(f, "{}", label)
    }
}

/// Trade direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// A held position in one instrument
///
/// Invariant maintained by the ledger: `total_invested == quantity * avg_price`
/// after every mutation, and `quantity` is never negative. A position sold
/// down to exactly zero is removed from the collection, not kept as a zero row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    /// Ticker symbol, stored uppercase, unique within the portfolio
    pub symbol: String,
    pub name: String,
    pub class: AssetClass,
    pub quantity: Decimal,
    /// Weighted-average cost basis per unit
    pub avg_price: Decimal,
    /// Last-known market price per unit
    pub current_price: Decimal,
    /// Cumulative amount invested at cost
    pub total_invested: Decimal,
    /// Date of the first purchase
    pub acquired_on: NaiveDate,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// Market value of the held quantity at the last-known price
    pub fn current_value(&self) -> Decimal {
        self.quantity * self.current_price
    }

    /// Paper profit/loss against cost
    pub fn unrealized_gain(&self) -> Decimal {
        self.current_value() - self.total_invested
    }

    /// Percentage performance of the last-known price over cost basis
    pub fn performance(&self) -> Decimal {
        if self.avg_price.is_zero() {
            return Decimal::ZERO;
        }
        (self.current_price - self.avg_price) / self.avg_price * Decimal::from(100)
    }
}

/// One executed order. Append-only: never edited or deleted once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub id: Uuid,
    pub asset_id: Uuid,
    pub asset_symbol: String,
    pub side: TradeSide,
    pub quantity: Decimal,
    /// Execution price per unit
    pub price: Decimal,
    /// `quantity * price` at execution
    pub total: Decimal,
    pub note: Option<String>,
    pub executed_at: DateTime<Utc>,
}

/// Aggregate portfolio statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioStats {
    pub total_value: Decimal,
    pub total_invested: Decimal,
    pub total_gain_loss: Decimal,
    pub asset_count: usize,
    pub trade_count: usize,
    pub best_performer: Option<BestPerformer>,
    pub last_updated: DateTime<Utc>,
}

/// The single best-performing asset by percentage over cost basis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BestPerformer {
    pub symbol: String,
    pub performance: Decimal,
}

/// One entry of the largest-holdings ranking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopHolding {
    pub symbol: String,
    pub value: Decimal,
    /// Share of total portfolio value, in percent
    pub share: Decimal,
}
