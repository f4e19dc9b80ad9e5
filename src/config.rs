//! Ledger configuration: price-simulation band and tax bracket tables
//!
//! The tax tables and jitter band are configuration values rather than
//! constants baked into the accounting code, so a consumer can swap them
//! (different tax year, deterministic tests) without touching the ledger.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Simulated price-movement band as a fraction (0.05 = +/-5%)
    pub price_jitter: f64,

    /// Tax bracket tables used by the tax estimator
    pub tax: TaxTables,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            price_jitter: 0.05,
            tax: TaxTables::default(),
        }
    }
}

impl LedgerConfig {
    /// Load configuration from a JSON file. A missing file falls back to
    /// defaults; a present-but-unparseable file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: LedgerConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }
}

/// Simplified tax tables: flat ordinary-income brackets for short-term gains
/// and tiered long-term capital-gains rates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxTables {
    /// Ordinary-income brackets, ascending by floor. The rate of the highest
    /// bracket whose floor does not exceed the income applies to the whole
    /// short-term gain.
    pub ordinary: Vec<TaxBracket>,

    /// Long-term capital-gains tiers, ascending by ceiling. The first tier
    /// whose ceiling covers the income applies; `up_to: None` is the open
    /// top tier.
    pub long_term: Vec<CapitalGainsTier>,
}

/// An ordinary-income bracket: applies at incomes of `floor` and above
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxBracket {
    pub floor: Decimal,
    pub rate: Decimal,
}

/// A long-term capital-gains tier: applies at incomes up to `up_to` inclusive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapitalGainsTier {
    pub up_to: Option<Decimal>,
    pub rate: Decimal,
}

impl Default for TaxTables {
    fn default() -> Self {
        Self {
            ordinary: vec![
                TaxBracket {
                    floor: Decimal::ZERO,
                    rate: Decimal::new(10, 2),
                },
                TaxBracket {
                    floor: Decimal::from(10_275),
                    rate: Decimal::new(12, 2),
                },
                TaxBracket {
                    floor: Decimal::from(41_775),
                    rate: Decimal::new(22, 2),
                },
                TaxBracket {
                    floor: Decimal::from(89_450),
                    rate: Decimal::new(24, 2),
                },
                TaxBracket {
                    floor: Decimal::from(190_750),
                    rate: Decimal::new(32, 2),
                },
            ],
            long_term: vec![
                CapitalGainsTier {
                    up_to: Some(Decimal::from(41_775)),
                    rate: Decimal::ZERO,
                },
                CapitalGainsTier {
                    up_to: Some(Decimal::from(459_750)),
                    rate: Decimal::new(15, 2),
                },
                CapitalGainsTier {
                    up_to: None,
                    rate: Decimal::new(20, 2),
                },
            ],
        }
    }
}

impl TaxTables {
    /// Ordinary rate applied to short-term gains for the given income
    pub fn ordinary_rate(&self, income: Decimal) -> Decimal {
        self.ordinary
            .iter()
            .take_while(|b| b.floor <= income)
            .last()
            .or_else(|| self.ordinary.first())
            .map(|b| b.rate)
            .unwrap_or(Decimal::ZERO)
    }

    /// Long-term capital-gains rate for the given income
    pub fn long_term_rate(&self, income: Decimal) -> Decimal {
        self.long_term
            .iter()
            .find(|t| t.up_to.map_or(true, |cap| income <= cap))
            .map(|t| t.rate)
            .unwrap_or(Decimal::ZERO)
    }
}
