//! Capital-gains tax estimation over the trade history
//!
//! This is an estimate, not an accounting of record. Realized gains are
//! computed against the asset's *current* average cost basis, not the basis
//! at the time each sell executed; for an asset that has since been fully
//! divested the trade's own price stands in, which makes its gain zero.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::config::TaxTables;
use crate::portfolio::types::{Asset, Trade, TradeSide};

/// Days of holding below which a realized gain counts as short-term
const SHORT_TERM_WINDOW_DAYS: i64 = 365;

/// Estimated tax liability on realized gains
#[derive(Debug, Clone, PartialEq)]
pub struct TaxEstimate {
    pub short_term_gains: Decimal,
    pub long_term_gains: Decimal,
    pub short_term_tax: Decimal,
    pub long_term_tax: Decimal,
    pub total_tax: Decimal,
}

/// Partition realized gains from sell trades into short- and long-term and
/// apply the configured bracket rates for the given income.
pub fn estimate(
    trades: &[Trade],
    assets: &[Asset],
    tables: &TaxTables,
    income: Decimal,
    now: DateTime<Utc>,
) -> TaxEstimate {
    let cutoff = now - Duration::days(SHORT_TERM_WINDOW_DAYS);

    let mut short_term_gains = Decimal::ZERO;
    let mut long_term_gains = Decimal::ZERO;

    for trade in trades.iter().filter(|t| t.side == TradeSide::Sell) {
        // Current basis of the still-held asset; the trade's own price for a
        // divested one (degenerate basis, zero gain)
        let basis = assets
            .iter()
            .find(|a| a.id == trade.asset_id)
            .map(|a| a.avg_price)
            .unwrap_or(trade.price);

        let gain = (trade.price - basis) * trade.quantity;

        if trade.executed_at > cutoff {
            short_term_gains += gain;
        } else {
            long_term_gains += gain;
        }
    }

    let short_term_tax = (short_term_gains * tables.ordinary_rate(income))
        .max(Decimal::ZERO)
        .round_dp(2);
    let long_term_tax = (long_term_gains * tables.long_term_rate(income))
        .max(Decimal::ZERO)
        .round_dp(2);

    TaxEstimate {
        short_term_gains,
        long_term_gains,
        short_term_tax,
        long_term_tax,
        total_tax: short_term_tax + long_term_tax,
    }
}
