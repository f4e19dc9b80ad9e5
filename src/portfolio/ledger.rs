//! The portfolio ledger: every mutation and query over the two collections
//!
//! Each operation is a single synchronous step: validate, mutate, persist,
//! return. The collections are owned exclusively by the ledger; presentation
//! code re-renders from its queries after every mutation and holds no copies.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::LedgerConfig;
use crate::portfolio::pricing::{PriceStrategy, RandomWalk};
use crate::portfolio::storage::PortfolioStorage;
use crate::portfolio::tax::{self, TaxEstimate};
use crate::portfolio::types::{
    Asset, AssetClass, BestPerformer, PortfolioStats, TopHolding, Trade, TradeSide,
};

/// Ledger validation errors. All are recoverable and leave state unchanged.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: Decimal },

    #[error("Unknown asset: {0}")]
    UnknownAsset(Uuid),

    #[error("Insufficient holdings of {symbol}: have {held}, tried to sell {requested}")]
    InsufficientHoldings {
        symbol: String,
        held: Decimal,
        requested: Decimal,
    },
}

/// Orderings accepted by [`PortfolioLedger::list_assets`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    /// Total current value, largest first
    Value,
    /// Percentage performance over cost basis, best first
    Performance,
    /// Display name, lexicographic
    Name,
}

/// Owns the asset and trade collections and all logic over them
pub struct PortfolioLedger {
    assets: Vec<Asset>,
    trades: Vec<Trade>,
    storage: PortfolioStorage,
    config: LedgerConfig,
    strategy: Box<dyn PriceStrategy>,
    last_persist_error: Option<String>,
}

impl PortfolioLedger {
    /// Open a ledger backed by the given storage, loading any existing
    /// records. Market-price simulation uses the configured jitter band.
    pub fn open(storage: PortfolioStorage, config: LedgerConfig) -> Self {
        let strategy = Box::new(RandomWalk::new(config.price_jitter));
        Self::with_strategy(storage, config, strategy)
    }

    /// Open a ledger with an explicit price strategy
    pub fn with_strategy(
        storage: PortfolioStorage,
        config: LedgerConfig,
        strategy: Box<dyn PriceStrategy>,
    ) -> Self {
        let (assets, trades) = storage.load();
        Self {
            assets,
            trades,
            storage,
            config,
            strategy,
            last_persist_error: None,
        }
    }

    /// Record a purchase by symbol, creating the asset on first buy or
    /// merging into the existing position at weighted-average cost.
    pub fn record_purchase(
        &mut self,
        symbol: &str,
        name: &str,
        class: AssetClass,
        quantity: Decimal,
        price: Decimal,
        acquired_on: NaiveDate,
    ) -> Result<Asset, LedgerError> {
        let symbol = symbol.trim();
        let name = name.trim();
        if symbol.is_empty() {
            return Err(LedgerError::MissingField("symbol"));
        }
        if name.is_empty() {
            return Err(LedgerError::MissingField("name"));
        }
        require_positive("quantity", quantity)?;
        require_positive("price", price)?;

        let symbol = symbol.to_uppercase();
        let now = Utc::now();

        let asset = match self.assets.iter_mut().find(|a| a.symbol == symbol) {
            Some(existing) => {
                apply_buy(existing, quantity, price, now);
                info!(
                    symbol = %existing.symbol,
                    quantity = %quantity,
                    price = %price,
                    avg_price = %existing.avg_price,
                    "Merged purchase into existing position"
                );
                existing.clone()
            }
            None => {
                let asset = Asset {
                    id: Uuid::new_v4(),
                    symbol: symbol.clone(),
                    name: name.to_string(),
                    class,
                    quantity,
                    avg_price: price,
                    current_price: price,
                    total_invested: quantity * price,
                    acquired_on,
                    updated_at: now,
                };
                info!(symbol = %symbol, quantity = %quantity, price = %price, "Added asset");
                self.assets.push(asset.clone());
                asset
            }
        };

        self.persist();
        Ok(asset)
    }

    /// Execute a buy or sell against an existing asset and append the trade
    /// to the history. A surviving asset's market price is refreshed from
    /// the trade price through the injected strategy.
    pub fn execute_trade(
        &mut self,
        asset_id: Uuid,
        side: TradeSide,
        quantity: Decimal,
        price: Decimal,
        note: Option<String>,
    ) -> Result<Trade, LedgerError> {
        require_positive("quantity", quantity)?;
        require_positive("price", price)?;

        let index = self
            .assets
            .iter()
            .position(|a| a.id == asset_id)
            .ok_or(LedgerError::UnknownAsset(asset_id))?;

        let now = Utc::now();
        let asset = &mut self.assets[index];

        if side == TradeSide::Sell && quantity > asset.quantity {
            return Err(LedgerError::InsufficientHoldings {
                symbol: asset.symbol.clone(),
                held: asset.quantity,
                requested: quantity,
            });
        }

        let trade = Trade {
            id: Uuid::new_v4(),
            asset_id,
            asset_symbol: asset.symbol.clone(),
            side,
            quantity,
            price,
            total: quantity * price,
            note,
            executed_at: now,
        };

        match side {
            TradeSide::Buy => apply_buy(asset, quantity, price, now),
            TradeSide::Sell => {
                // Cost basis leaves with the sold units; avg_price is unchanged
                asset.total_invested -= asset.avg_price * quantity;
                asset.quantity -= quantity;
            }
        }

        if asset.quantity.is_zero() {
            let closed = self.assets.remove(index);
            info!(symbol = %closed.symbol, "Position fully sold, removing asset");
        } else {
            asset.current_price = self.strategy.next_price(price);
            asset.updated_at = now;
        }

        info!(
            symbol = %trade.asset_symbol,
            side = %trade.side,
            quantity = %trade.quantity,
            price = %trade.price,
            "Executed trade"
        );

        self.trades.push(trade.clone());
        self.persist();
        Ok(trade)
    }

    /// Delete an asset outright. Its trade history is retained.
    pub fn remove_asset(&mut self, id: Uuid) -> Result<Asset, LedgerError> {
        let index = self
            .assets
            .iter()
            .position(|a| a.id == id)
            .ok_or(LedgerError::UnknownAsset(id))?;

        let removed = self.assets.remove(index);
        info!(symbol = %removed.symbol, "Removed asset");

        self.persist();
        Ok(removed)
    }

    /// Iterate the assets, optionally filtered by a case-insensitive
    /// substring of name or symbol and ordered by the given key. Restartable:
    /// each call walks the current collection afresh.
    pub fn list_assets<'a>(
        &'a self,
        filter: Option<&str>,
        sort: Option<SortKey>,
    ) -> impl Iterator<Item = &'a Asset> + 'a {
        let needle = filter.map(|f| f.to_lowercase());
        let mut selected: Vec<&Asset> = self
            .assets
            .iter()
            .filter(|a| match &needle {
                Some(needle) => {
                    a.name.to_lowercase().contains(needle)
                        || a.symbol.to_lowercase().contains(needle)
                }
                None => true,
            })
            .collect();

        match sort {
            Some(SortKey::Value) => {
                selected.sort_by(|a, b| b.current_value().cmp(&a.current_value()))
            }
            Some(SortKey::Performance) => {
                selected.sort_by(|a, b| b.performance().cmp(&a.performance()))
            }
            Some(SortKey::Name) => selected.sort_by(|a, b| a.name.cmp(&b.name)),
            None => {}
        }

        selected.into_iter()
    }

    /// Look up an asset by id
    pub fn asset(&self, id: Uuid) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Look up an asset by symbol, case-insensitively
    pub fn find_by_symbol(&self, symbol: &str) -> Option<&Asset> {
        self.assets
            .iter()
            .find(|a| a.symbol.eq_ignore_ascii_case(symbol.trim()))
    }

    /// All current holdings, in insertion order
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// The full trade history, oldest first
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    /// The most recent trades, newest first
    pub fn recent_trades(&self, limit: usize) -> impl Iterator<Item = &Trade> {
        self.trades.iter().rev().take(limit)
    }

    /// The largest holdings by current value, with their share of the total
    pub fn top_holdings(&self, count: usize) -> Vec<TopHolding> {
        let total: Decimal = self.assets.iter().map(Asset::current_value).sum();

        let mut ranked: Vec<&Asset> = self.assets.iter().collect();
        ranked.sort_by(|a, b| b.current_value().cmp(&a.current_value()));

        ranked
            .into_iter()
            .take(count)
            .map(|asset| {
                let value = asset.current_value();
                let share = if total.is_zero() {
                    Decimal::ZERO
                } else {
                    value / total * Decimal::from(100)
                };
                TopHolding {
                    symbol: asset.symbol.clone(),
                    value,
                    share,
                }
            })
            .collect()
    }

    /// Aggregate statistics over the current holdings and trade history
    pub fn compute_statistics(&self) -> PortfolioStats {
        let total_value: Decimal = self.assets.iter().map(Asset::current_value).sum();
        let total_invested: Decimal = self.assets.iter().map(|a| a.total_invested).sum();

        let best_performer = self
            .assets
            .iter()
            .max_by(|a, b| a.performance().cmp(&b.performance()))
            .map(|a| BestPerformer {
                symbol: a.symbol.clone(),
                performance: a.performance(),
            });

        PortfolioStats {
            total_value,
            total_invested,
            total_gain_loss: total_value - total_invested,
            asset_count: self.assets.len(),
            trade_count: self.trades.len(),
            best_performer,
            last_updated: Utc::now(),
        }
    }

    /// Estimate tax on realized gains for the given ordinary income
    pub fn estimate_taxes(&self, income: Decimal) -> TaxEstimate {
        self.estimate_taxes_as_of(income, Utc::now())
    }

    /// Deterministic variant of [`estimate_taxes`](Self::estimate_taxes):
    /// short/long-term classification uses the trailing 365 days from `now`
    pub fn estimate_taxes_as_of(&self, income: Decimal, now: DateTime<Utc>) -> TaxEstimate {
        tax::estimate(&self.trades, &self.assets, &self.config.tax, income, now)
    }

    /// Run every asset's market price through the injected strategy. The
    /// single point through which simulated live pricing flows.
    pub fn refresh_market_prices(&mut self) {
        let now = Utc::now();
        for asset in &mut self.assets {
            asset.current_price = self.strategy.next_price(asset.current_price);
            asset.updated_at = now;
        }

        info!(assets = self.assets.len(), "Refreshed market prices");
        self.persist();
    }

    /// True when the last durable write failed and in-memory state may not
    /// survive a reload
    pub fn is_degraded(&self) -> bool {
        self.last_persist_error.is_some()
    }

    /// The error message of the last failed durable write, if any
    pub fn last_persist_error(&self) -> Option<&str> {
        self.last_persist_error.as_deref()
    }

    fn persist(&mut self) {
        let result = self
            .storage
            .save_assets(&self.assets)
            .and_then(|_| self.storage.save_trades(&self.trades));

        match result {
            Ok(()) => self.last_persist_error = None,
            Err(e) => {
                warn!(error = %e, "Failed to persist portfolio; in-memory state remains authoritative");
                self.last_persist_error = Some(e.to_string());
            }
        }
    }
}

/// Merge a buy into a position at weighted-average cost
fn apply_buy(asset: &mut Asset, quantity: Decimal, price: Decimal, now: DateTime<Utc>) {
    let new_quantity = asset.quantity + quantity;
    let new_invested = asset.total_invested + quantity * price;

    asset.avg_price = new_invested / new_quantity;
    asset.quantity = new_quantity;
    asset.total_invested = new_invested;
    asset.updated_at = now;
}

fn require_positive(field: &'static str, value: Decimal) -> Result<(), LedgerError> {
    if value <= Decimal::ZERO {
        return Err(LedgerError::NonPositive { field, value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_paths::DataPaths;
    use crate::portfolio::pricing::Identity;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn test_ledger() -> (PortfolioLedger, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = PortfolioStorage::new(&DataPaths::new(dir.path()));
        let ledger = PortfolioLedger::with_strategy(
            storage,
            LedgerConfig::default(),
            Box::new(Identity),
        );
        (ledger, dir)
    }

    fn buy(
        ledger: &mut PortfolioLedger,
        symbol: &str,
        quantity: Decimal,
        price: Decimal,
    ) -> Asset {
        ledger
            .record_purchase(
                symbol,
                symbol,
                AssetClass::Stock,
                quantity,
                price,
                NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            )
            .unwrap()
    }

    #[test]
    fn test_first_purchase_creates_asset() {
        let (mut ledger, _dir) = test_ledger();

        let asset = buy(&mut ledger, "aaa", dec!(10), dec!(10));

        assert_eq!(asset.symbol, "AAA");
        assert_eq!(asset.quantity, dec!(10));
        assert_eq!(asset.avg_price, dec!(10));
        assert_eq!(asset.current_price, dec!(10));
        assert_eq!(asset.total_invested, dec!(100));
        assert_eq!(ledger.assets().len(), 1);
    }

    #[test]
    fn test_repeat_purchase_merges_at_weighted_average() {
        let (mut ledger, _dir) = test_ledger();

        buy(&mut ledger, "AAA", dec!(10), dec!(10));
        let merged = buy(&mut ledger, "aAa", dec!(10), dec!(20));

        // (100 + 200) / 20
        assert_eq!(merged.avg_price, dec!(15));
        assert_eq!(merged.quantity, dec!(20));
        assert_eq!(merged.total_invested, dec!(300));
        assert_eq!(ledger.assets().len(), 1);
    }

    #[test]
    fn test_invested_always_equals_quantity_times_avg() {
        let (mut ledger, _dir) = test_ledger();

        for (quantity, price) in [
            (dec!(3), dec!(11.50)),
            (dec!(5), dec!(9.80)),
            (dec!(2), dec!(30)),
        ] {
            let asset = buy(&mut ledger, "AAA", quantity, price);
            assert_eq!(asset.total_invested, asset.quantity * asset.avg_price);
        }

        // Invested equals the sum of each purchase's quantity * price
        let asset = ledger.find_by_symbol("AAA").unwrap();
        assert_eq!(
            asset.total_invested,
            dec!(3) * dec!(11.50) + dec!(5) * dec!(9.80) + dec!(2) * dec!(30)
        );
    }

    #[test]
    fn test_purchase_validation() {
        let (mut ledger, _dir) = test_ledger();
        let date = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();

        let blank = ledger.record_purchase("  ", "Name", AssetClass::Stock, dec!(1), dec!(1), date);
        assert!(matches!(blank, Err(LedgerError::MissingField("symbol"))));

        let no_name = ledger.record_purchase("AAA", "", AssetClass::Stock, dec!(1), dec!(1), date);
        assert!(matches!(no_name, Err(LedgerError::MissingField("name"))));

        let zero_qty =
            ledger.record_purchase("AAA", "Name", AssetClass::Stock, dec!(0), dec!(1), date);
        assert!(matches!(
            zero_qty,
            Err(LedgerError::NonPositive { field: "quantity", .. })
        ));

        let negative_price =
            ledger.record_purchase("AAA", "Name", AssetClass::Stock, dec!(1), dec!(-2), date);
        assert!(matches!(
            negative_price,
            Err(LedgerError::NonPositive { field: "price", .. })
        ));

        assert!(ledger.assets().is_empty());
    }

    #[test]
    fn test_sell_reduces_invested_by_cost_basis() {
        let (mut ledger, _dir) = test_ledger();

        buy(&mut ledger, "AAA", dec!(10), dec!(10));
        let asset = buy(&mut ledger, "AAA", dec!(10), dec!(20));

        ledger
            .execute_trade(asset.id, TradeSide::Sell, dec!(15), dec!(25), None)
            .unwrap();

        let asset = ledger.find_by_symbol("AAA").unwrap();
        // 300 - 15 * 15
        assert_eq!(asset.total_invested, dec!(75));
        assert_eq!(asset.quantity, dec!(5));
        assert_eq!(asset.avg_price, dec!(15));
    }

    #[test]
    fn test_sell_all_removes_asset_and_keeps_history() {
        let (mut ledger, _dir) = test_ledger();

        let asset = buy(&mut ledger, "AAA", dec!(10), dec!(10));
        ledger
            .execute_trade(asset.id, TradeSide::Sell, dec!(10), dec!(12), None)
            .unwrap();

        assert!(ledger.assets().is_empty());
        assert_eq!(ledger.trades().len(), 1);
        assert_eq!(ledger.trades()[0].asset_symbol, "AAA");
    }

    #[test]
    fn test_oversell_is_rejected_without_mutation() {
        let (mut ledger, _dir) = test_ledger();

        let asset = buy(&mut ledger, "AAA", dec!(5), dec!(10));
        let result = ledger.execute_trade(asset.id, TradeSide::Sell, dec!(6), dec!(10), None);

        assert!(matches!(
            result,
            Err(LedgerError::InsufficientHoldings { .. })
        ));
        assert!(ledger.trades().is_empty());

        let untouched = ledger.find_by_symbol("AAA").unwrap();
        assert_eq!(untouched.quantity, dec!(5));
        assert_eq!(untouched.total_invested, dec!(50));
    }

    #[test]
    fn test_trade_against_unknown_asset_is_rejected() {
        let (mut ledger, _dir) = test_ledger();

        let result = ledger.execute_trade(Uuid::new_v4(), TradeSide::Buy, dec!(1), dec!(1), None);

        assert!(matches!(result, Err(LedgerError::UnknownAsset(_))));
        assert!(ledger.trades().is_empty());
    }

    #[test]
    fn test_buy_trade_merges_and_updates_market_price() {
        let (mut ledger, _dir) = test_ledger();

        let asset = buy(&mut ledger, "AAA", dec!(10), dec!(10));
        let trade = ledger
            .execute_trade(asset.id, TradeSide::Buy, dec!(10), dec!(20), Some("add".into()))
            .unwrap();

        assert_eq!(trade.total, dec!(200));

        let asset = ledger.find_by_symbol("AAA").unwrap();
        assert_eq!(asset.avg_price, dec!(15));
        // Identity strategy pins the market price to the trade price
        assert_eq!(asset.current_price, dec!(20));
    }

    #[test]
    fn test_remove_asset_keeps_trades() {
        let (mut ledger, _dir) = test_ledger();

        let asset = buy(&mut ledger, "AAA", dec!(10), dec!(10));
        ledger
            .execute_trade(asset.id, TradeSide::Sell, dec!(2), dec!(11), None)
            .unwrap();

        let removed = ledger.remove_asset(asset.id).unwrap();
        assert_eq!(removed.symbol, "AAA");
        assert!(ledger.assets().is_empty());
        assert_eq!(ledger.trades().len(), 1);

        assert!(matches!(
            ledger.remove_asset(asset.id),
            Err(LedgerError::UnknownAsset(_))
        ));
    }

    #[test]
    fn test_list_assets_filters_and_sorts() {
        let (mut ledger, _dir) = test_ledger();

        ledger
            .record_purchase(
                "BTC",
                "Bitcoin",
                AssetClass::Crypto,
                dec!(1),
                dec!(100),
                NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            )
            .unwrap();
        ledger
            .record_purchase(
                "AAPL",
                "Apple",
                AssetClass::Stock,
                dec!(10),
                dec!(20),
                NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            )
            .unwrap();

        let hits: Vec<_> = ledger
            .list_assets(Some("bit"), None)
            .map(|a| a.symbol.as_str())
            .collect();
        assert_eq!(hits, vec!["BTC"]);

        // AAPL holds 10 * 20 = 200, BTC 1 * 100 = 100
        let by_value: Vec<_> = ledger
            .list_assets(None, Some(SortKey::Value))
            .map(|a| a.symbol.as_str())
            .collect();
        assert_eq!(by_value, vec!["AAPL", "BTC"]);

        let by_name: Vec<_> = ledger
            .list_assets(None, Some(SortKey::Name))
            .map(|a| a.symbol.as_str())
            .collect();
        assert_eq!(by_name, vec!["AAPL", "BTC"]);

        // Restartable: a second pass yields the same sequence
        let again: Vec<_> = ledger
            .list_assets(None, Some(SortKey::Name))
            .map(|a| a.symbol.as_str())
            .collect();
        assert_eq!(by_name, again);
    }

    #[test]
    fn test_statistics_on_empty_ledger() {
        let (ledger, _dir) = test_ledger();

        let stats = ledger.compute_statistics();
        assert_eq!(stats.total_value, Decimal::ZERO);
        assert_eq!(stats.total_invested, Decimal::ZERO);
        assert_eq!(stats.total_gain_loss, Decimal::ZERO);
        assert_eq!(stats.asset_count, 0);
        assert_eq!(stats.trade_count, 0);
        assert!(stats.best_performer.is_none());
    }

    #[test]
    fn test_statistics_reports_gain_and_best_performer() {
        let (mut ledger, _dir) = test_ledger();

        let asset = buy(&mut ledger, "AAA", dec!(10), dec!(100));
        // A buy at 120 lifts the market price to 120 under Identity
        ledger
            .execute_trade(asset.id, TradeSide::Buy, dec!(0.0001), dec!(120), None)
            .ok();

        // Second, flat position
        buy(&mut ledger, "BBB", dec!(1), dec!(50));

        let stats = ledger.compute_statistics();
        assert_eq!(stats.asset_count, 2);
        assert_eq!(stats.trade_count, 1);

        let best = stats.best_performer.unwrap();
        assert_eq!(best.symbol, "AAA");
        assert!(best.performance > Decimal::ZERO);
    }

    /// Pins every simulated price to a fixed value
    struct PinAt(Decimal);

    impl PriceStrategy for PinAt {
        fn next_price(&mut self, _current: Decimal) -> Decimal {
            self.0
        }
    }

    #[test]
    fn test_statistics_thousand_invested_twelve_hundred_value() {
        let dir = tempfile::tempdir().unwrap();
        let storage = PortfolioStorage::new(&DataPaths::new(dir.path()));
        let mut ledger = PortfolioLedger::with_strategy(
            storage,
            LedgerConfig::default(),
            Box::new(PinAt(dec!(120))),
        );

        buy(&mut ledger, "AAA", dec!(10), dec!(100));
        ledger.refresh_market_prices();

        let stats = ledger.compute_statistics();
        assert_eq!(stats.total_value, dec!(1200));
        assert_eq!(stats.total_invested, dec!(1000));
        assert_eq!(stats.total_gain_loss, dec!(200));
    }

    #[test]
    fn test_top_holdings_ranks_by_value_with_share() {
        let (mut ledger, _dir) = test_ledger();

        buy(&mut ledger, "AAA", dec!(10), dec!(30)); // 300
        buy(&mut ledger, "BBB", dec!(10), dec!(60)); // 600
        buy(&mut ledger, "CCC", dec!(10), dec!(10)); // 100

        let top = ledger.top_holdings(2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].symbol, "BBB");
        assert_eq!(top[0].value, dec!(600));
        assert_eq!(top[0].share, dec!(60));
        assert_eq!(top[1].symbol, "AAA");
        assert_eq!(top[1].share, dec!(30));
    }

    #[test]
    fn test_recent_trades_newest_first() {
        let (mut ledger, _dir) = test_ledger();

        let asset = buy(&mut ledger, "AAA", dec!(100), dec!(10));
        for price in [dec!(11), dec!(12), dec!(13)] {
            ledger
                .execute_trade(asset.id, TradeSide::Sell, dec!(1), price, None)
                .unwrap();
        }

        let recent: Vec<_> = ledger.recent_trades(2).map(|t| t.price).collect();
        assert_eq!(recent, vec![dec!(13), dec!(12)]);
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path());

        let asset_id = {
            let storage = PortfolioStorage::new(&paths);
            let mut ledger = PortfolioLedger::with_strategy(
                storage,
                LedgerConfig::default(),
                Box::new(Identity),
            );
            let asset = buy(&mut ledger, "AAA", dec!(10), dec!(12.345));
            ledger
                .execute_trade(asset.id, TradeSide::Sell, dec!(3), dec!(15), None)
                .unwrap();
            asset.id
        };

        let storage = PortfolioStorage::new(&paths);
        let reopened =
            PortfolioLedger::with_strategy(storage, LedgerConfig::default(), Box::new(Identity));

        let asset = reopened.asset(asset_id).unwrap();
        assert_eq!(asset.quantity, dec!(7));
        assert_eq!(asset.avg_price, dec!(12.345));
        assert_eq!(asset.total_invested, dec!(7) * dec!(12.345));
        assert_eq!(reopened.trades().len(), 1);
        assert_eq!(reopened.trades()[0].price, dec!(15));
    }

    #[test]
    fn test_persist_failure_degrades_without_corrupting_state() {
        let dir = tempfile::tempdir().unwrap();
        // Root the data directory at a regular file so directory creation fails
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, "not a directory").unwrap();

        let storage = PortfolioStorage::new(&DataPaths::new(&blocked));
        let mut ledger =
            PortfolioLedger::with_strategy(storage, LedgerConfig::default(), Box::new(Identity));

        let asset = buy(&mut ledger, "AAA", dec!(10), dec!(10));

        assert!(ledger.is_degraded());
        assert!(ledger.last_persist_error().is_some());
        // In-memory state is still authoritative
        assert_eq!(ledger.find_by_symbol("AAA").unwrap().id, asset.id);
        assert_eq!(ledger.assets().len(), 1);
    }

    #[test]
    fn test_refresh_market_prices_applies_strategy() {
        let (mut ledger, _dir) = test_ledger();

        buy(&mut ledger, "AAA", dec!(10), dec!(10));
        buy(&mut ledger, "BBB", dec!(1), dec!(50));

        // Identity leaves prices untouched
        ledger.refresh_market_prices();
        assert_eq!(ledger.find_by_symbol("AAA").unwrap().current_price, dec!(10));
        assert_eq!(ledger.find_by_symbol("BBB").unwrap().current_price, dec!(50));
    }

    #[test]
    fn test_taxes_flow_through_trade_history() {
        let (mut ledger, _dir) = test_ledger();

        let asset = buy(&mut ledger, "AAA", dec!(100), dec!(10));
        ledger
            .execute_trade(asset.id, TradeSide::Sell, dec!(50), dec!(20), None)
            .unwrap();

        // Classified against a "now" 400 days ahead: the sell is long-term
        let later = Utc::now() + chrono::Duration::days(400);
        let long_term = ledger.estimate_taxes_as_of(dec!(100000), later);
        assert_eq!(long_term.long_term_gains, dec!(500));
        assert_eq!(long_term.short_term_gains, Decimal::ZERO);

        // Against the immediate now it is short-term
        let short_term = ledger.estimate_taxes(dec!(100000));
        assert_eq!(short_term.short_term_gains, dec!(500));
        assert_eq!(short_term.long_term_gains, Decimal::ZERO);
    }
}
