//! Portfolio accounting: holdings, trade log, statistics, and tax estimates
//!
//! The ledger owns the asset and trade collections and mirrors them to two
//! JSON records on every mutation. Presentation layers consume its queries
//! and hold no state of their own.

pub mod ledger;
pub mod pricing;
pub mod storage;
pub mod tax;
pub mod types;

pub use ledger::{LedgerError, PortfolioLedger, SortKey};
pub use storage::PortfolioStorage;
pub use types::{
    Asset, AssetClass, BestPerformer, PortfolioStats, TopHolding, Trade, TradeSide,
};
