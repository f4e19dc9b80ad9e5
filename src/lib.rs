pub mod config;
pub mod data_paths;
pub use data_paths as data;
pub mod logging;
pub mod portfolio;

// Re-export the ledger API at the root level
pub use config::LedgerConfig;
pub use portfolio::ledger::{LedgerError, PortfolioLedger, SortKey};
pub use portfolio::pricing::{Identity, PriceStrategy, RandomWalk};
pub use portfolio::storage::PortfolioStorage;
pub use portfolio::tax::TaxEstimate;
pub use portfolio::types::{
    Asset, AssetClass, BestPerformer, PortfolioStats, TopHolding, Trade, TradeSide,
};
