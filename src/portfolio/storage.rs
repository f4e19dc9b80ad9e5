//! Durable storage for the two portfolio records
//!
//! Stores portfolio state in: <data>/portfolio/
//! - assets.json - current holdings
//! - trades.json - append-only trade history
//!
//! Loading is forgiving: a missing or unparseable record yields an empty
//! collection (with a warning) so startup never fails on bad state. Writes
//! go through a temp-file-then-rename so a crash mid-write cannot truncate
//! a record.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::data_paths::DataPaths;
use crate::portfolio::types::{Asset, Trade};

/// Portfolio storage errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reads and writes the asset and trade records
#[derive(Clone)]
pub struct PortfolioStorage {
    /// Directory holding both records
    portfolio_dir: PathBuf,

    assets_path: PathBuf,
    trades_path: PathBuf,
}

impl PortfolioStorage {
    /// Create a storage handle rooted at the given data paths
    pub fn new(paths: &DataPaths) -> Self {
        let portfolio_dir = paths.portfolio();
        let assets_path = portfolio_dir.join("assets.json");
        let trades_path = portfolio_dir.join("trades.json");

        Self {
            portfolio_dir,
            assets_path,
            trades_path,
        }
    }

    /// Load both records, falling back to empty collections when a record is
    /// missing or corrupt
    pub fn load(&self) -> (Vec<Asset>, Vec<Trade>) {
        let assets: Vec<Asset> = load_record(&self.assets_path, "assets");
        let trades: Vec<Trade> = load_record(&self.trades_path, "trades");

        info!(
            assets = assets.len(),
            trades = trades.len(),
            "Loaded portfolio records"
        );
        (assets, trades)
    }

    /// Persist the asset record
    pub fn save_assets(&self, assets: &[Asset]) -> Result<(), StorageError> {
        self.write_record(&self.assets_path, assets)?;
        debug!(count = assets.len(), "Saved asset record");
        Ok(())
    }

    /// Persist the trade record
    pub fn save_trades(&self, trades: &[Trade]) -> Result<(), StorageError> {
        self.write_record(&self.trades_path, trades)?;
        debug!(count = trades.len(), "Saved trade record");
        Ok(())
    }

    fn write_record<T: Serialize>(&self, path: &Path, items: &[T]) -> Result<(), StorageError> {
        std::fs::create_dir_all(&self.portfolio_dir)?;

        let json = serde_json::to_string_pretty(items)?;

        // Write to a temporary file first, then rename (atomic on the same fs)
        let temp_path = path.with_extension("tmp");
        std::fs::write(&temp_path, json)?;
        std::fs::rename(&temp_path, path)?;

        Ok(())
    }
}

fn load_record<T: DeserializeOwned>(path: &Path, record: &str) -> Vec<T> {
    if !path.exists() {
        debug!(record, "No record file found, starting empty");
        return Vec::new();
    }

    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            warn!(record, error = %e, "Failed to read record, starting empty");
            return Vec::new();
        }
    };

    match serde_json::from_str(&content) {
        Ok(items) => items,
        Err(e) => {
            warn!(record, error = %e, "Record is corrupt, starting empty");
            Vec::new()
        }
    }
}
