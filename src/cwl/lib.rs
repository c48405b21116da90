pub mod http;
pub mod ids;
pub mod input;
pub mod ledger;
pub mod models;
pub mod reconcile;
pub mod services;
pub mod store;
mod coins;
mod result;

pub use coins::{Coins, CoinsError};
pub use result::Result;

use std::path::Path;
use std::sync::Arc;

/// Builds the wallet service over a `CsvStore` in `data_dir`, or over a `MemoryStore` when none is
/// given
pub fn build_wallet_service(data_dir: Option<&Path>) -> Result<services::WalletService> {
    let store: Arc<dyn store::WalletStore> = match data_dir {
        Some(dir) => Arc::new(store::CsvStore::open(dir)?),
        None => {
            log::warn!("No data directory configured, wallet balances will not survive a restart");
            Arc::new(store::MemoryStore::new())
        }
    };

    let wallet_service = services::WalletService::new(store);

    return Ok(wallet_service);
}
