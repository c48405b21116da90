mod transaction;
mod wallet;

pub use transaction::{NewTransaction, TransactionType, WalletTransaction};
pub use wallet::Wallet;
