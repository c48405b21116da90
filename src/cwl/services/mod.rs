mod wallet_service;

pub use wallet_service::{LedgerError, WalletOutcome, WalletService};
