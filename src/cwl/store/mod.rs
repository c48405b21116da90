mod csv_store;
mod memory;

pub use csv_store::CsvStore;
pub use memory::MemoryStore;

use crate::ids::UserId;
use crate::ledger::Prepared;
use crate::models::{NewTransaction, Wallet, WalletTransaction};
use crate::{Coins, CoinsError};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Insufficient funds for {user_id}: balance is {balance}, requested {requested}")]
    InsufficientFunds {
        user_id: UserId,
        balance: Coins,
        requested: Coins,
    },

    #[error(transparent)]
    Coins(#[from] CoinsError),

    #[error("Corrupted ledger data: {0}")]
    Corrupted(String),

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// What `WalletStore::apply` did with a new transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied {
        transaction: WalletTransaction,
        balance: Coins,
    },
    /// The idempotency key was seen before; nothing was written
    Duplicate {
        existing: WalletTransaction,
        balance: Coins,
    },
}

impl ApplyOutcome {
    pub fn balance(&self) -> Coins {
        match self {
            ApplyOutcome::Applied { balance, .. } => *balance,
            ApplyOutcome::Duplicate { balance, .. } => *balance,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, ApplyOutcome::Duplicate { .. })
    }
}

impl From<Prepared> for ApplyOutcome {
    fn from(prepared: Prepared) -> Self {
        match prepared {
            Prepared::Duplicate { existing, balance } => ApplyOutcome::Duplicate { existing, balance },
            Prepared::Commit {
                transaction,
                balance,
            } => ApplyOutcome::Applied {
                transaction,
                balance,
            },
        }
    }
}

/// Storage seam for the wallet service.
///
/// `apply` is the only write. Implementations perform the idempotency check, the funds check,
/// the log append and the balance update as one atomic step, so concurrent requests carrying the
/// same idempotency key can never both be applied.
pub trait WalletStore: Send + Sync {
    fn apply(&self, new: NewTransaction) -> Result<ApplyOutcome, StoreError>;

    fn balance(&self, user_id: &UserId) -> Result<Coins, StoreError>;

    fn transactions(&self, user_id: &UserId) -> Result<Vec<WalletTransaction>, StoreError>;

    fn wallets(&self) -> Result<Vec<Wallet>, StoreError>;

    fn history(&self) -> Result<Vec<WalletTransaction>, StoreError>;
}
