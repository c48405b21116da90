use super::{ApplyOutcome, StoreError, WalletStore};

use crate::ids::UserId;
use crate::ledger::{Ledger, Prepared};
use crate::models::{NewTransaction, Wallet, WalletTransaction};
use crate::Coins;

use parking_lot::Mutex;

/// Process-local store; everything is lost on restart
#[derive(Debug, Default)]
pub struct MemoryStore {
    ledger: Mutex<Ledger>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStore for MemoryStore {
    fn apply(&self, new: NewTransaction) -> Result<ApplyOutcome, StoreError> {
        let mut ledger = self.ledger.lock();

        let prepared = ledger.prepare(new)?;

        if let Prepared::Commit {
            transaction,
            balance,
        } = &prepared
        {
            ledger.commit(transaction.clone(), *balance);
        }

        Ok(prepared.into())
    }

    fn balance(&self, user_id: &UserId) -> Result<Coins, StoreError> {
        Ok(self.ledger.lock().balance(user_id))
    }

    fn transactions(&self, user_id: &UserId) -> Result<Vec<WalletTransaction>, StoreError> {
        Ok(self.ledger.lock().transactions_for(user_id))
    }

    fn wallets(&self) -> Result<Vec<Wallet>, StoreError> {
        Ok(self.ledger.lock().wallets())
    }

    fn history(&self) -> Result<Vec<WalletTransaction>, StoreError> {
        Ok(self.ledger.lock().history().to_vec())
    }
}
