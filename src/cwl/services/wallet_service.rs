use crate::ids::UserId;
use crate::input::EntryRequest;
use crate::models::{NewTransaction, TransactionType, WalletTransaction};
use crate::store::{ApplyOutcome, StoreError, WalletStore};
use crate::Coins;

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Insufficient funds: balance is {balance}, requested {requested}")]
    InsufficientFunds { balance: Coins, requested: Coins },

    #[error("Storage failure: {0}")]
    Storage(StoreError),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientFunds {
                balance, requested, ..
            } => LedgerError::InsufficientFunds { balance, requested },
            other => LedgerError::Storage(other),
        }
    }
}

/// Result of a credit or debit as reported to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalletOutcome {
    pub balance: Coins,
    /// True when the idempotency key had already been applied and nothing changed
    pub replayed: bool,
}

/// Applies credits and debits to user wallets through a `WalletStore`
#[derive(Clone)]
pub struct WalletService {
    store: Arc<dyn WalletStore>,
}

impl WalletService {
    pub fn new(store: Arc<dyn WalletStore>) -> Self {
        return Self { store };
    }

    pub fn credit(&self, user_id: &UserId, entry: EntryRequest) -> Result<WalletOutcome, LedgerError> {
        self.apply(user_id, TransactionType::Credit, entry)
    }

    /// Fails with `InsufficientFunds` when the balance would go negative. A replayed idempotency
    /// key succeeds even if the balance has since dropped below the amount.
    pub fn debit(&self, user_id: &UserId, entry: EntryRequest) -> Result<WalletOutcome, LedgerError> {
        self.apply(user_id, TransactionType::Debit, entry)
    }

    pub fn get_balance(&self, user_id: &UserId) -> Result<Coins, LedgerError> {
        Ok(self.store.balance(user_id)?)
    }

    pub fn history(&self, user_id: &UserId) -> Result<Vec<WalletTransaction>, LedgerError> {
        Ok(self.store.transactions(user_id)?)
    }

    fn apply(
        &self,
        user_id: &UserId,
        tx_type: TransactionType,
        entry: EntryRequest,
    ) -> Result<WalletOutcome, LedgerError> {
        let new = NewTransaction {
            user_id: user_id.clone(),
            tx_type,
            amount: entry.amount,
            reference: entry.reference,
            idempotency_key: entry.idempotency_key,
            created_at: Utc::now(),
        };

        log::debug!("Applying {tx_type} of {} for {user_id}", new.amount);

        let requested = new.amount;

        let outcome = match self.store.apply(new) {
            Ok(outcome) => outcome,
            Err(e @ StoreError::InsufficientFunds { .. }) => {
                log::warn!("Rejected {tx_type} for {user_id}: {e}");
                return Err(e.into());
            }
            Err(e) => {
                log::error!("Failed to apply {tx_type} for {user_id}: {e:#}");
                return Err(e.into());
            }
        };

        match &outcome {
            ApplyOutcome::Applied { transaction, balance } => {
                log::info!(
                    "Applied {tx_type} {} of {} for {user_id}, balance is now {balance}",
                    transaction.id,
                    transaction.amount
                );
            }
            ApplyOutcome::Duplicate { existing, balance } => {
                if existing.tx_type != tx_type || existing.amount != requested {
                    log::warn!(
                        "Idempotency key {:?} for {user_id} reused with different payload: \
                         stored {} of {}, got {tx_type} of {requested}",
                        existing.idempotency_key,
                        existing.tx_type,
                        existing.amount
                    );
                }
                log::info!(
                    "Replayed {tx_type} for {user_id} matches transaction {}, balance is {balance}",
                    existing.id
                );
            }
        }

        Ok(WalletOutcome {
            balance: outcome.balance(),
            replayed: outcome.is_replay(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ids::IdempotencyKey;
    use crate::store::MemoryStore;

    fn build_service() -> WalletService {
        WalletService::new(Arc::new(MemoryStore::new()))
    }

    fn some_user() -> UserId {
        UserId::from("user-7")
    }

    fn entry(amount: u64, key: Option<&str>) -> EntryRequest {
        EntryRequest {
            amount: Coins(amount),
            reference: None,
            idempotency_key: key.map(IdempotencyKey::from),
        }
    }

    #[test]
    fn unknown_user_has_zero_balance() {
        let service = build_service();

        assert_eq!(service.get_balance(&some_user()).unwrap(), Coins::ZERO);
        assert!(service.history(&some_user()).unwrap().is_empty());
    }

    #[test]
    fn credit_then_debit() {
        let service = build_service();

        let outcome = service.credit(&some_user(), entry(100, None)).unwrap();
        assert_eq!(
            outcome,
            WalletOutcome {
                balance: Coins(100),
                replayed: false
            }
        );

        let outcome = service.debit(&some_user(), entry(40, None)).unwrap();
        assert_eq!(outcome.balance, Coins(60));
        assert_eq!(service.get_balance(&some_user()).unwrap(), Coins(60));
    }

    #[test]
    fn replayed_credit_is_applied_once() {
        let service = build_service();

        service.credit(&some_user(), entry(100, Some("evt_1"))).unwrap();
        let replay = service.credit(&some_user(), entry(100, Some("evt_1"))).unwrap();

        assert_eq!(
            replay,
            WalletOutcome {
                balance: Coins(100),
                replayed: true
            }
        );
        assert_eq!(service.history(&some_user()).unwrap().len(), 1);
    }

    #[test]
    fn replayed_debit_succeeds_after_balance_is_spent() {
        let service = build_service();

        service.credit(&some_user(), entry(50, None)).unwrap();
        service.debit(&some_user(), entry(50, Some("gift_1"))).unwrap();

        let replay = service.debit(&some_user(), entry(50, Some("gift_1"))).unwrap();
        assert!(replay.replayed);
        assert_eq!(replay.balance, Coins::ZERO);
    }

    #[test]
    fn insufficient_funds_leaves_balance_unchanged() {
        let service = build_service();

        service.credit(&some_user(), entry(10, None)).unwrap();

        let err = service.debit(&some_user(), entry(11, Some("gift_2"))).unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds { balance, requested }
                if balance == Coins(10) && requested == Coins(11)
        ));
        assert_eq!(service.get_balance(&some_user()).unwrap(), Coins(10));

        // the failed key was never recorded, so a later retry can still succeed
        service.credit(&some_user(), entry(5, None)).unwrap();
        let retry = service.debit(&some_user(), entry(11, Some("gift_2"))).unwrap();
        assert_eq!(
            retry,
            WalletOutcome {
                balance: Coins(4),
                replayed: false
            }
        );
    }

    #[test]
    fn concurrent_replays_apply_once() {
        let service = build_service();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let service = service.clone();
                std::thread::spawn(move || {
                    service
                        .credit(&UserId::from("user-7"), entry(25, Some("webhook-9")))
                        .unwrap()
                })
            })
            .collect();

        let outcomes: Vec<WalletOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(outcomes.iter().filter(|o| !o.replayed).count(), 1);
        assert_eq!(service.get_balance(&some_user()).unwrap(), Coins(25));
    }
}
