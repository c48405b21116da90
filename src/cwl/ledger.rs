use crate::ids::{IdempotencyKey, TransactionId, UserId};
use crate::models::{NewTransaction, TransactionType, Wallet, WalletTransaction};
use crate::store::StoreError;
use crate::Coins;

use std::collections::HashMap;

/// Result of checking a new transaction against the current ledger state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prepared {
    /// The idempotency key was already used by this user
    Duplicate {
        existing: WalletTransaction,
        balance: Coins,
    },
    /// The transaction may be committed with the given id, resulting in `balance`
    Commit {
        transaction: WalletTransaction,
        balance: Coins,
    },
}

/// Represents a WORM (Write Once, Read Many) transaction log, plus the balance projection kept
/// alongside it.
#[derive(Debug, Default)]
pub struct Ledger {
    history: Vec<WalletTransaction>,
    key_index: HashMap<(UserId, IdempotencyKey), usize>,
    balances: HashMap<UserId, Coins>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a ledger from a persisted log. Balances are recomputed from the log; the stored
    /// snapshot is only compared against them, and any stale wallet is logged.
    pub fn restore(history: Vec<WalletTransaction>, wallets: Vec<Wallet>) -> Result<Self, StoreError> {
        let mut ledger = Self::new();

        for tx in history {
            if let Some(last) = ledger.history.last() {
                if tx.id <= last.id {
                    Err(StoreError::Corrupted(format!(
                        "Transaction ids out of order: {} after {}",
                        tx.id, last.id
                    )))?;
                }
            }

            if let Some(key) = tx.idempotency_key.clone() {
                let index_key = (tx.user_id.clone(), key);
                if ledger.key_index.contains_key(&index_key) {
                    Err(StoreError::Corrupted(format!(
                        "Duplicate idempotency key {} for {}",
                        index_key.1, index_key.0
                    )))?;
                }
                ledger.key_index.insert(index_key, ledger.history.len());
            }

            let current = ledger.balance(&tx.user_id);
            let balance = match tx.tx_type {
                TransactionType::Credit => current.checked_add(tx.amount)?,
                TransactionType::Debit => current.checked_sub(tx.amount).map_err(|_| {
                    StoreError::Corrupted(format!(
                        "Transaction {} drives the balance of {} below zero",
                        tx.id, tx.user_id
                    ))
                })?,
            };
            ledger.balances.insert(tx.user_id.clone(), balance);

            ledger.history.push(tx);
        }

        for wallet in wallets {
            let computed = ledger.balance(&wallet.user_id);
            if computed != wallet.balance {
                log::warn!(
                    "Stored balance {} for {} differs from the log, using {computed}",
                    wallet.balance,
                    wallet.user_id
                );
            }
        }

        Ok(ledger)
    }

    /// Checks uniqueness, funds, and overflow, in that order, without changing anything
    pub fn prepare(&self, new: NewTransaction) -> Result<Prepared, StoreError> {
        if let Some(existing) = self.find_by_key(&new.user_id, new.idempotency_key.as_ref()) {
            return Ok(Prepared::Duplicate {
                existing: existing.clone(),
                balance: self.balance(&new.user_id),
            });
        }

        let current = self.balance(&new.user_id);

        let balance = match new.tx_type {
            TransactionType::Credit => current.checked_add(new.amount)?,
            TransactionType::Debit => {
                if current < new.amount {
                    Err(StoreError::InsufficientFunds {
                        user_id: new.user_id.clone(),
                        balance: current,
                        requested: new.amount,
                    })?;
                }
                current.checked_sub(new.amount)?
            }
        };

        let transaction = new.into_committed(self.next_id());

        Ok(Prepared::Commit {
            transaction,
            balance,
        })
    }

    /// Appends a prepared transaction and moves the owner's balance to `balance`
    pub fn commit(&mut self, transaction: WalletTransaction, balance: Coins) -> usize {
        let index = self.history.len();

        if let Some(key) = transaction.idempotency_key.clone() {
            self.key_index
                .insert((transaction.user_id.clone(), key), index);
        }

        self.balances.insert(transaction.user_id.clone(), balance);
        self.history.push(transaction);

        index
    }

    pub fn find_by_key(
        &self,
        user_id: &UserId,
        key: Option<&IdempotencyKey>,
    ) -> Option<&WalletTransaction> {
        let key = key?;

        self.key_index
            .get(&(user_id.clone(), key.clone()))
            .and_then(|index| self.get_by_index(index))
    }

    pub fn get_by_index(&self, index: &usize) -> Option<&WalletTransaction> {
        self.history.get(*index)
    }

    pub fn balance(&self, user_id: &UserId) -> Coins {
        self.balances.get(user_id).copied().unwrap_or(Coins::ZERO)
    }

    /// Finds every transaction for a user, oldest first
    pub fn transactions_for(&self, user_id: &UserId) -> Vec<WalletTransaction> {
        self.history
            .iter()
            .filter(|tx| &tx.user_id == user_id)
            .cloned()
            .collect()
    }

    pub fn history(&self) -> &[WalletTransaction] {
        &self.history
    }

    /// Wallets sorted by user id, so snapshots are written deterministically
    pub fn wallets(&self) -> Vec<Wallet> {
        let mut wallets: Vec<Wallet> = self
            .balances
            .iter()
            .map(|(user_id, balance)| Wallet {
                user_id: user_id.clone(),
                balance: *balance,
            })
            .collect();

        wallets.sort_by(|a, b| a.user_id.cmp(&b.user_id));

        wallets
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn next_id(&self) -> TransactionId {
        self.history
            .last()
            .map(|tx| tx.id.next())
            .unwrap_or(TransactionId(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Utc;

    const SOME_AMOUNT: Coins = Coins(500);

    fn some_user() -> UserId {
        UserId::from("user-40")
    }

    fn other_user() -> UserId {
        UserId::from("user-41")
    }

    fn build_new(
        user_id: UserId,
        tx_type: TransactionType,
        amount: Coins,
        key: Option<&str>,
    ) -> NewTransaction {
        NewTransaction {
            user_id,
            tx_type,
            amount,
            reference: None,
            idempotency_key: key.map(IdempotencyKey::from),
            created_at: Utc::now(),
        }
    }

    fn apply(ledger: &mut Ledger, new: NewTransaction) -> Result<Prepared, StoreError> {
        let prepared = ledger.prepare(new)?;
        if let Prepared::Commit {
            transaction,
            balance,
        } = prepared.clone()
        {
            ledger.commit(transaction, balance);
        }
        Ok(prepared)
    }

    #[test]
    fn commit_assigns_sequential_ids() {
        let mut ledger = Ledger::new();

        apply(
            &mut ledger,
            build_new(some_user(), TransactionType::Credit, SOME_AMOUNT, None),
        )
        .unwrap();
        apply(
            &mut ledger,
            build_new(other_user(), TransactionType::Credit, SOME_AMOUNT, None),
        )
        .unwrap();

        let ids: Vec<TransactionId> = ledger.history().iter().map(|tx| tx.id).collect();
        assert_eq!(ids, vec![TransactionId(1), TransactionId(2)]);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn prepare_does_not_mutate() {
        let ledger = Ledger::new();

        let prepared = ledger
            .prepare(build_new(some_user(), TransactionType::Credit, SOME_AMOUNT, None))
            .unwrap();

        assert!(matches!(prepared, Prepared::Commit { balance, .. } if balance == SOME_AMOUNT));
        assert!(ledger.is_empty());
        assert_eq!(ledger.balance(&some_user()), Coins::ZERO);
    }

    #[test]
    fn duplicate_key_is_scoped_per_user() {
        let mut ledger = Ledger::new();

        apply(
            &mut ledger,
            build_new(some_user(), TransactionType::Credit, SOME_AMOUNT, Some("k1")),
        )
        .unwrap();

        let replay = apply(
            &mut ledger,
            build_new(some_user(), TransactionType::Credit, SOME_AMOUNT, Some("k1")),
        )
        .unwrap();
        assert!(matches!(replay, Prepared::Duplicate { balance, .. } if balance == SOME_AMOUNT));

        let other = apply(
            &mut ledger,
            build_new(other_user(), TransactionType::Credit, SOME_AMOUNT, Some("k1")),
        )
        .unwrap();
        assert!(matches!(other, Prepared::Commit { .. }));

        assert_eq!(ledger.balance(&some_user()), SOME_AMOUNT);
        assert_eq!(ledger.balance(&other_user()), SOME_AMOUNT);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn debit_beyond_balance_is_rejected() {
        let mut ledger = Ledger::new();

        apply(
            &mut ledger,
            build_new(some_user(), TransactionType::Credit, Coins(10), None),
        )
        .unwrap();

        let err = apply(
            &mut ledger,
            build_new(some_user(), TransactionType::Debit, Coins(11), None),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            StoreError::InsufficientFunds { balance, requested, .. }
                if balance == Coins(10) && requested == Coins(11)
        ));
        assert_eq!(ledger.balance(&some_user()), Coins(10));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn credit_overflow_is_rejected() {
        let mut ledger = Ledger::new();

        apply(
            &mut ledger,
            build_new(some_user(), TransactionType::Credit, Coins::MAX, None),
        )
        .unwrap();

        let err = apply(
            &mut ledger,
            build_new(some_user(), TransactionType::Credit, Coins(1), None),
        )
        .unwrap_err();

        assert!(matches!(err, StoreError::Coins(_)));
        assert_eq!(ledger.balance(&some_user()), Coins::MAX);
    }

    #[test]
    fn transactions_for() {
        let mut ledger = Ledger::new();

        assert!(ledger.transactions_for(&some_user()).is_empty());

        apply(
            &mut ledger,
            build_new(some_user(), TransactionType::Credit, SOME_AMOUNT, None),
        )
        .unwrap();
        apply(
            &mut ledger,
            build_new(other_user(), TransactionType::Credit, SOME_AMOUNT, None),
        )
        .unwrap();
        apply(
            &mut ledger,
            build_new(some_user(), TransactionType::Debit, Coins(1), None),
        )
        .unwrap();

        let ids: Vec<TransactionId> = ledger
            .transactions_for(&some_user())
            .iter()
            .map(|tx| tx.id)
            .collect();
        assert_eq!(ids, vec![TransactionId(1), TransactionId(3)]);
    }

    #[test]
    fn restore_rejects_duplicate_keys() {
        let first = build_new(some_user(), TransactionType::Credit, SOME_AMOUNT, Some("k1"))
            .into_committed(TransactionId(1));
        let second = build_new(some_user(), TransactionType::Credit, SOME_AMOUNT, Some("k1"))
            .into_committed(TransactionId(2));

        let err = Ledger::restore(vec![first, second], vec![]).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted(_)));
    }

    #[test]
    fn restore_rebuilds_balances_from_log() {
        let credit = build_new(some_user(), TransactionType::Credit, Coins(100), Some("k1"))
            .into_committed(TransactionId(7));
        let debit = build_new(some_user(), TransactionType::Debit, Coins(100), None)
            .into_committed(TransactionId(8));

        // snapshot written before the debit reached it
        let stale = Wallet {
            user_id: some_user(),
            balance: Coins(100),
        };
        let orphan = Wallet {
            user_id: other_user(),
            balance: Coins(5),
        };

        let mut ledger = Ledger::restore(vec![credit, debit], vec![stale, orphan]).unwrap();

        assert_eq!(ledger.balance(&some_user()), Coins::ZERO);
        assert_eq!(ledger.balance(&other_user()), Coins::ZERO);
        assert!(ledger
            .find_by_key(&some_user(), Some(&IdempotencyKey::from("k1")))
            .is_some());
        assert_eq!(ledger.next_id(), TransactionId(9));

        let err = apply(
            &mut ledger,
            build_new(some_user(), TransactionType::Debit, Coins(100), None),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds { .. }));
    }

    #[test]
    fn restore_rejects_log_below_zero() {
        let debit = build_new(some_user(), TransactionType::Debit, Coins(1), None)
            .into_committed(TransactionId(1));

        let err = Ledger::restore(vec![debit], vec![]).unwrap_err();
        assert!(matches!(err, StoreError::Corrupted(_)));
    }
}
