use crate::ids::{IdempotencyKey, TransactionId, UserId};
use crate::Coins;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TransactionType::Credit => write!(f, "credit"),
            TransactionType::Debit => write!(f, "debit"),
        }
    }
}

/// A committed entry of the ledger. Written once, never mutated or deleted.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WalletTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub amount: Coins,
    pub reference: Option<String>,
    pub idempotency_key: Option<IdempotencyKey>,
    pub created_at: DateTime<Utc>,
}

impl WalletTransaction {
    /// Signed effect of this entry on the owner's balance
    pub fn delta(&self) -> i128 {
        match self.tx_type {
            TransactionType::Credit => self.amount.0 as i128,
            TransactionType::Debit => -(self.amount.0 as i128),
        }
    }
}

/// A validated request to append to the ledger; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub user_id: UserId,
    pub tx_type: TransactionType,
    pub amount: Coins,
    pub reference: Option<String>,
    pub idempotency_key: Option<IdempotencyKey>,
    pub created_at: DateTime<Utc>,
}

impl NewTransaction {
    pub fn into_committed(self, id: TransactionId) -> WalletTransaction {
        return WalletTransaction {
            id,
            user_id: self.user_id,
            tx_type: self.tx_type,
            amount: self.amount,
            reference: self.reference,
            idempotency_key: self.idempotency_key,
            created_at: self.created_at,
        };
    }
}
