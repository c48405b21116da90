use crate::ids::UserId;
use crate::Coins;

use serde::{Deserialize, Serialize};

/// Cached balance projection for a user. The transaction log stays authoritative.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub user_id: UserId,
    pub balance: Coins,
}

impl Wallet {
    pub fn new(user_id: UserId) -> Self {
        return Self {
            user_id,
            balance: Coins::ZERO,
        };
    }
}
