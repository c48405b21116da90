use crate::ids::UserId;
use crate::models::{Wallet, WalletTransaction};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A wallet whose stored balance differs from the balance recomputed from the transaction log
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    pub user: UserId,
    /// Missing when the user has log entries but no wallet record
    pub stored: Option<u64>,
    pub computed: i128,
    pub difference: i128,
}

/// Recomputes every balance from the log and reports each user whose stored balance disagrees.
///
/// Users present in only one of the two inputs are compared against zero. The result is sorted by
/// user id.
pub fn reconcile(wallets: &[Wallet], transactions: &[WalletTransaction]) -> Vec<Mismatch> {
    let mut computed: BTreeMap<&UserId, i128> = BTreeMap::new();

    for tx in transactions {
        *computed.entry(&tx.user_id).or_insert(0) += tx.delta();
    }

    let stored: BTreeMap<&UserId, u64> = wallets
        .iter()
        .map(|wallet| (&wallet.user_id, wallet.balance.0))
        .collect();

    let mut users: Vec<&UserId> = computed.keys().chain(stored.keys()).copied().collect();
    users.sort();
    users.dedup();

    users
        .into_iter()
        .filter_map(|user| {
            let stored_balance = stored.get(user).copied();
            let computed_balance = computed.get(user).copied().unwrap_or(0);
            let difference = stored_balance.unwrap_or(0) as i128 - computed_balance;

            if stored_balance.is_some() && difference == 0 {
                return None;
            }

            if stored_balance.is_none() && computed_balance == 0 {
                // net-zero history without a wallet record has nothing to repair
                return None;
            }

            log::debug!(
                "Mismatch for {user}: stored {stored_balance:?}, computed {computed_balance}"
            );

            Some(Mismatch {
                user: user.clone(),
                stored: stored_balance,
                computed: computed_balance,
                difference,
            })
        })
        .collect()
}
