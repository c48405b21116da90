use std::fmt;

use serde::{Deserialize, Serialize};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoinsError {
    #[error("Overflow error while applying {0} operation on {1} and {2}")]
    Overflow(&'static str, Coins, Coins),

    #[error("Underflow error while applying {0} operation on {1} and {2}")]
    Underflow(&'static str, Coins, Coins),
}

/// Whole number of platform coins. Balances and amounts are never fractional or negative.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Coins(pub u64);

impl Coins {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    pub fn checked_add(self, other: Self) -> Result<Self, CoinsError> {
        self.0
            .checked_add(other.0)
            .map(Coins)
            .ok_or(CoinsError::Overflow("add", self, other))
    }

    pub fn checked_sub(self, other: Self) -> Result<Self, CoinsError> {
        self.0
            .checked_sub(other.0)
            .map(Coins)
            .ok_or(CoinsError::Underflow("sub", self, other))
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        return write!(f, "{}", self.0);
    }
}
