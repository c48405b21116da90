use crate::ids::{IdempotencyKey, UserId, MAX_TOKEN_LEN};
use crate::Coins;

use serde::Deserialize;
use serde_json::Value;

use thiserror::Error;

/// Largest amount a single credit or debit may move
pub const MAX_AMOUNT: Coins = Coins(1_000_000_000);

/// Represents a credit or debit request body, as sent by clients and payment webhooks
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct WalletRequest {
    pub amount: Option<Value>,
    pub reference: Option<String>,
    pub idempotency_key: Option<String>,
}

/// A request that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRequest {
    pub amount: Coins,
    pub reference: Option<String>,
    pub idempotency_key: Option<IdempotencyKey>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputParseError {
    #[error("amount is required")]
    MissingAmount,

    #[error("amount must be a positive whole number of coins, got {0}")]
    InvalidAmount(String),

    #[error("amount must not exceed {}, got {0}", MAX_AMOUNT)]
    AmountTooLarge(u64),

    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("{0} must be at most {} characters", MAX_TOKEN_LEN)]
    TooLong(&'static str),
}

impl WalletRequest {
    pub fn parse_entry(self) -> Result<EntryRequest, InputParseError> {
        let amount = parse_amount(self.amount)?;

        let reference = self
            .reference
            .map(|reference| parse_token("reference", &reference))
            .transpose()?;

        let idempotency_key = self
            .idempotency_key
            .map(|key| parse_token("idempotencyKey", &key).map(IdempotencyKey))
            .transpose()?;

        Ok(EntryRequest {
            amount,
            reference,
            idempotency_key,
        })
    }
}

/// Validates the caller identity forwarded by the authentication gateway
pub fn parse_user_id(raw: &str) -> Result<UserId, InputParseError> {
    parse_token("user id", raw).map(UserId)
}

fn parse_amount(amount: Option<Value>) -> Result<Coins, InputParseError> {
    let amount = match amount {
        None | Some(Value::Null) => Err(InputParseError::MissingAmount)?,
        Some(amount) => amount,
    };

    // only JSON integers are accepted; `10.0` and `"10"` are both rejected
    let coins = amount
        .as_u64()
        .ok_or_else(|| InputParseError::InvalidAmount(amount.to_string()))?;

    if coins == 0 {
        Err(InputParseError::InvalidAmount(amount.to_string()))?;
    }

    if coins > MAX_AMOUNT.0 {
        Err(InputParseError::AmountTooLarge(coins))?;
    }

    Ok(Coins(coins))
}

fn parse_token(field: &'static str, raw: &str) -> Result<String, InputParseError> {
    let trimmed = raw.trim();

    if trimmed.is_empty() {
        Err(InputParseError::Empty(field))?;
    }

    if trimmed.chars().count() > MAX_TOKEN_LEN {
        Err(InputParseError::TooLong(field))?;
    }

    Ok(trimmed.to_string())
}
