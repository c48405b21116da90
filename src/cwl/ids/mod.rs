mod idempotency_key;
mod transaction_id;
mod user_id;

pub use idempotency_key::IdempotencyKey;
pub use transaction_id::TransactionId;
pub use user_id::UserId;

/// Longest accepted user id, idempotency key, or reference
pub const MAX_TOKEN_LEN: usize = 256;
