//! Axum router and HTTP handlers for the wallet API.
//!
//! Every response body carries `success`. Failures add an `error` message. Validation and
//! business-rule failures are 400, a missing caller identity is 401, and storage failures are 500
//! with the detail only logged.

use crate::ids::UserId;
use crate::input::{self, EntryRequest, InputParseError, WalletRequest};
use crate::services::{LedgerError, WalletOutcome, WalletService};

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

/// Header set by the authentication gateway with the signed-in member's id
pub const USER_ID_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct AppState {
    pub service: WalletService,
}

pub fn router(service: WalletService) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health))
        .route("/api/wallet/credit", post(credit))
        .route("/api/wallet/debit", post(debit))
        .route("/api/wallet/balance", get(balance))
        .route("/api/wallet/transactions", get(transactions))
        .with_state(AppState { service })
        .layer(cors)
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(String),
    BadRequest(String),
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };

        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

impl From<InputParseError> for ApiError {
    fn from(err: InputParseError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::InsufficientFunds { .. } => ApiError::BadRequest(err.to_string()),
            LedgerError::Storage(e) => {
                log::error!("Wallet storage failure: {e:#}");
                ApiError::Internal
            }
        }
    }
}

/// The authenticated caller, read from `x-user-id`
pub struct Caller(pub UserId);

#[axum::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized(format!("missing {USER_ID_HEADER} header")))?;

        let user_id = input::parse_user_id(raw)
            .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

        Ok(Caller(user_id))
    }
}

/// `GET /api/health`
async fn health() -> Json<Value> {
    Json(json!({ "success": true }))
}

/// `POST /api/wallet/credit`
async fn credit(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    payload: Result<Json<WalletRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let entry = parse_payload(payload)?;

    let outcome = run_blocking(move || state.service.credit(&user_id, entry)).await?;

    Ok(outcome_body(outcome))
}

/// `POST /api/wallet/debit`
async fn debit(
    State(state): State<AppState>,
    Caller(user_id): Caller,
    payload: Result<Json<WalletRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let entry = parse_payload(payload)?;

    let outcome = run_blocking(move || state.service.debit(&user_id, entry)).await?;

    Ok(outcome_body(outcome))
}

/// `GET /api/wallet/balance`
async fn balance(
    State(state): State<AppState>,
    Caller(user_id): Caller,
) -> Result<Json<Value>, ApiError> {
    let balance = run_blocking(move || state.service.get_balance(&user_id)).await?;

    Ok(Json(json!({ "success": true, "balance": balance })))
}

/// `GET /api/wallet/transactions`
async fn transactions(
    State(state): State<AppState>,
    Caller(user_id): Caller,
) -> Result<Json<Value>, ApiError> {
    let transactions = run_blocking(move || state.service.history(&user_id)).await?;

    Ok(Json(json!({ "success": true, "transactions": transactions })))
}

fn parse_payload(payload: Result<Json<WalletRequest>, JsonRejection>) -> Result<EntryRequest, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        log::warn!("Malformed wallet request: {}", rejection.body_text());
        ApiError::from(rejection)
    })?;

    let entry = request.parse_entry().map_err(|e| {
        log::warn!("Invalid wallet request: {e}");
        ApiError::from(e)
    })?;

    Ok(entry)
}

fn outcome_body(outcome: WalletOutcome) -> Json<Value> {
    Json(json!({
        "success": true,
        "balance": outcome.balance,
        "replayed": outcome.replayed,
    }))
}

/// Runs a store call off the async workers, since a file-backed store holds its lock while syncing
/// to disk
async fn run_blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, LedgerError> + Send + 'static,
    T: Send + 'static,
{
    let value = tokio::task::spawn_blocking(f).await.map_err(|e| {
        log::error!("Wallet task failed: {e}");
        ApiError::Internal
    })??;

    Ok(value)
}
