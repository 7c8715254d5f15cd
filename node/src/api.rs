//! # REST API
//!
//! The axum router that exposes the escrow ledger and payment registry.
//! Mutating calls name their caller in the `x-caller` header; the node
//! trusts it the way a contract host trusts its transaction sender.
//!
//! ## Endpoints
//!
//! | Method | Path                         | Description                         |
//! |--------|------------------------------|-------------------------------------|
//! | GET    | `/health`                    | Liveness probe                      |
//! | GET    | `/escrow`                    | Escrow identity of this ledger      |
//! | POST   | `/transactions`              | Lock a new deposit                  |
//! | POST   | `/transactions/:id/release`  | Release a deposit (escrow only)     |
//! | GET    | `/transactions/:id`          | Deposit record                      |
//! | GET    | `/locks/:account`            | Locked balance, zero if none        |
//! | POST   | `/payments`                  | Record a payment                    |
//! | GET    | `/payments/:id`              | Payment record                      |

use axum::{
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use caution_contracts::{
    DepositRequest, EscrowError, EscrowLedger, PaymentError, PaymentRecord, PaymentRegistry,
    PaymentRequest, TransactionRecord,
};
use caution_protocol::config::CALLER_HEADER;
use caution_protocol::storage::CautionDB;
use caution_protocol::Amount;

use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
///
/// Cheap to clone: everything behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// The node's reported version string.
    pub version: String,
    pub ledger: Arc<EscrowLedger<CautionDB>>,
    pub payments: Arc<PaymentRegistry<CautionDB>>,
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Count a failed call and convert it for the response.
    fn rejected(&self, err: impl Into<ApiError>) -> ApiError {
        let err = err.into();
        self.metrics.reject(err.kind());
        err
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the full axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/escrow", get(escrow_handler))
        .route("/transactions", post(create_transaction_handler))
        .route("/transactions/:id", get(get_transaction_handler))
        .route("/transactions/:id/release", post(release_handler))
        .route("/locks/:account", get(locks_handler))
        .route("/payments", post(create_payment_handler))
        .route("/payments/:id", get(get_payment_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EscrowResponse {
    pub escrow: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReleaseRequest {
    pub refund_id: String,
}

/// A deposit record together with its key.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionResponse {
    pub transaction_id: String,
    #[serde(flatten)]
    pub record: TransactionRecord,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LockResponse {
    pub account: String,
    pub balance: Amount,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentResponse {
    pub payment_id: String,
    #[serde(flatten)]
    pub record: PaymentRecord,
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable error kind, e.g. `AlreadyRefunded`.
    pub kind: String,
    pub error: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Everything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    MissingCaller,
    NotFound(String),
    Escrow(EscrowError),
    Payment(PaymentError),
}

impl ApiError {
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::MissingCaller => "MissingCaller",
            ApiError::NotFound(_) => "NotFound",
            ApiError::Escrow(e) => e.kind(),
            ApiError::Payment(e) => e.kind(),
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCaller => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Escrow(e) => match e {
                EscrowError::InvalidSender(_)
                | EscrowError::InvalidTransactionId
                | EscrowError::InvalidAddress(_)
                | EscrowError::InvalidAssetType(_)
                | EscrowError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                EscrowError::UnauthorizedRelease { .. } => StatusCode::FORBIDDEN,
                EscrowError::TransactionNotFound(_) => StatusCode::NOT_FOUND,
                EscrowError::DuplicateTransactionId(_)
                | EscrowError::AlreadyRefunded(_)
                | EscrowError::AlreadyInitialized(_) => StatusCode::CONFLICT,
                EscrowError::NoLockedBalance(_)
                | EscrowError::InsufficientLockedBalance { .. }
                | EscrowError::AmountOverflow => StatusCode::UNPROCESSABLE_ENTITY,
                EscrowError::NotInitialized | EscrowError::Storage(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::Payment(e) => match e {
                PaymentError::InvalidPaymentId
                | PaymentError::InvalidParties { .. }
                | PaymentError::InvalidAmount(_)
                | PaymentError::InvalidRate(_) => StatusCode::BAD_REQUEST,
                PaymentError::PaymentIdAlreadyExists(_) => StatusCode::CONFLICT,
                PaymentError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::MissingCaller => write!(f, "missing {CALLER_HEADER} header"),
            ApiError::NotFound(what) => write!(f, "{what} not found"),
            ApiError::Escrow(e) => std::fmt::Display::fmt(e, f),
            ApiError::Payment(e) => std::fmt::Display::fmt(e, f),
        }
    }
}

impl From<EscrowError> for ApiError {
    fn from(e: EscrowError) -> Self {
        ApiError::Escrow(e)
    }
}

impl From<PaymentError> for ApiError {
    fn from(e: PaymentError) -> Self {
        ApiError::Payment(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(kind = self.kind(), "request failed: {}", self);
        }
        let body = ErrorResponse {
            kind: self.kind().to_string(),
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Caller identity from the request headers.
fn caller(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(CALLER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(ApiError::MissingCaller)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: returns 200 while the process is alive.
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: state.version.clone(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn escrow_handler(State(state): State<AppState>) -> Json<EscrowResponse> {
    Json(EscrowResponse {
        escrow: state.ledger.escrow_address().to_string(),
    })
}

/// `POST /transactions`: lock a deposit on behalf of the caller.
async fn create_transaction_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<DepositRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let caller = caller(&headers).map_err(|e| state.rejected(e))?;
    let _timer = state.metrics.ledger_call_latency_seconds.start_timer();

    let record = state
        .ledger
        .create_transaction(&caller, &req)
        .map_err(|e| state.rejected(e))?;
    state.metrics.deposits_created_total.inc();

    Ok((
        StatusCode::CREATED,
        Json(TransactionResponse {
            transaction_id: req.transaction_id,
            record,
        }),
    ))
}

/// `POST /transactions/:id/release`: the escrow hands a deposit back.
async fn release_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ReleaseRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    let caller = caller(&headers).map_err(|e| state.rejected(e))?;
    let _timer = state.metrics.ledger_call_latency_seconds.start_timer();

    let record = state
        .ledger
        .release_amount(&caller, &id, &req.refund_id)
        .map_err(|e| state.rejected(e))?;
    state.metrics.deposits_released_total.inc();

    Ok(Json(TransactionResponse {
        transaction_id: id,
        record,
    }))
}

async fn get_transaction_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TransactionResponse>, ApiError> {
    match state.ledger.get_transaction(&id)? {
        Some(record) => Ok(Json(TransactionResponse {
            transaction_id: id,
            record,
        })),
        None => Err(ApiError::NotFound(format!("transaction {id}"))),
    }
}

/// `GET /locks/:account`: accounts that never deposited report zero.
async fn locks_handler(
    State(state): State<AppState>,
    Path(account): Path<String>,
) -> Result<Json<LockResponse>, ApiError> {
    let balance = state
        .ledger
        .amount_locked(&account)?
        .map(|lock| lock.balance)
        .unwrap_or(Amount::ZERO);
    Ok(Json(LockResponse { account, balance }))
}

async fn create_payment_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let caller = caller(&headers).map_err(|e| state.rejected(e))?;
    let _timer = state.metrics.ledger_call_latency_seconds.start_timer();

    let record = state
        .payments
        .create_payment(&caller, &req)
        .map_err(|e| state.rejected(e))?;
    state.metrics.payments_recorded_total.inc();

    Ok((
        StatusCode::CREATED,
        Json(PaymentResponse {
            payment_id: req.payment_id,
            record,
        }),
    ))
}

async fn get_payment_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PaymentResponse>, ApiError> {
    match state.payments.get_payment(&id)? {
        Some(record) => Ok(Json(PaymentResponse {
            payment_id: id,
            record,
        })),
        None => Err(ApiError::NotFound(format!("payment {id}"))),
    }
}
