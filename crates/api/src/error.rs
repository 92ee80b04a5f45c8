//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use checkout::{CheckoutError, PreconditionError};
use history::HistoryError;
use order_store::OrderStoreError;
use serde_json::{Value, json};

/// Path the client calls to finish an order whose payment was captured.
pub const RETRY_COMMIT_PATH: &str = "/checkout/retry-commit";

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// No caller identity on a route that needs one.
    Unauthorized(String),
    /// The caller lacks the required role.
    Forbidden(String),
    /// Checkout failure.
    Checkout(CheckoutError),
    /// Order history read failure.
    History(HistoryError),
    /// Order store failure.
    Store(OrderStoreError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, error_body(msg)),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, error_body(msg)),
            ApiError::Checkout(err) => checkout_error_to_response(err),
            ApiError::History(err) => history_error_to_response(err),
            ApiError::Store(err) => store_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, error_body(msg))
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn error_body(message: impl Into<String>) -> Value {
    json!({ "error": message.into() })
}

fn checkout_error_to_response(err: CheckoutError) -> (StatusCode, Value) {
    let message = err.to_string();
    match &err {
        CheckoutError::Precondition(PreconditionError::MissingIdentity) => {
            (StatusCode::UNAUTHORIZED, error_body(message))
        }
        CheckoutError::Precondition(PreconditionError::EmptyCart) => {
            (StatusCode::BAD_REQUEST, error_body(message))
        }
        CheckoutError::Payment(_) => (StatusCode::PAYMENT_REQUIRED, error_body(message)),
        CheckoutError::Commit(commit) => {
            tracing::error!(
                payment_reference = %commit.pending().reference(),
                error = %commit.store_error(),
                "order commit failed after capture"
            );
            (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "error": message,
                    "payment_reference": commit.pending().reference(),
                    "retry": format!("POST {RETRY_COMMIT_PATH}"),
                }),
            )
        }
        CheckoutError::CommitPending { reference } => (
            StatusCode::CONFLICT,
            json!({
                "error": message,
                "payment_reference": reference,
                "retry": format!("POST {RETRY_COMMIT_PATH}"),
            }),
        ),
        CheckoutError::InProgress { .. }
        | CheckoutError::NotCancellable { .. }
        | CheckoutError::NothingToRetry => (StatusCode::CONFLICT, error_body(message)),
        CheckoutError::Domain(_) => (StatusCode::BAD_REQUEST, error_body(message)),
    }
}

fn history_error_to_response(err: HistoryError) -> (StatusCode, Value) {
    match err {
        HistoryError::InvalidCursor(_) => (StatusCode::BAD_REQUEST, error_body(err.to_string())),
        HistoryError::Store(store) => store_error_to_response(store),
    }
}

fn store_error_to_response(err: OrderStoreError) -> (StatusCode, Value) {
    match &err {
        OrderStoreError::InvalidOrder(_) => (StatusCode::BAD_REQUEST, error_body(err.to_string())),
        OrderStoreError::KeyConflict { .. } => (StatusCode::CONFLICT, error_body(err.to_string())),
        _ if err.is_transient() => {
            tracing::warn!(error = %err, "order store unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, error_body(err.to_string()))
        }
        _ => {
            tracing::error!(error = %err, "order store error");
            (StatusCode::INTERNAL_SERVER_ERROR, error_body(err.to_string()))
        }
    }
}

impl From<CheckoutError> for ApiError {
    fn from(err: CheckoutError) -> Self {
        ApiError::Checkout(err)
    }
}

impl From<HistoryError> for ApiError {
    fn from(err: HistoryError) -> Self {
        ApiError::History(err)
    }
}

impl From<OrderStoreError> for ApiError {
    fn from(err: OrderStoreError) -> Self {
        ApiError::Store(err)
    }
}
