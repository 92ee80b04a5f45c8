//! Checkout endpoints for the caller's session.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use checkout::{CheckoutError, CheckoutState, CheckoutStatus};
use order_store::OrderStore;
use serde::Serialize;

use crate::error::ApiError;
use crate::extract::{Identity, SessionId};
use crate::routes::orders::OrderResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CheckoutStatusResponse {
    pub state: &'static str,
    pub idempotency_key: Option<String>,
    pub order_id: Option<String>,
    pub pending_reference: Option<String>,
    pub last_error: Option<String>,
}

impl From<CheckoutStatus> for CheckoutStatusResponse {
    fn from(status: CheckoutStatus) -> Self {
        Self {
            state: status.state.as_str(),
            idempotency_key: status.idempotency_key.map(|key| key.to_string()),
            order_id: status.order_id.map(|id| id.to_string()),
            pending_reference: status.pending_reference,
            last_error: status.last_error,
        }
    }
}

/// POST /checkout: captures the cart total and records the order.
#[tracing::instrument(skip(state, identity))]
pub async fn submit<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    session: SessionId,
    identity: Identity,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let coordinator = state.sessions.get_or_create(&session.0).await;
    let order = coordinator.checkout(identity.owner).await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// POST /checkout/cancel: abandons an attempt that is awaiting payment.
#[tracing::instrument(skip(state))]
pub async fn cancel<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    session: SessionId,
) -> Result<(StatusCode, Json<CheckoutStatusResponse>), ApiError> {
    let coordinator = state
        .sessions
        .get(&session.0)
        .await
        .ok_or(CheckoutError::NotCancellable {
            state: CheckoutState::Idle,
        })?;
    coordinator.cancel().await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(CheckoutStatusResponse::from(coordinator.status().await)),
    ))
}

/// POST /checkout/retry-commit: records the order for an already captured payment.
#[tracing::instrument(skip(state))]
pub async fn retry_commit<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    session: SessionId,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let coordinator = state
        .sessions
        .get(&session.0)
        .await
        .ok_or(CheckoutError::NothingToRetry)?;
    let order = coordinator.retry_commit().await?;

    Ok((StatusCode::CREATED, Json(OrderResponse::from(&order))))
}

/// GET /checkout: the session's latest checkout state.
#[tracing::instrument(skip(state))]
pub async fn status<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    session: SessionId,
) -> Json<CheckoutStatusResponse> {
    let status = match state.sessions.get(&session.0).await {
        Some(coordinator) => coordinator.status().await,
        None => CheckoutStatus::default(),
    };
    Json(CheckoutStatusResponse::from(status))
}
