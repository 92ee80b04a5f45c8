//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use order_store::OrderStore;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub open_sessions: usize,
    pub payments_captured: usize,
}

/// GET /health: liveness plus session and payment counts.
pub async fn check<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        open_sessions: state.sessions.count().await,
        payments_captured: state.gateway.capture_count().await,
    })
}
