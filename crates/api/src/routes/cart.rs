//! Cart endpoints for the caller's session.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use domain::{Cart, CartSnapshot, LineItem, ProductId, line_total};
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::SessionId;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Exactly one of `quantity` (absolute) or `delta` (relative) must be set.
#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: Option<i64>,
    pub delta: Option<i64>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct LineItemResponse {
    pub product_id: String,
    pub name: String,
    pub unit_price: String,
    pub quantity: u32,
    pub line_total: String,
}

impl From<&LineItem> for LineItemResponse {
    fn from(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id().to_string(),
            name: item.name().to_string(),
            unit_price: item.unit_price().to_fixed2(),
            quantity: item.quantity(),
            line_total: line_total(item).to_fixed2(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub items: Vec<LineItemResponse>,
    pub total: String,
    pub item_count: u64,
    pub distinct_count: usize,
}

impl From<&CartSnapshot> for CartResponse {
    fn from(snapshot: &CartSnapshot) -> Self {
        Self {
            items: snapshot.items().iter().map(LineItemResponse::from).collect(),
            total: snapshot.total().to_fixed2(),
            item_count: snapshot.item_count(),
            distinct_count: snapshot.len(),
        }
    }
}

/// Renders the session's cart. A session that was never opened has an empty cart.
async fn respond<S: OrderStore + Clone + 'static>(
    state: &AppState<S>,
    session: &SessionId,
) -> Json<CartResponse> {
    let snapshot = match state.sessions.get(&session.0).await {
        Some(coordinator) => coordinator.cart_snapshot().await,
        None => Cart::new().snapshot(),
    };
    Json(CartResponse::from(&snapshot))
}

fn record_mutation(op: &'static str) {
    metrics::counter!("cart_mutations_total", "op" => op).increment(1);
}

// -- Handlers --

/// GET /cart: the session's rows and derived totals.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    session: SessionId,
) -> Json<CartResponse> {
    respond(&state, &session).await
}

/// POST /cart/items: adds a catalog product, merging into an existing row.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    session: SessionId,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id = ProductId::new(req.product_id);
    let product = state
        .catalog
        .product(&product_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Product not found: {product_id}")))?;

    state
        .sessions
        .get_or_create(&session.0)
        .await
        .update_cart(|cart| cart.add(&product, req.quantity))
        .await;
    record_mutation("add");

    Ok(respond(&state, &session).await)
}

/// PATCH /cart/items/{id}: sets or steps a row's quantity.
#[tracing::instrument(skip(state, req))]
pub async fn update_item<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    session: SessionId,
    Path(id): Path<String>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let product_id = ProductId::new(id);
    let coordinator = state.sessions.get_or_create(&session.0).await;

    match (req.quantity, req.delta) {
        (Some(quantity), None) => {
            coordinator
                .update_cart(|cart| cart.set_quantity(&product_id, quantity))
                .await;
            record_mutation("set_quantity");
        }
        (None, Some(delta)) => {
            coordinator
                .update_cart(|cart| cart.adjust_quantity(&product_id, delta))
                .await;
            record_mutation("adjust_quantity");
        }
        _ => {
            return Err(ApiError::BadRequest(
                "Exactly one of quantity or delta is required".to_string(),
            ));
        }
    }

    Ok(respond(&state, &session).await)
}

/// DELETE /cart/items/{id}: removes a row.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    session: SessionId,
    Path(id): Path<String>,
) -> Json<CartResponse> {
    let product_id = ProductId::new(id);
    if let Some(coordinator) = state.sessions.get(&session.0).await {
        coordinator
            .update_cart(|cart| cart.remove(&product_id))
            .await;
        record_mutation("remove");
    }

    respond(&state, &session).await
}

/// DELETE /cart: empties the cart.
#[tracing::instrument(skip(state))]
pub async fn clear<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    session: SessionId,
) -> Json<CartResponse> {
    if let Some(coordinator) = state.sessions.get(&session.0).await {
        coordinator.update_cart(|cart| cart.clear()).await;
        record_mutation("clear");
    }

    respond(&state, &session).await
}

/// DELETE /cart/session: ends the session, dropping its cart and checkout state.
#[tracing::instrument(skip(state))]
pub async fn end_session<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    session: SessionId,
) -> Result<StatusCode, ApiError> {
    if state.sessions.end(&session.0).await? {
        metrics::counter!("sessions_ended_total").increment(1);
    }
    Ok(StatusCode::NO_CONTENT)
}
