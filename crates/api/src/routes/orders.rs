//! Order history endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::Order;
use history::{Cursor, OrderPage, SortKey};
use order_store::OrderStore;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::extract::Identity;
use crate::routes::cart::LineItemResponse;
use crate::state::AppState;

// -- Request types --

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub sort: Option<String>,
    pub cursor: Option<String>,
    pub page_size: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    pub sort: Option<String>,
}

// -- Response types --

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub owner_id: String,
    pub items: Vec<LineItemResponse>,
    pub total: String,
    pub item_count: u64,
    pub payment_reference: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id().to_string(),
            owner_id: order.owner_id().to_string(),
            items: order.items().iter().map(LineItemResponse::from).collect(),
            total: order.total().to_fixed2(),
            item_count: order.item_count(),
            payment_reference: order.payment_reference().to_string(),
            created_at: order.created_at(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OrderPageResponse {
    pub orders: Vec<OrderResponse>,
    pub sort: &'static str,
    /// Pass back as `cursor` to fetch the next page.
    pub next_cursor: Option<String>,
    pub has_more: bool,
}

impl OrderPageResponse {
    fn new(page: OrderPage, sort: SortKey) -> Self {
        Self {
            orders: page.orders.iter().map(OrderResponse::from).collect(),
            sort: sort.as_str(),
            next_cursor: page.cursor.map(|cursor| cursor.to_string()),
            has_more: page.has_more,
        }
    }
}

fn parse_sort(sort: Option<&str>) -> Result<SortKey, ApiError> {
    sort.map_or(Ok(SortKey::default()), |s| {
        s.parse().map_err(|e: order_store::OrderStoreError| ApiError::BadRequest(e.to_string()))
    })
}

// -- Handlers --

/// GET /orders: one page of the caller's order history.
#[tracing::instrument(skip(state, identity))]
pub async fn list<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<OrderPageResponse>, ApiError> {
    let owner = identity.require_owner()?;
    let sort = parse_sort(query.sort.as_deref())?;
    let cursor = query
        .cursor
        .as_deref()
        .map(str::parse::<Cursor>)
        .transpose()?;
    let page_size = query.page_size.unwrap_or(state.default_page_size);

    let page = state
        .history
        .page(owner, sort, cursor.as_ref(), page_size)
        .await?;

    Ok(Json(OrderPageResponse::new(page, sort)))
}

/// GET /orders/{id}: one of the caller's orders.
#[tracing::instrument(skip(state, identity))]
pub async fn get<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let owner = identity.require_owner()?;
    let order_id: OrderId = id
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))?;

    // Another owner's order is reported as missing.
    let order = state
        .history
        .order(owner, order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order not found: {id}")))?;

    Ok(Json(OrderResponse::from(&order)))
}

/// GET /admin/orders: every order across owners.
#[tracing::instrument(skip(state, identity))]
pub async fn admin_list<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    identity: Identity,
    Query(query): Query<AdminQuery>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    identity.require_admin()?;
    let sort = parse_sort(query.sort.as_deref())?;

    let orders = state.history.all_orders(sort).await?;

    Ok(Json(orders.iter().map(OrderResponse::from).collect()))
}
