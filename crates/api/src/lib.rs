//! HTTP API server for the storefront checkout core.
//!
//! Exposes the catalog listing, per-session carts, checkout and order
//! history as REST endpoints, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post};
use checkout::InMemoryPaymentGateway;
use domain::{Catalog, Category, Condition, DomainError, InMemoryCatalog, Money, Product};
use history::OrderHistoryReader;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use state::{AppState, SessionRegistry};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/products", get(routes::products::list::<S>))
        .route(
            "/cart",
            get(routes::cart::get::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/cart/session", delete(routes::cart::end_session::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/cart/items/{id}",
            delete(routes::cart::remove_item::<S>).patch(routes::cart::update_item::<S>),
        )
        .route(
            "/checkout",
            get(routes::checkout::status::<S>).post(routes::checkout::submit::<S>),
        )
        .route("/checkout/cancel", post(routes::checkout::cancel::<S>))
        .route(
            error::RETRY_COMMIT_PATH,
            post(routes::checkout::retry_commit::<S>),
        )
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/admin/orders", get(routes::orders::admin_list::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state over `store` with the given catalog.
pub fn create_state<S: OrderStore + Clone + 'static>(
    store: S,
    catalog: Arc<dyn Catalog>,
    config: &Config,
) -> Arc<AppState<S>> {
    let gateway = InMemoryPaymentGateway::new();
    let history =
        OrderHistoryReader::new(store.clone()).with_max_page_size(config.history_max_page_size);

    Arc::new(AppState {
        catalog,
        sessions: SessionRegistry::new(store, gateway.clone()),
        history,
        gateway,
        default_page_size: config.history_page_size,
    })
}

/// Creates the default application state: demo catalog and in-memory payments.
pub fn create_default_state<S: OrderStore + Clone + 'static>(
    store: S,
    config: &Config,
) -> Result<Arc<AppState<S>>, DomainError> {
    let catalog = InMemoryCatalog::with_products(demo_products()?);
    Ok(create_state(store, Arc::new(catalog), config))
}

/// A small catalog for local runs.
pub fn demo_products() -> Result<Vec<Product>, DomainError> {
    Ok(vec![
        Product::new(
            "ELEC-001",
            "Refurbished laptop",
            Money::from_cents(54999),
            Category::Electronics,
        )?
        .with_condition(Condition::Used),
        Product::new(
            "ELEC-002",
            "Wireless headphones",
            Money::from_cents(7950),
            Category::Electronics,
        )?
        .with_condition(Condition::New),
        Product::new(
            "DIG-001",
            "E-book bundle",
            Money::from_cents(1999),
            Category::Digital,
        )?,
        Product::new(
            "DIG-002",
            "Photo editing licence",
            Money::from_units(10),
            Category::Digital,
        )?,
    ])
}
