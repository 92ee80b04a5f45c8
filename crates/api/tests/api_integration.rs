//! Integration tests for the API server.

use std::sync::{Arc, OnceLock};

use api::config::Config;
use api::state::AppState;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use checkout::PaymentError;
use metrics_exporter_prometheus::PrometheusHandle;
use order_store::{FailureMode, InMemoryOrderStore};
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            metrics_exporter_prometheus::PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: Router,
    state: Arc<AppState<InMemoryOrderStore>>,
    store: InMemoryOrderStore,
}

fn setup() -> TestApp {
    let store = InMemoryOrderStore::new();
    let state = api::create_default_state(store.clone(), &Config::default()).unwrap();
    let app = api::create_app(state.clone(), get_metrics_handle());
    TestApp { app, state, store }
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    headers: &[(&str, &str)],
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

const SHOPPER: &[(&str, &str)] = &[("x-session-id", "s-1"), ("x-owner-id", "uid-1")];

/// Fills the shopper's cart with two units of the 10.00 licence.
async fn fill_cart(app: &Router, headers: &[(&str, &str)]) {
    let (status, _) = send(
        app,
        "POST",
        "/cart/items",
        headers,
        Some(json!({ "product_id": "DIG-002", "quantity": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();

    let (status, json) = send(&t.app, "GET", "/health", &[], None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["open_sessions"], 0);
    assert_eq!(json["payments_captured"], 0);

    fill_cart(&t.app, SHOPPER).await;
    let (status, _) = send(&t.app, "POST", "/checkout", SHOPPER, None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, json) = send(&t.app, "GET", "/health", &[], None).await;
    assert_eq!(json["open_sessions"], 1);
    assert_eq!(json["payments_captured"], 1);
}

#[tokio::test]
async fn test_list_products() {
    let t = setup();

    let (status, all) = send(&t.app, "GET", "/products", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 4);

    let (status, digital) = send(&t.app, "GET", "/products?category=digital", &[], None).await;
    assert_eq!(status, StatusCode::OK);
    let digital = digital.as_array().unwrap();
    assert_eq!(digital.len(), 2);
    assert!(digital.iter().all(|p| p["category"] == "Digital"));

    let (status, _) = send(&t.app, "GET", "/products?category=garden", &[], None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_requires_session() {
    let t = setup();

    let (status, json) = send(&t.app, "GET", "/cart", &[], None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("x-session-id"));
}

#[tokio::test]
async fn test_add_merges_rows_and_totals() {
    let t = setup();
    fill_cart(&t.app, SHOPPER).await;

    let (status, cart) = send(
        &t.app,
        "POST",
        "/cart/items",
        SHOPPER,
        Some(json!({ "product_id": "DIG-002" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);
    assert_eq!(cart["items"][0]["quantity"], 3);
    assert_eq!(cart["items"][0]["line_total"], "30.00");

    let (_, cart) = send(
        &t.app,
        "POST",
        "/cart/items",
        SHOPPER,
        Some(json!({ "product_id": "DIG-001", "quantity": 3 })),
    )
    .await;
    assert_eq!(cart["distinct_count"], 2);
    assert_eq!(cart["item_count"], 6);
    assert_eq!(cart["total"], "89.97");
}

#[tokio::test]
async fn test_add_unknown_product() {
    let t = setup();

    let (status, _) = send(
        &t.app,
        "POST",
        "/cart/items",
        SHOPPER,
        Some(json!({ "product_id": "NOPE" })),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_remove_and_clear() {
    let t = setup();
    fill_cart(&t.app, SHOPPER).await;

    let (status, cart) = send(
        &t.app,
        "PATCH",
        "/cart/items/DIG-002",
        SHOPPER,
        Some(json!({ "quantity": 0 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"][0]["quantity"], 1);

    let (_, cart) = send(
        &t.app,
        "PATCH",
        "/cart/items/DIG-002",
        SHOPPER,
        Some(json!({ "delta": 4 })),
    )
    .await;
    assert_eq!(cart["items"][0]["quantity"], 5);

    let (status, _) = send(
        &t.app,
        "PATCH",
        "/cart/items/DIG-002",
        SHOPPER,
        Some(json!({ "quantity": 2, "delta": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, cart) = send(&t.app, "DELETE", "/cart/items/DIG-002", SHOPPER, None).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);
    assert_eq!(cart["total"], "0.00");

    fill_cart(&t.app, SHOPPER).await;
    let (status, cart) = send(&t.app, "DELETE", "/cart", SHOPPER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["item_count"], 0);
}

#[tokio::test]
async fn test_sessions_have_separate_carts() {
    let t = setup();
    fill_cart(&t.app, SHOPPER).await;

    let (_, other) = send(&t.app, "GET", "/cart", &[("x-session-id", "s-2")], None).await;

    assert_eq!(other["items"].as_array().unwrap().len(), 0);
    assert_eq!(t.state.sessions.count().await, 1);
}

#[tokio::test]
async fn test_reads_do_not_open_sessions() {
    let t = setup();
    let visitor = &[("x-session-id", "s-9")];

    let (status, cart) = send(&t.app, "GET", "/cart", visitor, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["total"], "0.00");

    let (status, checkout) = send(&t.app, "GET", "/checkout", visitor, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(checkout["state"], "idle");

    let (status, _) = send(&t.app, "DELETE", "/cart", visitor, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&t.app, "DELETE", "/cart/items/DIG-001", visitor, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&t.app, "POST", "/checkout/cancel", visitor, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(&t.app, "POST", "/checkout/retry-commit", visitor, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(t.state.sessions.count().await, 0);
}

#[tokio::test]
async fn test_ending_session_shrinks_registry() {
    let t = setup();
    let other = &[("x-session-id", "s-2")];
    fill_cart(&t.app, SHOPPER).await;
    fill_cart(&t.app, other).await;
    assert_eq!(t.state.sessions.count().await, 2);

    let (status, _) = send(&t.app, "DELETE", "/cart/session", SHOPPER, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(t.state.sessions.count().await, 1);

    let (_, cart) = send(&t.app, "GET", "/cart", SHOPPER, None).await;
    assert_eq!(cart["item_count"], 0);
    let (_, cart) = send(&t.app, "GET", "/cart", other, None).await;
    assert_eq!(cart["item_count"], 2);

    // Ending a session that is not open is a no-op.
    let (status, _) = send(&t.app, "DELETE", "/cart/session", SHOPPER, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(t.state.sessions.count().await, 1);
}

#[tokio::test]
async fn test_session_with_pending_commit_cannot_end() {
    let t = setup();
    fill_cart(&t.app, SHOPPER).await;
    t.store.fail_next_create(FailureMode::BeforeWrite).await;

    let (status, _) = send(&t.app, "POST", "/checkout", SHOPPER, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, json) = send(&t.app, "DELETE", "/cart/session", SHOPPER, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["payment_reference"], "PAY-0001");
    assert_eq!(t.state.sessions.count().await, 1);

    let (status, _) = send(&t.app, "POST", "/checkout/retry-commit", SHOPPER, None).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&t.app, "DELETE", "/cart/session", SHOPPER, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(t.state.sessions.count().await, 0);
}

#[tokio::test]
async fn test_checkout_creates_order_and_empties_cart() {
    let t = setup();
    fill_cart(&t.app, SHOPPER).await;

    let (status, order) = send(&t.app, "POST", "/checkout", SHOPPER, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["total"], "20.00");
    assert_eq!(order["owner_id"], "uid-1");
    assert_eq!(order["item_count"], 2);
    assert_eq!(order["payment_reference"], "PAY-0001");

    let (_, cart) = send(&t.app, "GET", "/cart", SHOPPER, None).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 0);

    let (_, status_json) = send(&t.app, "GET", "/checkout", SHOPPER, None).await;
    assert_eq!(status_json["state"], "completed");
    assert_eq!(status_json["order_id"], order["id"]);

    assert_eq!(t.store.order_count().await, 1);
}

#[tokio::test]
async fn test_checkout_preconditions() {
    let t = setup();

    let (status, _) = send(&t.app, "POST", "/checkout", SHOPPER, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let anonymous = &[("x-session-id", "s-anon")];
    fill_cart(&t.app, anonymous).await;
    let (status, _) = send(&t.app, "POST", "/checkout", anonymous, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    assert_eq!(t.store.order_count().await, 0);
    assert_eq!(t.state.gateway.capture_calls().await, 0);
}

#[tokio::test]
async fn test_declined_payment_keeps_cart() {
    let t = setup();
    fill_cart(&t.app, SHOPPER).await;
    t.state
        .gateway
        .fail_next_capture(PaymentError::Declined("card declined".to_string()))
        .await;

    let (status, json) = send(&t.app, "POST", "/checkout", SHOPPER, None).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(json["error"].as_str().unwrap().contains("declined"));

    let (_, cart) = send(&t.app, "GET", "/cart", SHOPPER, None).await;
    assert_eq!(cart["total"], "20.00");
    assert_eq!(t.store.order_count().await, 0);
}

#[tokio::test]
async fn test_commit_failure_then_retry_commit() {
    let t = setup();
    fill_cart(&t.app, SHOPPER).await;
    t.store.fail_next_create(FailureMode::AfterWrite).await;

    let (status, json) = send(&t.app, "POST", "/checkout", SHOPPER, None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["payment_reference"], "PAY-0001");
    assert_eq!(json["retry"], "POST /checkout/retry-commit");

    // A new checkout must not charge again while the commit is pending.
    let (status, _) = send(&t.app, "POST", "/checkout", SHOPPER, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, order) = send(&t.app, "POST", "/checkout/retry-commit", SHOPPER, None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["payment_reference"], "PAY-0001");

    assert_eq!(t.store.order_count().await, 1);
    assert_eq!(t.state.gateway.capture_count().await, 1);

    let (status, _) = send(&t.app, "POST", "/checkout/retry-commit", SHOPPER, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_cancel_while_awaiting_payment() {
    let t = setup();
    fill_cart(&t.app, SHOPPER).await;
    t.state.gateway.hold_next_capture().await;

    let attempt = {
        let app = t.app.clone();
        tokio::spawn(async move { send(&app, "POST", "/checkout", SHOPPER, None).await })
    };
    t.state.gateway.wait_for_held_capture().await;

    let (status, _) = send(&t.app, "POST", "/checkout", SHOPPER, None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, json) = send(&t.app, "POST", "/checkout/cancel", SHOPPER, None).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(json["state"], "awaiting_payment");

    t.state.gateway.release_capture();
    let (status, _) = attempt.await.unwrap();
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    assert_eq!(t.store.order_count().await, 0);
    assert!(t.state.gateway.is_refunded("PAY-0001").await);

    let (status, _) = send(&t.app, "POST", "/checkout/cancel", SHOPPER, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_order_history_pages() {
    let t = setup();
    for _ in 0..3 {
        fill_cart(&t.app, SHOPPER).await;
        let (status, _) = send(&t.app, "POST", "/checkout", SHOPPER, None).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, first) = send(&t.app, "GET", "/orders?page_size=2", SHOPPER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["orders"].as_array().unwrap().len(), 2);
    assert_eq!(first["has_more"], true);
    assert_eq!(first["sort"], "recency");

    let cursor = first["next_cursor"].as_str().unwrap();
    let (status, second) = send(
        &t.app,
        "GET",
        &format!("/orders?page_size=2&cursor={cursor}"),
        SHOPPER,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let second_orders = second["orders"].as_array().unwrap();
    assert_eq!(second_orders.len(), 1);
    assert_eq!(second["has_more"], false);

    let first_ids: Vec<&Value> = first["orders"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| &o["id"])
        .collect();
    assert!(!first_ids.contains(&&second_orders[0]["id"]));
}

#[tokio::test]
async fn test_order_history_rejects_bad_input() {
    let t = setup();

    let (status, _) = send(&t.app, "GET", "/orders", &[("x-session-id", "s-1")], None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&t.app, "GET", "/orders?cursor=garbage", SHOPPER, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&t.app, "GET", "/orders?sort=price", SHOPPER, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_order_is_owner_scoped() {
    let t = setup();
    fill_cart(&t.app, SHOPPER).await;
    let (_, order) = send(&t.app, "POST", "/checkout", SHOPPER, None).await;
    let uri = format!("/orders/{}", order["id"].as_str().unwrap());

    let (status, fetched) = send(&t.app, "GET", &uri, SHOPPER, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], order["id"]);

    let stranger = &[("x-owner-id", "uid-2")];
    let (status, _) = send(&t.app, "GET", &uri, stranger, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&t.app, "GET", "/orders/not-a-uuid", SHOPPER, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_listing_requires_role() {
    let t = setup();
    fill_cart(&t.app, SHOPPER).await;
    send(&t.app, "POST", "/checkout", SHOPPER, None).await;

    let other = &[("x-session-id", "s-2"), ("x-owner-id", "uid-2")];
    fill_cart(&t.app, other).await;
    send(&t.app, "POST", "/checkout", other, None).await;

    let (status, _) = send(&t.app, "GET", "/admin/orders", SHOPPER, None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = &[("x-owner-id", "admin-1"), ("x-role", "admin")];
    let (status, orders) = send(&t.app, "GET", "/admin/orders", admin, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(orders.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup();
    fill_cart(&t.app, SHOPPER).await;
    send(&t.app, "POST", "/checkout", SHOPPER, None).await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("checkout_attempts_total"));
    assert!(text.contains("cart_mutations_total"));
}
