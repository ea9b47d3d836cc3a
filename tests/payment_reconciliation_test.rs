//! Integration tests for settlement reconciliation: terminal-once
//! transitions, idempotent duplicate absorption, first-terminal-wins over
//! late conflicting deliveries, and conflict handling against orders that
//! moved on.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

/// Runs a checkout and returns (order_id, order_code, payment_id).
async fn checkout(app: &TestApp) -> (i64, i64, String) {
    let product_id = app.seed_product("Cheeseburger", dec!(15.00)).await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "items": [{"product_id": product_id, "quantity": 2}]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    (
        body["data"]["order"]["id"].as_i64().unwrap(),
        body["data"]["order"]["order_code"].as_i64().unwrap(),
        body["data"]["payment"]["payment_id"]
            .as_str()
            .unwrap()
            .to_string(),
    )
}

async fn notify(app: &TestApp, payment_id: &str, status: &str) -> StatusCode {
    app.request(
        Method::POST,
        "/api/v1/payments/notifications",
        Some(json!({"payment_id": payment_id, "status": status})),
    )
    .await
    .status()
}

async fn status_view(app: &TestApp, order_code: i64) -> serde_json::Value {
    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/payments/status/{}", order_code),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await
}

#[tokio::test]
async fn approved_notification_settles_payment_and_marks_order_paid() {
    let app = TestApp::new().await;
    let (_, order_code, payment_id) = checkout(&app).await;

    let before = status_view(&app, order_code).await;
    assert_eq!(before["data"]["order_status"], "payment_pending");
    assert_eq!(before["data"]["payment_status"], "pending");

    assert_eq!(notify(&app, &payment_id, "approved").await, StatusCode::OK);

    let after = status_view(&app, order_code).await;
    assert_eq!(after["data"]["order_status"], "paid");
    assert_eq!(after["data"]["payment_status"], "approved");
}

#[tokio::test]
async fn rejected_notification_fails_the_order() {
    let app = TestApp::new().await;
    let (_, order_code, payment_id) = checkout(&app).await;

    assert_eq!(notify(&app, &payment_id, "rejected").await, StatusCode::OK);

    let view = status_view(&app, order_code).await;
    assert_eq!(view["data"]["order_status"], "payment_failed");
    assert_eq!(view["data"]["payment_status"], "rejected");
}

#[tokio::test]
async fn duplicate_terminal_notification_is_a_successful_no_op() {
    let app = TestApp::new().await;
    let (_, order_code, payment_id) = checkout(&app).await;

    assert_eq!(notify(&app, &payment_id, "approved").await, StatusCode::OK);

    // Redelivery reports success without re-advancing the order
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/notifications",
            Some(json!({"payment_id": payment_id, "status": "approved"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["data"], "already_settled");

    let view = status_view(&app, order_code).await;
    assert_eq!(view["data"]["order_status"], "paid");
}

#[tokio::test]
async fn late_conflicting_rejection_is_absorbed_after_approval() {
    let app = TestApp::new().await;
    let (_, order_code, payment_id) = checkout(&app).await;

    assert_eq!(notify(&app, &payment_id, "approved").await, StatusCode::OK);

    // First terminal status wins; the stale rejection changes nothing
    assert_eq!(notify(&app, &payment_id, "rejected").await, StatusCode::OK);

    let view = status_view(&app, order_code).await;
    assert_eq!(view["data"]["order_status"], "paid");
    assert_eq!(view["data"]["payment_status"], "approved");
}

#[tokio::test]
async fn unknown_payment_id_is_rejected_without_state_change() {
    let app = TestApp::new().await;
    let (_, order_code, _) = checkout(&app).await;

    assert_eq!(
        notify(&app, "pay_does_not_exist", "approved").await,
        StatusCode::NOT_FOUND
    );

    let view = status_view(&app, order_code).await;
    assert_eq!(view["data"]["order_status"], "payment_pending");
    assert_eq!(view["data"]["payment_status"], "pending");
}

#[tokio::test]
async fn structurally_invalid_notifications_get_client_errors() {
    let app = TestApp::new().await;

    let status = notify(&app, "  ", "approved").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let status = notify(&app, "pay_001", "refunded").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/notifications",
            Some(json!({"unexpected": true})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn settlement_for_cancelled_order_is_acknowledged_but_not_applied() {
    let app = TestApp::new().await;
    let (order_id, order_code, payment_id) = checkout(&app).await;

    // The customer cancels while settlement is in flight
    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/cancel", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // The gateway still reports approval; the anomaly is acknowledged so the
    // gateway stops retrying, but neither row changes.
    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/notifications",
            Some(json!({"payment_id": payment_id, "status": "approved"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["success"], false);

    let view = status_view(&app, order_code).await;
    assert_eq!(view["data"]["order_status"], "cancelled");
    assert_eq!(view["data"]["payment_status"], "pending");
}

#[tokio::test]
async fn status_query_for_unknown_code_returns_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/payments/status/424242", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
