//! Integration tests for order reads and the fulfillment status path.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;

async fn paid_order(app: &TestApp) -> i64 {
    let product_id = app.seed_product("Combo", dec!(25.00)).await;
    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "items": [{"product_id": product_id, "quantity": 1}]
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let order_id = body["data"]["order"]["id"].as_i64().unwrap();
    let payment_id = body["data"]["payment"]["payment_id"].as_str().unwrap().to_string();

    let status = app
        .request(
            Method::POST,
            "/api/v1/payments/notifications",
            Some(json!({"payment_id": payment_id, "status": "approved"})),
        )
        .await
        .status();
    assert_eq!(status, StatusCode::OK);

    order_id
}

async fn advance(app: &TestApp, order_id: i64, status: &str) -> StatusCode {
    app.request(
        Method::POST,
        &format!("/api/v1/orders/{}/status", order_id),
        Some(json!({"status": status})),
    )
    .await
    .status()
}

#[tokio::test]
async fn paid_order_walks_the_fulfillment_path() {
    let app = TestApp::new().await;
    let order_id = paid_order(&app).await;

    for status in ["in_preparation", "ready", "completed"] {
        assert_eq!(advance(&app, order_id, status).await, StatusCode::OK);
    }

    let response = app
        .request(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["data"]["status"], "completed");
}

#[tokio::test]
async fn skipping_a_fulfillment_step_is_rejected() {
    let app = TestApp::new().await;
    let order_id = paid_order(&app).await;

    assert_eq!(
        advance(&app, order_id, "ready").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        advance(&app, order_id, "completed").await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn settlement_statuses_cannot_be_set_through_the_status_endpoint() {
    let app = TestApp::new().await;
    let order_id = paid_order(&app).await;

    assert_eq!(
        advance(&app, order_id, "paid").await,
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        advance(&app, order_id, "payment_failed").await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn unknown_status_values_are_rejected() {
    let app = TestApp::new().await;
    let order_id = paid_order(&app).await;

    assert_eq!(
        advance(&app, order_id, "shipped").await,
        StatusCode::BAD_REQUEST
    );
}

#[tokio::test]
async fn completed_orders_cannot_be_cancelled() {
    let app = TestApp::new().await;
    let order_id = paid_order(&app).await;

    for status in ["in_preparation", "ready", "completed"] {
        assert_eq!(advance(&app, order_id, status).await, StatusCode::OK);
    }

    let response = app
        .request(
            Method::POST,
            &format!("/api/v1/orders/{}/cancel", order_id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn orders_are_addressable_by_id_and_by_code() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Shake", dec!(9.00)).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "items": [{"product_id": product_id, "quantity": 3}]
            })),
        )
        .await;
    let body = response_json(response).await;
    let order_id = body["data"]["order"]["id"].as_i64().unwrap();
    let order_code = body["data"]["order"]["order_code"].as_i64().unwrap();

    let by_id = response_json(
        app.request(Method::GET, &format!("/api/v1/orders/{}", order_id), None)
            .await,
    )
    .await;
    let by_code = response_json(
        app.request(
            Method::GET,
            &format!("/api/v1/orders/by-code/{}", order_code),
            None,
        )
        .await,
    )
    .await;

    assert_eq!(by_id["data"]["id"], by_code["data"]["id"]);
    assert_eq!(by_id["data"]["order_code"], by_code["data"]["order_code"]);
}

#[tokio::test]
async fn listing_returns_orders_newest_first_with_items() {
    let app = TestApp::new().await;
    let product_id = app.seed_product("Taco", dec!(6.00)).await;

    for quantity in 1..=3 {
        let response = app
            .request(
                Method::POST,
                "/api/v1/orders",
                Some(json!({
                    "items": [{"product_id": product_id, "quantity": quantity}]
                })),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = app
        .request(Method::GET, "/api/v1/orders?page=1&per_page=2", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;

    assert_eq!(body["data"]["total"], 3);
    let orders = body["data"]["orders"].as_array().unwrap();
    assert_eq!(orders.len(), 2);
    for order in orders {
        assert_eq!(order["items"].as_array().unwrap().len(), 1);
    }
}

#[tokio::test]
async fn missing_order_returns_not_found() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/orders/9999", None).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .request(Method::GET, "/api/v1/orders/by-code/9999", None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_endpoints_round_trip() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Brownie",
                "description": "warm, with ice cream",
                "category": "dessert",
                "unit_price": "7.50"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = response_json(response).await;
    let product_id = body["data"]["id"].as_i64().unwrap();
    assert_eq!(body["data"]["category"], "dessert");

    let response = app
        .request(Method::GET, &format!("/api/v1/products/{}", product_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .request(
            Method::POST,
            "/api/v1/products",
            Some(json!({
                "name": "Mystery",
                "category": "entree",
                "unit_price": "1.00"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
