use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use super::common::PaginationParams;
use crate::entities::order::OrderStatus;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::checkout::{CheckoutRequest, CheckoutResponse};
use crate::services::orders::{OrderListResponse, OrderResponse};
use crate::ApiResponse;

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({"status": "in_preparation"}))]
pub struct UpdateOrderStatusRequest {
    /// Target status; must be a legal transition from the current one
    #[validate(length(min = 1, message = "status is required"))]
    #[schema(example = "in_preparation")]
    pub status: String,
}

/// Create an order and initiate its payment
///
/// Resolves the requested items against the catalog, requests a payment code
/// from the gateway and persists the order only once payment initiation has
/// succeeded. Returns the order together with the code to display.
#[utoipa::path(
    post,
    path = "/api/v1/orders",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Order created and payment initiated", body = crate::ApiResponse<CheckoutResponse>),
        (status = 400, description = "Invalid items", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment gateway unavailable; safe to retry", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CheckoutResponse>>), ServiceError> {
    let response = state.services.checkout.checkout(request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(response))))
}

/// List orders
#[utoipa::path(
    get,
    path = "/api/v1/orders",
    params(PaginationParams),
    responses(
        (status = 200, description = "Orders, newest first", body = crate::ApiResponse<OrderListResponse>)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<OrderListResponse>>, ServiceError> {
    let (page, per_page) = params.normalized();
    let response = state.services.orders.list_orders(page, per_page).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Get an order by internal id
#[utoipa::path(
    get,
    path = "/api/v1/orders/{id}",
    params(("id" = i64, Path, description = "Internal order id")),
    responses(
        (status = 200, description = "Order details", body = crate::ApiResponse<OrderResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let response = state.services.orders.get_order(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Get an order by its externally visible code
#[utoipa::path(
    get,
    path = "/api/v1/orders/by-code/{code}",
    params(("code" = i64, Path, description = "Externally visible order code")),
    responses(
        (status = 200, description = "Order details", body = crate::ApiResponse<OrderResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn get_order_by_code(
    State(state): State<AppState>,
    Path(code): Path<i64>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let response = state.services.orders.get_order_by_code(code).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Advance an order's status
///
/// Only forward moves along the fulfillment path are accepted; settlement
/// transitions (`paid`, `payment_failed`) belong to the payment reconciler
/// and are rejected here.
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/status",
    params(("id" = i64, Path, description = "Internal order id")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = crate::ApiResponse<OrderResponse>),
        (status = 400, description = "Illegal transition", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Concurrent modification", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    request.validate()?;

    let new_status = OrderStatus::from_str(request.status.trim()).map_err(|_| {
        ServiceError::InvalidStatus(format!("Unknown order status: {}", request.status))
    })?;

    // Settlement is driven by gateway notifications, not by this endpoint.
    if matches!(
        new_status,
        OrderStatus::Paid | OrderStatus::PaymentFailed
    ) {
        return Err(ServiceError::InvalidOperation(format!(
            "status '{}' is set by payment reconciliation",
            new_status
        )));
    }

    let response = state
        .services
        .orders
        .update_order_status(id, new_status)
        .await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Cancel an order
#[utoipa::path(
    post,
    path = "/api/v1/orders/{id}/cancel",
    params(("id" = i64, Path, description = "Internal order id")),
    responses(
        (status = 200, description = "Order cancelled", body = crate::ApiResponse<OrderResponse>),
        (status = 400, description = "Order can no longer be cancelled", body = crate::errors::ErrorResponse),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Orders"
)]
pub async fn cancel_order(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<OrderResponse>>, ServiceError> {
    let response = state.services.orders.cancel_order(id).await?;
    Ok(Json(ApiResponse::success(response)))
}

/// Order routes
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_order))
        .route("/", get(list_orders))
        .route("/:id", get(get_order))
        .route("/by-code/:code", get(get_order_by_code))
        .route("/:id/status", post(update_order_status))
        .route("/:id/cancel", post(cancel_order))
}
