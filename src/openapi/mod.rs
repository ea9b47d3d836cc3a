use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Orderflow API",
        version = "0.2.0",
        description = r#"
# Orderflow API

Order lifecycle and payment settlement for a self-service storefront.

## Flow

1. Register catalog products.
2. `POST /api/v1/orders` creates an order, requests a scannable payment code
   from the payment gateway and returns both; the order is persisted as
   `payment_pending`.
3. The gateway later reports settlement through
   `POST /api/v1/payments/notifications`; the order advances to `paid` or
   `payment_failed`. Duplicate notifications are acknowledged without effect.
4. Clients poll `GET /api/v1/payments/status/{order_code}` until settlement,
   then the kitchen advances the order through `in_preparation`, `ready` and
   `completed`.

## Error Handling

Errors use a consistent JSON shape with appropriate HTTP status codes:

```json
{
  "error": "Not Found",
  "message": "Order with code 1042 not found",
  "request_id": "req-abc123",
  "timestamp": "2026-08-07T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Orders", description = "Checkout and order lifecycle endpoints"),
        (name = "Payments", description = "Settlement notifications and status views"),
        (name = "Products", description = "Catalog management endpoints")
    ),
    paths(
        // Orders
        crate::handlers::orders::create_order,
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::get_order_by_code,
        crate::handlers::orders::update_order_status,
        crate::handlers::orders::cancel_order,

        // Payments
        crate::handlers::payments::payment_notification,
        crate::handlers::payments::get_payment_status,

        // Products
        crate::handlers::products::create_product,
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,
            crate::PaginatedResponse<serde_json::Value>,
            crate::HealthStatus,

            // Order types
            crate::services::checkout::CheckoutRequest,
            crate::services::checkout::CheckoutItemRequest,
            crate::services::checkout::CheckoutResponse,
            crate::services::checkout::PaymentCodeView,
            crate::services::orders::OrderResponse,
            crate::services::orders::OrderItemView,
            crate::services::orders::OrderListResponse,
            crate::handlers::orders::UpdateOrderStatusRequest,

            // Payment types
            crate::handlers::payments::PaymentNotificationRequest,
            crate::services::payments::PaymentStatusView,
            crate::services::payments::ReconciliationOutcome,

            // Product types
            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::ProductResponse,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
