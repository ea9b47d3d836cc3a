use axum::{
    body::Bytes,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::Sha256;
use std::str::FromStr;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::entities::payment::PaymentStatus;
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::payments::{PaymentStatusView, ReconciliationOutcome};
use crate::ApiResponse;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({"payment_id": "pay_001", "status": "approved"}))]
pub struct PaymentNotificationRequest {
    /// Gateway-issued payment id
    #[schema(example = "pay_001")]
    pub payment_id: String,
    /// Settlement result: "approved" or "rejected"
    #[schema(example = "approved")]
    pub status: String,
}

/// Inbound settlement notification from the payment gateway
///
/// Repeated deliveries for a settled payment are acknowledged without effect,
/// so the gateway can retry freely. A notification that conflicts with the
/// order's current state is logged for operators and still acknowledged;
/// retrying cannot change the conflicting fact.
#[utoipa::path(
    post,
    path = "/api/v1/payments/notifications",
    request_body = PaymentNotificationRequest,
    responses(
        (status = 200, description = "Notification processed (or absorbed as a no-op)", body = crate::ApiResponse<ReconciliationOutcome>),
        (status = 400, description = "Structurally invalid notification", body = crate::errors::ErrorResponse),
        (status = 401, description = "Invalid signature", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown payment id", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn payment_notification(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<ReconciliationOutcome>>, ServiceError> {
    // Verify signature if a shared secret is configured
    if let Some(secret) = state.config.payment_webhook_secret.clone() {
        let tolerance = state.config.payment_webhook_tolerance_secs.unwrap_or(300);
        if !verify_signature(&headers, &body, &secret, tolerance) {
            warn!("payment notification signature verification failed");
            return Err(ServiceError::Unauthorized(
                "invalid notification signature".to_string(),
            ));
        }
    }

    let request: PaymentNotificationRequest = serde_json::from_slice(&body)
        .map_err(|e| ServiceError::BadRequest(format!("invalid json: {}", e)))?;

    let payment_id = request.payment_id.trim();
    if payment_id.is_empty() {
        return Err(ServiceError::BadRequest(
            "payment_id must not be empty".to_string(),
        ));
    }

    let reported = PaymentStatus::from_str(request.status.trim().to_ascii_lowercase().as_str())
        .ok()
        .filter(|status| status.is_terminal())
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "status must be 'approved' or 'rejected', got '{}'",
                request.status
            ))
        })?;

    match state.services.payments.apply_status(payment_id, reported).await {
        Ok(outcome) => {
            info!(%payment_id, ?outcome, "payment notification handled");
            Ok(Json(ApiResponse::success(outcome)))
        }
        Err(ServiceError::Conflict(message)) => {
            // Acknowledge anyway: the gateway retrying cannot resolve a
            // business conflict, it needs an operator.
            warn!(%payment_id, %message, "settlement conflicts with order state; flagged for review");
            Ok(Json(ApiResponse::error(message)))
        }
        Err(other) => Err(other),
    }
}

/// Combined order/payment status by order code
#[utoipa::path(
    get,
    path = "/api/v1/payments/status/{order_code}",
    params(("order_code" = i64, Path, description = "Externally visible order code")),
    responses(
        (status = 200, description = "Combined status view", body = crate::ApiResponse<PaymentStatusView>),
        (status = 404, description = "Unknown order code", body = crate::errors::ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn get_payment_status(
    State(state): State<AppState>,
    Path(order_code): Path<i64>,
) -> Result<Json<ApiResponse<PaymentStatusView>>, ServiceError> {
    let view = state.services.payments.payment_status(order_code).await?;
    Ok(Json(ApiResponse::success(view)))
}

/// Payment routes
pub fn payment_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", post(payment_notification))
        .route("/status/:order_code", get(get_payment_status))
}

fn verify_signature(headers: &HeaderMap, payload: &Bytes, secret: &str, tolerance_secs: u64) -> bool {
    // Generic HMAC over "{timestamp}.{body}" with x-timestamp and x-signature headers
    if let (Some(ts), Some(sig)) = (headers.get("x-timestamp"), headers.get("x-signature")) {
        if let (Ok(ts), Ok(sig)) = (ts.to_str(), sig.to_str()) {
            if let Ok(ts_i) = ts.parse::<i64>() {
                let now = chrono::Utc::now().timestamp();
                if (now - ts_i).unsigned_abs() > tolerance_secs {
                    return false;
                }
            }
            let signed = format!("{}.{}", ts, std::str::from_utf8(payload).unwrap_or(""));
            let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
                Ok(mac) => mac,
                Err(_) => return false,
            };
            mac.update(signed.as_bytes());
            let expected = hex::encode(mac.finalize().into_bytes());
            return constant_time_eq(&expected, sig);
        }
    }
    false
}

fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut res = 0u8;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes()) {
        res |= x ^ y;
    }
    res == 0
}
