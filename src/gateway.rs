use crate::errors::ServiceError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

/// A payment attempt initiated at the gateway: the gateway-issued payment id,
/// the scannable code payload, and the amount it settles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCode {
    #[serde(rename = "id")]
    pub payment_id: String,
    pub qr_code: String,
    pub amount: Decimal,
}

/// Client-side contract of the external payment gateway.
///
/// The gateway owns the payment's lifecycle; this interface only initiates a
/// payment and hands back the code to display. Settlement arrives later
/// through the inbound notification endpoint.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn request_payment_code(&self, amount: Decimal) -> Result<PaymentCode, ServiceError>;
}

#[derive(Debug, Serialize)]
struct PaymentCodeRequest {
    amount: Decimal,
}

/// HTTP implementation talking to the gateway's REST endpoint.
#[derive(Clone)]
pub struct HttpPaymentGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPaymentGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ServiceError::InternalError(format!("failed to build gateway HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    #[instrument(skip(self))]
    async fn request_payment_code(&self, amount: Decimal) -> Result<PaymentCode, ServiceError> {
        let url = format!("{}/payments/qrcode", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&PaymentCodeRequest { amount })
            .send()
            .await
            .map_err(|e| {
                error!(%amount, error = %e, "payment gateway request failed");
                ServiceError::ExternalServiceError(format!("payment gateway unreachable: {}", e))
            })?;

        if !response.status().is_success() {
            warn!(%amount, status = %response.status(), "payment gateway returned an error");
            return Err(ServiceError::ExternalServiceError(format!(
                "payment gateway returned status {}",
                response.status()
            )));
        }

        let code: PaymentCode = response.json().await.map_err(|e| {
            error!(error = %e, "payment gateway returned an unparsable body");
            ServiceError::ExternalServiceError(format!("invalid payment gateway response: {}", e))
        })?;

        if code.amount != amount {
            error!(
                requested = %amount,
                issued = %code.amount,
                payment_id = %code.payment_id,
                "payment gateway issued a code for a different amount"
            );
            return Err(ServiceError::ExternalServiceError(
                "payment gateway amount mismatch".to_string(),
            ));
        }

        info!(payment_id = %code.payment_id, %amount, "payment code issued");
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn issues_payment_code_for_requested_amount() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payments/qrcode"))
            .and(body_json(json!({"amount": "30.00"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pay_001",
                "qr_code": "00020126360014BR.GOV.BCB.PIX",
                "amount": "30.00"
            })))
            .mount(&server)
            .await;

        let gateway =
            HttpPaymentGateway::new(server.uri(), Duration::from_secs(2)).expect("client");
        let code = gateway.request_payment_code(dec!(30.00)).await.unwrap();

        assert_eq!(code.payment_id, "pay_001");
        assert_eq!(code.amount, dec!(30.00));
        assert!(!code.qr_code.is_empty());
    }

    #[tokio::test]
    async fn gateway_http_error_maps_to_external_service_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payments/qrcode"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let gateway =
            HttpPaymentGateway::new(server.uri(), Duration::from_secs(2)).expect("client");
        let err = gateway.request_payment_code(dec!(10.00)).await.unwrap_err();

        assert!(matches!(err, ServiceError::ExternalServiceError(_)));
    }

    #[tokio::test]
    async fn amount_mismatch_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/payments/qrcode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "pay_002",
                "qr_code": "payload",
                "amount": "9.99"
            })))
            .mount(&server)
            .await;

        let gateway =
            HttpPaymentGateway::new(server.uri(), Duration::from_secs(2)).expect("client");
        let err = gateway.request_payment_code(dec!(10.00)).await.unwrap_err();

        assert!(matches!(err, ServiceError::ExternalServiceError(_)));
    }
}
