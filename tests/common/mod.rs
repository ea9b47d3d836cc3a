use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, Response},
    Router,
};
use orderflow_api::{
    config::AppConfig,
    db::{self, DbConfig},
    entities::product::ProductCategory,
    errors::ServiceError,
    events::{self, EventSender},
    gateway::{PaymentCode, PaymentGateway},
    handlers::AppServices,
    services::catalog::CreateProductRequest,
    AppState,
};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;

/// Payment gateway double: issues deterministic payment ids, can be switched
/// into failure mode to exercise checkout abort paths.
pub struct StubPaymentGateway {
    counter: AtomicU64,
    fail: AtomicBool,
}

impl StubPaymentGateway {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            fail: AtomicBool::new(false),
        }
    }

    #[allow(dead_code)]
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for StubPaymentGateway {
    async fn request_payment_code(&self, amount: Decimal) -> Result<PaymentCode, ServiceError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ServiceError::ExternalServiceError(
                "payment gateway unreachable: connection refused".to_string(),
            ));
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentCode {
            payment_id: format!("pay_{:03}", n),
            qr_code: format!("qr-payload-{:03}", n),
            amount,
        })
    }
}

/// Helper harness spinning up the application against an in-memory SQLite
/// database and a stub payment gateway.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub gateway: Arc<StubPaymentGateway>,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        // A single pooled connection keeps every query on the same in-memory
        // database.
        let db_cfg = DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool).await.expect("failed to create schema");

        let cfg = AppConfig::new(
            db_cfg.url.clone(),
            "http://gateway.invalid".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );

        let (event_tx, event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let gateway = Arc::new(StubPaymentGateway::new());

        let db_arc = Arc::new(pool);
        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            gateway.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };

        let router = Router::new()
            .merge(orderflow_api::base_routes())
            .nest("/api/v1", orderflow_api::api_v1_routes())
            .layer(axum::middleware::from_fn(
                orderflow_api::middleware_helpers::request_id::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            gateway,
            _event_task: event_task,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> Response<axum::body::Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("request"))
            .await
            .expect("response")
    }

    /// Seed a catalog product and return its id.
    pub async fn seed_product(&self, name: &str, unit_price: Decimal) -> i64 {
        let product = self
            .state
            .services
            .catalog
            .create_product(CreateProductRequest {
                name: name.to_string(),
                description: None,
                category: ProductCategory::Meal,
                unit_price,
            })
            .await
            .expect("seed product");
        product.id
    }
}

pub async fn response_json(response: Response<axum::body::Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    serde_json::from_slice(&bytes).expect("json response")
}
