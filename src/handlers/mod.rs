pub mod common;
pub mod orders;
pub mod payments;
pub mod products;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::gateway::PaymentGateway;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub catalog: Arc<crate::services::catalog::ProductCatalogService>,
    pub checkout: Arc<crate::services::checkout::CheckoutService>,
    pub orders: Arc<crate::services::orders::OrderService>,
    pub payments: Arc<crate::services::payments::PaymentService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        let catalog = Arc::new(crate::services::catalog::ProductCatalogService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let checkout = Arc::new(crate::services::checkout::CheckoutService::new(
            db_pool.clone(),
            event_sender.clone(),
            catalog.clone(),
            gateway,
        ));
        let orders = Arc::new(crate::services::orders::OrderService::new(
            db_pool.clone(),
            event_sender.clone(),
        ));
        let payments = Arc::new(crate::services::payments::PaymentService::new(
            db_pool,
            event_sender,
        ));

        Self {
            catalog,
            checkout,
            orders,
            payments,
        }
    }
}
