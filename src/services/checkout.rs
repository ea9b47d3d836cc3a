use crate::{
    db::{self, DbPool, ORDER_CODE_SEQUENCE},
    entities::order::{self, OrderStatus},
    entities::order_item,
    entities::payment::{self, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    gateway::PaymentGateway,
    services::catalog::ProductCatalogService,
    services::orders::OrderResponse,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutItemRequest {
    pub product_id: i64,
    #[schema(example = 2, minimum = 1)]
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CheckoutRequest {
    /// Opaque customer reference; omit for anonymous orders.
    pub customer_ref: Option<String>,
    #[validate(length(min = 1, message = "An order needs at least one item"))]
    pub items: Vec<CheckoutItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentCodeView {
    pub payment_id: String,
    pub qr_code: String,
    #[schema(value_type = String, example = "30.00")]
    pub amount: Decimal,
    #[schema(value_type = String, example = "pending")]
    pub status: PaymentStatus,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub payment: PaymentCodeView,
}

/// Builds an order from requested items, initiates its payment at the
/// gateway, and persists both in one transaction.
///
/// The gateway call happens before the transaction opens: a slow or failing
/// gateway must never hold database locks, and a failed call must leave
/// nothing behind.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    catalog: Arc<ProductCatalogService>,
    gateway: Arc<dyn PaymentGateway>,
}

impl CheckoutService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        catalog: Arc<ProductCatalogService>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Self {
        Self {
            db,
            event_sender,
            catalog,
            gateway,
        }
    }

    #[instrument(skip(self, request), fields(item_count = request.items.len()))]
    pub async fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutResponse, ServiceError> {
        request.validate()?;

        for item in &request.items {
            if item.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "quantity for product {} must be at least 1",
                    item.product_id
                )));
            }
        }

        // Resolve every product up front; one unknown id fails the whole
        // checkout before anything is persisted.
        let mut resolved = Vec::with_capacity(request.items.len());
        for item in &request.items {
            let product = self.catalog.get_product(item.product_id).await?;
            resolved.push((product, item.quantity));
        }

        let total: Decimal = resolved
            .iter()
            .map(|(product, quantity)| product.unit_price * Decimal::from(*quantity))
            .sum();

        // Initiate the payment first. No order exists yet, so a gateway
        // failure needs no compensation.
        let payment_code = self.gateway.request_payment_code(total).await.map_err(|e| {
            error!(%total, error = %e, "payment initiation failed; aborting checkout");
            e
        })?;

        let now = Utc::now();
        let txn = self.db.begin().await?;

        let order_code = db::next_sequence(&txn, ORDER_CODE_SEQUENCE).await?;

        let order_model = order::ActiveModel {
            order_code: Set(order_code),
            customer_ref: Set(request.customer_ref.clone()),
            total: Set(total),
            status: Set(OrderStatus::Received),
            created_at: Set(now),
            updated_at: Set(None),
            version: Set(1),
            ..Default::default()
        };
        let inserted = order_model.insert(&txn).await?;

        // Payment has been initiated, so the order leaves `received`
        // immediately; both states share the creation transaction.
        debug_assert!(OrderStatus::Received.can_transition_to(OrderStatus::PaymentPending));
        let mut pending: order::ActiveModel = inserted.clone().into();
        pending.status = Set(OrderStatus::PaymentPending);
        pending.updated_at = Set(Some(now));
        pending.version = Set(inserted.version + 1);
        let persisted = pending.update(&txn).await?;

        let mut item_models = Vec::with_capacity(resolved.len());
        for (product, quantity) in &resolved {
            let item = order_item::ActiveModel {
                order_id: Set(persisted.id),
                product_id: Set(product.id),
                product_name: Set(product.name.clone()),
                unit_price: Set(product.unit_price),
                quantity: Set(*quantity),
                line_total: Set(product.unit_price * Decimal::from(*quantity)),
                created_at: Set(now),
                ..Default::default()
            };
            item_models.push(item.insert(&txn).await?);
        }

        let payment_model = payment::ActiveModel {
            id: Set(payment_code.payment_id.clone()),
            order_id: Set(persisted.id),
            amount: Set(total),
            qr_code: Set(payment_code.qr_code.clone()),
            status: Set(PaymentStatus::Pending),
            created_at: Set(now),
            updated_at: Set(None),
        };
        let payment_record = payment_model.insert(&txn).await?;

        txn.commit().await?;

        info!(
            order_id = persisted.id,
            order_code,
            %total,
            payment_id = %payment_record.id,
            "checkout completed"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::OrderCreated(persisted.id))
            .await
        {
            warn!(error = %e, order_id = persisted.id, "failed to publish order created event");
        }
        if let Err(e) = self
            .event_sender
            .send(Event::CheckoutCompleted {
                order_id: persisted.id,
                payment_id: payment_record.id.clone(),
            })
            .await
        {
            warn!(error = %e, order_id = persisted.id, "failed to publish checkout event");
        }

        Ok(CheckoutResponse {
            order: OrderResponse::from_model(persisted, item_models),
            payment: PaymentCodeView {
                payment_id: payment_record.id,
                qr_code: payment_record.qr_code,
                amount: payment_record.amount,
                status: payment_record.status,
            },
        })
    }
}
