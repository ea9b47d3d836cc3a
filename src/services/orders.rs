use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, Model as OrderModel, OrderStatus},
    entities::order_item::{self, Entity as OrderItemEntity, Model as OrderItemModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, EntityTrait, LoaderTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItemView {
    pub product_id: i64,
    pub product_name: String,
    #[schema(value_type = String, example = "15.00")]
    pub unit_price: Decimal,
    pub quantity: i32,
    #[schema(value_type = String, example = "30.00")]
    pub line_total: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub order_code: i64,
    pub customer_ref: Option<String>,
    #[schema(value_type = String, example = "30.00")]
    pub total: Decimal,
    #[schema(value_type = String, example = "payment_pending")]
    pub status: OrderStatus,
    pub items: Vec<OrderItemView>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

impl OrderResponse {
    pub fn from_model(model: OrderModel, items: Vec<OrderItemModel>) -> Self {
        Self {
            id: model.id,
            order_code: model.order_code,
            customer_ref: model.customer_ref,
            total: model.total,
            status: model.status,
            items: items
                .into_iter()
                .map(|item| OrderItemView {
                    product_id: item.product_id,
                    product_name: item.product_name,
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    line_total: item.line_total,
                })
                .collect(),
            created_at: model.created_at,
            updated_at: model.updated_at,
            version: model.version,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderListResponse {
    pub orders: Vec<OrderResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Read and lifecycle operations on persisted orders. Creation lives in the
/// checkout service; settlement transitions live in the payment service.
#[derive(Clone)]
pub struct OrderService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl OrderService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Retrieves an order with its item snapshots by internal id.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: i64) -> Result<OrderResponse, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let items = self.load_items(order.id).await?;
        Ok(OrderResponse::from_model(order, items))
    }

    /// Retrieves an order by its externally visible code.
    #[instrument(skip(self), fields(order_code = %order_code))]
    pub async fn get_order_by_code(&self, order_code: i64) -> Result<OrderResponse, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::OrderCode.eq(order_code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order with code {} not found", order_code))
            })?;

        let items = self.load_items(order.id).await?;
        Ok(OrderResponse::from_model(order, items))
    }

    /// Lists orders with their items, newest first.
    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<OrderListResponse, ServiceError> {
        let paginator = OrderEntity::find()
            .order_by_desc(order::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        let items = orders.load_many(OrderItemEntity, &*self.db).await?;

        let responses = orders
            .into_iter()
            .zip(items)
            .map(|(order, order_items)| OrderResponse::from_model(order, order_items))
            .collect();

        Ok(OrderListResponse {
            orders: responses,
            total,
            page,
            per_page,
        })
    }

    /// Advances an order along the fulfillment path (paid -> in_preparation
    /// -> ready -> completed). Illegal moves are rejected; a lost optimistic
    /// race surfaces as a conflict for the caller to retry.
    #[instrument(skip(self), fields(order_id = %order_id, new_status = %new_status))]
    pub async fn update_order_status(
        &self,
        order_id: i64,
        new_status: OrderStatus,
    ) -> Result<OrderResponse, ServiceError> {
        let order = OrderEntity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        if !old_status.can_transition_to(new_status) {
            return Err(ServiceError::InvalidStatus(format!(
                "Cannot transition order {} from '{}' to '{}'",
                order_id, old_status, new_status
            )));
        }

        self.transition(&order, new_status).await?;

        info!(
            order_id,
            %old_status,
            %new_status,
            "order status updated"
        );

        if let Err(e) = self
            .event_sender
            .send(Event::OrderStatusChanged {
                order_id,
                old_status: old_status.to_string(),
                new_status: new_status.to_string(),
            })
            .await
        {
            warn!(error = %e, order_id, "failed to publish status change event");
        }

        self.get_order(order_id).await
    }

    /// Cancels an order. Only permitted before payment settles; the state
    /// machine rejects cancellation of paid or fulfilled orders.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn cancel_order(&self, order_id: i64) -> Result<OrderResponse, ServiceError> {
        let response = self
            .update_order_status(order_id, OrderStatus::Cancelled)
            .await?;

        if let Err(e) = self.event_sender.send(Event::OrderCancelled(order_id)).await {
            warn!(error = %e, order_id, "failed to publish cancellation event");
        }

        Ok(response)
    }

    /// Version-checked single-row status update.
    async fn transition(
        &self,
        order: &OrderModel,
        new_status: OrderStatus,
    ) -> Result<(), ServiceError> {
        let updated = OrderEntity::update_many()
            .col_expr(order::Column::Status, Expr::value(new_status))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .col_expr(
                order::Column::Version,
                Expr::col(order::Column::Version).add(1),
            )
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::Version.eq(order.version))
            .exec(&*self.db)
            .await?;

        if updated.rows_affected == 0 {
            warn!(order_id = order.id, "optimistic status update lost a race");
            return Err(ServiceError::ConcurrentModification(order.id));
        }

        Ok(())
    }

    async fn load_items(&self, order_id: i64) -> Result<Vec<OrderItemModel>, ServiceError> {
        Ok(OrderItemEntity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::Id)
            .all(&*self.db)
            .await?)
    }
}
