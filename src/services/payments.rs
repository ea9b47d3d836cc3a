use crate::{
    db::DbPool,
    entities::order::{self, Entity as OrderEntity, OrderStatus},
    entities::payment::{self, Entity as PaymentEntity, PaymentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;

/// What a reconciliation attempt did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// The notification settled the payment and advanced the order.
    Applied,
    /// The payment was already terminal; nothing changed. Duplicate and
    /// late conflicting deliveries both land here.
    AlreadySettled,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaymentStatusView {
    pub order_code: i64,
    #[schema(value_type = String, example = "paid")]
    pub order_status: OrderStatus,
    #[schema(value_type = String, example = "approved")]
    pub payment_status: PaymentStatus,
}

/// Applies asynchronous settlement notifications to the payment record and
/// its order, and serves the combined status view clients poll.
#[derive(Clone)]
pub struct PaymentService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PaymentService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Applies a reported settlement status to the payment with the given
    /// gateway id.
    ///
    /// Terminal-once: the payment row moves out of `pending` exactly once,
    /// via a compare-and-set on its current status. A second notification
    /// for the same payment observes the terminal state and is absorbed as
    /// a successful no-op, whatever status it reports. Both row updates
    /// share one transaction.
    #[instrument(skip(self), fields(payment_id = %payment_id, reported = %reported))]
    pub async fn apply_status(
        &self,
        payment_id: &str,
        reported: PaymentStatus,
    ) -> Result<ReconciliationOutcome, ServiceError> {
        if !reported.is_terminal() {
            return Err(ServiceError::ValidationError(format!(
                "reported status '{}' is not a settlement status",
                reported
            )));
        }

        let txn = self.db.begin().await?;

        let record = PaymentEntity::find_by_id(payment_id.to_string())
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Payment {} not found", payment_id)))?;

        if record.status.is_terminal() {
            info!(
                current = %record.status,
                "payment already settled; absorbing duplicate notification"
            );
            txn.commit().await?;
            return Ok(ReconciliationOutcome::AlreadySettled);
        }

        // Transition only if the row is still pending. Zero rows affected
        // means a concurrent notification settled it first.
        let updated = PaymentEntity::update_many()
            .col_expr(payment::Column::Status, Expr::value(reported))
            .col_expr(payment::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .filter(payment::Column::Id.eq(payment_id))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending))
            .exec(&txn)
            .await?;

        if updated.rows_affected == 0 {
            info!("lost settlement race; payment already terminal");
            txn.commit().await?;
            return Ok(ReconciliationOutcome::AlreadySettled);
        }

        let order = OrderEntity::find_by_id(record.order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "payment {} references missing order {}",
                    payment_id, record.order_id
                ))
            })?;

        if order.status != OrderStatus::PaymentPending {
            // Business anomaly, not a transient fault: the order moved on
            // (e.g. was cancelled) before settlement arrived. Roll back so
            // neither row changes and leave the decision to an operator.
            txn.rollback().await?;
            return Err(ServiceError::Conflict(format!(
                "payment {} settled as '{}' but order {} is '{}'",
                payment_id, reported, order.id, order.status
            )));
        }

        let next_order_status = match reported {
            PaymentStatus::Approved => OrderStatus::Paid,
            PaymentStatus::Rejected => OrderStatus::PaymentFailed,
            PaymentStatus::Pending => unreachable!("guarded above"),
        };

        let advanced = OrderEntity::update_many()
            .col_expr(order::Column::Status, Expr::value(next_order_status))
            .col_expr(order::Column::UpdatedAt, Expr::value(Some(Utc::now())))
            .col_expr(
                order::Column::Version,
                Expr::col(order::Column::Version).add(1),
            )
            .filter(order::Column::Id.eq(order.id))
            .filter(order::Column::Status.eq(OrderStatus::PaymentPending))
            .filter(order::Column::Version.eq(order.version))
            .exec(&txn)
            .await?;

        if advanced.rows_affected == 0 {
            txn.rollback().await?;
            return Err(ServiceError::ConcurrentModification(order.id));
        }

        txn.commit().await?;

        info!(
            order_id = order.id,
            %next_order_status,
            "settlement applied"
        );

        let event = match reported {
            PaymentStatus::Approved => Event::PaymentApproved {
                payment_id: payment_id.to_string(),
                order_id: order.id,
            },
            _ => Event::PaymentRejected {
                payment_id: payment_id.to_string(),
                order_id: order.id,
            },
        };
        if let Err(e) = self.event_sender.send(event).await {
            warn!(error = %e, %payment_id, "failed to publish settlement event");
        }
        if let Err(e) = self
            .event_sender
            .send(Event::OrderStatusChanged {
                order_id: order.id,
                old_status: OrderStatus::PaymentPending.to_string(),
                new_status: next_order_status.to_string(),
            })
            .await
        {
            warn!(error = %e, order_id = order.id, "failed to publish status change event");
        }

        Ok(ReconciliationOutcome::Applied)
    }

    /// Combined read-only view of an order and its payment, addressed by the
    /// externally visible order code. Never mutates state.
    #[instrument(skip(self), fields(order_code = %order_code))]
    pub async fn payment_status(&self, order_code: i64) -> Result<PaymentStatusView, ServiceError> {
        let order = OrderEntity::find()
            .filter(order::Column::OrderCode.eq(order_code))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Order with code {} not found", order_code))
            })?;

        let record = PaymentEntity::find()
            .filter(payment::Column::OrderId.eq(order.id))
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!("order {} has no payment record", order.id))
            })?;

        Ok(PaymentStatusView {
            order_code: order.order_code,
            order_status: order.status,
            payment_status: record.status,
        })
    }
}
