use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    /// Externally visible order number, allocated from a dedicated sequence.
    /// Distinct from the surrogate `id`.
    #[sea_orm(unique)]
    pub order_code: i64,

    /// Opaque customer reference; orders may be anonymous.
    #[sea_orm(nullable)]
    pub customer_ref: Option<String>,

    /// Frozen at creation; never recomputed from the catalog afterwards.
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total: Decimal,

    pub status: OrderStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::payment::Entity")]
    Payments,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::payment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Order lifecycle status
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "received")]
    Received,
    #[sea_orm(string_value = "payment_pending")]
    PaymentPending,
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "in_preparation")]
    InPreparation,
    #[sea_orm(string_value = "ready")]
    Ready,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "payment_failed")]
    PaymentFailed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    /// No transition is permitted out of a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Completed | OrderStatus::PaymentFailed | OrderStatus::Cancelled
        )
    }

    /// The forward-only transition table. Cancellation is the one
    /// sideways move, and only before payment settles.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Received, PaymentPending)
                | (Received, Cancelled)
                | (PaymentPending, Paid)
                | (PaymentPending, PaymentFailed)
                | (PaymentPending, Cancelled)
                | (Paid, InPreparation)
                | (InPreparation, Ready)
                | (Ready, Completed)
        )
    }
}
