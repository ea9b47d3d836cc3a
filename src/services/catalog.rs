use crate::{
    db::DbPool,
    entities::product::{self, Entity as ProductEntity, Model as ProductModel, ProductCategory},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, EntityTrait, PaginatorTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 120, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    pub category: ProductCategory,
    pub unit_price: Decimal,
}

/// Catalog lookups and maintenance. Checkout resolves price snapshots here;
/// everything else is operator-facing product management.
#[derive(Clone)]
pub struct ProductCatalogService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl ProductCatalogService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Resolves a product by id, failing with NotFound for unknown ids.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn get_product(&self, product_id: i64) -> Result<ProductModel, ServiceError> {
        ProductEntity::find_by_id(product_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))
    }

    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductModel, ServiceError> {
        request.validate()?;

        if request.unit_price <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "unit_price must be greater than zero".to_string(),
            ));
        }

        let model = product::ActiveModel {
            name: Set(request.name),
            description: Set(request.description),
            category: Set(request.category),
            unit_price: Set(request.unit_price),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        let created = model.insert(&*self.db).await?;

        info!(product_id = created.id, "product created");

        if let Err(e) = self
            .event_sender
            .send(Event::ProductCreated(created.id))
            .await
        {
            warn!(error = %e, product_id = created.id, "failed to publish product created event");
        }

        Ok(created)
    }

    /// Lists catalog products, newest first.
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<ProductModel>, u64), ServiceError> {
        let paginator = ProductEntity::find()
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page.max(1));

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((products, total))
    }
}
