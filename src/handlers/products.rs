use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use super::common::PaginationParams;
use crate::entities::product::{Model as ProductModel, ProductCategory};
use crate::errors::ServiceError;
use crate::handlers::AppState;
use crate::services::catalog::CreateProductRequest as CatalogCreateRequest;
use crate::{ApiResponse, PaginatedResponse};

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "name": "Cheeseburger",
    "description": "House burger with cheddar",
    "category": "meal",
    "unit_price": "15.00"
}))]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 120, message = "Product name is required"))]
    pub name: String,
    pub description: Option<String>,
    /// One of: meal, side, drink, dessert
    #[schema(example = "meal")]
    pub category: String,
    #[schema(value_type = String, example = "15.00")]
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    #[schema(example = "meal")]
    pub category: String,
    #[schema(value_type = String, example = "15.00")]
    pub unit_price: Decimal,
    pub created_at: DateTime<Utc>,
}

impl From<ProductModel> for ProductResponse {
    fn from(model: ProductModel) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            category: model.category.to_string(),
            unit_price: model.unit_price,
            created_at: model.created_at,
        }
    }
}

/// Register a catalog product
#[utoipa::path(
    post,
    path = "/api/v1/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = crate::ApiResponse<ProductResponse>),
        (status = 400, description = "Invalid product", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(request): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductResponse>>), ServiceError> {
    request.validate()?;

    let category = ProductCategory::from_str(request.category.trim()).map_err(|_| {
        ServiceError::ValidationError(format!("Unknown product category: {}", request.category))
    })?;

    let created = state
        .services
        .catalog
        .create_product(CatalogCreateRequest {
            name: request.name,
            description: request.description,
            category,
            unit_price: request.unit_price,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(created.into())),
    ))
}

/// List catalog products
#[utoipa::path(
    get,
    path = "/api/v1/products",
    params(PaginationParams),
    responses(
        (status = 200, description = "Products, newest first", body = crate::ApiResponse<crate::PaginatedResponse<ProductResponse>>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<PaginationParams>,
) -> Result<Json<ApiResponse<PaginatedResponse<ProductResponse>>>, ServiceError> {
    let (page, per_page) = params.normalized();
    let (products, total) = state.services.catalog.list_products(page, per_page).await?;

    let response = PaginatedResponse {
        items: products.into_iter().map(ProductResponse::from).collect(),
        total,
        page,
        limit: per_page,
        total_pages: total.div_ceil(per_page),
    };

    Ok(Json(ApiResponse::success(response)))
}

/// Get a product by id
#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = i64, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product details", body = crate::ApiResponse<ProductResponse>),
        (status = 404, description = "Not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductResponse>>, ServiceError> {
    let product = state.services.catalog.get_product(id).await?;
    Ok(Json(ApiResponse::success(product.into())))
}

/// Product routes
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product))
        .route("/", get(list_products))
        .route("/:id", get(get_product))
}
