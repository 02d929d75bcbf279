//! Product catalog endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::response::{created, ok, ApiResult, Created};
use crate::routes::{default_true, flag};
use crate::state::AppState;
use thrive_core::drafts::ProductDraft;
use thrive_core::{Money, Product};

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub active_only: Option<String>,
}

/// Create/update body. Amounts are minor units.
#[derive(Debug, Deserialize)]
pub struct ProductBody {
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Money,
    #[serde(default)]
    pub making_cost: Money,
    #[serde(default)]
    pub stock_quantity: i64,
    #[serde(default)]
    pub min_stock_level: i64,
    pub image_url: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<ProductBody> for ProductDraft {
    fn from(body: ProductBody) -> Self {
        ProductDraft {
            name: body.name,
            sku: body.sku,
            description: body.description,
            category: body.category,
            price: body.price,
            making_cost: body.making_cost,
            stock_quantity: body.stock_quantity,
            min_stock_level: body.min_stock_level,
            image_url: body.image_url,
            is_active: body.is_active,
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<CatalogQuery>, QueryRejection>,
) -> ApiResult<Vec<Product>> {
    let Query(query) = query?;
    let products = state
        .db
        .products()
        .list(flag(query.active_only.as_deref()))
        .await?;
    ok(products)
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Product> {
    match state.db.products().get_by_id(&id).await? {
        Some(product) => ok(product),
        None => Err(ApiError::not_found(format!("Product not found: {}", id))),
    }
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<ProductBody>, JsonRejection>,
) -> Created<Product> {
    let Json(body) = payload?;
    let product = state.db.products().create(&body.into()).await?;
    info!(id = %product.id, sku = %product.sku, "Product created");
    created(product, "Product created")
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ProductBody>, JsonRejection>,
) -> ApiResult<Product> {
    let Json(body) = payload?;
    let product = state.db.products().update(&id, &body.into()).await?;
    ok(product)
}

/// Soft delete; past orders keep pointing at the row.
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    state.db.products().soft_delete(&id).await?;
    info!(id = %id, "Product deactivated");
    ok(json!({ "id": id }))
}
