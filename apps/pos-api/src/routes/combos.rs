//! Combo endpoints.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ApiError;
use crate::response::{created, ok, ApiResult, Created};
use crate::routes::products::CatalogQuery;
use crate::routes::{default_true, flag};
use crate::state::AppState;
use thrive_core::drafts::ComboDraft;
use thrive_core::{Combo, Money};

#[derive(Debug, Deserialize)]
pub struct ComboBody {
    pub name: String,
    pub description: Option<String>,
    pub price: Money,
    /// Ordered; a product may appear more than once.
    pub product_ids: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

impl From<ComboBody> for ComboDraft {
    fn from(body: ComboBody) -> Self {
        ComboDraft {
            name: body.name,
            description: body.description,
            price: body.price,
            product_ids: body.product_ids,
            is_active: body.is_active,
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<CatalogQuery>, QueryRejection>,
) -> ApiResult<Vec<Combo>> {
    let Query(query) = query?;
    let combos = state
        .db
        .combos()
        .list(flag(query.active_only.as_deref()))
        .await?;
    ok(combos)
}

pub async fn get(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Combo> {
    match state.db.combos().get_by_id(&id).await? {
        Some(combo) => ok(combo),
        None => Err(ApiError::not_found(format!("Combo not found: {}", id))),
    }
}

pub async fn create(
    State(state): State<AppState>,
    payload: Result<Json<ComboBody>, JsonRejection>,
) -> Created<Combo> {
    let Json(body) = payload?;
    let combo = state.db.combos().create(&body.into()).await?;
    info!(id = %combo.id, making_cost = %combo.making_cost(), "Combo created");
    created(combo, "Combo created")
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<ComboBody>, JsonRejection>,
) -> ApiResult<Combo> {
    let Json(body) = payload?;
    let combo = state.db.combos().update(&id, &body.into()).await?;
    ok(combo)
}

pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    state.db.combos().soft_delete(&id).await?;
    info!(id = %id, "Combo deactivated");
    ok(json!({ "id": id }))
}
