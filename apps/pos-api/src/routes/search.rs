use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::response::{ok, ApiResult};
use crate::state::AppState;
use thrive_db::{SearchHit, SEARCH_LIMIT};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    pub limit: Option<i64>,
}

/// Billing-screen type-ahead over products and combos.
pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> ApiResult<Vec<SearchHit>> {
    let Query(query) = query?;
    let limit = query.limit.unwrap_or(SEARCH_LIMIT).clamp(1, SEARCH_LIMIT);
    ok(state.db.search().search(&query.query, limit).await?)
}
