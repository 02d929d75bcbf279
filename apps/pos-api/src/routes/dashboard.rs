use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use chrono::Utc;
use serde::Deserialize;

use crate::response::{ok, ApiResult};
use crate::state::AppState;
use thrive_db::{Dashboard, DashboardFilter};

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub filter: Option<String>,
}

/// Unknown filters fall back to today.
pub async fn get(
    State(state): State<AppState>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> ApiResult<Dashboard> {
    let Query(query) = query?;
    let filter = DashboardFilter::parse(query.filter.as_deref());
    let today = state.settings.local_now(Utc::now()).date();

    let dashboard = state
        .db
        .dashboard()
        .load(filter, today, state.settings.utc_offset)
        .await?;

    ok(dashboard)
}
