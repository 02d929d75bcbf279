use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use serde::Deserialize;

use crate::error::ApiError;
use crate::response::{ok, ApiResult};
use crate::state::AppState;
use thrive_core::validation::validate_mobile;
use thrive_core::Customer;
use thrive_db::CustomerSummary;

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub mobile: Option<String>,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<CustomerSummary>> {
    ok(state.db.customers().list().await?)
}

/// Till lookup by mobile number before checkout.
pub async fn lookup(
    State(state): State<AppState>,
    query: Result<Query<LookupQuery>, QueryRejection>,
) -> ApiResult<Customer> {
    let Query(query) = query?;
    let mobile = query
        .mobile
        .ok_or_else(|| ApiError::validation("mobile is required"))?;
    let mobile = validate_mobile(&mobile)?;

    match state.db.customers().get_by_mobile(&mobile).await? {
        Some(customer) => ok(customer),
        None => Err(ApiError::not_found(format!("Customer not found: {}", mobile))),
    }
}
