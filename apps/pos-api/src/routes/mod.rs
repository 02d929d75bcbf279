//! # Routes
//!
//! ```text
//! /api
//! ├── GET    /health
//! ├── GET    /settings
//! ├── GET    /products            ?active_only=1
//! ├── POST   /products
//! ├── GET    /products/{id}       PUT · DELETE (soft)
//! ├── GET    /combos              ?active_only=1
//! ├── POST   /combos
//! ├── GET    /combos/{id}         PUT · DELETE (soft)
//! ├── GET    /offers              ?checkout_offers=1
//! ├── POST   /offers
//! ├── GET    /offers/{id}         PUT · DELETE
//! ├── PUT    /offers/{id}/active
//! ├── POST   /pricing/preview
//! ├── POST   /orders              ← checkout
//! ├── GET    /orders              ?start_date&end_date&status&order_type&limit&offset
//! ├── GET    /orders/{id}         DELETE (pending only)
//! ├── PUT    /orders/{id}/status
//! ├── GET    /customers
//! ├── GET    /customers/lookup    ?mobile=
//! ├── GET    /dashboard           ?filter=today|7days|30days|year
//! ├── GET    /search              ?query=
//! └── GET    /export              ?report_type&filter&start_date&end_date (CSV)
//! ```

use axum::routing::{get, post, put};
use axum::Router;

use crate::state::AppState;

pub mod combos;
pub mod customers;
pub mod dashboard;
pub mod export;
pub mod health;
pub mod offers;
pub mod orders;
pub mod pricing;
pub mod products;
pub mod search;

/// All `/api` routes, without middleware.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/settings", get(health::settings))
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::get).put(products::update).delete(products::delete),
        )
        .route("/combos", get(combos::list).post(combos::create))
        .route(
            "/combos/{id}",
            get(combos::get).put(combos::update).delete(combos::delete),
        )
        .route("/offers", get(offers::list).post(offers::create))
        .route(
            "/offers/{id}",
            get(offers::get).put(offers::update).delete(offers::delete),
        )
        .route("/offers/{id}/active", put(offers::set_active))
        .route("/pricing/preview", post(pricing::preview))
        .route("/orders", get(orders::list).post(orders::create))
        .route("/orders/{id}", get(orders::get).delete(orders::delete))
        .route("/orders/{id}/status", put(orders::update_status))
        .route("/customers", get(customers::list))
        .route("/customers/lookup", get(customers::lookup))
        .route("/dashboard", get(dashboard::get))
        .route("/search", get(search::search))
        .route("/export", get(export::export))
}

/// Query-string flags arrive as `1`/`0` from the billing UI.
pub(crate) fn flag(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}

pub(crate) fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_values() {
        assert!(flag(Some("1")));
        assert!(flag(Some("TRUE")));
        assert!(!flag(Some("0")));
        assert!(!flag(Some("")));
        assert!(!flag(None));
    }
}
