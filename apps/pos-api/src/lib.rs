//! # Thrive POS API
//!
//! HTTP server for the café till: catalog and offer administration,
//! live billing preview, checkout, dashboard and CSV exports.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  request ──► CORS ──► TraceLayer ──► /api ──► rate_limit ──► handler    │
//! │                                                                │        │
//! │                                            thrive-db repositories       │
//! │                                            thrive-core pricing          │
//! │                                                                │        │
//! │  response ◄── ApiResponse envelope ◄── ApiError / ok(data) ◄───┘        │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod csv;
pub mod error;
pub mod rate_limit;
pub mod response;
pub mod routes;
pub mod state;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{ConfigError, ServerConfig};
pub use error::ApiError;
pub use state::AppState;

/// Builds the full application router.
pub fn build_router(state: AppState) -> Router {
    let api = routes::api_router().layer(middleware::from_fn_with_state(
        state.clone(),
        rate_limit::rate_limit,
    ));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}

/// Any origin when none are configured, else exactly the listed ones.
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

// =============================================================================
// Router Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use chrono::NaiveDate;
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use thrive_core::drafts::{OfferDraft, ProductDraft};
    use thrive_core::{Discount, Money, Percent, Product};
    use thrive_db::{CheckoutSettings, Database, DbConfig};
    use tower::ServiceExt;

    async fn test_state(config: ServerConfig) -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppState::new(db, CheckoutSettings::default(), config)
    }

    async fn seed_product(state: &AppState, name: &str, price_cents: i64) -> Product {
        state
            .db
            .products()
            .create(&ProductDraft {
                name: name.to_string(),
                sku: None,
                description: None,
                category: Some("Beverages".to_string()),
                price: Money::from_cents(price_cents),
                making_cost: Money::from_cents(price_cents / 4),
                stock_quantity: 50,
                min_stock_level: 5,
                image_url: None,
                is_active: true,
            })
            .await
            .unwrap()
    }

    async fn seed_coupon(state: &AppState, code: &str, usage_limit: Option<i64>) {
        state
            .db
            .offers()
            .create(&OfferDraft {
                name: format!("{} offer", code),
                description: None,
                discount: Discount::Percentage(Percent::from_bps(1000)),
                apply_to_all: true,
                scope: Vec::new(),
                start_date: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(),
                start_time: None,
                end_time: None,
                is_active: true,
                coupon_code: Some(code.to_string()),
                usage_limit,
                min_order_amount: None,
                max_discount_amount: None,
            })
            .await
            .unwrap();
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn put(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    #[tokio::test]
    async fn test_health_envelope() {
        let app = build_router(test_state(ServerConfig::default()).await);

        let (status, body) = send(&app, get("/api/health")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["version"], "2.0.0");
        assert_eq!(body["data"]["database"], true);
        assert_eq!(body["data"]["status"], "healthy");
        assert!(body["timestamp"].is_string());
    }

    fn assert_envelope_keys(body: &Value) {
        let object = body.as_object().unwrap();
        for key in ["success", "data", "message", "timestamp", "version"] {
            assert!(object.contains_key(key), "envelope missing {:?}: {}", key, body);
        }
    }

    #[tokio::test]
    async fn test_envelope_always_has_five_keys() {
        let app = build_router(test_state(ServerConfig::default()).await);

        let (status, body) = send(&app, get("/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_envelope_keys(&body);
        assert_eq!(body["message"], "Operation successful");

        let (status, body) = send(&app, get("/api/orders/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_envelope_keys(&body);
        assert!(body["data"].is_null());
        assert!(body["message"].is_string());
    }

    #[tokio::test]
    async fn test_checkout_offers_picker_shape() {
        let state = test_state(ServerConfig::default()).await;
        let latte = seed_product(&state, "Latte", 10000).await;
        let app = build_router(state);

        let (status, body) = send(
            &app,
            post(
                "/api/offers",
                json!({
                    "name": "Latte Hour",
                    "discount_percent": 12.5,
                    "apply_to_all": false,
                    "applicable_items": [format!("product-{}", latte.id)],
                    "start_date": "2000-01-01",
                    "end_date": "2099-12-31"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        assert_eq!(body["data"]["discount"]["value"], 1250);
        assert_eq!(body["data"]["applicable_items"][0]["item_id"], latte.id.as_str());

        let (status, body) = send(&app, get("/api/offers?checkout_offers=1")).await;
        assert_eq!(status, StatusCode::OK);
        let row = &body["data"][0];
        let mut keys: Vec<&str> = row.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            [
                "applicable_items",
                "apply_to_all",
                "discount_percent",
                "discount_type",
                "id",
                "name"
            ]
        );
        assert_eq!(row["discount_percent"], 12.5);
        assert_eq!(row["discount_type"], "percentage");
        assert_eq!(row["applicable_items"][0]["item_type"], "product");
    }

    #[tokio::test]
    async fn test_create_order_uses_catalog_prices() {
        let state = test_state(ServerConfig::default()).await;
        let latte = seed_product(&state, "Latte", 7000).await;
        let app = build_router(state);

        let (status, body) = send(
            &app,
            post(
                "/api/orders",
                json!({
                    "items": [{ "product_id": latte.id, "quantity": 2, "price": 1 }],
                    "payment_method": "cash",
                    "customer_name": "Asha",
                    "customer_mobile": "98765 43210"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Order created");
        let data = &body["data"];
        assert_eq!(data["subtotal"], 14000);
        assert_eq!(data["discount_amount"], 0);
        assert_eq!(data["tax_amount"], 2520);
        assert_eq!(data["final_amount"], 16520);
        assert!(data["order_number"].as_str().unwrap().starts_with("TC"));
        assert_eq!(data["customer"]["mobile"], "9876543210");
        assert_eq!(data["items"][0]["unit_price_cents"], 7000);

        let order_id = data["order_id"].as_str().unwrap().to_string();
        let (status, body) = send(&app, get(&format!("/api/orders/{}", order_id))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_coupon_is_applied_then_exhausted() {
        let state = test_state(ServerConfig::default()).await;
        let latte = seed_product(&state, "Latte", 10000).await;
        seed_coupon(&state, "WELCOME10", Some(1)).await;
        let app = build_router(state);

        let order = json!({
            "items": [{ "product_id": latte.id, "quantity": 1 }],
            "payment_method": "upi",
            "coupon_code": "welcome10"
        });

        let (status, body) = send(&app, post("/api/orders", order.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["discount_amount"], 1000);
        assert_eq!(body["data"]["coupon_code"], "WELCOME10");

        let (status, body) = send(&app, post("/api/orders", order)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_kitchen_ticket_lifecycle() {
        let state = test_state(ServerConfig::default()).await;
        let latte = seed_product(&state, "Latte", 10000).await;
        let app = build_router(state);

        let ticket = json!({
            "items": [{ "product_id": latte.id, "quantity": 1 }],
            "payment_method": "cash",
            "order_type": "takeaway",
            "status": "pending"
        });
        let (status, body) = send(&app, post("/api/orders", ticket.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["status"], "pending");
        let first = body["data"]["order_id"].as_str().unwrap().to_string();

        let (_, body) = send(&app, get("/api/orders?status=pending&order_type=takeaway")).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);

        let status_uri = format!("/api/orders/{}/status", first);
        let (status, body) = send(&app, put(&status_uri, json!({ "status": "preparing" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["status"], "preparing");
        assert_eq!(body["data"]["final_amount_cents"], 11800);

        let (status, _) = send(&app, delete(&format!("/api/orders/{}", first))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = send(&app, put(&status_uri, json!({ "status": "completed" }))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, put(&status_uri, json!({ "status": "ready" }))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].as_str().unwrap().contains("completed"));

        let (status, _) = send(&app, put(&status_uri, json!({ "status": "lost" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(&app, post("/api/orders", ticket)).await;
        let second = body["data"]["order_id"].as_str().unwrap().to_string();
        let (status, _) = send(&app, delete(&format!("/api/orders/{}", second))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, get(&format!("/api/orders/{}", second))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, delete("/api/orders/ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_coupon_is_422() {
        let state = test_state(ServerConfig::default()).await;
        let latte = seed_product(&state, "Latte", 10000).await;
        let app = build_router(state);

        let (status, body) = send(
            &app,
            post(
                "/api/orders",
                json!({
                    "items": [{ "product_id": latte.id, "quantity": 1 }],
                    "payment_method": "card",
                    "coupon_code": "NOPE"
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].as_str().unwrap().contains("NOPE"));
    }

    #[tokio::test]
    async fn test_bad_requests_are_400() {
        let app = build_router(test_state(ServerConfig::default()).await);

        let (status, _) = send(
            &app,
            post(
                "/api/orders",
                json!({ "items": [], "payment_method": "cash" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            post("/api/orders", json!({ "items": "nope" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, _) = send(
            &app,
            post(
                "/api/orders",
                json!({
                    "items": [{ "product_id": "a", "combo_id": "b", "quantity": 1 }],
                    "payment_method": "cash"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_missing_records_are_404() {
        let app = build_router(test_state(ServerConfig::default()).await);

        let (status, body) = send(&app, get("/api/products/does-not-exist")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);

        let (status, _) = send(&app, get("/api/orders/does-not-exist")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_preview_stacks_quick_discount() {
        let state = test_state(ServerConfig::default()).await;
        let latte = seed_product(&state, "Latte", 10000).await;
        let app = build_router(state);

        let (status, body) = send(
            &app,
            post(
                "/api/pricing/preview",
                json!({
                    "items": [{ "product_id": latte.id, "quantity": 1, "price": 5 }],
                    "quick_discount": true
                }),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["subtotal"], 10000);
        assert_eq!(body["data"]["discount"], 1000);
        assert_eq!(body["data"]["total"], 9000);
    }

    #[tokio::test]
    async fn test_product_create_and_soft_delete() {
        let app = build_router(test_state(ServerConfig::default()).await);

        let (status, body) = send(
            &app,
            post(
                "/api/products",
                json!({ "name": "Cold Coffee", "price": 12000, "making_cost": 3000 }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = body["data"]["id"].as_str().unwrap().to_string();
        assert!(body["data"]["sku"].as_str().unwrap().starts_with("CCCOLD"));

        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/products/{}", id))
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = send(&app, get("/api/products?active_only=1")).await;
        assert!(body["data"].as_array().unwrap().is_empty());
        let (_, body) = send(&app, get("/api/products")).await;
        assert_eq!(body["data"][0]["is_active"], false);
    }

    #[tokio::test]
    async fn test_rate_limit_returns_429() {
        let config = ServerConfig {
            rate_limit_per_minute: 2,
            ..ServerConfig::default()
        };
        let app = build_router(test_state(config).await);

        let from = |ip: &str| {
            Request::builder()
                .uri("/api/settings")
                .header("x-forwarded-for", ip)
                .body(Body::empty())
                .unwrap()
        };

        assert_eq!(send(&app, from("10.0.0.1")).await.0, StatusCode::OK);
        assert_eq!(send(&app, from("10.0.0.1")).await.0, StatusCode::OK);

        let (status, body) = send(&app, from("10.0.0.1")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["success"], false);

        assert_eq!(send(&app, from("10.0.0.2")).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_export_products_csv() {
        let state = test_state(ServerConfig::default()).await;
        seed_product(&state, "Masala, Chai", 4000).await;
        let app = build_router(state);

        let response = app
            .oneshot(get("/api/export?report_type=products"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/csv; charset=utf-8"
        );
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .to_string();
        assert!(disposition.starts_with("attachment; filename=\"products_report_"));

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let mut lines = text.split("\r\n");
        assert!(lines.next().unwrap().starts_with("ID,SKU,Name,Selling Price"));
        let row = lines.next().unwrap();
        assert!(row.contains("\"Masala, Chai\""));
        assert!(row.contains("₹40.00"));
        assert!(row.contains("Active"));
    }

    #[tokio::test]
    async fn test_export_rejects_bad_parameters() {
        let app = build_router(test_state(ServerConfig::default()).await);

        let (status, _) = send(&app, get("/api/export?report_type=orders")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            get("/api/export?report_type=sales&filter=custom&start_date=2026-10-01"),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(get("/api/export?report_type=sales&filter=custom&start_date=2026-10-01&end_date=2026-10-05"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"sales_report_2026-10-01_to_2026-10-05.csv\""
        );
    }
}
