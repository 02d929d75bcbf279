//! Liveness and read-only settings.

use axum::extract::State;
use serde::Serialize;
use tracing::warn;

use crate::response::{ok, ApiResult, API_VERSION};
use crate::state::AppState;
use thrive_core::Percent;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub database: bool,
    pub migrations_applied: usize,
    pub migrations_total: usize,
    pub version: &'static str,
}

/// Always 200 so load balancers can tell "up but degraded" from "down".
pub async fn health(State(state): State<AppState>) -> ApiResult<HealthStatus> {
    let database = state.db.health_check().await;

    let (migrations_total, migrations_applied) = match state.db.migration_status().await {
        Ok(counts) => counts,
        Err(e) => {
            warn!(error = %e, "Migration status unavailable");
            (0, 0)
        }
    };

    let status = if database && migrations_applied == migrations_total {
        "healthy"
    } else {
        "degraded"
    };

    ok(HealthStatus {
        status,
        database,
        migrations_applied,
        migrations_total,
        version: API_VERSION,
    })
}

#[derive(Debug, Serialize)]
pub struct SettingsView {
    pub cafe_name: String,
    pub tax_rate: Percent,
    pub currency_symbol: String,
    pub order_prefix: String,
    /// Minutes east of UTC.
    pub utc_offset_minutes: i32,
}

/// Settings in force; loaded at startup.
pub async fn settings(State(state): State<AppState>) -> ApiResult<SettingsView> {
    let settings = &state.settings;
    ok(SettingsView {
        cafe_name: settings.cafe_name.clone(),
        tax_rate: settings.tax_rate,
        currency_symbol: settings.currency_symbol.clone(),
        order_prefix: settings.order_prefix.clone(),
        utc_offset_minutes: settings.utc_offset.local_minus_utc() / 60,
    })
}
