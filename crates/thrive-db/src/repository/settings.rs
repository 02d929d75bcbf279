//! # Settings Repository
//!
//! Reads the `system_settings` key/value table into [`CheckoutSettings`].
//!
//! ## Layering
//! ```text
//! CheckoutSettings::default()     18.00% · "TC" · "₹" · +05:30
//!        │
//!        ▼  ServerConfig (THRIVE_* env vars)
//!        │
//!        ▼  system_settings rows (admin-editable, win when valid)
//!        │
//!  CheckoutSettings  ──► AppState (read once at startup, restart to reload)
//! ```

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;
use thrive_core::validation::validate_tax_rate;
use thrive_core::Percent;

/// Everything checkout needs that is configured rather than computed.
///
/// Passed explicitly into pricing and finalization; nothing reads a
/// global.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSettings {
    pub tax_rate: Percent,
    /// Order number prefix, e.g. `TC` → `TC2610190042`.
    pub order_prefix: String,
    pub currency_symbol: String,
    pub cafe_name: String,
    /// Local wall clock offset; offers and business dates use local time.
    pub utc_offset: FixedOffset,
    /// Order number retries before `OrderNumberCollision`.
    pub order_number_attempts: u32,
}

impl Default for CheckoutSettings {
    fn default() -> Self {
        CheckoutSettings {
            tax_rate: Percent::from_bps(1800),
            order_prefix: "TC".to_string(),
            currency_symbol: "₹".to_string(),
            cafe_name: "Thrive Cafe".to_string(),
            // Asia/Kolkata, which has no DST
            utc_offset: FixedOffset::east_opt(330 * 60).unwrap_or(Utc.fix()),
            order_number_attempts: 5,
        }
    }
}

impl CheckoutSettings {
    /// Café-local wall clock for a UTC instant.
    pub fn local_now(&self, at: DateTime<Utc>) -> NaiveDateTime {
        at.with_timezone(&self.utc_offset).naive_local()
    }
}

/// Order prefixes end up in receipts; keep them short and plain.
fn valid_prefix(prefix: &str) -> bool {
    !prefix.is_empty() && prefix.len() <= 10 && prefix.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Repository for the `system_settings` table.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    /// Creates a new SettingsRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Raw value for a key.
    pub async fn get(&self, key: &str) -> DbResult<Option<String>> {
        let value = sqlx::query_scalar("SELECT value FROM system_settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    /// Inserts or replaces a value. Takes effect on next startup.
    pub async fn set(&self, key: &str, value: &str) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system_settings (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Overlays stored values onto `base`.
    ///
    /// Missing or malformed rows keep the base value (malformed ones are
    /// logged), so a bad edit in the table can't stop the till.
    pub async fn load_checkout_settings(&self, base: CheckoutSettings) -> DbResult<CheckoutSettings> {
        let mut settings = base;

        if let Some(raw) = self.get("tax_rate").await? {
            match raw.parse::<Percent>().ok().filter(|r| validate_tax_rate(*r).is_ok()) {
                Some(rate) => settings.tax_rate = rate,
                None => warn!(value = %raw, "Ignoring invalid tax_rate setting"),
            }
        }

        if let Some(raw) = self.get("order_prefix").await? {
            let prefix = raw.trim().to_ascii_uppercase();
            if valid_prefix(&prefix) {
                settings.order_prefix = prefix;
            } else {
                warn!(value = %raw, "Ignoring invalid order_prefix setting");
            }
        }

        if let Some(raw) = self.get("currency_symbol").await? {
            if !raw.trim().is_empty() {
                settings.currency_symbol = raw.trim().to_string();
            }
        }

        if let Some(raw) = self.get("cafe_name").await? {
            if !raw.trim().is_empty() {
                settings.cafe_name = raw.trim().to_string();
            }
        }

        debug!(
            tax_rate = %settings.tax_rate,
            order_prefix = %settings.order_prefix,
            "Checkout settings loaded"
        );
        Ok(settings)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
