//! POS API configuration module.
//!
//! Configuration is loaded from `THRIVE_*` environment variables with
//! fallback to defaults. An optional `.env` file is read first by `main`.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::HeaderValue;
use chrono::FixedOffset;
use thrive_core::validation::validate_tax_rate;
use thrive_core::Percent;
use thrive_db::CheckoutSettings;

/// POS API configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    /// HTTP listen address
    pub bind_addr: SocketAddr,

    /// SQLite database file
    pub database_path: PathBuf,

    pub db_max_connections: u32,

    /// Fallback tax rate when `system_settings` has none
    pub tax_rate: Percent,

    /// Fallback order number prefix
    pub order_prefix: String,

    pub currency_symbol: String,

    /// Café wall clock offset from UTC, in minutes (330 = IST)
    pub utc_offset_minutes: i32,

    /// Requests per client IP per minute
    pub rate_limit_per_minute: u32,

    /// Order number regenerations before giving up
    pub order_number_attempts: u32,

    /// Allowed CORS origins; empty means any origin
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_path: PathBuf::from("thrive.db"),
            db_max_connections: 5,
            tax_rate: Percent::from_bps(1800),
            order_prefix: "TC".to_string(),
            currency_symbol: "₹".to_string(),
            utc_offset_minutes: 330,
            rate_limit_per_minute: 100,
            order_number_attempts: 5,
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; unset keys keep defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ServerConfig::default();
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let config = ServerConfig {
            bind_addr: match get("THRIVE_BIND_ADDR") {
                Some(v) => v
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("THRIVE_BIND_ADDR".to_string()))?,
                None => defaults.bind_addr,
            },

            database_path: get("THRIVE_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),

            db_max_connections: match get("THRIVE_DB_MAX_CONNECTIONS") {
                Some(v) => v
                    .parse()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| ConfigError::InvalidValue("THRIVE_DB_MAX_CONNECTIONS".to_string()))?,
                None => defaults.db_max_connections,
            },

            tax_rate: match get("THRIVE_TAX_RATE") {
                Some(v) => v
                    .parse::<Percent>()
                    .ok()
                    .filter(|r| validate_tax_rate(*r).is_ok())
                    .ok_or_else(|| ConfigError::InvalidValue("THRIVE_TAX_RATE".to_string()))?,
                None => defaults.tax_rate,
            },

            order_prefix: match get("THRIVE_ORDER_PREFIX") {
                Some(v) if v.len() <= 10 && v.chars().all(|c| c.is_ascii_alphanumeric()) => {
                    v.to_ascii_uppercase()
                }
                Some(_) => return Err(ConfigError::InvalidValue("THRIVE_ORDER_PREFIX".to_string())),
                None => defaults.order_prefix,
            },

            currency_symbol: get("THRIVE_CURRENCY_SYMBOL").unwrap_or(defaults.currency_symbol),

            utc_offset_minutes: match get("THRIVE_UTC_OFFSET_MINUTES") {
                Some(v) => v
                    .parse::<i32>()
                    .ok()
                    .filter(|m| FixedOffset::east_opt(m * 60).is_some())
                    .ok_or_else(|| ConfigError::InvalidValue("THRIVE_UTC_OFFSET_MINUTES".to_string()))?,
                None => defaults.utc_offset_minutes,
            },

            rate_limit_per_minute: match get("THRIVE_RATE_LIMIT_PER_MINUTE") {
                Some(v) => v
                    .parse()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        ConfigError::InvalidValue("THRIVE_RATE_LIMIT_PER_MINUTE".to_string())
                    })?,
                None => defaults.rate_limit_per_minute,
            },

            order_number_attempts: match get("THRIVE_ORDER_NUMBER_ATTEMPTS") {
                Some(v) => v
                    .parse()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        ConfigError::InvalidValue("THRIVE_ORDER_NUMBER_ATTEMPTS".to_string())
                    })?,
                None => defaults.order_number_attempts,
            },

            cors_origins: match get("THRIVE_CORS_ORIGINS") {
                Some(v) => v
                    .split(',')
                    .map(str::trim)
                    .filter(|o| !o.is_empty())
                    .map(str::to_string)
                    .collect(),
                None => defaults.cors_origins,
            },
        };

        // Origins end up in response headers
        if config
            .cors_origins
            .iter()
            .any(|origin| HeaderValue::from_str(origin).is_err())
        {
            return Err(ConfigError::InvalidValue("THRIVE_CORS_ORIGINS".to_string()));
        }

        Ok(config)
    }

    /// Café-local offset. Validated at load time.
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| CheckoutSettings::default().utc_offset)
    }

    /// Checkout settings before `system_settings` rows are applied.
    pub fn checkout_defaults(&self) -> CheckoutSettings {
        CheckoutSettings {
            tax_rate: self.tax_rate,
            order_prefix: self.order_prefix.clone(),
            currency_symbol: self.currency_symbol.clone(),
            utc_offset: self.utc_offset(),
            order_number_attempts: self.order_number_attempts,
            ..CheckoutSettings::default()
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

// =============================================================================
// Unit Tests
// =============================================================================
