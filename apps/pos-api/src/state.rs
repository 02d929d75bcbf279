//! Shared application state.

use std::sync::Arc;

use thrive_db::{CheckoutSettings, Database};

use crate::config::ServerConfig;
use crate::rate_limit::RateLimiter;

/// Cloned into every handler; all fields are cheap handles.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    /// Read once at startup. Edits to `system_settings` need a restart.
    pub settings: Arc<CheckoutSettings>,
    pub rate_limiter: RateLimiter,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, settings: CheckoutSettings, config: ServerConfig) -> Self {
        AppState {
            db,
            settings: Arc::new(settings),
            rate_limiter: RateLimiter::per_minute(config.rate_limit_per_minute),
            config: Arc::new(config),
        }
    }
}
