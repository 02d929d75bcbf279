//! # Thrive POS API Server
//!
//! ## Startup Sequence
//! 1. Load `.env` (optional) and initialize tracing
//! 2. Read `ServerConfig` from `THRIVE_*` variables
//! 3. Open the SQLite pool and run migrations
//! 4. Layer `system_settings` over the config defaults
//! 5. Spawn the rate-limit cleanup task
//! 6. Serve until Ctrl+C / SIGTERM, then close the pool

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use thrive_api::{build_router, AppState, ServerConfig};
use thrive_db::{Database, DbConfig};

/// How often idle rate-limit windows are pruned.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,thrive=debug,sqlx=warn")),
        )
        .with_target(true)
        .init();

    info!("Starting Thrive POS API server...");

    let config = ServerConfig::load().context("invalid configuration")?;
    info!(
        addr = %config.bind_addr,
        database = %config.database_path.display(),
        tax_rate = %config.tax_rate,
        "Configuration loaded"
    );

    let db = Database::new(
        DbConfig::new(config.database_path.clone()).max_connections(config.db_max_connections),
    )
    .await
    .context("failed to open database")?;

    let settings = db
        .settings()
        .load_checkout_settings(config.checkout_defaults())
        .await
        .context("failed to load system settings")?;
    info!(
        cafe = %settings.cafe_name,
        tax_rate = %settings.tax_rate,
        prefix = %settings.order_prefix,
        "Checkout settings loaded"
    );

    let bind_addr = config.bind_addr;
    let state = AppState::new(db.clone(), settings, config);

    let limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            limiter.cleanup();
            debug!(clients = limiter.tracked_clients(), "Rate limit windows pruned");
        }
    });

    let app = build_router(state);

    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!(%bind_addr, "Listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

    db.close().await;
    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown...");
}
