//! # Schema Migrations
//!
//! SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied when the pool opens, so a fresh till only needs an empty
//! file path.
//!
//! ```text
//! Database::new ──► run_migrations ──► _sqlx_migrations up to date?
//!                                          │no
//!                                          ▼
//!                           001_initial_schema.sql
//!                           (catalog, offers, orders, customers,
//!                            system_settings + default rows)
//! ```
//!
//! Applied files are checksummed by sqlx. Edit the schema with a new
//! `NNN_description.sql`, never by changing an applied one.

use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies pending migrations. A no-op on an up-to-date database.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    let (total, applied) = migration_status(pool).await?;
    if applied < total {
        info!(pending = total - applied, "Applying schema migrations");
    }

    MIGRATOR.run(pool).await?;
    Ok(())
}

/// `(embedded, applied)` counts, reported by `/api/health`.
///
/// A missing bookkeeping table (brand new file) counts as zero applied.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let embedded = MIGRATOR.migrations.len();

    let applied = match sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_one(pool)
    .await
    {
        Ok(n) => n as usize,
        Err(sqlx::Error::Database(e)) if e.message().contains("no such table") => 0,
        Err(e) => {
            warn!(error = %e, "Could not read migration table");
            0
        }
    };

    Ok((embedded, applied))
}
