//! # Database Migrations
//!
//! Embedded SQL migrations for CardPOS.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Startup                                                                │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  _sqlx_migrations (created if missing)                                  │
//! │     │                                                                   │
//! │     ├── 0001_initial_schema.sql     ✓ applied                           │
//! │     ├── 0002_stock_movements.sql    ✓ applied                           │
//! │     └── 0003_discount_campaigns.sql ⬜ pending → run, record version     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Adding New Migrations
//! 1. Add `NNNN_description.sql` to `migrations/sqlite/` with the next number
//! 2. Additive only, guarded with `IF NOT EXISTS`
//! 3. **Never** edit an applied migration

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Migrations embedded from `migrations/sqlite` at compile time.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending migrations, in version order, each in its own
/// transaction. Safe to call repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns (total_migrations, applied_migrations).
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    // Table is absent until the first run.
    let applied: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    Ok((total, applied as usize))
}
