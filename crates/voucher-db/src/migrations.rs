//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied in file-name order. sqlx records each applied script in
//! `_sqlx_migrations` together with its checksum, so a script that was edited
//! after being applied makes startup fail with `MigrationFailed`.
//!
//! | File                         | Creates                                  |
//! |------------------------------|------------------------------------------|
//! | `001_create_discounts.sql`   | `discounts` table, unique `code`, checks |
//!
//! New schema changes go in a new `NNN_description.sql` file.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::{DbError, DbResult};

/// Embedded migrations from the workspace `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every embedded migration not yet recorded.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(migrations = MIGRATOR.migrations.len(), "Discount schema up to date");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)`.
///
/// An unmigrated database (no `_sqlx_migrations` table yet) reports zero
/// applied migrations. Any other failure is returned.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let tracked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if tracked == 0 {
        return Ok((total, 0));
    }

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await?;
    let applied = usize::try_from(applied).map_err(|e| DbError::Internal(e.to_string()))?;

    Ok((total, applied))
}
