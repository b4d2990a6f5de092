// Fallback Schema Bootstrap

use crate::error::map_sqlx_error;
use consultorio_core::error::Result;
use sqlx::{Executor as _, SqlitePool};
use tracing::info;

/// Versioned schema files, applied in order
const MIGRATIONS: [(i64, &str, &str); 2] = [
    (
        1,
        "Initial schema",
        include_str!("../migrations/001_initial_schema.sql"),
    ),
    (
        2,
        "Appointment rules",
        include_str!("../migrations/002_appointment_rules.sql"),
    ),
];

/// Bring the fallback database up to the latest schema version
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    let current_version = schema_version(pool).await?;
    info!(current_version, "Checking fallback schema");

    for (version, name, sql) in MIGRATIONS {
        if current_version < version {
            info!(version, name, "Applying schema migration");
            apply_migration(pool, sql).await?;
        }
    }

    Ok(())
}

pub async fn schema_version(pool: &SqlitePool) -> Result<i64> {
    let table_exists: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='schema_version'",
    )
    .fetch_one(pool)
    .await
    .map_err(map_sqlx_error)?;

    if table_exists == 0 {
        return Ok(0);
    }

    let version: Option<i64> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await
            .map_err(map_sqlx_error)?;
    Ok(version.unwrap_or(0))
}

/// Trigger bodies contain `;`, so each file runs as one unprepared script
async fn apply_migration(pool: &SqlitePool, sql: &str) -> Result<()> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;
    (&mut *tx).execute(sql).await.map_err(map_sqlx_error)?;
    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::create_sqlite_pool;

    #[tokio::test]
    async fn test_run_migrations() {
        let pool = create_sqlite_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        for table in ["tabelapaciente", "tabelamedico", "tabelaclinica", "tabelaconsulta"] {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count, 0, "{}", table);
        }
        assert_eq!(schema_version(&pool).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = create_sqlite_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
        assert_eq!(schema_version(&pool).await.unwrap(), 2);
    }
}
