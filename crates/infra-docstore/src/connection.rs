// Document database setup

use consultorio_core::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

const CREATE_DOCUMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    id TEXT NOT NULL,
    data TEXT NOT NULL,
    PRIMARY KEY (collection, id)
)
"#;

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => AppError::Statement(db_err.message().to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => AppError::Connectivity(err.to_string()),
        sqlx::Error::Configuration(_) => AppError::Config(err.to_string()),
        _ => AppError::Statement(err.to_string()),
    }
}

/// Open (and create when missing) the document database at `location`
///
/// `location` is a `sqlite:` URL or a file path. The documents table is
/// created on first open.
pub async fn open_document_pool(location: &str) -> Result<SqlitePool> {
    let in_memory = location.contains(":memory:") || location.contains("mode=memory");

    let options = if location.starts_with("sqlite:") {
        SqliteConnectOptions::from_str(location).map_err(map_sqlx_error)?
    } else {
        if let Some(parent) = Path::new(location).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::Connectivity(format!(
                        "Cannot create directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        SqliteConnectOptions::new().filename(location)
    };

    let options = options
        .journal_mode(if in_memory {
            SqliteJournalMode::Memory
        } else {
            SqliteJournalMode::Wal
        })
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)?;

    sqlx::query(CREATE_DOCUMENTS)
        .execute(&pool)
        .await
        .map_err(map_sqlx_error)?;

    Ok(pool)
}
