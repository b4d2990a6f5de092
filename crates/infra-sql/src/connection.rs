// Connection Pool Setup (MySQL primary, SQLite fallback)

use crate::error::map_sqlx_error;
use consultorio_core::config::DatabaseSettings;
use consultorio_core::error::{AppError, Result};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Create the MySQL pool; the connect timeout bounds the first connection
pub async fn create_mysql_pool(settings: &DatabaseSettings) -> Result<MySqlPool> {
    let options = MySqlConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .username(&settings.user)
        .password(&settings.password)
        .database(&settings.name)
        .charset("utf8mb4");

    MySqlPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)
}

/// Create a SQLite pool with WAL mode and foreign keys enforced
///
/// `location` is either a `sqlite:` URL (e.g. `sqlite::memory:`) or a file
/// path; missing parent directories and the file itself are created.
pub async fn create_sqlite_pool(location: &str) -> Result<SqlitePool> {
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
        .foreign_keys(true)
        .create_if_missing(true);

    // A shared in-memory database lives only while a connection holds it
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)
}
