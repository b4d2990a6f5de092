// Connection Manager - owns the single active relational backend

use crate::connection::{create_mysql_pool, create_sqlite_pool};
use crate::migration::run_migrations;
use consultorio_core::application::{ReconnectPolicy, RetryDecision};
use consultorio_core::config::DatabaseSettings;
use consultorio_core::error::Result;
use consultorio_core::sql::Dialect;
use sqlx::mysql::MySqlPool;
use sqlx::sqlite::SqlitePool;
use sqlx::Connection;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Handle to the active backend (pools are cheap to clone)
#[derive(Debug, Clone)]
pub enum Backend {
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl Backend {
    pub fn dialect(&self) -> Dialect {
        match self {
            Backend::MySql(_) => Dialect::MySql,
            Backend::Sqlite(_) => Dialect::Sqlite,
        }
    }
}

/// Decides between the primary backend and the SQLite fallback, and keeps
/// the chosen handle healthy
///
/// Connection failures are logged and reported as `false`, never raised.
pub struct ConnectionManager {
    settings: DatabaseSettings,
    policy: ReconnectPolicy,
    backend: Mutex<Option<Backend>>,
}

impl ConnectionManager {
    pub fn new(settings: DatabaseSettings, policy: ReconnectPolicy) -> Self {
        Self {
            settings,
            policy,
            backend: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &DatabaseSettings {
        &self.settings
    }

    /// Open a backend, replacing any current one
    ///
    /// The lock is only taken to install the result, so readers of
    /// `backend()` are not held up by connect retries.
    pub async fn connect(&self) -> bool {
        let opened = self.open().await;
        let connected = opened.is_some();
        *self.backend.lock().await = opened;
        connected
    }

    async fn open(&self) -> Option<Backend> {
        if self.settings.demo {
            info!("Demo mode enabled, using SQLite fallback");
            return self.open_sqlite().await;
        }

        match self.open_mysql().await {
            Ok(pool) => Some(Backend::MySql(pool)),
            Err(e) => {
                warn!(
                    target_db = %self.settings.primary_label(),
                    error = %e,
                    "Primary backend unavailable"
                );
                if self.settings.use_sqlite_fallback {
                    info!("Falling back to SQLite");
                    self.open_sqlite().await
                } else {
                    error!("SQLite fallback disabled, no backend available");
                    None
                }
            }
        }
    }

    async fn open_mysql(&self) -> Result<MySqlPool> {
        let label = self.settings.primary_label();
        let mut attempt = 0;
        loop {
            match create_mysql_pool(&self.settings).await {
                Ok(pool) => {
                    info!(target_db = %label, "Connected to MySQL");
                    return Ok(pool);
                }
                Err(e) => match self.policy.decide(attempt, &label) {
                    RetryDecision::Retry(delay_ms) => {
                        warn!(target_db = %label, error = %e, delay_ms, "MySQL connect failed, retrying");
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        attempt += 1;
                    }
                    RetryDecision::GiveUp => return Err(e),
                },
            }
        }
    }

    async fn open_sqlite(&self) -> Option<Backend> {
        let path = &self.settings.sqlite_path;
        let pool = match create_sqlite_pool(path).await {
            Ok(pool) => pool,
            Err(e) => {
                error!(path = %path, error = %e, "Failed to open SQLite fallback");
                return None;
            }
        };

        if let Err(e) = run_migrations(&pool).await {
            error!(path = %path, error = %e, "Failed to create SQLite schema");
            pool.close().await;
            return None;
        }

        info!(path = %path, "Using SQLite fallback");
        Some(Backend::Sqlite(pool))
    }

    /// Health probe; reconnects when needed
    ///
    /// SQLite is a presence check. MySQL is pinged, and a failed ping closes
    /// the stale pool and runs `connect()` again.
    pub async fn ensure_connected(&self) -> bool {
        let current = self.backend.lock().await.clone();
        match current {
            Some(Backend::Sqlite(pool)) if !pool.is_closed() => true,
            Some(Backend::MySql(pool)) => {
                if ping(&pool).await {
                    return true;
                }
                warn!("MySQL ping failed, reconnecting");
                pool.close().await;
                self.connect().await
            }
            _ => self.connect().await,
        }
    }

    /// Release the SQLite file handle; a MySQL pool stays for the process
    pub async fn close(&self) {
        let mut guard = self.backend.lock().await;
        if let Some(Backend::Sqlite(pool)) = guard.as_ref() {
            pool.close().await;
            *guard = None;
            info!("SQLite fallback closed");
        }
    }

    /// Drop a MySQL handle after a connectivity error so the next call
    /// reconnects
    pub async fn invalidate(&self) {
        let stale = {
            let mut guard = self.backend.lock().await;
            match guard.as_ref() {
                Some(Backend::MySql(_)) => guard.take(),
                _ => None,
            }
        };
        if let Some(Backend::MySql(pool)) = stale {
            debug!("Dropping MySQL handle after connectivity error");
            pool.close().await;
        }
    }

    /// Current handle, without probing it
    pub async fn backend(&self) -> Option<Backend> {
        self.backend.lock().await.clone()
    }

    pub async fn dialect(&self) -> Option<Dialect> {
        self.backend().await.map(|b| b.dialect())
    }
}

async fn ping(pool: &MySqlPool) -> bool {
    match pool.acquire().await {
        Ok(mut conn) => conn.ping().await.is_ok(),
        Err(_) => false,
    }
}
