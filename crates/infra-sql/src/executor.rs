// SQL Executor Adapter - renders `%s` statements for the active backend

use crate::decode::{bind_mysql, bind_sqlite, mysql_row, sqlite_row};
use crate::error::map_sqlx_error;
use crate::manager::{Backend, ConnectionManager};
use async_trait::async_trait;
use consultorio_core::error::{AppError, Result};
use consultorio_core::port::sql_executor::{ExecOutcome, SqlExecutor, NO_CONNECTION_MESSAGE};
use consultorio_core::sql::{Dialect, Row, SqlValue, Statement};
use sqlx::mysql::MySqlPool;
use sqlx::sqlite::SqlitePool;
use sqlx::{Executor as _, Row as _};
use std::sync::Arc;
use tracing::{debug, warn};

/// `SqlExecutor` backed by whichever pool the manager currently holds
pub struct SqlQueryExecutor {
    manager: Arc<ConnectionManager>,
}

impl SqlQueryExecutor {
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    async fn active_backend(&self) -> Option<Backend> {
        if !self.manager.ensure_connected().await {
            return None;
        }
        self.manager.backend().await
    }

    async fn on_error(&self, err: &AppError) {
        if err.is_connectivity() {
            self.manager.invalidate().await;
        }
    }
}

#[async_trait]
impl SqlExecutor for SqlQueryExecutor {
    async fn ensure_connected(&self) -> bool {
        self.manager.ensure_connected().await
    }

    async fn dialect(&self) -> Option<Dialect> {
        self.manager.dialect().await
    }

    async fn execute(&self, statement: &str, params: &[SqlValue]) -> Result<ExecOutcome> {
        let parsed = Statement::parse(statement);
        parsed.check_params(params)?;

        let backend = self
            .active_backend()
            .await
            .ok_or_else(|| AppError::Connectivity(NO_CONNECTION_MESSAGE.to_string()))?;
        let sql = parsed.render(backend.dialect());
        debug!(dialect = %backend.dialect(), sql = %sql, "Executing statement");

        let result = match &backend {
            Backend::MySql(pool) => execute_mysql(pool, &sql, params).await,
            Backend::Sqlite(pool) => execute_sqlite(pool, &sql, params).await,
        };

        match result {
            Ok(outcome) => {
                if !outcome.warnings.is_empty() {
                    warn!(warnings = ?outcome.warnings, "Statement raised warnings");
                }
                Ok(outcome)
            }
            Err(e) => {
                warn!(error = %e, "Statement failed");
                self.on_error(&e).await;
                Err(e)
            }
        }
    }

    async fn fetch_all(&self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        let parsed = Statement::parse(statement);
        parsed.check_params(params)?;

        let Some(backend) = self.active_backend().await else {
            warn!("No backend available, returning no rows");
            return Ok(Vec::new());
        };
        let sql = parsed.render(backend.dialect());
        debug!(dialect = %backend.dialect(), sql = %sql, "Fetching rows");

        let result = match &backend {
            Backend::MySql(pool) => bind_mysql(sqlx::query(&sql), params)
                .fetch_all(pool)
                .await
                .map(|rows| rows.iter().map(mysql_row).collect()),
            Backend::Sqlite(pool) => bind_sqlite(sqlx::query(&sql), params)
                .fetch_all(pool)
                .await
                .map(|rows| rows.iter().map(sqlite_row).collect()),
        }
        .map_err(map_sqlx_error);

        match result {
            Err(e) if e.is_connectivity() => {
                warn!(error = %e, "Connection lost during fetch, returning no rows");
                self.on_error(&e).await;
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn fetch_one(&self, statement: &str, params: &[SqlValue]) -> Result<Option<Row>> {
        let parsed = Statement::parse(statement);
        parsed.check_params(params)?;

        let Some(backend) = self.active_backend().await else {
            warn!("No backend available, returning no row");
            return Ok(None);
        };
        let sql = parsed.render(backend.dialect());
        debug!(dialect = %backend.dialect(), sql = %sql, "Fetching row");

        let result = match &backend {
            Backend::MySql(pool) => bind_mysql(sqlx::query(&sql), params)
                .fetch_optional(pool)
                .await
                .map(|row| row.as_ref().map(mysql_row)),
            Backend::Sqlite(pool) => bind_sqlite(sqlx::query(&sql), params)
                .fetch_optional(pool)
                .await
                .map(|row| row.as_ref().map(sqlite_row)),
        }
        .map_err(map_sqlx_error);

        match result {
            Err(e) if e.is_connectivity() => {
                warn!(error = %e, "Connection lost during fetch, returning no row");
                self.on_error(&e).await;
                Ok(None)
            }
            other => other,
        }
    }
}

/// Each write is its own transaction; warnings are read before commit, on
/// the same connection
async fn execute_mysql(pool: &MySqlPool, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;

    let done = match bind_mysql(sqlx::query(sql), params).execute(&mut *tx).await {
        Ok(done) => done,
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            return Err(map_sqlx_error(e));
        }
    };

    // A bare string runs over the text protocol; preparing a statement would
    // reset the diagnostics area
    let warnings = match (&mut *tx).fetch_all("SHOW WARNINGS").await {
        Ok(rows) => rows
            .iter()
            .map(|row| {
                let level: String = row.try_get("Level").unwrap_or_default();
                let code: u32 = row.try_get("Code").unwrap_or_default();
                let message: String = row.try_get("Message").unwrap_or_default();
                format!("{} ({}): {}", level, code, message)
            })
            .collect(),
        Err(e) => {
            debug!(error = %e, "Could not read warnings");
            Vec::new()
        }
    };

    tx.commit().await.map_err(map_sqlx_error)?;
    Ok(ExecOutcome {
        rows_affected: done.rows_affected(),
        warnings,
    })
}

async fn execute_sqlite(pool: &SqlitePool, sql: &str, params: &[SqlValue]) -> Result<ExecOutcome> {
    let mut tx = pool.begin().await.map_err(map_sqlx_error)?;

    match bind_sqlite(sqlx::query(sql), params).execute(&mut *tx).await {
        Ok(done) => {
            tx.commit().await.map_err(map_sqlx_error)?;
            Ok(ExecOutcome {
                rows_affected: done.rows_affected(),
                warnings: Vec::new(),
            })
        }
        Err(e) => {
            if let Err(rollback) = tx.rollback().await {
                warn!(error = %rollback, "Rollback failed");
            }
            Err(map_sqlx_error(e))
        }
    }
}
