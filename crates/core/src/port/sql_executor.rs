// SQL Executor Port (Interface)

use crate::error::{AppError, Result};
use crate::sql::{Dialect, Row, SqlValue, Statement};
use async_trait::async_trait;

/// Message returned for a write that raised no warnings
pub const SUCCESS_MESSAGE: &str = "Operação realizada com sucesso";

/// Prefix for a write that succeeded with backend warnings attached
pub const SUCCESS_WITH_WARNINGS_PREFIX: &str = "Operação realizada. Avisos: ";

/// Marker the UI looks for to render a soft warning
pub const WARNING_MARKER: &str = "Avisos:";

/// Marker prefixing a business-rule rejection raised by a trigger
pub const BUSINESS_RULE_MARKER: &str = "TRIGGER_AVISO:";

/// Message for writes attempted while no backend is reachable
pub const NO_CONNECTION_MESSAGE: &str = "Sem conexão com o banco de dados";

/// Outcome of a successful mutating statement
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Backend advisory notices, formatted `"{level} ({code}): {message}"`
    pub warnings: Vec<String>,
}

impl ExecOutcome {
    pub fn message(&self) -> String {
        if self.warnings.is_empty() {
            SUCCESS_MESSAGE.to_string()
        } else {
            format!("{}{}", SUCCESS_WITH_WARNINGS_PREFIX, self.warnings.join("; "))
        }
    }
}

/// `(success, message)` pair handed to UI collaborators
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementStatus {
    pub success: bool,
    pub message: String,
}

impl StatementStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Success that carried backend warnings (rendered as a soft alert)
    pub fn has_warnings(&self) -> bool {
        self.success && self.message.contains(WARNING_MARKER)
    }

    /// Rejection by a business-rule trigger (rendered as a rule alert)
    pub fn is_business_rule(&self) -> bool {
        !self.success && self.message.contains(BUSINESS_RULE_MARKER)
    }
}

impl From<Result<ExecOutcome>> for StatementStatus {
    fn from(result: Result<ExecOutcome>) -> Self {
        match result {
            Ok(outcome) => StatementStatus::ok(outcome.message()),
            Err(err) => StatementStatus::failed(err.message()),
        }
    }
}

impl From<AppError> for StatementStatus {
    fn from(err: AppError) -> Self {
        StatementStatus::failed(err.message())
    }
}

/// Backend-agnostic statement execution
///
/// Statements are authored with `%s` placeholders; implementations render
/// them for whichever backend is active.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Health probe, reconnecting when needed. Never fails.
    async fn ensure_connected(&self) -> bool;

    /// Dialect of the active backend, if any
    async fn dialect(&self) -> Option<Dialect>;

    /// Run a mutating statement (insert/update/delete)
    async fn execute(&self, statement: &str, params: &[SqlValue]) -> Result<ExecOutcome>;

    /// Fetch all rows; empty when connectivity cannot be restored
    async fn fetch_all(&self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Fetch the first row; `None` when connectivity cannot be restored
    async fn fetch_one(&self, statement: &str, params: &[SqlValue]) -> Result<Option<Row>>;

    /// Fetch with `LIMIT`/`OFFSET` appended unless the statement already has one
    async fn fetch_all_paginated(
        &self,
        statement: &str,
        params: &[SqlValue],
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Row>> {
        let (paged, extra) = Statement::parse(statement).paginate(limit, offset);
        let mut all = params.to_vec();
        all.extend(extra);
        self.fetch_all(paged.source(), &all).await
    }
}
