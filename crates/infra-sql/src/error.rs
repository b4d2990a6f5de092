// sqlx::Error -> AppError mapping (orphan rule keeps it out of core)

use consultorio_core::error::AppError;
use consultorio_core::port::sql_executor::BUSINESS_RULE_MARKER;
use sqlx::error::ErrorKind;
use sqlx::mysql::MySqlDatabaseError;

/// MySQL error raised by `SIGNAL` in a trigger
const MYSQL_SIGNAL: u16 = 1644;

/// Classify a driver error, keeping the backend's message verbatim
pub fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message().to_string();

            let signalled = db_err
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(|e| e.number() == MYSQL_SIGNAL)
                .unwrap_or(false);
            if signalled || message.contains(BUSINESS_RULE_MARKER) {
                return AppError::BusinessRule(message);
            }

            match db_err.kind() {
                ErrorKind::UniqueViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::CheckViolation => return AppError::Constraint(message),
                _ => {}
            }

            // SQLite extended result codes: https://www.sqlite.org/rescode.html
            // MySQL numbers: 1062 duplicate key, 1451/1452 foreign key
            // Busy and locked, including their extended forms, are transient
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            let number = db_err
                .try_downcast_ref::<MySqlDatabaseError>()
                .map(|e| e.number());
            match (code.as_str(), number) {
                ("2067" | "1555" | "787" | "3850" | "1299" | "275", _) => {
                    AppError::Constraint(message)
                }
                (_, Some(1062 | 1451 | 1452)) => AppError::Constraint(message),
                ("5" | "6" | "261" | "517" | "773" | "262", _) => AppError::Connectivity(message),
                _ => AppError::Statement(message),
            }
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => AppError::Connectivity(err.to_string()),
        sqlx::Error::Configuration(_) => AppError::Config(err.to_string()),
        sqlx::Error::RowNotFound => AppError::NotFound("Row not found".to_string()),
        _ => AppError::Statement(err.to_string()),
    }
}
