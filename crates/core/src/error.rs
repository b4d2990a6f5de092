// Central Error Type for the Data Layer

use thiserror::Error;

/// Application-level error type
///
/// Each variant is a failure kind callers can branch on. Backend text is kept
/// verbatim inside the variant so it can be surfaced unchanged to the UI.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(#[from] crate::domain::DomainError),

    #[error("Connectivity error: {0}")]
    Connectivity(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Statement error: {0}")]
    Statement(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Message without the kind prefix (backend text for backend errors)
    pub fn message(&self) -> String {
        match self {
            AppError::Connectivity(msg)
            | AppError::Constraint(msg)
            | AppError::BusinessRule(msg)
            | AppError::Statement(msg)
            | AppError::Validation(msg)
            | AppError::Config(msg)
            | AppError::NotFound(msg)
            | AppError::Internal(msg) => msg.clone(),
            AppError::Domain(e) => e.to_string(),
            AppError::Io(e) => e.to_string(),
            AppError::Serialization(e) => e.to_string(),
        }
    }

    pub fn is_connectivity(&self) -> bool {
        matches!(self, AppError::Connectivity(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in the infra crates
// by a map_sqlx_error helper (orphan rule)

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_strips_kind_prefix() {
        let err = AppError::BusinessRule("TRIGGER_AVISO: slot taken".to_string());
        assert_eq!(err.to_string(), "Business rule violation: TRIGGER_AVISO: slot taken");
        assert_eq!(err.message(), "TRIGGER_AVISO: slot taken");
    }
}
