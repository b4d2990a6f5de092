// Domain Error Types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid {kind} identifier '{value}': expected {digits} digits")]
    InvalidIdentifier {
        kind: &'static str,
        value: String,
        digits: usize,
    },

    #[error("Invalid gender: {0}")]
    InvalidGender(String),

    #[error("Invalid appointment status: {0}")]
    InvalidStatus(String),

    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Validation error: {0}")]
    ValidationError(String),
}

pub type Result<T> = std::result::Result<T, DomainError>;
