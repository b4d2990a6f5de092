// Port Layer - Interfaces the backend adapters implement

pub mod document_store;
pub mod id_provider; // For deterministic testing
pub mod sql_executor;
pub mod time_provider;

// Re-exports
pub use document_store::{
    collections, Document, DocumentData, DocumentStore, Filter, FilterOp, OrderBy,
};
pub use id_provider::IdProvider;
pub use sql_executor::{ExecOutcome, SqlExecutor, StatementStatus};
pub use time_provider::TimeProvider;
