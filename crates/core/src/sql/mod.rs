// SQL Layer - Backend-neutral statements, values and rows

pub mod row;
pub mod statement;
pub mod value;

// Re-exports
pub use row::Row;
pub use statement::{Dialect, Statement};
pub use value::SqlValue;
