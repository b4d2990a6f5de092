// Consultorio Infrastructure - Relational Adapter
// Implements: SqlExecutor over MySQL (primary) with a SQLite fallback

mod connection;
mod decode;
mod error;
mod executor;
mod manager;
mod migration;

pub use connection::{create_mysql_pool, create_sqlite_pool};
pub use error::map_sqlx_error;
pub use executor::SqlQueryExecutor;
pub use manager::{Backend, ConnectionManager};
pub use migration::{run_migrations, schema_version};
