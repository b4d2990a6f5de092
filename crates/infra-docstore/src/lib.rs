// Consultorio Infrastructure - Document Store Adapter
// Implements: DocumentStore over JSON documents kept in a dedicated SQLite file

mod connection;
mod filter;
mod store;

pub use connection::open_document_pool;
pub use filter::{matches_all, sort_documents};
pub use store::SqliteDocumentStore;
