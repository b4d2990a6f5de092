// Application Layer - Use Cases and Business Logic

pub mod documents;
pub mod migration;
pub mod relational;
pub mod retry;
pub mod seeding;

// Re-exports
pub use documents::{CatalogStatistics, DocumentCatalog, StoredAppointment};
pub use migration::{
    AppointmentIdStrategy, EntityTally, MigrationEngine, MigrationOptions, MigrationReport,
};
pub use relational::{AppointmentSummary, SchedulingCounts, SchedulingRepository, SelectOption};
pub use retry::{ReconnectPolicy, RetryDecision};
pub use seeding::{SeedPlan, SeedReport, Seeder};
