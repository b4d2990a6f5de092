//! Consultorio CLI - status, fallback schema, demo data, relational to
//! document migration and ad-hoc statements against either store

mod settings;
mod telemetry;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use consultorio_core::application::{
    AppointmentIdStrategy, DocumentCatalog, MigrationEngine, MigrationOptions, MigrationReport,
    ReconnectPolicy, SchedulingRepository, SeedPlan, SeedReport, Seeder,
};
use consultorio_core::config::{AppConfig, ModelingMode};
use consultorio_core::port::id_provider::UuidProvider;
use consultorio_core::port::time_provider::SystemTimeProvider;
use consultorio_core::port::{DocumentStore, Filter, FilterOp, OrderBy, SqlExecutor, StatementStatus};
use consultorio_core::sql::{Row, SqlValue};
use consultorio_infra_docstore::SqliteDocumentStore;
use consultorio_infra_sql::{
    create_sqlite_pool, run_migrations, schema_version, ConnectionManager, SqlQueryExecutor,
};
use serde_json::Value;
use std::future::Future;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tabled::{builder::Builder, Table, Tabled};
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const RECONNECT_BASE_DELAY_MS: u64 = 500;
const RECONNECT_BACKOFF_FACTOR: f64 = 2.0;

const EXIT_MIGRATION_ERRORS: u8 = 1;
const EXIT_STATEMENT_REJECTED: u8 = 1;
const EXIT_INTERRUPTED: u8 = 2;
const EXIT_FATAL: u8 = 3;

#[derive(Parser)]
#[command(name = "consultorio")]
#[command(about = "Consultorio data layer CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (default: ./consultorio.toml when present)
    #[arg(long, env = "CONSULTORIO_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Use the SQLite fallback without trying the primary backend
    #[arg(long, global = true)]
    demo: bool,

    /// Verbose logging
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show backend, counts and document store statistics
    Status,

    /// Create or upgrade the SQLite fallback schema
    InitSchema,

    /// Fill the relational store with generated demo data
    Populate {
        #[arg(long, default_value = "200")]
        patients: usize,

        #[arg(long, default_value = "80")]
        doctors: usize,

        /// At most one clinic per built-in clinic name (12)
        #[arg(long, default_value = "12")]
        clinics: usize,

        #[arg(long, default_value = "1500")]
        appointments: usize,

        /// Delete all scheduling rows first
        #[arg(long)]
        clear: bool,

        /// RNG seed for reproducible data
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Copy relational records into the document store
    Migrate {
        /// Most recent N appointments to migrate
        #[arg(long, default_value = "100")]
        appointment_limit: u64,

        /// Migrate every appointment (ignores --appointment-limit)
        #[arg(long)]
        all_appointments: bool,

        /// Appointment document shape (embedded | referenced)
        #[arg(long)]
        mode: Option<ModelingMode>,

        /// Derive appointment ids from clinic|doctor|patient|timestamp so
        /// re-runs overwrite instead of duplicating
        #[arg(long)]
        stable_appointment_ids: bool,
    },

    /// Run a statement against the relational store (`%s` placeholders)
    Sql {
        statement: String,

        /// Positional parameter; the literal NULL binds SQL NULL
        #[arg(short, long = "param")]
        params: Vec<String>,
    },

    /// Query a document collection
    Query {
        /// Collection name (patients, doctors, clinics, appointments)
        collection: String,

        /// Condition `field op value`, e.g. `status == "scheduled"`;
        /// values are JSON when they parse, plain strings otherwise
        #[arg(short = 'w', long = "where")]
        conditions: Vec<String>,

        /// Field to order by
        #[arg(long)]
        order_by: Option<String>,

        /// Descending order
        #[arg(long)]
        desc: bool,

        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match settings::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "✗ Configuration error:".red().bold(), e);
            return ExitCode::from(EXIT_FATAL);
        }
    };
    if cli.demo {
        config.database.demo = true;
    }

    let _log_guard = match telemetry::init_logging(cli.debug || config.docstore.debug) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "✗ Logging setup failed:".red().bold(), e);
            return ExitCode::from(EXIT_FATAL);
        }
    };

    info!("Consultorio CLI v{}", VERSION);

    match run(cli.command, config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(command: Commands, config: AppConfig) -> Result<ExitCode> {
    match command {
        Commands::Status => status(&config).await,
        Commands::InitSchema => init_schema(&config).await,
        Commands::Populate {
            patients,
            doctors,
            clinics,
            appointments,
            clear,
            seed,
        } => {
            let plan = SeedPlan {
                patients,
                doctors,
                clinics,
                appointments,
                clear_existing: clear,
                rng_seed: seed,
            };
            populate(&config, plan).await
        }
        Commands::Migrate {
            appointment_limit,
            all_appointments,
            mode,
            stable_appointment_ids,
        } => {
            let options = MigrationOptions {
                appointment_limit: (!all_appointments).then_some(appointment_limit),
                appointment_ids: if stable_appointment_ids {
                    AppointmentIdStrategy::Composite
                } else {
                    AppointmentIdStrategy::Generated
                },
            };
            migrate(&config, mode.unwrap_or(config.docstore.modeling_mode), options).await
        }
        Commands::Sql { statement, params } => sql(&config, &statement, params).await,
        Commands::Query {
            collection,
            conditions,
            order_by,
            desc,
            limit,
        } => {
            let order = order_by.map(|field| {
                if desc {
                    OrderBy::desc(field)
                } else {
                    OrderBy::asc(field)
                }
            });
            query(&config, &collection, &conditions, order.as_ref(), limit).await
        }
    }
}

// --- wiring ---

fn relational(config: &AppConfig) -> (Arc<ConnectionManager>, Arc<SqlQueryExecutor>) {
    let policy = ReconnectPolicy::new(
        config.database.connect_attempts,
        RECONNECT_BASE_DELAY_MS,
        RECONNECT_BACKOFF_FACTOR,
    );
    let manager = Arc::new(ConnectionManager::new(config.database.clone(), policy));
    let executor = Arc::new(SqlQueryExecutor::new(manager.clone()));
    (manager, executor)
}

fn documents(config: &AppConfig, mode: ModelingMode) -> (Arc<SqliteDocumentStore>, Arc<DocumentCatalog>) {
    let id_provider = Arc::new(UuidProvider);
    let store = Arc::new(SqliteDocumentStore::new(
        config.docstore.path.clone(),
        id_provider.clone(),
    ));
    let catalog = Arc::new(DocumentCatalog::new(
        store.clone(),
        mode,
        id_provider,
        Arc::new(SystemTimeProvider),
    ));
    (store, catalog)
}

/// Run `work` unless `interrupt` resolves first
async fn until_interrupted<T>(
    work: impl Future<Output = T>,
    interrupt: impl Future<Output = ()>,
) -> Option<T> {
    tokio::select! {
        output = work => Some(output),
        _ = interrupt => None,
    }
}

/// Resolves on Ctrl-C; pends forever when the handler cannot be installed
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

// --- commands ---

async fn status(config: &AppConfig) -> Result<ExitCode> {
    println!("{}", "Relational store".cyan().bold());
    let (manager, executor) = relational(config);

    if manager.connect().await {
        let dialect = manager
            .dialect()
            .await
            .map(|d| d.to_string())
            .unwrap_or_default();
        println!("  {} {}", "Status:".bold(), "ONLINE".green());
        println!("  {} {}", "Backend:".bold(), dialect);
        if config.database.demo || dialect == "sqlite" {
            println!("  {} {}", "File:".bold(), config.database.sqlite_path);
        } else {
            println!("  {} {}", "Target:".bold(), config.database.primary_label());
        }

        let repository = SchedulingRepository::new(executor);
        match repository.counts().await {
            Ok(counts) => {
                println!("  {} {}", "Patients:".bold(), counts.patients);
                println!("  {} {}", "Doctors:".bold(), counts.doctors);
                println!("  {} {}", "Clinics:".bold(), counts.clinics);
                println!("  {} {}", "Appointments:".bold(), counts.appointments);
                println!("  {} {}", "Today:".bold(), counts.appointments_today);
                println!("  {} {}", "Upcoming:".bold(), counts.upcoming_appointments);
            }
            Err(e) => println!("  {} {}", "Counts unavailable:".yellow(), e.message()),
        }
        manager.close().await;
    } else {
        println!("  {} {}", "Status:".bold(), "OFFLINE".red());
        println!("  {} {}", "Target:".bold(), config.database.primary_label());
    }

    println!();
    println!("{}", "Document store".cyan().bold());
    let credentials = std::env::var(settings::CREDENTIALS_VAR).ok();
    if let Some(notice) = settings::credentials_notice(credentials.as_deref(), &config.docstore.path) {
        println!("  {} {}", "Note:".yellow().bold(), notice);
    }
    let (store, catalog) = documents(config, config.docstore.modeling_mode);
    match store.connect().await {
        Ok(()) => {
            println!("  {} {}", "Status:".bold(), "ONLINE".green());
            println!("  {} {}", "Backend:".bold(), "sqlite (JSON documents)");
            println!("  {} {}", "File:".bold(), store.location());
            let stats = catalog.statistics().await?;
            println!("  {} {}", "Mode:".bold(), stats.modeling_mode);
            println!("  {} {}", "Patients:".bold(), stats.patients);
            println!("  {} {}", "Doctors:".bold(), stats.doctors);
            println!("  {} {}", "Clinics:".bold(), stats.clinics);
            println!("  {} {}", "Appointments:".bold(), stats.appointments);
            store.close().await;
        }
        Err(e) => {
            println!("  {} {}", "Status:".bold(), "ERROR".red());
            println!("  {} {}", "Error:".bold(), e.message());
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn init_schema(config: &AppConfig) -> Result<ExitCode> {
    let path = &config.database.sqlite_path;
    let pool = create_sqlite_pool(path)
        .await
        .with_context(|| format!("Cannot open {}", path))?;
    run_migrations(&pool).await.context("Schema migration failed")?;
    let version = schema_version(&pool).await?;
    pool.close().await;

    println!("{}", "✓ Fallback schema ready".green().bold());
    println!("  {} {}", "File:".bold(), path);
    println!("  {} {}", "Version:".bold(), version);
    Ok(ExitCode::SUCCESS)
}

#[derive(Tabled)]
struct ReportRow {
    entity: &'static str,
    migrated: usize,
    errors: usize,
}

async fn migrate(
    config: &AppConfig,
    mode: ModelingMode,
    options: MigrationOptions,
) -> Result<ExitCode> {
    let (manager, executor) = relational(config);
    let (store, catalog) = documents(config, mode);

    println!("{}", "Migrating relational records to documents...".cyan().bold());
    println!("  {} {}", "Mode:".bold(), mode);
    match options.appointment_limit {
        Some(limit) => println!("  {} {}", "Appointments:".bold(), format!("latest {}", limit)),
        None => println!("  {} {}", "Appointments:".bold(), "all"),
    }
    println!();

    let engine = MigrationEngine::new(executor, catalog, options);
    let result = until_interrupted(engine.run(), ctrl_c()).await;
    manager.close().await;
    store.close().await;

    let report = match result {
        None => {
            println!("{}", "✗ Migration interrupted".yellow().bold());
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
        Some(Ok(report)) => report,
        Some(Err(e)) => {
            println!("{} {}", "✗ Migration aborted:".red().bold(), e.message());
            return Ok(ExitCode::from(EXIT_FATAL));
        }
    };

    print_report(&report);
    if report.is_success() {
        println!("{}", "✓ Migration completed".green().bold());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{}",
            format!("⚠ Migration completed with {} error(s)", report.total_errors())
                .yellow()
                .bold()
        );
        Ok(ExitCode::from(EXIT_MIGRATION_ERRORS))
    }
}

fn print_report(report: &MigrationReport) {
    let rows: Vec<ReportRow> = report
        .entries()
        .into_iter()
        .map(|(entity, tally)| ReportRow {
            entity,
            migrated: tally.migrated,
            errors: tally.errors,
        })
        .collect();
    println!("{}", Table::new(rows));
    println!();

    for (entity, tally) in report.entries() {
        for reason in &tally.failures {
            println!("  {} {}: {}", "✗".red(), entity, reason);
        }
    }
}

async fn populate(config: &AppConfig, plan: SeedPlan) -> Result<ExitCode> {
    let (manager, executor) = relational(config);

    println!("{}", "Generating demo data...".cyan().bold());
    if plan.clear_existing {
        println!("  {}", "Existing scheduling rows will be deleted".yellow());
    }
    println!();

    let seeder = Seeder::new(
        SchedulingRepository::new(executor),
        Arc::new(SystemTimeProvider),
        plan,
    );
    let result = until_interrupted(seeder.run(), ctrl_c()).await;
    manager.close().await;

    match result {
        None => {
            println!("{}", "✗ Population interrupted".yellow().bold());
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        Some(Ok(report)) => {
            print_seed_report(&report);
            println!("{}", "✓ Demo data ready".green().bold());
            Ok(ExitCode::SUCCESS)
        }
        Some(Err(e)) => {
            println!("{} {}", "✗ Population aborted:".red().bold(), e.message());
            Ok(ExitCode::from(EXIT_FATAL))
        }
    }
}

#[derive(Tabled)]
struct SeedRow {
    table: &'static str,
    inserted: usize,
}

fn print_seed_report(report: &SeedReport) {
    let rows: Vec<SeedRow> = report
        .entries()
        .into_iter()
        .map(|(table, inserted)| SeedRow { table, inserted })
        .collect();
    println!("{}", Table::new(rows));
    if report.rejected > 0 {
        println!(
            "{}",
            format!("{} row(s) rejected by the backend", report.rejected).dimmed()
        );
    }
    println!();
}

async fn sql(config: &AppConfig, statement: &str, params: Vec<String>) -> Result<ExitCode> {
    let (manager, executor) = relational(config);
    let params: Vec<SqlValue> = params
        .into_iter()
        .map(|p| if p == "NULL" { SqlValue::Null } else { SqlValue::Text(p) })
        .collect();

    let code = if is_read(statement) {
        let rows = executor.fetch_all(statement, &params).await?;
        if rows.is_empty() {
            println!("{}", "(no rows)".dimmed());
        } else {
            println!("{}", rows_table(&rows));
            println!("{}", format!("{} row(s)", rows.len()).dimmed());
        }
        ExitCode::SUCCESS
    } else {
        let status = StatementStatus::from(executor.execute(statement, &params).await);
        print_status(&status);
        if status.success {
            ExitCode::SUCCESS
        } else {
            ExitCode::from(EXIT_STATEMENT_REJECTED)
        }
    };

    manager.close().await;
    Ok(code)
}

fn is_read(statement: &str) -> bool {
    let keyword = statement
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase();
    matches!(
        keyword.as_str(),
        "SELECT" | "WITH" | "SHOW" | "PRAGMA" | "EXPLAIN" | "DESCRIBE"
    )
}

fn rows_table(rows: &[Row]) -> String {
    let mut builder = Builder::default();
    if let Some(first) = rows.first() {
        builder.push_record(first.columns().map(|(name, _)| name.to_string()));
    }
    for row in rows {
        builder.push_record(row.columns().map(|(_, value)| match value {
            SqlValue::Null => "NULL".to_string(),
            other => other.as_text().unwrap_or_default(),
        }));
    }
    builder.build().to_string()
}

fn print_status(status: &StatementStatus) {
    if status.is_business_rule() {
        println!("{} {}", "✗ Rule:".red().bold(), status.message);
    } else if status.has_warnings() {
        println!("{} {}", "⚠".yellow().bold(), status.message.yellow());
    } else if status.success {
        println!("{} {}", "✓".green().bold(), status.message);
    } else {
        println!("{} {}", "✗".red().bold(), status.message);
    }
}

async fn query(
    config: &AppConfig,
    collection: &str,
    conditions: &[String],
    order: Option<&OrderBy>,
    limit: Option<usize>,
) -> Result<ExitCode> {
    let filters = conditions
        .iter()
        .map(|c| parse_condition(c))
        .collect::<Result<Vec<_>>>()?;

    let (store, _) = documents(config, config.docstore.modeling_mode);
    store.connect().await?;
    let docs = store.query(collection, &filters, order, limit).await?;
    store.close().await;

    for doc in &docs {
        println!("{}", serde_json::to_string_pretty(&doc.to_json())?);
    }
    println!("{}", format!("{} document(s)", docs.len()).dimmed());
    Ok(ExitCode::SUCCESS)
}

/// `field op value`; the value is JSON when it parses, a plain string otherwise
fn parse_condition(condition: &str) -> Result<Filter> {
    let mut parts = condition.trim().splitn(3, char::is_whitespace);
    let (Some(field), Some(op), Some(raw)) = (parts.next(), parts.next(), parts.next()) else {
        anyhow::bail!("Condition must be `field op value`: {}", condition);
    };
    let op: FilterOp = op.parse()?;
    let raw = raw.trim();
    let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok(Filter::new(field, op, value))
}
