// Migration Engine - one-way copy from the relational store into documents
//
// Order is fixed: patients, doctors, clinics, then appointments, because an
// appointment can only be written once its three references exist as
// documents. Runs sequentially with no checkpoint; a failed row is tallied
// and the batch continues.

pub mod report;

pub use report::{EntityTally, MigrationReport};

use super::documents::DocumentCatalog;
use super::relational::mapping::{self, column, table};
use crate::domain::AppointmentStatus;
use crate::error::{AppError, Result};
use crate::port::SqlExecutor;
use crate::sql::{Row, SqlValue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Appointment cap used when the caller does not pick one
pub const DEFAULT_APPOINTMENT_LIMIT: u64 = 100;

/// Notes attached to migrated appointments whose row has none
pub const MIGRATED_NOTE: &str = "Migrated from relational store";

/// How appointment documents get their ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentIdStrategy {
    /// Fresh id per write; re-running duplicates appointment documents
    #[default]
    Generated,
    /// Id derived from clinic|doctor|patient|timestamp; re-runs overwrite
    Composite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationOptions {
    /// Most recent N appointments; `None` migrates all of them
    pub appointment_limit: Option<u64>,
    pub appointment_ids: AppointmentIdStrategy,
}

impl Default for MigrationOptions {
    fn default() -> Self {
        Self {
            appointment_limit: Some(DEFAULT_APPOINTMENT_LIMIT),
            appointment_ids: AppointmentIdStrategy::default(),
        }
    }
}

pub struct MigrationEngine {
    executor: Arc<dyn SqlExecutor>,
    catalog: Arc<DocumentCatalog>,
    options: MigrationOptions,
}

impl MigrationEngine {
    pub fn new(
        executor: Arc<dyn SqlExecutor>,
        catalog: Arc<DocumentCatalog>,
        options: MigrationOptions,
    ) -> Self {
        Self {
            executor,
            catalog,
            options,
        }
    }

    /// Migrate everything and return the per-entity tallies
    ///
    /// Fails before any write when either side is unreachable.
    pub async fn run(&self) -> Result<MigrationReport> {
        if !self.executor.ensure_connected().await {
            return Err(AppError::Connectivity(
                "Relational store is not reachable".to_string(),
            ));
        }
        info!("Relational store connected");

        self.catalog.store().connect().await?;
        info!("Document store connected");

        info!(
            mode = %self.catalog.mode(),
            appointment_limit = ?self.options.appointment_limit,
            appointment_ids = ?self.options.appointment_ids,
            "Starting relational to document migration"
        );

        let mut report =
            MigrationReport::new(self.catalog.mode(), self.options.appointment_ids);
        report.patients = self.migrate_patients().await;
        report.doctors = self.migrate_doctors().await;
        report.clinics = self.migrate_clinics().await;
        report.appointments = self.migrate_appointments().await;

        report.log_summary();
        Ok(report)
    }

    /// Read source rows; a failed read counts as one error for the entity
    async fn read(
        &self,
        entity: &str,
        statement: &str,
        limit: Option<u64>,
        tally: &mut EntityTally,
    ) -> Vec<Row> {
        match self
            .executor
            .fetch_all_paginated(statement, &[], limit, None)
            .await
        {
            Ok(rows) => {
                if rows.is_empty() {
                    warn!(entity, "No source rows found");
                } else {
                    info!(entity, rows = rows.len(), "Source rows loaded");
                }
                rows
            }
            Err(e) => {
                tally.failed(format!("Could not read {}: {}", entity, e.message()));
                Vec::new()
            }
        }
    }

    pub async fn migrate_patients(&self) -> EntityTally {
        let mut tally = EntityTally::default();
        let statement = format!("SELECT * FROM {}", table::PATIENTS);
        for row in self.read("patients", &statement, None, &mut tally).await {
            let outcome = async {
                let patient = mapping::patient_from_row(&row)?;
                self.catalog.create_patient(&patient).await
            }
            .await;
            record(&mut tally, "patient", &row_label(&row, column::PATIENT_ID), outcome);
        }
        tally
    }

    pub async fn migrate_doctors(&self) -> EntityTally {
        let mut tally = EntityTally::default();
        let statement = format!("SELECT * FROM {}", table::DOCTORS);
        for row in self.read("doctors", &statement, None, &mut tally).await {
            let outcome = async {
                let doctor = mapping::doctor_from_row(&row)?;
                self.catalog.create_doctor(&doctor).await
            }
            .await;
            record(&mut tally, "doctor", &row_label(&row, column::DOCTOR_ID), outcome);
        }
        tally
    }

    pub async fn migrate_clinics(&self) -> EntityTally {
        let mut tally = EntityTally::default();
        let statement = format!("SELECT * FROM {}", table::CLINICS);
        for row in self.read("clinics", &statement, None, &mut tally).await {
            let outcome = async {
                let clinic = mapping::clinic_from_row(&row)?;
                self.catalog.create_clinic(&clinic).await
            }
            .await;
            record(&mut tally, "clinic", &row_label(&row, column::CLINIC_ID), outcome);
        }
        tally
    }

    /// Most recent first, capped by `appointment_limit`
    pub async fn migrate_appointments(&self) -> EntityTally {
        let mut tally = EntityTally::default();
        let statement = format!(
            "SELECT * FROM {} ORDER BY {} DESC",
            table::APPOINTMENTS,
            column::SCHEDULED_AT
        );
        if let Some(limit) = self.options.appointment_limit {
            info!(limit, "Migrating only the most recent appointments");
        }

        let rows = self
            .read(
                "appointments",
                &statement,
                self.options.appointment_limit,
                &mut tally,
            )
            .await;
        for row in rows {
            let outcome = async {
                let appointment = mapping::appointment_from_row(
                    &row,
                    AppointmentStatus::Completed,
                    Some(MIGRATED_NOTE),
                )?;
                match self.options.appointment_ids {
                    AppointmentIdStrategy::Generated => {
                        self.catalog.create_appointment(&appointment).await?;
                    }
                    AppointmentIdStrategy::Composite => {
                        let id = self
                            .catalog
                            .id_provider()
                            .derive_id(&appointment.key().to_string());
                        self.catalog.put_appointment(&id, &appointment).await?;
                    }
                }
                Ok::<(), AppError>(())
            }
            .await;
            record(&mut tally, "appointment", &appointment_label(&row), outcome);
        }
        tally
    }
}

fn record(tally: &mut EntityTally, entity: &str, label: &str, outcome: Result<()>) {
    match outcome {
        Ok(()) => {
            debug!(entity, id = %label, "Migrated");
            tally.succeeded();
        }
        Err(e) => tally.failed(format!("{} {}: {}", entity, label, e.message())),
    }
}

fn row_label(row: &Row, col: &str) -> String {
    row.value(col)
        .and_then(SqlValue::as_text)
        .unwrap_or_else(|| "<unknown>".to_string())
}

fn appointment_label(row: &Row) -> String {
    [
        column::CLINIC_ID,
        column::DOCTOR_ID,
        column::PATIENT_ID,
        column::SCHEDULED_AT,
    ]
    .iter()
    .map(|col| row_label(row, col))
    .collect::<Vec<_>>()
    .join("|")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::documents::testing::{catalog, MemoryStore};
    use crate::config::ModelingMode;
    use crate::port::{collections, DocumentStore, ExecOutcome};
    use crate::sql::Dialect;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned rows per table and records the statements it saw
    #[derive(Default)]
    struct TableExecutor {
        tables: HashMap<&'static str, Vec<Row>>,
        down: bool,
        seen: Mutex<Vec<(String, Vec<SqlValue>)>>,
    }

    #[async_trait]
    impl SqlExecutor for TableExecutor {
        async fn ensure_connected(&self) -> bool {
            !self.down
        }

        async fn dialect(&self) -> Option<Dialect> {
            Some(Dialect::MySql)
        }

        async fn execute(&self, _: &str, _: &[SqlValue]) -> Result<ExecOutcome> {
            Ok(ExecOutcome::default())
        }

        async fn fetch_all(&self, statement: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
            self.seen
                .lock()
                .unwrap()
                .push((statement.to_string(), params.to_vec()));
            let table = statement
                .split_whitespace()
                .skip_while(|w| !w.eq_ignore_ascii_case("FROM"))
                .nth(1)
                .unwrap_or_default();
            match self.tables.get(table) {
                Some(rows) => Ok(rows.clone()),
                None => Err(AppError::Statement(format!("no such table: {}", table))),
            }
        }

        async fn fetch_one(&self, statement: &str, params: &[SqlValue]) -> Result<Option<Row>> {
            Ok(self.fetch_all(statement, params).await?.into_iter().next())
        }
    }

    fn row(pairs: &[(&str, &str)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), SqlValue::from(*v)))
            .collect()
    }

    fn source(appointment_patients: &[&str]) -> TableExecutor {
        let mut tables = HashMap::new();
        tables.insert(
            table::PATIENTS,
            vec![row(&[("CpfPaciente", "12345678901"), ("NomePac", "Maria Silva")])],
        );
        tables.insert(
            table::DOCTORS,
            vec![row(&[
                ("CodMed", "1234567"),
                ("NomeMed", "Dr. Souza"),
                ("Especialidade", "Cardiologia"),
            ])],
        );
        tables.insert(
            table::CLINICS,
            vec![row(&[("CodCli", "123456"), ("NomeCli", "Clinica Centro")])],
        );
        tables.insert(
            table::APPOINTMENTS,
            appointment_patients
                .iter()
                .map(|cpf| {
                    row(&[
                        ("CodCli", "123456"),
                        ("CodMed", "1234567"),
                        ("CpfPaciente", cpf),
                        ("Data_Hora", "2024-06-01 10:00:00"),
                    ])
                })
                .collect(),
        );
        TableExecutor {
            tables,
            ..Default::default()
        }
    }

    fn engine(
        executor: TableExecutor,
        store: Arc<MemoryStore>,
        ids: AppointmentIdStrategy,
    ) -> MigrationEngine {
        MigrationEngine::new(
            Arc::new(executor),
            Arc::new(catalog(store, ModelingMode::Embedded)),
            MigrationOptions {
                appointment_limit: Some(DEFAULT_APPOINTMENT_LIMIT),
                appointment_ids: ids,
            },
        )
    }

    #[tokio::test]
    async fn test_full_run_embedded() {
        let store = Arc::new(MemoryStore::default());
        let report = engine(
            source(&["12345678901"]),
            store.clone(),
            AppointmentIdStrategy::Generated,
        )
        .run()
        .await
        .unwrap();

        assert!(report.is_success());
        assert_eq!(report.total_migrated(), 4);

        let docs = store.list(collections::APPOINTMENTS, None).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].str_field("patient.name"), Some("Maria Silva"));
        assert_eq!(docs[0].str_field("status"), Some("completed"));
        assert_eq!(docs[0].str_field("notes"), Some(MIGRATED_NOTE));
    }

    #[tokio::test]
    async fn test_missing_reference_counts_one_error() {
        let store = Arc::new(MemoryStore::default());
        let report = engine(
            source(&["12345678901", "98765432100"]),
            store,
            AppointmentIdStrategy::Generated,
        )
        .run()
        .await
        .unwrap();

        assert_eq!(report.appointments.migrated, 1);
        assert_eq!(report.appointments.errors, 1);
        assert!(report.appointments.failures[0].contains("Patient 98765432100 not found"));
        assert!(!report.is_success());
    }

    #[tokio::test]
    async fn test_generated_ids_duplicate_on_rerun() {
        let store = Arc::new(MemoryStore::default());
        for _ in 0..2 {
            engine(
                source(&["12345678901"]),
                store.clone(),
                AppointmentIdStrategy::Generated,
            )
            .run()
            .await
            .unwrap();
        }
        assert_eq!(store.count(collections::PATIENTS).await.unwrap(), 1);
        assert_eq!(store.count(collections::APPOINTMENTS).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_composite_ids_overwrite_on_rerun() {
        let store = Arc::new(MemoryStore::default());
        for _ in 0..2 {
            engine(
                source(&["12345678901"]),
                store.clone(),
                AppointmentIdStrategy::Composite,
            )
            .run()
            .await
            .unwrap();
        }
        assert_eq!(store.count(collections::APPOINTMENTS).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_appointments_read_newest_first_with_limit() {
        let store = Arc::new(MemoryStore::default());
        let executor = Arc::new(source(&[]));
        let engine = MigrationEngine::new(
            executor.clone(),
            Arc::new(catalog(store, ModelingMode::Referenced)),
            MigrationOptions {
                appointment_limit: Some(5),
                appointment_ids: AppointmentIdStrategy::Generated,
            },
        );
        engine.migrate_appointments().await;

        let seen = executor.seen.lock().unwrap().clone();
        let (statement, params) = seen.last().unwrap();
        assert_eq!(
            statement,
            "SELECT * FROM tabelaconsulta ORDER BY Data_Hora DESC LIMIT %s"
        );
        assert_eq!(params, &vec![SqlValue::Int(5)]);
    }

    #[tokio::test]
    async fn test_bad_row_counted_and_batch_continues() {
        let store = Arc::new(MemoryStore::default());
        let mut executor = source(&[]);
        executor.tables.insert(
            table::PATIENTS,
            vec![
                row(&[("CpfPaciente", "123"), ("NomePac", "Short Id")]),
                row(&[("CpfPaciente", "12345678901"), ("NomePac", "Maria Silva")]),
            ],
        );
        let report = engine(executor, store, AppointmentIdStrategy::Generated)
            .run()
            .await
            .unwrap();

        assert_eq!(report.patients.migrated, 1);
        assert_eq!(report.patients.errors, 1);
        assert!(report.patients.failures[0].starts_with("patient 123:"));
    }

    #[tokio::test]
    async fn test_unreadable_table_is_an_error() {
        let store = Arc::new(MemoryStore::default());
        let mut executor = source(&[]);
        executor.tables.remove(table::CLINICS);
        let report = engine(executor, store, AppointmentIdStrategy::Generated)
            .run()
            .await
            .unwrap();

        assert_eq!(report.clinics.errors, 1);
        assert!(report.clinics.failures[0].contains("no such table"));
    }

    #[tokio::test]
    async fn test_unreachable_sides_abort_before_writes() {
        let store = Arc::new(MemoryStore::default());
        let mut down = source(&["12345678901"]);
        down.down = true;
        let err = engine(down, store.clone(), AppointmentIdStrategy::Generated)
            .run()
            .await
            .unwrap_err();
        assert!(err.is_connectivity());
        assert_eq!(store.count(collections::PATIENTS).await.unwrap(), 0);

        let offline = Arc::new(MemoryStore::offline());
        let err = engine(
            source(&["12345678901"]),
            offline,
            AppointmentIdStrategy::Generated,
        )
        .run()
        .await
        .unwrap_err();
        assert!(err.is_connectivity());
    }
}
