//! Demo data generation against the SQLite fallback

mod common;

use common::*;
use consultorio_core::application::{SeedPlan, Seeder};
use consultorio_core::port::time_provider::FixedTimeProvider;
use consultorio_core::port::SqlExecutor;
use consultorio_core::sql::SqlValue;
use std::sync::Arc;

/// 2024-06-01T00:00:00Z
const JUNE_FIRST_MS: i64 = 1_717_200_000_000;

fn small_plan() -> SeedPlan {
    SeedPlan {
        patients: 20,
        doctors: 5,
        clinics: 3,
        appointments: 40,
        clear_existing: false,
        rng_seed: Some(42),
    }
}

fn seeder(rel: &Relational, plan: SeedPlan) -> Seeder {
    Seeder::new(
        rel.repository.clone(),
        Arc::new(FixedTimeProvider(JUNE_FIRST_MS)),
        plan,
    )
}

async fn column(rel: &Relational, statement: &str) -> Vec<String> {
    rel.executor
        .fetch_all(statement, &[])
        .await
        .unwrap()
        .iter()
        .filter_map(|row| row.columns().next().and_then(|(_, v)| v.as_text()))
        .collect()
}

#[tokio::test]
async fn test_seed_counts_match_report() {
    let rel = relational().await;

    let report = seeder(&rel, small_plan()).run().await.unwrap();

    assert_eq!(report.patients, 20);
    assert_eq!(report.doctors, 5);
    assert_eq!(report.clinics, 3);
    assert_eq!(report.appointments, 40);
    assert_eq!(report.rejected, 0);

    let counts = rel.repository.counts().await.unwrap();
    assert_eq!(counts.patients, 20);
    assert_eq!(counts.doctors, 5);
    assert_eq!(counts.clinics, 3);
    assert_eq!(counts.appointments, 40);
}

#[tokio::test]
async fn test_seeded_ids_keep_their_widths() {
    let rel = relational().await;
    seeder(&rel, small_plan()).run().await.unwrap();

    let cpfs = column(&rel, "SELECT CpfPaciente FROM tabelapaciente").await;
    let doctors = column(&rel, "SELECT CodMed FROM tabelamedico").await;
    let clinics = column(&rel, "SELECT CodCli FROM tabelaclinica").await;

    assert!(cpfs.iter().all(|id| id.len() == 11), "{:?}", cpfs);
    assert!(doctors.iter().all(|id| id.len() == 7), "{:?}", doctors);
    assert!(clinics.iter().all(|id| id.len() == 6), "{:?}", clinics);
}

#[tokio::test]
async fn test_no_doctor_is_double_booked() {
    let rel = relational().await;
    seeder(&rel, small_plan()).run().await.unwrap();

    let row = rel
        .executor
        .fetch_one(
            "SELECT COUNT(*) AS total FROM (SELECT CodMed, Data_Hora FROM tabelaconsulta \
             GROUP BY CodMed, Data_Hora HAVING COUNT(*) > 1)",
            &[],
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.get("total"), Some(&SqlValue::Int(0)));

    let slots = column(&rel, "SELECT Data_Hora FROM tabelaconsulta").await;
    assert!(slots.iter().all(|s| s.as_str() >= "2024-04-02" && s.as_str() < "2024-08-03"));
}

#[tokio::test]
async fn test_clear_existing_replaces_previous_rows() {
    let rel = relational().await;
    seed_scenario(&rel).await;

    let plan = SeedPlan {
        clear_existing: true,
        ..small_plan()
    };
    seeder(&rel, plan).run().await.unwrap();

    let counts = rel.repository.counts().await.unwrap();
    assert_eq!(counts.patients, 20);
    assert_eq!(counts.appointments, 40);
    let maria = column(
        &rel,
        "SELECT CpfPaciente FROM tabelapaciente WHERE NomePac = 'Maria Silva'",
    )
    .await;
    assert!(maria.is_empty());
}

#[tokio::test]
async fn test_existing_rows_are_kept_by_default() {
    let rel = relational().await;
    seed_scenario(&rel).await;

    seeder(&rel, small_plan()).run().await.unwrap();

    let counts = rel.repository.counts().await.unwrap();
    assert_eq!(counts.patients, 21);
    assert_eq!(counts.clinics, 4);
}

#[tokio::test]
async fn test_same_seed_generates_same_patients() {
    let first = relational().await;
    let second = relational().await;

    seeder(&first, small_plan()).run().await.unwrap();
    seeder(&second, small_plan()).run().await.unwrap();

    let statement = "SELECT CpfPaciente FROM tabelapaciente ORDER BY CpfPaciente";
    assert_eq!(column(&first, statement).await, column(&second, statement).await);
}
