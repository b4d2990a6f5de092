//! Shared wiring for the scenario tests: both stores in memory

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use consultorio_core::application::{DocumentCatalog, ReconnectPolicy, SchedulingRepository};
use consultorio_core::config::{DatabaseSettings, ModelingMode};
use consultorio_core::domain::{Appointment, Clinic, ClinicId, Doctor, DoctorId, Gender, Patient, PatientId};
use consultorio_core::port::id_provider::UuidProvider;
use consultorio_core::port::time_provider::SystemTimeProvider;
use consultorio_infra_docstore::SqliteDocumentStore;
use consultorio_infra_sql::{ConnectionManager, SqlQueryExecutor};
use std::sync::Arc;

pub const MARIA_CPF: &str = "12345678901";
pub const DOCTOR_CODE: &str = "1234567";
pub const CLINIC_CODE: &str = "123456";

pub struct Relational {
    pub manager: Arc<ConnectionManager>,
    pub executor: Arc<SqlQueryExecutor>,
    pub repository: SchedulingRepository,
}

/// Fallback backend on a private in-memory database, schema applied
pub async fn relational() -> Relational {
    let manager = Arc::new(ConnectionManager::new(
        DatabaseSettings::demo("sqlite::memory:"),
        ReconnectPolicy::default(),
    ));
    assert!(manager.connect().await, "fallback backend should open");
    let executor = Arc::new(SqlQueryExecutor::new(manager.clone()));
    let repository = SchedulingRepository::new(executor.clone());
    Relational {
        manager,
        executor,
        repository,
    }
}

pub struct Documents {
    pub store: Arc<SqliteDocumentStore>,
    pub catalog: Arc<DocumentCatalog>,
}

pub fn documents(mode: ModelingMode) -> Documents {
    let id_provider = Arc::new(UuidProvider);
    let store = Arc::new(SqliteDocumentStore::new("sqlite::memory:", id_provider.clone()));
    let catalog = Arc::new(DocumentCatalog::new(
        store.clone(),
        mode,
        id_provider,
        Arc::new(SystemTimeProvider),
    ));
    Documents { store, catalog }
}

pub fn at(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap()
}

pub fn maria() -> Patient {
    Patient {
        id: PatientId::new(MARIA_CPF).unwrap(),
        name: "Maria Silva".to_string(),
        birth_date: NaiveDate::from_ymd_opt(1985, 3, 12),
        gender: Some(Gender::Female),
        phone: Some("11999990000".to_string()),
        email: Some("maria@example.com".to_string()),
    }
}

pub fn patient(cpf: &str, name: &str) -> Patient {
    Patient::new(PatientId::new(cpf).unwrap(), name)
}

pub fn cardiologist() -> Doctor {
    Doctor {
        specialty: Some("Cardiologia".to_string()),
        ..Doctor::new(DoctorId::new(DOCTOR_CODE).unwrap(), "Dr. Souza")
    }
}

pub fn clinic() -> Clinic {
    Clinic {
        address: Some("Rua das Flores, 100".to_string()),
        ..Clinic::new(ClinicId::new(CLINIC_CODE).unwrap(), "Clinica Central")
    }
}

pub fn appointment(patient: &Patient, when: &str) -> Appointment {
    Appointment::new(
        ClinicId::new(CLINIC_CODE).unwrap(),
        DoctorId::new(DOCTOR_CODE).unwrap(),
        patient.id.clone(),
        at(when),
    )
}

/// Maria, the cardiologist and the clinic, plus Maria's appointment
pub async fn seed_scenario(rel: &Relational) {
    assert!(rel.repository.insert_patient(&maria()).await.success);
    assert!(rel.repository.insert_doctor(&cardiologist()).await.success);
    assert!(rel.repository.insert_clinic(&clinic()).await.success);
    let status = rel
        .repository
        .schedule_appointment(&appointment(&maria(), "2024-06-01 10:00:00"))
        .await;
    assert!(status.success, "{}", status.message);
}
