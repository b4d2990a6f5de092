// Relational repository used by the UI collaborators
//
// Every statement is written once with `%s` placeholders; the executor
// renders it for whichever backend is active.

pub mod mapping;

use crate::domain::{
    Appointment, AppointmentKey, AppointmentStatus, Clinic, ClinicId, Doctor, DoctorId, Patient,
    PatientId,
};
use crate::error::{AppError, Result};
use crate::port::{SqlExecutor, StatementStatus};
use crate::sql::{Row, SqlValue};
use mapping::column;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

const INSERT_PATIENT: &str = "INSERT INTO tabelapaciente \
     (CpfPaciente, NomePac, DataNascimento, Genero, Telefone, Email) \
     VALUES (%s, %s, %s, %s, %s, %s)";
const UPDATE_PATIENT: &str = "UPDATE tabelapaciente \
     SET NomePac = %s, DataNascimento = %s, Genero = %s, Telefone = %s, Email = %s \
     WHERE CpfPaciente = %s";
const DELETE_PATIENT: &str = "DELETE FROM tabelapaciente WHERE CpfPaciente = %s";
const SELECT_PATIENT: &str = "SELECT * FROM tabelapaciente WHERE CpfPaciente = %s";

const INSERT_DOCTOR: &str = "INSERT INTO tabelamedico \
     (CodMed, NomeMed, Genero, Telefone, Email, Especialidade) \
     VALUES (%s, %s, %s, %s, %s, %s)";
const UPDATE_DOCTOR: &str = "UPDATE tabelamedico \
     SET NomeMed = %s, Genero = %s, Telefone = %s, Email = %s, Especialidade = %s \
     WHERE CodMed = %s";
const DELETE_DOCTOR: &str = "DELETE FROM tabelamedico WHERE CodMed = %s";
const SELECT_DOCTOR: &str = "SELECT * FROM tabelamedico WHERE CodMed = %s";

const INSERT_CLINIC: &str = "INSERT INTO tabelaclinica \
     (CodCli, NomeCli, Endereco, Telefone, Email) \
     VALUES (%s, %s, %s, %s, %s)";
const UPDATE_CLINIC: &str = "UPDATE tabelaclinica \
     SET NomeCli = %s, Endereco = %s, Telefone = %s, Email = %s \
     WHERE CodCli = %s";
const DELETE_CLINIC: &str = "DELETE FROM tabelaclinica WHERE CodCli = %s";
const SELECT_CLINIC: &str = "SELECT * FROM tabelaclinica WHERE CodCli = %s";

const INSERT_APPOINTMENT: &str = "INSERT INTO tabelaconsulta \
     (CodCli, CodMed, CpfPaciente, Data_Hora, Status, Observacoes) \
     VALUES (%s, %s, %s, %s, %s, %s)";
const APPOINTMENT_KEY_FILTER: &str =
    "WHERE CodCli = %s AND CodMed = %s AND CpfPaciente = %s AND Data_Hora = %s";
const LIST_APPOINTMENTS: &str = "SELECT c.CodCli, c.CodMed, c.CpfPaciente, c.Data_Hora, \
     c.Status, c.Observacoes, cl.NomeCli, m.NomeMed, p.NomePac \
     FROM tabelaconsulta c \
     JOIN tabelaclinica cl ON cl.CodCli = c.CodCli \
     JOIN tabelamedico m ON m.CodMed = c.CodMed \
     JOIN tabelapaciente p ON p.CpfPaciente = c.CpfPaciente \
     ORDER BY c.Data_Hora DESC";

const COUNT_APPOINTMENTS_TODAY: &str =
    "SELECT COUNT(*) AS total FROM tabelaconsulta WHERE DATE(Data_Hora) = CURDATE()";
const COUNT_UPCOMING: &str =
    "SELECT COUNT(*) AS total FROM tabelaconsulta WHERE Data_Hora >= NOW()";

/// Appointment row joined with the display names of its references
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppointmentSummary {
    pub appointment: Appointment,
    pub clinic_name: String,
    pub doctor_name: String,
    pub patient_name: String,
}

/// `(id, name)` pair for selection widgets
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectOption<Id> {
    pub id: Id,
    pub name: String,
}

/// Dashboard counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulingCounts {
    pub patients: i64,
    pub doctors: i64,
    pub clinics: i64,
    pub appointments: i64,
    pub appointments_today: i64,
    pub upcoming_appointments: i64,
}

/// Typed CRUD over the four relational tables
#[derive(Clone)]
pub struct SchedulingRepository {
    executor: Arc<dyn SqlExecutor>,
}

impl SchedulingRepository {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self { executor }
    }

    pub fn executor(&self) -> &Arc<dyn SqlExecutor> {
        &self.executor
    }

    async fn write(&self, statement: &str, params: Vec<SqlValue>) -> StatementStatus {
        let status = StatementStatus::from(self.executor.execute(statement, &params).await);
        debug!(success = status.success, message = %status.message, "Write finished");
        status
    }

    async fn list_rows(
        &self,
        table: &str,
        name_column: &str,
        name_filter: Option<&str>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Row>> {
        let mut statement = format!("SELECT * FROM {}", table);
        let mut params = Vec::new();
        if let Some(filter) = name_filter.map(str::trim).filter(|f| !f.is_empty()) {
            statement.push_str(&format!(" WHERE {} LIKE %s", name_column));
            params.push(SqlValue::from(format!("%{}%", filter)));
        }
        statement.push_str(&format!(" ORDER BY {}", name_column));

        self.executor
            .fetch_all_paginated(&statement, &params, limit, offset)
            .await
    }

    async fn count(&self, statement: &str) -> Result<i64> {
        let row = self.executor.fetch_one(statement, &[]).await?;
        Ok(row
            .as_ref()
            .and_then(|r| r.value("total"))
            .and_then(SqlValue::as_i64)
            .unwrap_or(0))
    }

    // === Patients ===

    pub async fn insert_patient(&self, patient: &Patient) -> StatementStatus {
        self.write(INSERT_PATIENT, mapping::patient_params(patient))
            .await
    }

    /// The id is immutable; it only selects the row
    pub async fn update_patient(&self, patient: &Patient) -> StatementStatus {
        self.write(UPDATE_PATIENT, id_last(mapping::patient_params(patient)))
            .await
    }

    pub async fn delete_patient(&self, id: &PatientId) -> StatementStatus {
        self.write(DELETE_PATIENT, vec![id.as_str().into()]).await
    }

    pub async fn get_patient(&self, id: &PatientId) -> Result<Option<Patient>> {
        let row = self
            .executor
            .fetch_one(SELECT_PATIENT, &[id.as_str().into()])
            .await?;
        Ok(row.as_ref().map(mapping::patient_from_row).transpose()?)
    }

    pub async fn list_patients(
        &self,
        name_filter: Option<&str>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Patient>> {
        let rows = self
            .list_rows(
                mapping::table::PATIENTS,
                column::PATIENT_NAME,
                name_filter,
                limit,
                offset,
            )
            .await?;
        collect(&rows, mapping::patient_from_row)
    }

    pub async fn patients_for_select(&self) -> Result<Vec<SelectOption<PatientId>>> {
        let rows = self
            .executor
            .fetch_all(
                "SELECT CpfPaciente, NomePac FROM tabelapaciente ORDER BY NomePac",
                &[],
            )
            .await?;
        collect(&rows, |row| {
            Ok(SelectOption {
                id: mapping::patient_id(row)?,
                name: name_of(row, column::PATIENT_NAME),
            })
        })
    }

    // === Doctors ===

    pub async fn insert_doctor(&self, doctor: &Doctor) -> StatementStatus {
        self.write(INSERT_DOCTOR, mapping::doctor_params(doctor)).await
    }

    pub async fn update_doctor(&self, doctor: &Doctor) -> StatementStatus {
        self.write(UPDATE_DOCTOR, id_last(mapping::doctor_params(doctor)))
            .await
    }

    pub async fn delete_doctor(&self, id: &DoctorId) -> StatementStatus {
        self.write(DELETE_DOCTOR, vec![id.as_str().into()]).await
    }

    pub async fn get_doctor(&self, id: &DoctorId) -> Result<Option<Doctor>> {
        let row = self
            .executor
            .fetch_one(SELECT_DOCTOR, &[id.as_str().into()])
            .await?;
        Ok(row.as_ref().map(mapping::doctor_from_row).transpose()?)
    }

    pub async fn list_doctors(
        &self,
        name_filter: Option<&str>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Doctor>> {
        let rows = self
            .list_rows(
                mapping::table::DOCTORS,
                column::DOCTOR_NAME,
                name_filter,
                limit,
                offset,
            )
            .await?;
        collect(&rows, mapping::doctor_from_row)
    }

    pub async fn doctors_for_select(&self) -> Result<Vec<SelectOption<DoctorId>>> {
        let rows = self
            .executor
            .fetch_all(
                "SELECT CodMed, NomeMed FROM tabelamedico ORDER BY NomeMed",
                &[],
            )
            .await?;
        collect(&rows, |row| {
            Ok(SelectOption {
                id: mapping::doctor_id(row)?,
                name: name_of(row, column::DOCTOR_NAME),
            })
        })
    }

    // === Clinics ===

    pub async fn insert_clinic(&self, clinic: &Clinic) -> StatementStatus {
        self.write(INSERT_CLINIC, mapping::clinic_params(clinic)).await
    }

    pub async fn update_clinic(&self, clinic: &Clinic) -> StatementStatus {
        self.write(UPDATE_CLINIC, id_last(mapping::clinic_params(clinic)))
            .await
    }

    pub async fn delete_clinic(&self, id: &ClinicId) -> StatementStatus {
        self.write(DELETE_CLINIC, vec![id.as_str().into()]).await
    }

    pub async fn get_clinic(&self, id: &ClinicId) -> Result<Option<Clinic>> {
        let row = self
            .executor
            .fetch_one(SELECT_CLINIC, &[id.as_str().into()])
            .await?;
        Ok(row.as_ref().map(mapping::clinic_from_row).transpose()?)
    }

    pub async fn list_clinics(
        &self,
        name_filter: Option<&str>,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<Clinic>> {
        let rows = self
            .list_rows(
                mapping::table::CLINICS,
                column::CLINIC_NAME,
                name_filter,
                limit,
                offset,
            )
            .await?;
        collect(&rows, mapping::clinic_from_row)
    }

    pub async fn clinics_for_select(&self) -> Result<Vec<SelectOption<ClinicId>>> {
        let rows = self
            .executor
            .fetch_all(
                "SELECT CodCli, NomeCli FROM tabelaclinica ORDER BY NomeCli",
                &[],
            )
            .await?;
        collect(&rows, |row| {
            Ok(SelectOption {
                id: mapping::clinic_id(row)?,
                name: name_of(row, column::CLINIC_NAME),
            })
        })
    }

    // === Appointments ===

    /// Duplicate (doctor, timestamp) slots come back as a business-rule failure
    pub async fn schedule_appointment(&self, appointment: &Appointment) -> StatementStatus {
        let mut params = mapping::appointment_key_params(appointment);
        params.push(appointment.status.as_str().into());
        params.push(appointment.notes.clone().into());
        self.write(INSERT_APPOINTMENT, params).await
    }

    pub async fn update_appointment_status(
        &self,
        key: &AppointmentKey,
        status: AppointmentStatus,
        notes: Option<&str>,
    ) -> StatementStatus {
        let statement = format!(
            "UPDATE tabelaconsulta SET Status = %s, Observacoes = %s {}",
            APPOINTMENT_KEY_FILTER
        );
        let mut params: Vec<SqlValue> = vec![status.as_str().into(), notes.into()];
        params.extend(key_params(key));
        self.write(&statement, params).await
    }

    pub async fn cancel_appointment(&self, key: &AppointmentKey) -> StatementStatus {
        let statement = format!(
            "UPDATE tabelaconsulta SET Status = %s {}",
            APPOINTMENT_KEY_FILTER
        );
        let mut params: Vec<SqlValue> = vec![AppointmentStatus::Cancelled.as_str().into()];
        params.extend(key_params(key));
        self.write(&statement, params).await
    }

    pub async fn delete_appointment(&self, key: &AppointmentKey) -> StatementStatus {
        let statement = format!("DELETE FROM tabelaconsulta {}", APPOINTMENT_KEY_FILTER);
        self.write(&statement, key_params(key)).await
    }

    /// Most recent first
    pub async fn list_appointments(
        &self,
        limit: Option<u64>,
        offset: Option<u64>,
    ) -> Result<Vec<AppointmentSummary>> {
        let rows = self
            .executor
            .fetch_all_paginated(LIST_APPOINTMENTS, &[], limit, offset)
            .await?;
        collect(&rows, |row| {
            Ok(AppointmentSummary {
                appointment: mapping::appointment_from_row(
                    row,
                    AppointmentStatus::Scheduled,
                    None,
                )?,
                clinic_name: name_of(row, column::CLINIC_NAME),
                doctor_name: name_of(row, column::DOCTOR_NAME),
                patient_name: name_of(row, column::PATIENT_NAME),
            })
        })
    }

    pub async fn counts(&self) -> Result<SchedulingCounts> {
        Ok(SchedulingCounts {
            patients: self
                .count("SELECT COUNT(*) AS total FROM tabelapaciente")
                .await?,
            doctors: self
                .count("SELECT COUNT(*) AS total FROM tabelamedico")
                .await?,
            clinics: self
                .count("SELECT COUNT(*) AS total FROM tabelaclinica")
                .await?,
            appointments: self
                .count("SELECT COUNT(*) AS total FROM tabelaconsulta")
                .await?,
            appointments_today: self.count(COUNT_APPOINTMENTS_TODAY).await?,
            upcoming_appointments: self.count(COUNT_UPCOMING).await?,
        })
    }
}

/// Move the leading id parameter to the end (for `UPDATE ... WHERE id = %s`)
fn id_last(mut params: Vec<SqlValue>) -> Vec<SqlValue> {
    if !params.is_empty() {
        let id = params.remove(0);
        params.push(id);
    }
    params
}

fn key_params(key: &AppointmentKey) -> Vec<SqlValue> {
    vec![
        key.clinic_id.as_str().into(),
        key.doctor_id.as_str().into(),
        key.patient_id.as_str().into(),
        key.scheduled_at
            .format(crate::domain::TIMESTAMP_FORMAT)
            .to_string()
            .into(),
    ]
}

fn name_of(row: &Row, col: &str) -> String {
    row.value(col)
        .and_then(SqlValue::as_text)
        .unwrap_or_default()
}

fn collect<T>(
    rows: &[Row],
    convert: impl Fn(&Row) -> std::result::Result<T, crate::domain::DomainError>,
) -> Result<Vec<T>> {
    rows.iter()
        .map(|row| convert(row).map_err(AppError::from))
        .collect()
}
