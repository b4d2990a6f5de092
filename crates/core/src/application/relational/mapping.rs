// Row <-> entity mapping at the relational boundary
//
// Column names below are the relational contract; nothing outside this
// module reads them.

use crate::domain::{
    Appointment, AppointmentStatus, Clinic, ClinicId, Doctor, DoctorId, DomainError, Gender,
    Patient, PatientId,
};
use crate::sql::{Row, SqlValue};
use std::str::FromStr;

pub mod table {
    pub const PATIENTS: &str = "tabelapaciente";
    pub const DOCTORS: &str = "tabelamedico";
    pub const CLINICS: &str = "tabelaclinica";
    pub const APPOINTMENTS: &str = "tabelaconsulta";
}

pub mod column {
    pub const PATIENT_ID: &str = "CpfPaciente";
    pub const PATIENT_NAME: &str = "NomePac";
    pub const BIRTH_DATE: &str = "DataNascimento";
    pub const DOCTOR_ID: &str = "CodMed";
    pub const DOCTOR_NAME: &str = "NomeMed";
    pub const SPECIALTY: &str = "Especialidade";
    pub const CLINIC_ID: &str = "CodCli";
    pub const CLINIC_NAME: &str = "NomeCli";
    pub const ADDRESS: &str = "Endereco";
    pub const GENDER: &str = "Genero";
    pub const PHONE: &str = "Telefone";
    pub const EMAIL: &str = "Email";
    pub const SCHEDULED_AT: &str = "Data_Hora";
    pub const STATUS: &str = "Status";
    pub const NOTES: &str = "Observacoes";
}

type Result<T> = std::result::Result<T, DomainError>;

fn required_text(row: &Row, col: &str) -> Result<String> {
    row.value(col)
        .and_then(SqlValue::as_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| DomainError::MissingField(col.to_string()))
}

fn optional_text(row: &Row, col: &str) -> Option<String> {
    row.value(col)
        .and_then(SqlValue::as_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn optional_gender(row: &Row) -> Result<Option<Gender>> {
    optional_text(row, column::GENDER)
        .map(|g| Gender::from_str(&g))
        .transpose()
}

/// Identifier columns may come back as integers (leading zeros lost)
fn id_value<T>(
    row: &Row,
    col: &str,
    from_text: impl Fn(String) -> Result<T>,
    from_number: impl Fn(i64) -> Result<T>,
) -> Result<T> {
    match row.value(col) {
        Some(SqlValue::Int(n)) => from_number(*n),
        Some(other) => match other.as_text() {
            Some(text) => from_text(text),
            None => Err(DomainError::MissingField(col.to_string())),
        },
        None => Err(DomainError::MissingField(col.to_string())),
    }
}

pub fn patient_id(row: &Row) -> Result<PatientId> {
    id_value(row, column::PATIENT_ID, PatientId::new, PatientId::from_number)
}

pub fn doctor_id(row: &Row) -> Result<DoctorId> {
    id_value(row, column::DOCTOR_ID, DoctorId::new, DoctorId::from_number)
}

pub fn clinic_id(row: &Row) -> Result<ClinicId> {
    id_value(row, column::CLINIC_ID, ClinicId::new, ClinicId::from_number)
}

pub fn patient_from_row(row: &Row) -> Result<Patient> {
    let birth_date = match row.value(column::BIRTH_DATE) {
        None => None,
        Some(value) => Some(value.as_date().ok_or_else(|| DomainError::InvalidField {
            field: column::BIRTH_DATE.to_string(),
            reason: format!("not a date: {:?}", value),
        })?),
    };

    Ok(Patient {
        id: patient_id(row)?,
        name: required_text(row, column::PATIENT_NAME)?,
        birth_date,
        gender: optional_gender(row)?,
        phone: optional_text(row, column::PHONE),
        email: optional_text(row, column::EMAIL),
    })
}

pub fn doctor_from_row(row: &Row) -> Result<Doctor> {
    Ok(Doctor {
        id: doctor_id(row)?,
        name: required_text(row, column::DOCTOR_NAME)?,
        gender: optional_gender(row)?,
        phone: optional_text(row, column::PHONE),
        email: optional_text(row, column::EMAIL),
        specialty: optional_text(row, column::SPECIALTY),
    })
}

pub fn clinic_from_row(row: &Row) -> Result<Clinic> {
    Ok(Clinic {
        id: clinic_id(row)?,
        name: required_text(row, column::CLINIC_NAME)?,
        address: optional_text(row, column::ADDRESS),
        phone: optional_text(row, column::PHONE),
        email: optional_text(row, column::EMAIL),
    })
}

/// Rows from schemas without `Status`/`Observacoes` get the given defaults
pub fn appointment_from_row(
    row: &Row,
    default_status: AppointmentStatus,
    default_notes: Option<&str>,
) -> Result<Appointment> {
    let scheduled_at = row
        .value(column::SCHEDULED_AT)
        .ok_or_else(|| DomainError::MissingField(column::SCHEDULED_AT.to_string()))?;
    let scheduled_at = scheduled_at
        .as_datetime()
        .ok_or_else(|| DomainError::InvalidField {
            field: column::SCHEDULED_AT.to_string(),
            reason: format!("not a timestamp: {:?}", scheduled_at),
        })?;

    let status = match optional_text(row, column::STATUS) {
        Some(status) => status.parse::<AppointmentStatus>()?,
        None => default_status,
    };

    let notes = optional_text(row, column::NOTES).or_else(|| default_notes.map(str::to_string));

    Ok(Appointment {
        clinic_id: clinic_id(row)?,
        doctor_id: doctor_id(row)?,
        patient_id: patient_id(row)?,
        scheduled_at,
        status,
        notes,
    })
}

pub fn patient_params(p: &Patient) -> Vec<SqlValue> {
    vec![
        p.id.as_str().into(),
        p.name.as_str().into(),
        p.birth_date.into(),
        p.gender.map(|g| g.code()).into(),
        p.phone.clone().into(),
        p.email.clone().into(),
    ]
}

pub fn doctor_params(d: &Doctor) -> Vec<SqlValue> {
    vec![
        d.id.as_str().into(),
        d.name.as_str().into(),
        d.gender.map(|g| g.code()).into(),
        d.phone.clone().into(),
        d.email.clone().into(),
        d.specialty.clone().into(),
    ]
}

pub fn clinic_params(c: &Clinic) -> Vec<SqlValue> {
    vec![
        c.id.as_str().into(),
        c.name.as_str().into(),
        c.address.clone().into(),
        c.phone.clone().into(),
        c.email.clone().into(),
    ]
}

/// Key columns in `(CodCli, CodMed, CpfPaciente, Data_Hora)` order
pub fn appointment_key_params(a: &Appointment) -> Vec<SqlValue> {
    vec![
        a.clinic_id.as_str().into(),
        a.doctor_id.as_str().into(),
        a.patient_id.as_str().into(),
        a.scheduled_at_text().into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn patient_row() -> Row {
        vec![
            (column::PATIENT_ID, SqlValue::from("12345678901")),
            (column::PATIENT_NAME, SqlValue::from("Maria Silva")),
            (column::BIRTH_DATE, SqlValue::from("1985-03-12")),
            (column::GENDER, SqlValue::from("F")),
            (column::PHONE, SqlValue::from("11999990000")),
            (column::EMAIL, SqlValue::Null),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_patient_from_row() {
        let patient = patient_from_row(&patient_row()).unwrap();
        assert_eq!(patient.id.as_str(), "12345678901");
        assert_eq!(patient.name, "Maria Silva");
        assert_eq!(patient.birth_date, NaiveDate::from_ymd_opt(1985, 3, 12));
        assert_eq!(patient.gender, Some(Gender::Female));
        assert_eq!(patient.email, None);
    }

    #[test]
    fn test_patient_params_follow_column_order() {
        let patient = patient_from_row(&patient_row()).unwrap();
        let params = patient_params(&patient);
        assert_eq!(params[0], SqlValue::from("12345678901"));
        assert_eq!(params[3], SqlValue::from("F"));
        assert!(params[5].is_null());
    }

    #[test]
    fn test_numeric_ids_are_zero_padded() {
        let row: Row = vec![
            (column::CLINIC_ID, SqlValue::Int(42)),
            (column::CLINIC_NAME, SqlValue::from("Centro")),
        ]
        .into_iter()
        .collect();
        assert_eq!(clinic_from_row(&row).unwrap().id.as_str(), "000042");
    }

    #[test]
    fn test_missing_name_is_reported() {
        let row: Row = vec![(column::DOCTOR_ID, SqlValue::from("1234567"))]
            .into_iter()
            .collect();
        assert_eq!(
            doctor_from_row(&row).unwrap_err(),
            DomainError::MissingField(column::DOCTOR_NAME.to_string())
        );
    }

    #[test]
    fn test_appointment_defaults_when_columns_absent() {
        let row: Row = vec![
            (column::CLINIC_ID, SqlValue::from("123456")),
            (column::DOCTOR_ID, SqlValue::from("1234567")),
            (column::PATIENT_ID, SqlValue::from("12345678901")),
            (column::SCHEDULED_AT, SqlValue::from("2024-06-01 10:00:00")),
        ]
        .into_iter()
        .collect();

        let appt =
            appointment_from_row(&row, AppointmentStatus::Completed, Some("migrated")).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Completed);
        assert_eq!(appt.notes.as_deref(), Some("migrated"));
        assert_eq!(appt.scheduled_at_text(), "2024-06-01 10:00:00");
    }

    #[test]
    fn test_appointment_status_column_wins() {
        let row: Row = vec![
            (column::CLINIC_ID, SqlValue::from("123456")),
            (column::DOCTOR_ID, SqlValue::from("1234567")),
            (column::PATIENT_ID, SqlValue::from("12345678901")),
            (column::SCHEDULED_AT, SqlValue::from("2024-06-01 10:00:00")),
            (column::STATUS, SqlValue::from("cancelada")),
        ]
        .into_iter()
        .collect();

        let appt = appointment_from_row(&row, AppointmentStatus::Completed, None).unwrap();
        assert_eq!(appt.status, AppointmentStatus::Cancelled);
        assert_eq!(appt.notes, None);
    }

    #[test]
    fn test_bad_timestamp_is_invalid_field() {
        let row: Row = vec![
            (column::CLINIC_ID, SqlValue::from("123456")),
            (column::DOCTOR_ID, SqlValue::from("1234567")),
            (column::PATIENT_ID, SqlValue::from("12345678901")),
            (column::SCHEDULED_AT, SqlValue::from("tomorrow")),
        ]
        .into_iter()
        .collect();
        assert!(matches!(
            appointment_from_row(&row, AppointmentStatus::Scheduled, None),
            Err(DomainError::InvalidField { .. })
        ));
    }
}
