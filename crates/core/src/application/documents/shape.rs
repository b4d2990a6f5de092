// Document shapes for the four collections

use crate::config::ModelingMode;
use crate::domain::{
    Appointment, AppointmentStatus, Clinic, ClinicId, Doctor, DoctorId, DomainError, Gender,
    Patient, PatientId, TIMESTAMP_FORMAT,
};
use crate::port::{Document, DocumentData};
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::{json, Value};

type Result<T> = std::result::Result<T, DomainError>;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

/// Which related entity an appointment points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Patient,
    Doctor,
    Clinic,
}

/// Field holding the related id for the given shape
pub fn relation_field(mode: ModelingMode, relation: Relation) -> &'static str {
    match (mode, relation) {
        (ModelingMode::Embedded, Relation::Patient) => "patient.id",
        (ModelingMode::Embedded, Relation::Doctor) => "doctor.id",
        (ModelingMode::Embedded, Relation::Clinic) => "clinic.id",
        (ModelingMode::Referenced, Relation::Patient) => "patient_id",
        (ModelingMode::Referenced, Relation::Doctor) => "doctor_id",
        (ModelingMode::Referenced, Relation::Clinic) => "clinic_id",
    }
}

fn object(value: Value) -> DocumentData {
    match value {
        Value::Object(map) => map,
        _ => DocumentData::new(),
    }
}

fn date_text(date: Option<NaiveDate>) -> Option<String> {
    date.map(|d| d.format(DATE_FORMAT).to_string())
}

fn stamp(data: &mut DocumentData, now_ms: i64) {
    data.insert(CREATED_AT.to_string(), Value::from(now_ms));
    data.insert(UPDATED_AT.to_string(), Value::from(now_ms));
}

pub fn patient_document(patient: &Patient, now_ms: i64) -> DocumentData {
    let mut data = object(json!({
        "id": patient.id,
        "name": patient.name,
        "birth_date": date_text(patient.birth_date),
        "gender": patient.gender,
        "contact": { "phone": patient.phone, "email": patient.email },
    }));
    stamp(&mut data, now_ms);
    data
}

pub fn doctor_document(doctor: &Doctor, now_ms: i64) -> DocumentData {
    let mut data = object(json!({
        "id": doctor.id,
        "name": doctor.name,
        "gender": doctor.gender,
        "specialty": doctor.specialty,
        "contact": { "phone": doctor.phone, "email": doctor.email },
    }));
    stamp(&mut data, now_ms);
    data
}

pub fn clinic_document(clinic: &Clinic, now_ms: i64) -> DocumentData {
    let mut data = object(json!({
        "id": clinic.id,
        "name": clinic.name,
        "address": clinic.address,
        "contact": { "phone": clinic.phone, "email": clinic.email },
    }));
    stamp(&mut data, now_ms);
    data
}

/// Snapshots of the related records travel inline
pub fn embedded_appointment_document(
    appointment: &Appointment,
    patient: &Patient,
    doctor: &Doctor,
    clinic: &Clinic,
    now_ms: i64,
) -> DocumentData {
    let mut data = object(json!({
        "scheduled_at": appointment.scheduled_at_text(),
        "status": appointment.status,
        "notes": appointment.notes,
        "patient": {
            "id": patient.id,
            "name": patient.name,
            "birth_date": date_text(patient.birth_date),
            "gender": patient.gender,
            "phone": patient.phone,
            "email": patient.email,
        },
        "doctor": {
            "id": doctor.id,
            "name": doctor.name,
            "specialty": doctor.specialty,
            "phone": doctor.phone,
            "email": doctor.email,
        },
        "clinic": {
            "id": clinic.id,
            "name": clinic.name,
            "address": clinic.address,
            "phone": clinic.phone,
            "email": clinic.email,
        },
    }));
    stamp(&mut data, now_ms);
    data
}

pub fn referenced_appointment_document(appointment: &Appointment, now_ms: i64) -> DocumentData {
    let mut data = object(json!({
        "scheduled_at": appointment.scheduled_at_text(),
        "status": appointment.status,
        "notes": appointment.notes,
        "patient_id": appointment.patient_id,
        "doctor_id": appointment.doctor_id,
        "clinic_id": appointment.clinic_id,
    }));
    stamp(&mut data, now_ms);
    data
}

// === Decoding ===

fn required_str<'a>(doc: &'a Document, path: &str) -> Result<&'a str> {
    doc.str_field(path)
        .ok_or_else(|| DomainError::MissingField(path.to_string()))
}

fn optional_string(doc: &Document, path: &str) -> Option<String> {
    doc.str_field(path).map(str::to_string)
}

fn optional_gender(doc: &Document, path: &str) -> Result<Option<Gender>> {
    doc.str_field(path).map(str::parse::<Gender>).transpose()
}

fn optional_date(doc: &Document, path: &str) -> Result<Option<NaiveDate>> {
    doc.str_field(path)
        .map(|s| {
            NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| DomainError::InvalidField {
                field: path.to_string(),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Id field inside the document, falling back to the document id
fn id_text<'a>(doc: &'a Document, path: &str) -> &'a str {
    doc.str_field(path).unwrap_or(doc.id.as_str())
}

pub fn patient_from_document(doc: &Document) -> Result<Patient> {
    Ok(Patient {
        id: PatientId::new(id_text(doc, "id"))?,
        name: required_str(doc, "name")?.to_string(),
        birth_date: optional_date(doc, "birth_date")?,
        gender: optional_gender(doc, "gender")?,
        phone: optional_string(doc, "contact.phone"),
        email: optional_string(doc, "contact.email"),
    })
}

pub fn doctor_from_document(doc: &Document) -> Result<Doctor> {
    Ok(Doctor {
        id: DoctorId::new(id_text(doc, "id"))?,
        name: required_str(doc, "name")?.to_string(),
        gender: optional_gender(doc, "gender")?,
        phone: optional_string(doc, "contact.phone"),
        email: optional_string(doc, "contact.email"),
        specialty: optional_string(doc, "specialty"),
    })
}

pub fn clinic_from_document(doc: &Document) -> Result<Clinic> {
    Ok(Clinic {
        id: ClinicId::new(id_text(doc, "id"))?,
        name: required_str(doc, "name")?.to_string(),
        address: optional_string(doc, "address"),
        phone: optional_string(doc, "contact.phone"),
        email: optional_string(doc, "contact.email"),
    })
}

/// Reads either shape
pub fn appointment_from_document(doc: &Document) -> Result<Appointment> {
    let relation = |embedded: &str, referenced: &str| -> Result<String> {
        doc.str_field(embedded)
            .or_else(|| doc.str_field(referenced))
            .map(str::to_string)
            .ok_or_else(|| DomainError::MissingField(referenced.to_string()))
    };

    let scheduled_at = required_str(doc, "scheduled_at")?;
    let scheduled_at = NaiveDateTime::parse_from_str(scheduled_at, TIMESTAMP_FORMAT).map_err(
        |e| DomainError::InvalidField {
            field: "scheduled_at".to_string(),
            reason: e.to_string(),
        },
    )?;

    let status = match doc.str_field("status") {
        Some(status) => status.parse::<AppointmentStatus>()?,
        None => AppointmentStatus::Scheduled,
    };

    Ok(Appointment {
        clinic_id: ClinicId::new(relation("clinic.id", "clinic_id")?)?,
        doctor_id: DoctorId::new(relation("doctor.id", "doctor_id")?)?,
        patient_id: PatientId::new(relation("patient.id", "patient_id")?)?,
        scheduled_at,
        status,
        notes: optional_string(doc, "notes"),
    })
}
