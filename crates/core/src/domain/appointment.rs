// Appointment Entity (relationship between clinic, doctor and patient)

use super::error::DomainError;
use super::{ClinicId, DoctorId, PatientId};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Canonical timestamp layout shared by both relational dialects
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Scheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Legacy Portuguese labels are still found in older rows
        match s.trim().to_lowercase().as_str() {
            "scheduled" | "agendada" => Ok(AppointmentStatus::Scheduled),
            "completed" | "realizada" => Ok(AppointmentStatus::Completed),
            "cancelled" | "canceled" | "cancelada" => Ok(AppointmentStatus::Cancelled),
            other => Err(DomainError::InvalidStatus(other.to_string())),
        }
    }
}

/// Composite identity of an appointment in the relational model
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AppointmentKey {
    pub clinic_id: ClinicId,
    pub doctor_id: DoctorId,
    pub patient_id: PatientId,
    pub scheduled_at: NaiveDateTime,
}

impl fmt::Display for AppointmentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.clinic_id,
            self.doctor_id,
            self.patient_id,
            self.scheduled_at.format(TIMESTAMP_FORMAT)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub clinic_id: ClinicId,
    pub doctor_id: DoctorId,
    pub patient_id: PatientId,
    pub scheduled_at: NaiveDateTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

impl Appointment {
    pub fn new(
        clinic_id: ClinicId,
        doctor_id: DoctorId,
        patient_id: PatientId,
        scheduled_at: NaiveDateTime,
    ) -> Self {
        Self {
            clinic_id,
            doctor_id,
            patient_id,
            scheduled_at,
            status: AppointmentStatus::Scheduled,
            notes: None,
        }
    }

    pub fn key(&self) -> AppointmentKey {
        AppointmentKey {
            clinic_id: self.clinic_id.clone(),
            doctor_id: self.doctor_id.clone(),
            patient_id: self.patient_id.clone(),
            scheduled_at: self.scheduled_at,
        }
    }

    pub fn scheduled_at_text(&self) -> String {
        self.scheduled_at.format(TIMESTAMP_FORMAT).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Appointment {
        let at = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Appointment::new(
            ClinicId::new("123456").unwrap(),
            DoctorId::new("1234567").unwrap(),
            PatientId::new("12345678901").unwrap(),
            at,
        )
    }

    #[test]
    fn test_new_appointment_is_scheduled() {
        let appt = sample();
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.scheduled_at_text(), "2024-06-01 10:00:00");
    }

    #[test]
    fn test_key_display() {
        assert_eq!(
            sample().key().to_string(),
            "123456|1234567|12345678901|2024-06-01 10:00:00"
        );
    }

    #[test]
    fn test_status_accepts_legacy_labels() {
        assert_eq!(
            "realizada".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::Completed
        );
        assert_eq!(
            " Scheduled ".parse::<AppointmentStatus>().unwrap(),
            AppointmentStatus::Scheduled
        );
        assert!("pending".parse::<AppointmentStatus>().is_err());
    }
}
