// Domain Layer - Entities of the scheduling domain

pub mod appointment;
pub mod clinic;
pub mod doctor;
pub mod error;
pub mod gender;
pub mod identifier;
pub mod patient;

// Re-exports
pub use appointment::{Appointment, AppointmentKey, AppointmentStatus, TIMESTAMP_FORMAT};
pub use clinic::Clinic;
pub use doctor::Doctor;
pub use error::DomainError;
pub use gender::Gender;
pub use identifier::{ClinicId, DoctorId, PatientId};
pub use patient::Patient;
