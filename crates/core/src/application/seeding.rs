// Demo Data Seeder - fills the relational store with generated records
//
// Everything goes through `SchedulingRepository`, so the backend's own rules
// (foreign keys, one booking per doctor and timestamp) still apply. Rows the
// backend rejects are counted, not retried.

use super::relational::mapping::table;
use super::relational::SchedulingRepository;
use crate::domain::{
    Appointment, Clinic, ClinicId, Doctor, DoctorId, DomainError, Gender, Patient, PatientId,
};
use crate::error::{AppError, Result};
use crate::port::TimeProvider;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use fake::faker::address::en::{BuildingNumber, CityName, StreetName};
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const SPECIALTIES: [&str; 16] = [
    "Cardiologia",
    "Dermatologia",
    "Endocrinologia",
    "Gastroenterologia",
    "Ginecologia",
    "Neurologia",
    "Oftalmologia",
    "Ortopedia",
    "Pediatria",
    "Psiquiatria",
    "Urologia",
    "Oncologia",
    "Pneumologia",
    "Reumatologia",
    "Otorrinolaringologia",
    "Nefrologia",
];

/// One clinic per name; `SeedPlan::clinics` is capped at this length
pub const CLINIC_NAMES: [&str; 12] = [
    "Clínica São Lucas",
    "Hospital Santa Maria",
    "Centro Médico Saúde+",
    "Clínica Vida Nova",
    "Hospital Esperança",
    "Policlínica Central",
    "Clínica MedCare",
    "Centro de Saúde Integrado",
    "Hospital Regional",
    "Clínica Bem Estar",
    "Hospital Coração de Jesus",
    "Centro Médico Excellence",
];

/// Appointments fall within this many days either side of today
const WINDOW_DAYS: i64 = 60;
const SLOT_MINUTES: [u32; 4] = [0, 15, 30, 45];
const WEEKDAY_BIAS: f64 = 0.7;
const MAX_SLOT_DRAWS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPlan {
    pub patients: usize,
    pub doctors: usize,
    pub clinics: usize,
    pub appointments: usize,
    /// Delete every scheduling row before inserting
    pub clear_existing: bool,
    /// Fixed seed for reproducible data; `None` draws from the OS
    pub rng_seed: Option<u64>,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            patients: 200,
            doctors: 80,
            clinics: CLINIC_NAMES.len(),
            appointments: 1500,
            clear_existing: false,
            rng_seed: None,
        }
    }
}

/// Rows accepted by the backend, per table, plus everything it refused
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub patients: usize,
    pub doctors: usize,
    pub clinics: usize,
    pub appointments: usize,
    pub rejected: usize,
}

impl SeedReport {
    pub fn entries(&self) -> [(&'static str, usize); 4] {
        [
            ("patients", self.patients),
            ("doctors", self.doctors),
            ("clinics", self.clinics),
            ("appointments", self.appointments),
        ]
    }
}

pub struct Seeder {
    repository: SchedulingRepository,
    time_provider: Arc<dyn TimeProvider>,
    plan: SeedPlan,
}

impl Seeder {
    pub fn new(
        repository: SchedulingRepository,
        time_provider: Arc<dyn TimeProvider>,
        plan: SeedPlan,
    ) -> Self {
        Self {
            repository,
            time_provider,
            plan,
        }
    }

    pub async fn run(&self) -> Result<SeedReport> {
        let executor = self.repository.executor();
        if !executor.ensure_connected().await {
            return Err(AppError::Connectivity(
                "Relational store is not reachable".to_string(),
            ));
        }

        if self.plan.clear_existing {
            warn!("Clearing existing scheduling data");
            // Appointments first, they reference the other three
            for table in [table::APPOINTMENTS, table::PATIENTS, table::DOCTORS, table::CLINICS] {
                executor
                    .execute(&format!("DELETE FROM {}", table), &[])
                    .await?;
            }
        }

        let mut rng = match self.plan.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut report = SeedReport::default();

        info!(plan = ?self.plan, "Seeding relational store");
        let patients = self.seed_patients(&mut rng, &mut report).await?;
        let doctors = self.seed_doctors(&mut rng, &mut report).await?;
        let clinics = self.seed_clinics(&mut rng, &mut report).await?;

        if patients.is_empty() || doctors.is_empty() || clinics.is_empty() {
            warn!("Nothing to book against, skipping appointments");
        } else {
            self.seed_appointments(&mut rng, &patients, &doctors, &clinics, &mut report)
                .await;
        }

        info!(
            patients = report.patients,
            doctors = report.doctors,
            clinics = report.clinics,
            appointments = report.appointments,
            rejected = report.rejected,
            "Seeding finished"
        );
        Ok(report)
    }

    fn today(&self) -> NaiveDateTime {
        DateTime::from_timestamp_millis(self.time_provider.now_millis())
            .map(|dt| dt.naive_utc())
            .unwrap_or_default()
    }

    async fn seed_patients(
        &self,
        rng: &mut StdRng,
        report: &mut SeedReport,
    ) -> Result<Vec<PatientId>> {
        let today = self.today().date();
        let mut accepted = Vec::with_capacity(self.plan.patients);
        for id in unique_ids(rng, self.plan.patients, PatientId::DIGITS, PatientId::new)? {
            let patient = Patient {
                name: Name().fake_with_rng(rng),
                birth_date: Some(birth_date(rng, today)),
                gender: Some(gender(rng)),
                phone: Some(PhoneNumber().fake_with_rng(rng)),
                email: Some(SafeEmail().fake_with_rng(rng)),
                ..Patient::new(id.clone(), "")
            };
            if tally(self.repository.insert_patient(&patient).await, report) {
                report.patients += 1;
                accepted.push(id);
            }
        }
        Ok(accepted)
    }

    async fn seed_doctors(
        &self,
        rng: &mut StdRng,
        report: &mut SeedReport,
    ) -> Result<Vec<DoctorId>> {
        let mut accepted = Vec::with_capacity(self.plan.doctors);
        for id in unique_ids(rng, self.plan.doctors, DoctorId::DIGITS, DoctorId::new)? {
            let doctor = Doctor {
                name: Name().fake_with_rng(rng),
                gender: Some(gender(rng)),
                phone: Some(PhoneNumber().fake_with_rng(rng)),
                email: Some(SafeEmail().fake_with_rng(rng)),
                specialty: SPECIALTIES.choose(rng).map(|s| s.to_string()),
                ..Doctor::new(id.clone(), "")
            };
            if tally(self.repository.insert_doctor(&doctor).await, report) {
                report.doctors += 1;
                accepted.push(id);
            }
        }
        Ok(accepted)
    }

    async fn seed_clinics(
        &self,
        rng: &mut StdRng,
        report: &mut SeedReport,
    ) -> Result<Vec<ClinicId>> {
        let wanted = self.plan.clinics.min(CLINIC_NAMES.len());
        let ids = unique_ids(rng, wanted, ClinicId::DIGITS, ClinicId::new)?;
        let mut accepted = Vec::with_capacity(wanted);
        for (id, name) in ids.into_iter().zip(CLINIC_NAMES) {
            let street: String = StreetName().fake_with_rng(rng);
            let number: String = BuildingNumber().fake_with_rng(rng);
            let city: String = CityName().fake_with_rng(rng);
            let clinic = Clinic {
                address: Some(format!("{}, {}, {}", street, number, city)),
                phone: Some(PhoneNumber().fake_with_rng(rng)),
                email: Some(SafeEmail().fake_with_rng(rng)),
                ..Clinic::new(id.clone(), name)
            };
            if tally(self.repository.insert_clinic(&clinic).await, report) {
                report.clinics += 1;
                accepted.push(id);
            }
        }
        Ok(accepted)
    }

    async fn seed_appointments(
        &self,
        rng: &mut StdRng,
        patients: &[PatientId],
        doctors: &[DoctorId],
        clinics: &[ClinicId],
        report: &mut SeedReport,
    ) {
        let start = self.today().date() - Duration::days(WINDOW_DAYS);
        let mut booked: HashSet<(DoctorId, NaiveDateTime)> = HashSet::new();

        for n in 0..self.plan.appointments {
            let Some((doctor, when)) = (0..MAX_SLOT_DRAWS)
                .map(|_| (pick(rng, doctors).clone(), slot(rng, start)))
                .find(|key| !booked.contains(key))
            else {
                debug!(n, "No free doctor slot found, skipping appointment");
                report.rejected += 1;
                continue;
            };
            booked.insert((doctor.clone(), when));

            let appointment = Appointment::new(
                pick(rng, clinics).clone(),
                doctor,
                pick(rng, patients).clone(),
                when,
            );
            if tally(self.repository.schedule_appointment(&appointment).await, report) {
                report.appointments += 1;
            }
            if (n + 1) % 100 == 0 {
                debug!(done = n + 1, total = self.plan.appointments, "Appointments processed");
            }
        }
    }
}

fn tally(status: crate::port::StatementStatus, report: &mut SeedReport) -> bool {
    if !status.success {
        debug!(message = %status.message, "Seed row rejected");
        report.rejected += 1;
    }
    status.success
}

/// `count` distinct zero-padded identifiers of exactly `digits` digits
fn unique_ids<T: Eq + Hash + Clone>(
    rng: &mut StdRng,
    count: usize,
    digits: usize,
    build: impl Fn(String) -> std::result::Result<T, DomainError>,
) -> Result<Vec<T>> {
    let upper = 10u64.pow(digits as u32);
    let mut seen = HashSet::with_capacity(count);
    let mut ids = Vec::with_capacity(count);
    while ids.len() < count {
        let id = build(format!("{:0width$}", rng.gen_range(0..upper), width = digits))?;
        if seen.insert(id.clone()) {
            ids.push(id);
        }
    }
    Ok(ids)
}

fn pick<'a, T>(rng: &mut StdRng, items: &'a [T]) -> &'a T {
    &items[rng.gen_range(0..items.len())]
}

fn gender(rng: &mut StdRng) -> Gender {
    if rng.gen_bool(0.5) {
        Gender::Male
    } else {
        Gender::Female
    }
}

/// Age between 1 and 95 years
fn birth_date(rng: &mut StdRng, today: NaiveDate) -> NaiveDate {
    today - Duration::days(rng.gen_range(365..=95 * 365))
}

/// Business hours on a quarter hour; mostly weekdays
fn slot(rng: &mut StdRng, start: NaiveDate) -> NaiveDateTime {
    let mut day = start + Duration::days(rng.gen_range(0..=2 * WINDOW_DAYS));
    if rng.gen_bool(WEEKDAY_BIAS) {
        while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            day += Duration::days(1);
        }
    }
    let hour = rng.gen_range(8..=17);
    let minute = SLOT_MINUTES[rng.gen_range(0..SLOT_MINUTES.len())];
    day.and_hms_opt(hour, minute, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_ids_are_fixed_width() {
        let mut rng = StdRng::seed_from_u64(7);
        let ids = unique_ids(&mut rng, 50, ClinicId::DIGITS, ClinicId::new).unwrap();
        assert_eq!(ids.len(), 50);
        assert!(ids.iter().all(|id| id.as_str().len() == 6));
        assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 50);
    }

    #[test]
    fn test_slots_are_quarter_hours_in_business_hours() {
        let mut rng = StdRng::seed_from_u64(11);
        let start = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        for _ in 0..200 {
            let when = slot(&mut rng, start);
            assert!((8..=17).contains(&chrono::Timelike::hour(&when)));
            assert!(SLOT_MINUTES.contains(&chrono::Timelike::minute(&when)));
            assert!(when.date() >= start);
            assert!(when.date() <= start + Duration::days(2 * WINDOW_DAYS + 2));
        }
    }

    #[test]
    fn test_birth_date_within_age_range() {
        let mut rng = StdRng::seed_from_u64(3);
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        for _ in 0..100 {
            let born = birth_date(&mut rng, today);
            let age_days = (today - born).num_days();
            assert!((365..=95 * 365).contains(&age_days));
        }
    }

    #[test]
    fn test_default_plan_covers_every_clinic_name() {
        assert_eq!(SeedPlan::default().clinics, CLINIC_NAMES.len());
    }
}
