// Document Catalog - typed CRUD over the document store

pub mod shape;

use crate::config::ModelingMode;
use crate::domain::{
    Appointment, AppointmentStatus, Clinic, ClinicId, Doctor, DoctorId, Patient, PatientId,
};
use crate::error::{AppError, Result};
use crate::port::{
    collections, Document, DocumentData, DocumentStore, Filter, IdProvider, OrderBy, TimeProvider,
};
use serde::Serialize;
use serde_json::Value;
use shape::Relation;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Appointment document together with its id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredAppointment {
    pub id: String,
    pub appointment: Appointment,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStatistics {
    pub patients: usize,
    pub doctors: usize,
    pub clinics: usize,
    pub appointments: usize,
    pub modeling_mode: ModelingMode,
}

/// Typed access to the four collections in the configured modeling mode
///
/// Patients, doctors and clinics are keyed by their natural id. Appointments
/// are validated against the three referenced documents before any write.
pub struct DocumentCatalog {
    store: Arc<dyn DocumentStore>,
    mode: ModelingMode,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl DocumentCatalog {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        mode: ModelingMode,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            mode,
            id_provider,
            time_provider,
        }
    }

    pub fn mode(&self) -> ModelingMode {
        self.mode
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn id_provider(&self) -> &Arc<dyn IdProvider> {
        &self.id_provider
    }

    fn now(&self) -> i64 {
        self.time_provider.now_millis()
    }

    /// Drop `created_at` so a merge keeps the original creation stamp
    fn for_update(mut data: DocumentData) -> DocumentData {
        data.remove(shape::CREATED_AT);
        data
    }

    // === Patients ===

    pub async fn create_patient(&self, patient: &Patient) -> Result<()> {
        let data = shape::patient_document(patient, self.now());
        self.store
            .create(collections::PATIENTS, patient.id.as_str(), data)
            .await
    }

    pub async fn get_patient(&self, id: &PatientId) -> Result<Option<Patient>> {
        let doc = self.store.get(collections::PATIENTS, id.as_str()).await?;
        Ok(doc.as_ref().map(shape::patient_from_document).transpose()?)
    }

    pub async fn list_patients(&self, limit: Option<usize>) -> Result<Vec<Patient>> {
        let docs = self.store.list(collections::PATIENTS, limit).await?;
        decode_all(&docs, shape::patient_from_document)
    }

    pub async fn update_patient(&self, patient: &Patient) -> Result<()> {
        let data = Self::for_update(shape::patient_document(patient, self.now()));
        self.store
            .update(collections::PATIENTS, patient.id.as_str(), data, true)
            .await
    }

    pub async fn delete_patient(&self, id: &PatientId) -> Result<()> {
        self.store.delete(collections::PATIENTS, id.as_str()).await
    }

    // === Doctors ===

    pub async fn create_doctor(&self, doctor: &Doctor) -> Result<()> {
        let data = shape::doctor_document(doctor, self.now());
        self.store
            .create(collections::DOCTORS, doctor.id.as_str(), data)
            .await
    }

    pub async fn get_doctor(&self, id: &DoctorId) -> Result<Option<Doctor>> {
        let doc = self.store.get(collections::DOCTORS, id.as_str()).await?;
        Ok(doc.as_ref().map(shape::doctor_from_document).transpose()?)
    }

    pub async fn list_doctors(&self, limit: Option<usize>) -> Result<Vec<Doctor>> {
        let docs = self.store.list(collections::DOCTORS, limit).await?;
        decode_all(&docs, shape::doctor_from_document)
    }

    pub async fn update_doctor(&self, doctor: &Doctor) -> Result<()> {
        let data = Self::for_update(shape::doctor_document(doctor, self.now()));
        self.store
            .update(collections::DOCTORS, doctor.id.as_str(), data, true)
            .await
    }

    pub async fn delete_doctor(&self, id: &DoctorId) -> Result<()> {
        self.store.delete(collections::DOCTORS, id.as_str()).await
    }

    pub async fn doctors_by_specialty(&self, specialty: &str) -> Result<Vec<Doctor>> {
        let docs = self
            .store
            .query(
                collections::DOCTORS,
                &[Filter::eq("specialty", specialty)],
                Some(&OrderBy::asc("name")),
                None,
            )
            .await?;
        decode_all(&docs, shape::doctor_from_document)
    }

    // === Clinics ===

    pub async fn create_clinic(&self, clinic: &Clinic) -> Result<()> {
        let data = shape::clinic_document(clinic, self.now());
        self.store
            .create(collections::CLINICS, clinic.id.as_str(), data)
            .await
    }

    pub async fn get_clinic(&self, id: &ClinicId) -> Result<Option<Clinic>> {
        let doc = self.store.get(collections::CLINICS, id.as_str()).await?;
        Ok(doc.as_ref().map(shape::clinic_from_document).transpose()?)
    }

    pub async fn list_clinics(&self, limit: Option<usize>) -> Result<Vec<Clinic>> {
        let docs = self.store.list(collections::CLINICS, limit).await?;
        decode_all(&docs, shape::clinic_from_document)
    }

    pub async fn update_clinic(&self, clinic: &Clinic) -> Result<()> {
        let data = Self::for_update(shape::clinic_document(clinic, self.now()));
        self.store
            .update(collections::CLINICS, clinic.id.as_str(), data, true)
            .await
    }

    pub async fn delete_clinic(&self, id: &ClinicId) -> Result<()> {
        self.store.delete(collections::CLINICS, id.as_str()).await
    }

    // === Appointments ===

    /// Build the appointment document, failing with `NotFound` when any
    /// referenced document is missing
    async fn appointment_data(&self, appointment: &Appointment) -> Result<DocumentData> {
        let patient = self
            .get_patient(&appointment.patient_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Patient {} not found", appointment.patient_id))
            })?;
        let doctor = self
            .get_doctor(&appointment.doctor_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Doctor {} not found", appointment.doctor_id))
            })?;
        let clinic = self
            .get_clinic(&appointment.clinic_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Clinic {} not found", appointment.clinic_id))
            })?;

        let now = self.now();
        Ok(match self.mode {
            ModelingMode::Embedded => {
                shape::embedded_appointment_document(appointment, &patient, &doctor, &clinic, now)
            }
            ModelingMode::Referenced => shape::referenced_appointment_document(appointment, now),
        })
    }

    /// Create under a generated id and return it
    pub async fn create_appointment(&self, appointment: &Appointment) -> Result<String> {
        let data = self.appointment_data(appointment).await?;
        let id = self
            .store
            .create_auto_id(collections::APPOINTMENTS, data)
            .await?;
        debug!(appointment_id = %id, mode = %self.mode, "Appointment document created");
        Ok(id)
    }

    /// Create or overwrite at a caller-chosen id
    pub async fn put_appointment(&self, id: &str, appointment: &Appointment) -> Result<()> {
        let data = self.appointment_data(appointment).await?;
        self.store
            .create(collections::APPOINTMENTS, id, data)
            .await?;
        debug!(appointment_id = %id, mode = %self.mode, "Appointment document written");
        Ok(())
    }

    pub async fn get_appointment(&self, id: &str) -> Result<Option<StoredAppointment>> {
        let doc = self.store.get(collections::APPOINTMENTS, id).await?;
        doc.as_ref().map(stored_appointment).transpose()
    }

    pub async fn list_appointments(&self, limit: Option<usize>) -> Result<Vec<StoredAppointment>> {
        let docs = self
            .store
            .query(
                collections::APPOINTMENTS,
                &[],
                Some(&OrderBy::desc("scheduled_at")),
                limit,
            )
            .await?;
        docs.iter().map(stored_appointment).collect()
    }

    pub async fn update_appointment_status(
        &self,
        id: &str,
        status: AppointmentStatus,
    ) -> Result<()> {
        let mut data = DocumentData::new();
        data.insert("status".to_string(), Value::from(status.as_str()));
        data.insert(shape::UPDATED_AT.to_string(), Value::from(self.now()));
        self.store
            .update(collections::APPOINTMENTS, id, data, true)
            .await
    }

    pub async fn delete_appointment(&self, id: &str) -> Result<()> {
        self.store.delete(collections::APPOINTMENTS, id).await
    }

    async fn appointments_where(&self, filters: &[Filter]) -> Result<Vec<StoredAppointment>> {
        let docs = self
            .store
            .query(
                collections::APPOINTMENTS,
                filters,
                Some(&OrderBy::desc("scheduled_at")),
                None,
            )
            .await?;
        docs.iter().map(stored_appointment).collect()
    }

    pub async fn appointments_by_patient(&self, id: &PatientId) -> Result<Vec<StoredAppointment>> {
        let field = shape::relation_field(self.mode, Relation::Patient);
        self.appointments_where(&[Filter::eq(field, id.as_str())])
            .await
    }

    pub async fn appointments_by_doctor(&self, id: &DoctorId) -> Result<Vec<StoredAppointment>> {
        let field = shape::relation_field(self.mode, Relation::Doctor);
        self.appointments_where(&[Filter::eq(field, id.as_str())])
            .await
    }

    pub async fn appointments_by_status(
        &self,
        status: AppointmentStatus,
    ) -> Result<Vec<StoredAppointment>> {
        self.appointments_where(&[Filter::eq("status", status.as_str())])
            .await
    }

    /// Appointment count per doctor specialty
    ///
    /// Embedded documents carry the specialty inline; referenced ones are
    /// resolved through one doctor lookup per distinct doctor id.
    pub async fn appointments_per_specialty(&self) -> Result<BTreeMap<String, usize>> {
        let docs = self.store.list(collections::APPOINTMENTS, None).await?;
        let mut totals = BTreeMap::new();
        let mut doctor_cache: HashMap<String, Option<String>> = HashMap::new();

        for doc in &docs {
            let specialty = match self.mode {
                ModelingMode::Embedded => doc.str_field("doctor.specialty").map(str::to_string),
                ModelingMode::Referenced => {
                    let Some(doctor_id) = doc.str_field("doctor_id") else {
                        continue;
                    };
                    if !doctor_cache.contains_key(doctor_id) {
                        let specialty = self
                            .store
                            .get(collections::DOCTORS, doctor_id)
                            .await?
                            .and_then(|d| d.str_field("specialty").map(str::to_string));
                        doctor_cache.insert(doctor_id.to_string(), specialty);
                    }
                    doctor_cache.get(doctor_id).cloned().flatten()
                }
            };

            if let Some(specialty) = specialty {
                *totals.entry(specialty).or_insert(0) += 1;
            }
        }

        Ok(totals)
    }

    pub async fn statistics(&self) -> Result<CatalogStatistics> {
        let stats = CatalogStatistics {
            patients: self.store.count(collections::PATIENTS).await?,
            doctors: self.store.count(collections::DOCTORS).await?,
            clinics: self.store.count(collections::CLINICS).await?,
            appointments: self.store.count(collections::APPOINTMENTS).await?,
            modeling_mode: self.mode,
        };
        info!(
            patients = stats.patients,
            doctors = stats.doctors,
            clinics = stats.clinics,
            appointments = stats.appointments,
            mode = %stats.modeling_mode,
            "Document store statistics"
        );
        Ok(stats)
    }
}

fn stored_appointment(doc: &Document) -> Result<StoredAppointment> {
    Ok(StoredAppointment {
        id: doc.id.clone(),
        appointment: shape::appointment_from_document(doc)?,
    })
}

fn decode_all<T>(
    docs: &[Document],
    decode: impl Fn(&Document) -> std::result::Result<T, crate::domain::DomainError>,
) -> Result<Vec<T>> {
    docs.iter()
        .map(|doc| decode(doc).map_err(AppError::from))
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory store for application-layer tests (equality filters only)

    use super::*;
    use crate::port::time_provider::FixedTimeProvider;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::RwLock;

    #[derive(Default)]
    pub struct MemoryStore {
        docs: RwLock<BTreeMap<(String, String), DocumentData>>,
        offline: bool,
    }

    impl MemoryStore {
        pub fn offline() -> Self {
            Self {
                offline: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl DocumentStore for MemoryStore {
        async fn connect(&self) -> Result<()> {
            if self.offline {
                return Err(AppError::Connectivity("store offline".to_string()));
            }
            Ok(())
        }

        async fn is_connected(&self) -> bool {
            !self.offline
        }

        async fn close(&self) {}

        async fn create(&self, collection: &str, id: &str, data: DocumentData) -> Result<()> {
            self.docs
                .write()
                .await
                .insert((collection.to_string(), id.to_string()), data);
            Ok(())
        }

        async fn create_auto_id(&self, collection: &str, data: DocumentData) -> Result<String> {
            let id = format!("auto-{}", self.docs.read().await.len());
            self.create(collection, &id, data).await?;
            Ok(id)
        }

        async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
            Ok(self
                .docs
                .read()
                .await
                .get(&(collection.to_string(), id.to_string()))
                .map(|data| Document::new(id, data.clone())))
        }

        async fn list(&self, collection: &str, limit: Option<usize>) -> Result<Vec<Document>> {
            Ok(self
                .docs
                .read()
                .await
                .iter()
                .filter(|((c, _), _)| c == collection)
                .map(|((_, id), data)| Document::new(id.clone(), data.clone()))
                .take(limit.unwrap_or(usize::MAX))
                .collect())
        }

        async fn query(
            &self,
            collection: &str,
            filters: &[Filter],
            _order_by: Option<&OrderBy>,
            limit: Option<usize>,
        ) -> Result<Vec<Document>> {
            let docs = self.list(collection, None).await?;
            Ok(docs
                .into_iter()
                .filter(|d| filters.iter().all(|f| d.field(&f.field) == Some(&f.value)))
                .take(limit.unwrap_or(usize::MAX))
                .collect())
        }

        async fn update(
            &self,
            collection: &str,
            id: &str,
            data: DocumentData,
            merge: bool,
        ) -> Result<()> {
            let mut docs = self.docs.write().await;
            let key = (collection.to_string(), id.to_string());
            if merge {
                docs.get_mut(&key)
                    .ok_or_else(|| AppError::NotFound(id.to_string()))?
                    .extend(data);
            } else {
                docs.insert(key, data);
            }
            Ok(())
        }

        async fn delete(&self, collection: &str, id: &str) -> Result<()> {
            self.docs
                .write()
                .await
                .remove(&(collection.to_string(), id.to_string()));
            Ok(())
        }

        async fn count(&self, collection: &str) -> Result<usize> {
            Ok(self.list(collection, None).await?.len())
        }
    }

    pub struct SequentialIds(pub AtomicUsize);

    impl IdProvider for SequentialIds {
        fn generate_id(&self) -> String {
            format!("gen-{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    pub fn catalog(store: Arc<MemoryStore>, mode: ModelingMode) -> DocumentCatalog {
        DocumentCatalog::new(
            store,
            mode,
            Arc::new(SequentialIds(AtomicUsize::new(0))),
            Arc::new(FixedTimeProvider(1_717_236_000_000)),
        )
    }
}
