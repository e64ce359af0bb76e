//! Patient register operations.

use crate::error::RecordKind;
use crate::patient::{NewPatient, Patient};
use crate::repositories::ClinicStore;
use crate::validation::validate_record_id;
use crate::{ClinicError, ClinicResult};
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct PatientService {
    store: Arc<dyn ClinicStore>,
}

impl PatientService {
    pub fn new(store: Arc<dyn ClinicStore>) -> Self {
        Self { store }
    }

    /// Registers a new patient.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidInput` if the details fail validation, or a storage error.
    pub fn create_patient(
        &self,
        first_name: &str,
        last_name: &str,
        birth_date: Option<&str>,
        phone: Option<&str>,
    ) -> ClinicResult<Patient> {
        let new = NewPatient::new(first_name, last_name, birth_date, phone, Utc::now())?;
        let patient = self.store.add_patient(new)?;
        tracing::info!("registered patient {}", patient.id);
        Ok(patient)
    }

    /// Fetches a patient that has not been deleted.
    ///
    /// # Errors
    ///
    /// - `ClinicError::InvalidInput` if `patient_id` is not positive
    /// - `ClinicError::NotFound` if the patient does not exist or has been deleted
    pub fn get_patient(&self, patient_id: i64) -> ClinicResult<Patient> {
        let id = validate_record_id("patient_id", patient_id)?;
        match self.store.get_patient(id)? {
            Some(patient) if !patient.is_deleted() => Ok(patient),
            _ => Err(ClinicError::not_found(RecordKind::Patient, patient_id)),
        }
    }

    /// All patients that have not been deleted, ordered by id.
    pub fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        Ok(self
            .store
            .list_patients()?
            .into_iter()
            .filter(|p| !p.is_deleted())
            .collect())
    }

    /// Marks a patient as deleted. The record and its visits stay in storage.
    ///
    /// # Errors
    ///
    /// - `ClinicError::InvalidInput` if `patient_id` is not positive
    /// - `ClinicError::NotFound` if the patient does not exist or is already deleted
    /// - `ClinicError::InvalidState` if the patient has a visit that has not ended
    pub fn soft_delete_patient(&self, patient_id: i64) -> ClinicResult<Patient> {
        let mut patient = self.get_patient(patient_id)?;

        if self
            .store
            .visits_for_patient(patient.id)?
            .iter()
            .any(|v| v.is_open())
        {
            return Err(ClinicError::InvalidState(format!(
                "patient {} has a visit that has not ended",
                patient.id
            )));
        }

        patient.deleted_at = Some(Utc::now());
        self.store.update_patient(&patient)?;
        tracing::info!("soft-deleted patient {}", patient.id);
        Ok(patient)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CoreConfig, PausedVisitPolicy};
    use crate::repositories::{InMemoryStore, YamlFileStore};
    use crate::services::VisitService;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn setup() -> (PatientService, VisitService) {
        let store: Arc<dyn ClinicStore> = Arc::new(InMemoryStore::new());
        let cfg = Arc::new(
            CoreConfig::new(
                PathBuf::from("unused"),
                vec![],
                PausedVisitPolicy::AutoResume,
                chrono::Duration::hours(24),
            )
            .unwrap(),
        );
        (
            PatientService::new(store.clone()),
            VisitService::new(cfg, store),
        )
    }

    #[test]
    fn test_create_and_get_patient() {
        let (patients, _) = setup();
        let created = patients
            .create_patient("Amina", "Yusuf", Some("1990-05-17"), Some("0700 000 000"))
            .unwrap();
        assert_eq!(created.id.get(), 1);
        assert_eq!(patients.get_patient(1).unwrap(), created);
    }

    #[test]
    fn test_get_patient_validates_id() {
        let (patients, _) = setup();
        assert!(matches!(
            patients.get_patient(0),
            Err(ClinicError::InvalidInput(_))
        ));
        assert!(matches!(
            patients.get_patient(4),
            Err(ClinicError::NotFound { .. })
        ));
    }

    #[test]
    fn test_soft_delete_hides_patient() {
        let (patients, _) = setup();
        let a = patients.create_patient("A", "One", None, None).unwrap();
        patients.create_patient("B", "Two", None, None).unwrap();

        let deleted = patients.soft_delete_patient(a.id.get()).unwrap();
        assert!(deleted.is_deleted());

        let listed = patients.list_patients().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].first_name, "B");
        assert!(matches!(
            patients.get_patient(a.id.get()),
            Err(ClinicError::NotFound { .. })
        ));
        assert!(matches!(
            patients.soft_delete_patient(a.id.get()),
            Err(ClinicError::NotFound { .. })
        ));
    }

    #[test]
    fn test_soft_delete_blocked_by_open_visit() {
        let (patients, visits) = setup();
        let p = patients.create_patient("A", "One", None, None).unwrap();
        let started = visits
            .start_or_resume_visit(p.id.get(), "fever", "", None)
            .unwrap();

        assert!(matches!(
            patients.soft_delete_patient(p.id.get()),
            Err(ClinicError::InvalidState(_))
        ));

        visits.end_visit(started.visit_id.get()).unwrap();
        assert!(patients.soft_delete_patient(p.id.get()).is_ok());
    }

    #[test]
    fn test_patients_persist_in_yaml_store() {
        let temp_dir = TempDir::new().unwrap();
        let store: Arc<dyn ClinicStore> = Arc::new(YamlFileStore::open(temp_dir.path()).unwrap());
        let patients = PatientService::new(store);
        patients.create_patient("Amina", "Yusuf", None, None).unwrap();

        let reopened: Arc<dyn ClinicStore> =
            Arc::new(YamlFileStore::open(temp_dir.path()).unwrap());
        let listed = PatientService::new(reopened).list_patients().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].full_name(), "Amina Yusuf");
    }
}
