//! Storage abstractions for patients and visits.
//!
//! Services talk to storage only through [`PatientRepository`] and [`VisitRepository`]. Each
//! call is its own unit of work: `add_*` and `update_*` are durable when they return `Ok`.
//!
//! Two backends are provided:
//! - [`memory::InMemoryStore`] keeps records in mutex-guarded maps
//! - [`files::YamlFileStore`] keeps one YAML document per record on disk

use crate::patient::{NewPatient, Patient};
use crate::visit::{NewVisit, Visit};
use crate::ClinicResult;
use clinic_types::RecordId;

pub mod files;
pub mod memory;

pub use files::YamlFileStore;
pub use memory::InMemoryStore;

pub trait PatientRepository: Send + Sync {
    /// Stores a new patient, assigning the next free id.
    fn add_patient(&self, new: NewPatient) -> ClinicResult<Patient>;

    fn get_patient(&self, id: RecordId) -> ClinicResult<Option<Patient>>;

    /// Overwrites an existing patient. Fails with `NotFound` if it was never stored.
    fn update_patient(&self, patient: &Patient) -> ClinicResult<()>;

    /// All stored patients, including soft-deleted ones, ordered by id.
    fn list_patients(&self) -> ClinicResult<Vec<Patient>>;
}

pub trait VisitRepository: Send + Sync {
    /// Stores a new visit, assigning the next free id.
    fn add_visit(&self, new: NewVisit) -> ClinicResult<Visit>;

    fn get_visit(&self, id: RecordId) -> ClinicResult<Option<Visit>>;

    /// Overwrites an existing visit. Fails with `NotFound` if it was never stored.
    fn update_visit(&self, visit: &Visit) -> ClinicResult<()>;

    /// Visits owned by `patient_id`, ordered by start time then id.
    fn visits_for_patient(&self, patient_id: RecordId) -> ClinicResult<Vec<Visit>>;

    /// Visits currently paused and not ended, ordered by id.
    fn paused_visits(&self) -> ClinicResult<Vec<Visit>>;
}

/// A backend providing both patient and visit storage.
pub trait ClinicStore: PatientRepository + VisitRepository {}

impl<T: PatientRepository + VisitRepository> ClinicStore for T {}

pub(crate) fn sort_visits_by_start(visits: &mut [Visit]) {
    visits.sort_by(|a, b| {
        a.started_at()
            .cmp(&b.started_at())
            .then(a.id().cmp(&b.id()))
    });
}
