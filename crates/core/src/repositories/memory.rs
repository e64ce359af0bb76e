//! In-process storage backend.

use super::{sort_visits_by_start, PatientRepository, VisitRepository};
use crate::error::RecordKind;
use crate::patient::{NewPatient, Patient};
use crate::visit::{NewVisit, Visit, VisitState};
use crate::{ClinicError, ClinicResult};
use clinic_types::RecordId;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Tables {
    patients: BTreeMap<RecordId, Patient>,
    visits: BTreeMap<RecordId, Visit>,
}

fn next_id<T>(map: &BTreeMap<RecordId, T>) -> RecordId {
    map.keys()
        .next_back()
        .map(|id| id.next())
        .unwrap_or(RecordId::FIRST)
}

/// Mutex-guarded maps. Records are lost when the store is dropped.
#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `patient` under its own id, replacing any existing record.
    ///
    /// Used to load patients whose ids were assigned elsewhere.
    pub fn seed_patient(&self, patient: Patient) -> ClinicResult<()> {
        self.lock()?.patients.insert(patient.id, patient);
        Ok(())
    }

    fn lock(&self) -> ClinicResult<MutexGuard<'_, Tables>> {
        self.tables.lock().map_err(|_| ClinicError::LockPoisoned)
    }
}

impl PatientRepository for InMemoryStore {
    fn add_patient(&self, new: NewPatient) -> ClinicResult<Patient> {
        let mut tables = self.lock()?;
        let id = next_id(&tables.patients);
        let patient = Patient::from_new(id, new);
        tables.patients.insert(id, patient.clone());
        Ok(patient)
    }

    fn get_patient(&self, id: RecordId) -> ClinicResult<Option<Patient>> {
        Ok(self.lock()?.patients.get(&id).cloned())
    }

    fn update_patient(&self, patient: &Patient) -> ClinicResult<()> {
        let mut tables = self.lock()?;
        match tables.patients.get_mut(&patient.id) {
            Some(slot) => {
                *slot = patient.clone();
                Ok(())
            }
            None => Err(ClinicError::not_found(RecordKind::Patient, patient.id.get())),
        }
    }

    fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        Ok(self.lock()?.patients.values().cloned().collect())
    }
}

impl VisitRepository for InMemoryStore {
    fn add_visit(&self, new: NewVisit) -> ClinicResult<Visit> {
        let mut tables = self.lock()?;
        let id = next_id(&tables.visits);
        let visit = Visit::from_new(id, new);
        tables.visits.insert(id, visit.clone());
        Ok(visit)
    }

    fn get_visit(&self, id: RecordId) -> ClinicResult<Option<Visit>> {
        Ok(self.lock()?.visits.get(&id).cloned())
    }

    fn update_visit(&self, visit: &Visit) -> ClinicResult<()> {
        let mut tables = self.lock()?;
        match tables.visits.get_mut(&visit.id()) {
            Some(slot) => {
                *slot = visit.clone();
                Ok(())
            }
            None => Err(ClinicError::not_found(RecordKind::Visit, visit.id().get())),
        }
    }

    fn visits_for_patient(&self, patient_id: RecordId) -> ClinicResult<Vec<Visit>> {
        let mut visits: Vec<Visit> = self
            .lock()?
            .visits
            .values()
            .filter(|v| v.patient_id() == patient_id)
            .cloned()
            .collect();
        sort_visits_by_start(&mut visits);
        Ok(visits)
    }

    fn paused_visits(&self) -> ClinicResult<Vec<Visit>> {
        Ok(self
            .lock()?
            .visits
            .values()
            .filter(|v| v.state() == VisitState::Paused)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visit::tests::t0;

    fn new_visit(patient_id: i64) -> NewVisit {
        NewVisit::new(patient_id, "fever", "2 days", None, vec![], t0()).unwrap()
    }

    #[test]
    fn test_ids_start_at_one_and_increase() {
        let store = InMemoryStore::new();
        let a = store.add_visit(new_visit(1)).unwrap();
        let b = store.add_visit(new_visit(2)).unwrap();
        assert_eq!(a.id().get(), 1);
        assert_eq!(b.id().get(), 2);
    }

    #[test]
    fn test_update_unknown_visit_is_not_found() {
        let store = InMemoryStore::new();
        let visit = Visit::from_new(RecordId::new(7).unwrap(), new_visit(1));
        let err = store.update_visit(&visit).unwrap_err();
        assert!(matches!(
            err,
            ClinicError::NotFound {
                kind: RecordKind::Visit,
                id: 7
            }
        ));
    }

    #[test]
    fn test_visits_for_patient_filters_by_owner() {
        let store = InMemoryStore::new();
        store.add_visit(new_visit(1)).unwrap();
        store.add_visit(new_visit(2)).unwrap();
        store.add_visit(new_visit(1)).unwrap();
        let visits = store.visits_for_patient(RecordId::new(1).unwrap()).unwrap();
        assert_eq!(visits.len(), 2);
        assert!(visits.iter().all(|v| v.patient_id().get() == 1));
    }

    #[test]
    fn test_paused_visits_excludes_active_and_ended() {
        let store = InMemoryStore::new();
        let mut paused = store.add_visit(new_visit(1)).unwrap();
        paused.pause(t0()).unwrap();
        store.update_visit(&paused).unwrap();

        let mut ended = store.add_visit(new_visit(2)).unwrap();
        ended.pause(t0()).unwrap();
        ended.end(t0());
        store.update_visit(&ended).unwrap();

        store.add_visit(new_visit(3)).unwrap();

        let listed = store.paused_visits().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id(), paused.id());
    }
}
