//! On-disk storage backend.
//!
//! Records are stored one YAML document per file:
//!
//! ```text
//! <data_dir>/patients/<id>.yaml
//! <data_dir>/visits/<id>.yaml
//! ```
//!
//! New ids are allocated as one past the highest id on disk. The record file is created with
//! `create_new`, so two writers racing for the same id cannot both succeed; the loser
//! re-scans and retries a bounded number of times. Updates write a sibling temporary file and
//! rename it over the original.

use super::{sort_visits_by_start, PatientRepository, VisitRepository};
use crate::constants::{
    ID_ALLOCATION_ATTEMPTS, PATIENTS_DIR_NAME, RECORD_FILE_EXTENSION, VISITS_DIR_NAME,
};
use crate::error::RecordKind;
use crate::patient::{NewPatient, Patient};
use crate::visit::{NewVisit, Visit, VisitState};
use crate::{ClinicError, ClinicResult};
use clinic_types::RecordId;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

pub struct YamlFileStore {
    patients_dir: PathBuf,
    visits_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl YamlFileStore {
    /// Opens a store rooted at `data_dir`, creating the record directories if needed.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::StorageDirCreation` if `data_dir` does not exist or a record
    /// directory cannot be created.
    pub fn open(data_dir: &Path) -> ClinicResult<Self> {
        if !data_dir.is_dir() {
            return Err(ClinicError::StorageDirCreation(std::io::Error::new(
                ErrorKind::NotFound,
                format!("data directory does not exist: {}", data_dir.display()),
            )));
        }

        let patients_dir = data_dir.join(PATIENTS_DIR_NAME);
        let visits_dir = data_dir.join(VISITS_DIR_NAME);
        fs::create_dir_all(&patients_dir).map_err(ClinicError::StorageDirCreation)?;
        fs::create_dir_all(&visits_dir).map_err(ClinicError::StorageDirCreation)?;

        Ok(Self {
            patients_dir,
            visits_dir,
            write_lock: Mutex::new(()),
        })
    }

    fn lock(&self) -> ClinicResult<MutexGuard<'_, ()>> {
        self.write_lock.lock().map_err(|_| ClinicError::LockPoisoned)
    }
}

fn record_path(dir: &Path, id: RecordId) -> PathBuf {
    dir.join(format!("{id}.{RECORD_FILE_EXTENSION}"))
}

/// Ids of all record files in `dir`, ascending. Files that are not `<positive int>.yaml` are
/// ignored.
fn list_ids(dir: &Path) -> ClinicResult<Vec<RecordId>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir).map_err(ClinicError::FileRead)? {
        let path = entry.map_err(ClinicError::FileRead)?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(RECORD_FILE_EXTENSION) {
            continue;
        }
        let id = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.parse::<i64>().ok())
            .and_then(|n| RecordId::new(n).ok());
        if let Some(id) = id {
            ids.push(id);
        }
    }
    ids.sort();
    Ok(ids)
}

fn parse_record<T: DeserializeOwned>(file: &Path, text: &str) -> ClinicResult<T> {
    let deserializer = serde_yaml::Deserializer::from_str(text);
    serde_path_to_error::deserialize(deserializer).map_err(|err| {
        let path = err.path().to_string();
        let path = if path.is_empty() || path == "." {
            "<root>".to_string()
        } else {
            path
        };
        ClinicError::Deserialization {
            file: file.to_path_buf(),
            path,
            message: err.into_inner().to_string(),
        }
    })
}

fn read_record<T: DeserializeOwned>(file: &Path) -> ClinicResult<Option<T>> {
    match fs::read_to_string(file) {
        Ok(text) => parse_record(file, &text).map(Some),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ClinicError::FileRead(e)),
    }
}

/// Reads every record in `dir`. Unreadable records are logged and skipped.
fn read_all<T: DeserializeOwned>(dir: &Path) -> ClinicResult<Vec<T>> {
    let mut records = Vec::new();
    for id in list_ids(dir)? {
        let file = record_path(dir, id);
        match read_record(&file) {
            Ok(Some(record)) => records.push(record),
            Ok(None) => {}
            Err(e) => tracing::warn!("skipping unreadable record {}: {}", file.display(), e),
        }
    }
    Ok(records)
}

/// Reads every record in `dir`, failing on the first unreadable one.
///
/// Used where a skipped record could hide an open visit from a lifecycle decision.
fn read_all_strict<T: DeserializeOwned>(dir: &Path) -> ClinicResult<Vec<T>> {
    let mut records = Vec::new();
    for id in list_ids(dir)? {
        if let Some(record) = read_record(&record_path(dir, id))? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Creates the record file for a freshly allocated id.
///
/// Returns `Ok(false)` if the file already exists.
fn create_record<T: Serialize>(file: &Path, record: &T) -> ClinicResult<bool> {
    let yaml = serde_yaml::to_string(record).map_err(ClinicError::Serialization)?;
    create_with(file, |handle| handle.write_all(yaml.as_bytes()))
}

/// Creates `file` exclusively and fills it with `write`.
///
/// A failed write removes the file again so the id is not held by a partial record.
fn create_with(
    file: &Path,
    write: impl FnOnce(&mut fs::File) -> std::io::Result<()>,
) -> ClinicResult<bool> {
    let mut handle = match fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(file)
    {
        Ok(h) => h,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(ClinicError::FileWrite(e)),
    };
    if let Err(e) = write(&mut handle) {
        drop(handle);
        if let Err(cleanup) = fs::remove_file(file) {
            tracing::error!(
                "failed to remove partial record {}: {}",
                file.display(),
                cleanup
            );
        }
        return Err(ClinicError::FileWrite(e));
    }
    Ok(true)
}

/// Replaces the record file for an existing id.
fn replace_record<T: Serialize>(
    file: &Path,
    record: &T,
    kind: RecordKind,
    id: RecordId,
) -> ClinicResult<()> {
    if !file.is_file() {
        return Err(ClinicError::not_found(kind, id.get()));
    }
    let yaml = serde_yaml::to_string(record).map_err(ClinicError::Serialization)?;
    let tmp = file.with_extension(format!("{RECORD_FILE_EXTENSION}.tmp"));
    fs::write(&tmp, yaml).map_err(ClinicError::FileWrite)?;
    fs::rename(&tmp, file).map_err(ClinicError::FileWrite)
}

/// Allocates the next free id in `dir` and writes the record built for it.
fn allocate_and_create<T: Serialize>(
    dir: &Path,
    mut build: impl FnMut(RecordId) -> T,
) -> ClinicResult<T> {
    for _attempt in 0..ID_ALLOCATION_ATTEMPTS {
        let id = list_ids(dir)?
            .last()
            .map(|id| id.next())
            .unwrap_or(RecordId::FIRST);
        let record = build(id);
        if create_record(&record_path(dir, id), &record)? {
            return Ok(record);
        }
    }

    Err(ClinicError::IdAllocation {
        attempts: ID_ALLOCATION_ATTEMPTS,
    })
}

impl PatientRepository for YamlFileStore {
    fn add_patient(&self, new: NewPatient) -> ClinicResult<Patient> {
        let _guard = self.lock()?;
        allocate_and_create(&self.patients_dir, |id| Patient::from_new(id, new.clone()))
    }

    fn get_patient(&self, id: RecordId) -> ClinicResult<Option<Patient>> {
        read_record(&record_path(&self.patients_dir, id))
    }

    fn update_patient(&self, patient: &Patient) -> ClinicResult<()> {
        let _guard = self.lock()?;
        replace_record(
            &record_path(&self.patients_dir, patient.id),
            patient,
            RecordKind::Patient,
            patient.id,
        )
    }

    fn list_patients(&self) -> ClinicResult<Vec<Patient>> {
        read_all(&self.patients_dir)
    }
}

impl VisitRepository for YamlFileStore {
    fn add_visit(&self, new: NewVisit) -> ClinicResult<Visit> {
        let _guard = self.lock()?;
        allocate_and_create(&self.visits_dir, |id| Visit::from_new(id, new.clone()))
    }

    fn get_visit(&self, id: RecordId) -> ClinicResult<Option<Visit>> {
        read_record(&record_path(&self.visits_dir, id))
    }

    fn update_visit(&self, visit: &Visit) -> ClinicResult<()> {
        let _guard = self.lock()?;
        replace_record(
            &record_path(&self.visits_dir, visit.id()),
            visit,
            RecordKind::Visit,
            visit.id(),
        )
    }

    fn visits_for_patient(&self, patient_id: RecordId) -> ClinicResult<Vec<Visit>> {
        let mut visits: Vec<Visit> = read_all_strict::<Visit>(&self.visits_dir)?
            .into_iter()
            .filter(|v| v.patient_id() == patient_id)
            .collect();
        sort_visits_by_start(&mut visits);
        Ok(visits)
    }

    fn paused_visits(&self) -> ClinicResult<Vec<Visit>> {
        Ok(read_all::<Visit>(&self.visits_dir)?
            .into_iter()
            .filter(|v| v.state() == VisitState::Paused)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sections::resolve_sections;
    use crate::visit::tests::t0;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, YamlFileStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = YamlFileStore::open(temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    fn new_visit(patient_id: i64) -> NewVisit {
        NewVisit::new(
            patient_id,
            "fever",
            "2 days",
            Some("walk-in"),
            resolve_sections(&[]),
            t0(),
        )
        .unwrap()
    }

    #[test]
    fn test_open_rejects_missing_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");
        assert!(matches!(
            YamlFileStore::open(&missing),
            Err(ClinicError::StorageDirCreation(_))
        ));
    }

    #[test]
    fn test_add_and_get_visit() {
        let (temp_dir, store) = setup_store();
        let visit = store.add_visit(new_visit(42)).unwrap();
        assert_eq!(visit.id().get(), 1);
        assert!(temp_dir.path().join("visits/1.yaml").is_file());

        let loaded = store.get_visit(visit.id()).unwrap().unwrap();
        assert_eq!(loaded, visit);
        assert_eq!(loaded.short_note(), Some("walk-in"));
    }

    #[test]
    fn test_get_missing_visit_is_none() {
        let (_temp_dir, store) = setup_store();
        assert!(store.get_visit(RecordId::new(9).unwrap()).unwrap().is_none());
    }

    #[test]
    fn test_ids_continue_after_highest_existing_file() {
        let (temp_dir, store) = setup_store();
        store.add_visit(new_visit(1)).unwrap();
        fs::copy(
            temp_dir.path().join("visits/1.yaml"),
            temp_dir.path().join("visits/5.yaml"),
        )
        .unwrap();
        let next = store.add_visit(new_visit(1)).unwrap();
        assert_eq!(next.id().get(), 6);
    }

    #[test]
    fn test_update_visit_persists_changes() {
        let (_temp_dir, store) = setup_store();
        let mut visit = store.add_visit(new_visit(42)).unwrap();
        visit.pause(t0()).unwrap();
        store.update_visit(&visit).unwrap();

        let reopened = store.get_visit(visit.id()).unwrap().unwrap();
        assert_eq!(reopened.state(), VisitState::Paused);
        assert_eq!(store.paused_visits().unwrap().len(), 1);
    }

    #[test]
    fn test_update_unknown_patient_is_not_found() {
        let (_temp_dir, store) = setup_store();
        let new = NewPatient::new("A", "B", None, None, t0()).unwrap();
        let patient = Patient::from_new(RecordId::new(3).unwrap(), new);
        assert!(matches!(
            store.update_patient(&patient),
            Err(ClinicError::NotFound {
                kind: RecordKind::Patient,
                id: 3
            })
        ));
    }

    #[test]
    fn test_list_skips_unreadable_and_foreign_files() {
        let (temp_dir, store) = setup_store();
        store
            .add_patient(NewPatient::new("Amina", "Yusuf", None, None, t0()).unwrap())
            .unwrap();
        fs::write(temp_dir.path().join("patients/2.yaml"), "id: [not an id").unwrap();
        fs::write(temp_dir.path().join("patients/notes.txt"), "hello").unwrap();

        let patients = store.list_patients().unwrap();
        assert_eq!(patients.len(), 1);
        assert_eq!(patients[0].first_name, "Amina");
    }

    #[test]
    fn test_schema_mismatch_reports_field_path() {
        let (temp_dir, store) = setup_store();
        let visit = store.add_visit(new_visit(42)).unwrap();
        let file = temp_dir.path().join("visits/1.yaml");
        let text = fs::read_to_string(&file).unwrap();
        let broken = text.replace("patient_id: 42", "patient_id: -1");
        fs::write(&file, broken).unwrap();

        let err = store.get_visit(visit.id()).unwrap_err();
        match err {
            ClinicError::Deserialization { path, .. } => assert_eq!(path, "patient_id"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_visits_for_patient_are_ordered_by_start() {
        let (_temp_dir, store) = setup_store();
        let later = NewVisit::new(
            7,
            "cough",
            "",
            None,
            vec![],
            t0() + chrono::Duration::days(1),
        )
        .unwrap();
        store.add_visit(later).unwrap();
        store.add_visit(new_visit(7)).unwrap();

        let visits = store.visits_for_patient(RecordId::new(7).unwrap()).unwrap();
        assert_eq!(visits.len(), 2);
        assert_eq!(visits[0].presenting_symptom(), "fever");
        assert_eq!(visits[1].presenting_symptom(), "cough");
    }

    #[test]
    fn test_visits_for_patient_fails_on_unreadable_visit() {
        let (temp_dir, store) = setup_store();
        store.add_visit(new_visit(7)).unwrap();
        fs::write(temp_dir.path().join("visits/2.yaml"), "patient_id: [7").unwrap();

        assert!(matches!(
            store.visits_for_patient(RecordId::new(7).unwrap()),
            Err(ClinicError::Deserialization { .. })
        ));
        // Listings for follow-up still skip the broken file.
        assert!(store.paused_visits().unwrap().is_empty());
    }

    #[test]
    fn test_failed_write_removes_partial_record() {
        let (temp_dir, _store) = setup_store();
        let file = temp_dir.path().join("visits/1.yaml");

        let result = create_with(&file, |handle| {
            handle.write_all(b"patient_")?;
            Err(std::io::Error::new(ErrorKind::Other, "disk full"))
        });

        assert!(matches!(result, Err(ClinicError::FileWrite(_))));
        assert!(!file.exists());
        assert!(create_with(&file, |handle| handle.write_all(b"id: 1\n")).unwrap());
    }
}
