//! Visit lifecycle orchestration.
//!
//! [`VisitService`] decides, per patient, whether starting a visit reuses an open visit or
//! creates a new one, and applies pause/resume/end/entry operations to stored visits. Every
//! mutation reads the current record, changes it in memory and writes it back in one storage
//! call. There is no optimistic concurrency check, so two concurrent mutations of the same
//! visit resolve as last writer wins. Start-or-resume is serialised across clones of one
//! service so a patient never ends up with two open visits.

use crate::config::{CoreConfig, PausedVisitPolicy};
use crate::constants::MAX_FREE_TEXT_LEN;
use crate::error::RecordKind;
use crate::patient::Patient;
use crate::repositories::ClinicStore;
use crate::sections::SpecialtyProfile;
use crate::validation::{validate_record_id, validate_required_text};
use crate::visit::{NewVisit, Visit, VisitEntry, VisitState, Vitals};
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use clinic_types::RecordId;
use std::sync::{Arc, Mutex};

/// Outcome of [`VisitService::start_or_resume_visit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VisitStartResult {
    pub visit_id: RecordId,
    pub patient_id: RecordId,
    /// True when a paused visit was resumed by this call.
    pub is_resumed: bool,
    pub started_at: DateTime<Utc>,
    /// True when the patient has a paused visit that this call left untouched.
    pub has_paused_visit: bool,
    pub paused_visit_id: Option<RecordId>,
}

impl VisitStartResult {
    fn for_visit(visit: &Visit) -> Self {
        Self {
            visit_id: visit.id(),
            patient_id: visit.patient_id(),
            is_resumed: false,
            started_at: visit.started_at(),
            has_paused_visit: false,
            paused_visit_id: None,
        }
    }
}

/// A paused visit as listed for follow-up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PausedVisitSummary {
    pub visit_id: RecordId,
    pub patient_id: RecordId,
    pub patient_name: String,
    pub paused_at: DateTime<Utc>,
    /// True when the visit has been paused for longer than the configured threshold.
    pub is_stale: bool,
}

#[derive(Clone)]
pub struct VisitService {
    cfg: Arc<CoreConfig>,
    store: Arc<dyn ClinicStore>,
    /// Held across the open-visit lookup and the create or resume that follows it.
    start_lock: Arc<Mutex<()>>,
}

impl VisitService {
    pub fn new(cfg: Arc<CoreConfig>, store: Arc<dyn ClinicStore>) -> Self {
        Self {
            cfg,
            store,
            start_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Starts a visit for a patient, or returns the visit they already have open.
    ///
    /// - An active visit is returned unchanged with `is_resumed = false`.
    /// - A paused visit is handled according to the configured [`PausedVisitPolicy`]:
    ///   `Surface` reports it through `has_paused_visit`/`paused_visit_id` without changing it;
    ///   `AutoResume` resumes it, refreshes the presenting symptom details and sets
    ///   `is_resumed = true`.
    /// - Otherwise a new visit is created with sections resolved from the configured profiles.
    ///
    /// # Errors
    ///
    /// - `ClinicError::InvalidInput` if `patient_id` is not positive or `symptom` is blank
    /// - `ClinicError::NotFound` if the patient does not exist or has been deleted
    /// - storage errors from the underlying store
    pub fn start_or_resume_visit(
        &self,
        patient_id: i64,
        symptom: &str,
        duration: &str,
        note: Option<&str>,
    ) -> ClinicResult<VisitStartResult> {
        let patient_id = validate_record_id("patient_id", patient_id)?;
        validate_required_text("symptom", symptom, MAX_FREE_TEXT_LEN)?;
        self.require_patient(patient_id)?;

        let _guard = self
            .start_lock
            .lock()
            .map_err(|_| ClinicError::LockPoisoned)?;
        let now = Utc::now();

        if let Some(mut open) = self.open_visit_for(patient_id)? {
            match open.state() {
                VisitState::Paused => {
                    return self.handle_paused_visit(&mut open, symptom, duration, note);
                }
                _ => {
                    tracing::info!(
                        "patient {} already has active visit {}",
                        patient_id,
                        open.id()
                    );
                    return Ok(VisitStartResult::for_visit(&open));
                }
            }
        }

        let new = NewVisit::new(
            patient_id.get(),
            symptom,
            duration,
            note,
            self.cfg.visit_sections(),
            now,
        )?;
        let visit = self.store.add_visit(new)?;
        tracing::info!("started visit {} for patient {}", visit.id(), patient_id);

        Ok(VisitStartResult::for_visit(&visit))
    }

    fn handle_paused_visit(
        &self,
        visit: &mut Visit,
        symptom: &str,
        duration: &str,
        note: Option<&str>,
    ) -> ClinicResult<VisitStartResult> {
        match self.cfg.paused_visit_policy() {
            PausedVisitPolicy::Surface => {
                tracing::info!(
                    "patient {} has paused visit {}; leaving it for explicit resume",
                    visit.patient_id(),
                    visit.id()
                );
                Ok(VisitStartResult {
                    has_paused_visit: true,
                    paused_visit_id: Some(visit.id()),
                    ..VisitStartResult::for_visit(visit)
                })
            }
            PausedVisitPolicy::AutoResume => {
                visit.resume()?;
                visit.update_presenting_symptom(symptom, duration, note)?;
                self.store.update_visit(visit)?;
                tracing::info!(
                    "resumed paused visit {} for patient {}",
                    visit.id(),
                    visit.patient_id()
                );
                Ok(VisitStartResult {
                    is_resumed: true,
                    ..VisitStartResult::for_visit(visit)
                })
            }
        }
    }

    /// Pauses an active visit.
    ///
    /// # Errors
    ///
    /// - `ClinicError::InvalidInput` if `visit_id` is not positive
    /// - `ClinicError::NotFound` if the visit does not exist
    /// - `ClinicError::InvalidState` if the visit is already paused or has ended
    pub fn pause_visit(&self, visit_id: i64) -> ClinicResult<Visit> {
        self.mutate_visit(visit_id, |visit| visit.pause(Utc::now()))
            .inspect(|v| tracing::info!("paused visit {}", v.id()))
    }

    /// Resumes a paused visit.
    ///
    /// # Errors
    ///
    /// - `ClinicError::InvalidInput` if `visit_id` is not positive
    /// - `ClinicError::NotFound` if the visit does not exist
    /// - `ClinicError::InvalidState` if the visit is active or has ended
    pub fn resume_visit(&self, visit_id: i64) -> ClinicResult<Visit> {
        self.mutate_visit(visit_id, Visit::resume)
            .inspect(|v| tracing::info!("resumed visit {}", v.id()))
    }

    /// Ends a visit. Ending an already ended visit returns it unchanged.
    ///
    /// # Errors
    ///
    /// - `ClinicError::InvalidInput` if `visit_id` is not positive
    /// - `ClinicError::NotFound` if the visit does not exist
    pub fn end_visit(&self, visit_id: i64) -> ClinicResult<Visit> {
        let mut visit = self.load_visit(visit_id)?;
        if visit.end(Utc::now()) {
            self.store.update_visit(&visit)?;
            tracing::info!("ended visit {}", visit.id());
        } else {
            tracing::debug!("visit {} was already ended", visit.id());
        }
        Ok(visit)
    }

    /// Appends a clinical entry to an open visit.
    ///
    /// # Errors
    ///
    /// - `ClinicError::InvalidInput` if `visit_id` is not positive, or the section, content or
    ///   system code is invalid
    /// - `ClinicError::NotFound` if the visit does not exist
    /// - `ClinicError::InvalidState` if the visit has ended
    pub fn add_entry(
        &self,
        visit_id: i64,
        profile: SpecialtyProfile,
        section: &str,
        content: &str,
        system_code: Option<&str>,
    ) -> ClinicResult<VisitEntry> {
        let mut visit = self.load_visit(visit_id)?;
        let entry = visit
            .add_entry(profile, section, content, system_code, Utc::now())?
            .clone();
        self.store.update_visit(&visit)?;
        tracing::info!(
            "added {} entry to section '{}' of visit {}",
            entry.system_code,
            entry.section,
            visit.id()
        );
        Ok(entry)
    }

    /// Records vital signs on an open visit, replacing any earlier reading.
    ///
    /// # Errors
    ///
    /// - `ClinicError::InvalidInput` if `visit_id` is not positive or the readings are invalid
    /// - `ClinicError::NotFound` if the visit does not exist
    /// - `ClinicError::InvalidState` if the visit has ended
    pub fn record_vitals(&self, visit_id: i64, vitals: Vitals) -> ClinicResult<Visit> {
        self.mutate_visit(visit_id, |visit| visit.record_vitals(vitals))
    }

    /// # Errors
    ///
    /// - `ClinicError::InvalidInput` if `visit_id` is not positive
    /// - `ClinicError::NotFound` if the visit does not exist
    pub fn get_visit(&self, visit_id: i64) -> ClinicResult<Visit> {
        self.load_visit(visit_id)
    }

    /// All visits of a patient, oldest first.
    ///
    /// # Errors
    ///
    /// - `ClinicError::InvalidInput` if `patient_id` is not positive
    /// - `ClinicError::NotFound` if the patient does not exist or has been deleted
    pub fn visits_for_patient(&self, patient_id: i64) -> ClinicResult<Vec<Visit>> {
        let patient_id = validate_record_id("patient_id", patient_id)?;
        self.require_patient(patient_id)?;
        self.store.visits_for_patient(patient_id)
    }

    /// Paused visits with their patient names, longest paused first.
    ///
    /// A visit is stale when it was paused before `now` minus the configured threshold.
    pub fn list_paused_visits(&self, now: DateTime<Utc>) -> ClinicResult<Vec<PausedVisitSummary>> {
        // A threshold reaching past the earliest representable time means nothing is stale.
        let stale_before = now.checked_sub_signed(self.cfg.paused_stale_after());

        let mut summaries = Vec::new();
        for visit in self.store.paused_visits()? {
            let Some(paused_at) = visit.paused_at() else {
                continue;
            };
            let patient_name = match self.store.get_patient(visit.patient_id())? {
                Some(patient) => patient.full_name(),
                None => {
                    tracing::warn!(
                        "paused visit {} references missing patient {}",
                        visit.id(),
                        visit.patient_id()
                    );
                    String::new()
                }
            };
            summaries.push(PausedVisitSummary {
                visit_id: visit.id(),
                patient_id: visit.patient_id(),
                patient_name,
                paused_at,
                is_stale: stale_before.is_some_and(|cutoff| paused_at < cutoff),
            });
        }

        summaries.sort_by(|a, b| a.paused_at.cmp(&b.paused_at).then(a.visit_id.cmp(&b.visit_id)));
        Ok(summaries)
    }

    /// Sections new visits are created with under the configured profiles.
    pub fn active_sections(&self) -> Vec<String> {
        self.cfg.visit_sections()
    }

    fn require_patient(&self, patient_id: RecordId) -> ClinicResult<Patient> {
        match self.store.get_patient(patient_id)? {
            Some(patient) if !patient.is_deleted() => Ok(patient),
            _ => Err(ClinicError::not_found(RecordKind::Patient, patient_id.get())),
        }
    }

    /// The patient's non-ended visit, if any. If storage holds more than one, the most recently
    /// started wins.
    fn open_visit_for(&self, patient_id: RecordId) -> ClinicResult<Option<Visit>> {
        let mut open: Vec<Visit> = self
            .store
            .visits_for_patient(patient_id)?
            .into_iter()
            .filter(Visit::is_open)
            .collect();
        if open.len() > 1 {
            tracing::warn!(
                "patient {} has {} open visits; using the most recent",
                patient_id,
                open.len()
            );
        }
        Ok(open.pop())
    }

    fn load_visit(&self, visit_id: i64) -> ClinicResult<Visit> {
        let id = validate_record_id("visit_id", visit_id)?;
        self.store
            .get_visit(id)?
            .ok_or_else(|| ClinicError::not_found(RecordKind::Visit, visit_id))
    }

    fn mutate_visit(
        &self,
        visit_id: i64,
        change: impl FnOnce(&mut Visit) -> ClinicResult<()>,
    ) -> ClinicResult<Visit> {
        let mut visit = self.load_visit(visit_id)?;
        change(&mut visit)?;
        self.store.update_visit(&visit)?;
        Ok(visit)
    }
}
