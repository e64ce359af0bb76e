//! Visit entity and lifecycle state machine.
//!
//! A visit starts `Active`, may alternate between `Active` and `Paused` any number of times,
//! and finally becomes `Ended`. An ended visit is terminal: its end timestamp never changes and
//! no further entries, vitals or symptom updates are accepted.

use crate::constants::MAX_FREE_TEXT_LEN;
use crate::sections::{find_section, SpecialtyProfile};
use crate::validation::{validate_optional_text, validate_record_id, validate_required_text};
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use clinic_types::{RecordId, SystemCode};
use serde::{Deserialize, Serialize};

/// Lifecycle state derived from a visit's timestamps.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitState {
    /// Started and not paused.
    Active,
    /// Temporarily suspended pending resumption.
    Paused,
    /// Terminal.
    Ended,
}

impl std::fmt::Display for VisitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VisitState::Active => write!(f, "active"),
            VisitState::Paused => write!(f, "paused"),
            VisitState::Ended => write!(f, "ended"),
        }
    }
}

/// Vital signs recorded during a visit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    /// Body temperature in degrees Celsius.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f32>,
    /// Systolic blood pressure in mmHg.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic: Option<u16>,
    /// Diastolic blood pressure in mmHg.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diastolic: Option<u16>,
}

impl Vitals {
    const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 25.0..=45.0;
    const SYSTOLIC_RANGE: std::ops::RangeInclusive<u16> = 40..=300;
    const DIASTOLIC_RANGE: std::ops::RangeInclusive<u16> = 20..=200;

    /// Checks that at least one reading is present and that each reading is plausible.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidInput` describing the first failing reading.
    pub fn validate(&self) -> ClinicResult<()> {
        if self.temperature_c.is_none() && self.systolic.is_none() && self.diastolic.is_none() {
            return Err(ClinicError::InvalidInput(
                "vitals must contain at least one reading".into(),
            ));
        }

        if let Some(t) = self.temperature_c {
            if !Self::TEMPERATURE_RANGE.contains(&t) {
                return Err(ClinicError::InvalidInput(format!(
                    "temperature {t} is outside {:?} C",
                    Self::TEMPERATURE_RANGE
                )));
            }
        }
        if let Some(s) = self.systolic {
            if !Self::SYSTOLIC_RANGE.contains(&s) {
                return Err(ClinicError::InvalidInput(format!(
                    "systolic pressure {s} is outside {:?} mmHg",
                    Self::SYSTOLIC_RANGE
                )));
            }
        }
        if let Some(d) = self.diastolic {
            if !Self::DIASTOLIC_RANGE.contains(&d) {
                return Err(ClinicError::InvalidInput(format!(
                    "diastolic pressure {d} is outside {:?} mmHg",
                    Self::DIASTOLIC_RANGE
                )));
            }
        }
        if let (Some(s), Some(d)) = (self.systolic, self.diastolic) {
            if d >= s {
                return Err(ClinicError::InvalidInput(
                    "diastolic pressure must be below systolic pressure".into(),
                ));
            }
        }

        Ok(())
    }
}

/// One free-text clinical entry within a visit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisitEntry {
    pub system_code: SystemCode,
    pub section: String,
    pub content: String,
    pub recorded_at: DateTime<Utc>,
}

/// A validated visit that has not yet been given an id by storage.
#[derive(Clone, Debug, PartialEq)]
pub struct NewVisit {
    pub(crate) patient_id: RecordId,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) presenting_symptom: String,
    pub(crate) symptom_duration: String,
    pub(crate) short_note: Option<String>,
    pub(crate) sections: Vec<String>,
}

impl NewVisit {
    /// Validates the opening details of a visit.
    ///
    /// # Arguments
    ///
    /// * `patient_id` - Owning patient; must be positive.
    /// * `symptom` - Presenting symptom; must not be blank.
    /// * `duration` - How long the symptom has been present; may be blank.
    /// * `note` - Optional short note; blank becomes `None`.
    /// * `sections` - The resolved form sections for this visit.
    /// * `started_at` - Start timestamp.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidInput` if the patient id is not positive, the symptom is
    /// blank, or any text field is too long.
    pub fn new(
        patient_id: i64,
        symptom: &str,
        duration: &str,
        note: Option<&str>,
        sections: Vec<String>,
        started_at: DateTime<Utc>,
    ) -> ClinicResult<Self> {
        let patient_id = validate_record_id("patient_id", patient_id)?;
        let (presenting_symptom, symptom_duration, short_note) =
            validate_presenting_symptom(symptom, duration, note)?;

        Ok(Self {
            patient_id,
            started_at,
            presenting_symptom,
            symptom_duration,
            short_note,
            sections,
        })
    }
}

fn validate_presenting_symptom(
    symptom: &str,
    duration: &str,
    note: Option<&str>,
) -> ClinicResult<(String, String, Option<String>)> {
    let symptom = validate_required_text("symptom", symptom, MAX_FREE_TEXT_LEN)?;
    let duration = validate_optional_text("duration", Some(duration))?.unwrap_or_default();
    let note = validate_optional_text("note", note)?;
    Ok((symptom.into_string(), duration, note))
}

/// A clinical encounter between a patient and the clinic.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    id: RecordId,
    patient_id: RecordId,
    started_at: DateTime<Utc>,
    #[serde(default)]
    paused_at: Option<DateTime<Utc>>,
    #[serde(default)]
    ended_at: Option<DateTime<Utc>>,
    presenting_symptom: String,
    #[serde(default)]
    symptom_duration: String,
    #[serde(default)]
    short_note: Option<String>,
    #[serde(default)]
    vitals: Option<Vitals>,
    #[serde(default)]
    sections: Vec<String>,
    #[serde(default)]
    entries: Vec<VisitEntry>,
}

impl Visit {
    /// Builds a stored visit from validated details and a storage-assigned id.
    pub fn from_new(id: RecordId, new: NewVisit) -> Self {
        Self {
            id,
            patient_id: new.patient_id,
            started_at: new.started_at,
            paused_at: None,
            ended_at: None,
            presenting_symptom: new.presenting_symptom,
            symptom_duration: new.symptom_duration,
            short_note: new.short_note,
            vitals: None,
            sections: new.sections,
            entries: Vec::new(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn patient_id(&self) -> RecordId {
        self.patient_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn paused_at(&self) -> Option<DateTime<Utc>> {
        self.paused_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    pub fn presenting_symptom(&self) -> &str {
        &self.presenting_symptom
    }

    pub fn symptom_duration(&self) -> &str {
        &self.symptom_duration
    }

    pub fn short_note(&self) -> Option<&str> {
        self.short_note.as_deref()
    }

    pub fn vitals(&self) -> Option<&Vitals> {
        self.vitals.as_ref()
    }

    pub fn sections(&self) -> &[String] {
        &self.sections
    }

    pub fn entries(&self) -> &[VisitEntry] {
        &self.entries
    }

    pub fn state(&self) -> VisitState {
        if self.ended_at.is_some() {
            VisitState::Ended
        } else if self.paused_at.is_some() {
            VisitState::Paused
        } else {
            VisitState::Active
        }
    }

    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Pauses an active visit.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidState` if the visit is already paused or has ended.
    pub fn pause(&mut self, at: DateTime<Utc>) -> ClinicResult<()> {
        match self.state() {
            VisitState::Active => {
                self.paused_at = Some(at);
                Ok(())
            }
            state => Err(self.transition_error("pause", state)),
        }
    }

    /// Resumes a paused visit, clearing its pause timestamp.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidState` if the visit is active or has ended.
    pub fn resume(&mut self) -> ClinicResult<()> {
        match self.state() {
            VisitState::Paused => {
                self.paused_at = None;
                Ok(())
            }
            state => Err(self.transition_error("resume", state)),
        }
    }

    /// Ends the visit.
    ///
    /// Returns `true` if this call ended the visit and `false` if it had already ended, in which
    /// case the original end timestamp is kept.
    pub fn end(&mut self, at: DateTime<Utc>) -> bool {
        if self.ended_at.is_some() {
            return false;
        }
        self.ended_at = Some(at);
        true
    }

    /// Appends a clinical entry.
    ///
    /// `system_code` defaults to the profile's system tag. When the visit carries a resolved
    /// section list, `section` must name one of those sections (case-insensitively) and is
    /// stored in its canonical spelling.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidState` if the visit has ended, or
    /// `ClinicError::InvalidInput` if the section, content or system code is invalid.
    pub fn add_entry(
        &mut self,
        profile: SpecialtyProfile,
        section: &str,
        content: &str,
        system_code: Option<&str>,
        at: DateTime<Utc>,
    ) -> ClinicResult<&VisitEntry> {
        self.ensure_open("add an entry to")?;

        let section = validate_required_text("section", section, MAX_FREE_TEXT_LEN)?;
        let section = if self.sections.is_empty() {
            section.into_string()
        } else {
            find_section(&self.sections, section.as_str())
                .map(str::to_owned)
                .ok_or_else(|| {
                    ClinicError::InvalidInput(format!(
                        "section '{section}' is not part of visit {}",
                        self.id
                    ))
                })?
        };
        let content = validate_required_text("content", content, MAX_FREE_TEXT_LEN)?;
        let system_code = match system_code.map(str::trim).filter(|s| !s.is_empty()) {
            Some(code) => SystemCode::new(code)?,
            None => profile.system_code()?,
        };

        self.entries.push(VisitEntry {
            system_code,
            section,
            content: content.into_string(),
            recorded_at: at,
        });
        // The push above guarantees at least one entry.
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Replaces the visit's vital signs.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidState` if the visit has ended, or
    /// `ClinicError::InvalidInput` if the readings are implausible.
    pub fn record_vitals(&mut self, vitals: Vitals) -> ClinicResult<()> {
        self.ensure_open("record vitals for")?;
        vitals.validate()?;
        self.vitals = Some(vitals);
        Ok(())
    }

    /// Replaces the presenting symptom details. A `None` note keeps the existing note.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidState` if the visit has ended, or
    /// `ClinicError::InvalidInput` if the symptom is blank.
    pub fn update_presenting_symptom(
        &mut self,
        symptom: &str,
        duration: &str,
        note: Option<&str>,
    ) -> ClinicResult<()> {
        self.ensure_open("update")?;
        let (symptom, duration, note) = validate_presenting_symptom(symptom, duration, note)?;
        self.presenting_symptom = symptom;
        self.symptom_duration = duration;
        if note.is_some() {
            self.short_note = note;
        }
        Ok(())
    }

    fn ensure_open(&self, action: &str) -> ClinicResult<()> {
        if self.ended_at.is_some() {
            return Err(ClinicError::InvalidState(format!(
                "cannot {action} visit {} because it has ended",
                self.id
            )));
        }
        Ok(())
    }

    fn transition_error(&self, action: &str, state: VisitState) -> ClinicError {
        ClinicError::InvalidState(format!("cannot {action} visit {} while it is {state}", self.id))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::sections::resolve_sections;
    use chrono::{Duration, TimeZone};

    pub(crate) fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn new_visit(sections: Vec<String>) -> Visit {
        let new = NewVisit::new(42, "fever", "2 days", None, sections, t0()).unwrap();
        Visit::from_new(RecordId::new(1).unwrap(), new)
    }

    #[test]
    fn test_new_visit_rejects_non_positive_patient() {
        let err = NewVisit::new(0, "fever", "", None, vec![], t0()).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
        assert!(NewVisit::new(-3, "fever", "", None, vec![], t0()).is_err());
    }

    #[test]
    fn test_new_visit_rejects_blank_symptom() {
        let err = NewVisit::new(42, "  ", "2 days", None, vec![], t0()).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(msg) if msg.contains("symptom")));
    }

    #[test]
    fn test_new_visit_starts_active() {
        let visit = new_visit(vec![]);
        assert_eq!(visit.state(), VisitState::Active);
        assert_eq!(visit.started_at(), t0());
        assert_eq!(visit.presenting_symptom(), "fever");
        assert_eq!(visit.symptom_duration(), "2 days");
        assert_eq!(visit.short_note(), None);
    }

    #[test]
    fn test_pause_then_resume_restores_active() {
        let mut visit = new_visit(vec![]);
        visit.pause(t0() + Duration::minutes(10)).unwrap();
        assert_eq!(visit.state(), VisitState::Paused);
        assert_eq!(visit.paused_at(), Some(t0() + Duration::minutes(10)));

        visit.resume().unwrap();
        assert_eq!(visit.state(), VisitState::Active);
        assert_eq!(visit.paused_at(), None);
        assert_eq!(visit.started_at(), t0());
    }

    #[test]
    fn test_active_and_paused_alternate_repeatedly() {
        let mut visit = new_visit(vec![]);
        for i in 1..=3 {
            visit.pause(t0() + Duration::hours(i)).unwrap();
            visit.resume().unwrap();
        }
        assert_eq!(visit.state(), VisitState::Active);
    }

    #[test]
    fn test_pause_when_paused_is_reported() {
        let mut visit = new_visit(vec![]);
        visit.pause(t0()).unwrap();
        let err = visit.pause(t0() + Duration::minutes(1)).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidState(_)));
        assert_eq!(visit.paused_at(), Some(t0()));
    }

    #[test]
    fn test_resume_when_active_is_reported() {
        let mut visit = new_visit(vec![]);
        assert!(matches!(
            visit.resume().unwrap_err(),
            ClinicError::InvalidState(_)
        ));
    }

    #[test]
    fn test_end_is_idempotent() {
        let mut visit = new_visit(vec![]);
        let first = t0() + Duration::hours(1);
        assert!(visit.end(first));
        assert!(!visit.end(first + Duration::hours(5)));
        assert_eq!(visit.ended_at(), Some(first));
        assert_eq!(visit.state(), VisitState::Ended);
    }

    #[test]
    fn test_end_from_paused() {
        let mut visit = new_visit(vec![]);
        visit.pause(t0()).unwrap();
        assert!(visit.end(t0() + Duration::minutes(5)));
        assert_eq!(visit.state(), VisitState::Ended);
    }

    #[test]
    fn test_pause_and_resume_rejected_after_end() {
        let mut visit = new_visit(vec![]);
        visit.pause(t0()).unwrap();
        visit.end(t0());
        assert!(visit.resume().is_err());
        assert!(visit.pause(t0()).is_err());
    }

    #[test]
    fn test_add_entry_after_end_is_rejected() {
        let mut visit = new_visit(resolve_sections(&[]));
        visit.end(t0());
        let err = visit
            .add_entry(SpecialtyProfile::Generic, "History", "cough", None, t0())
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidState(_)));
        assert!(visit.entries().is_empty());
    }

    #[test]
    fn test_add_entry_while_paused_is_allowed() {
        let mut visit = new_visit(resolve_sections(&[]));
        visit.pause(t0()).unwrap();
        visit
            .add_entry(SpecialtyProfile::Generic, "diagnosis", "viral URTI", None, t0())
            .unwrap();
        assert_eq!(visit.entries()[0].section, "Diagnosis");
        assert_eq!(visit.entries()[0].system_code.as_str(), "General");
    }

    #[test]
    fn test_add_entry_uses_profile_system_code_by_default() {
        let mut visit = new_visit(resolve_sections(&[SpecialtyProfile::ObGyne]));
        let entry = visit
            .add_entry(SpecialtyProfile::ObGyne, "LMP", "2024-02-10", None, t0())
            .unwrap();
        assert_eq!(entry.system_code.as_str(), "GyneOb");

        let entry = visit
            .add_entry(
                SpecialtyProfile::ObGyne,
                "EDD",
                "2024-11-16",
                Some("Antenatal"),
                t0(),
            )
            .unwrap();
        assert_eq!(entry.system_code.as_str(), "Antenatal");
        assert_eq!(visit.entries().len(), 2);
    }

    #[test]
    fn test_add_entry_rejects_unknown_section() {
        let mut visit = new_visit(resolve_sections(&[SpecialtyProfile::Ophthalmology]));
        let err = visit
            .add_entry(SpecialtyProfile::Generic, "History", "x", None, t0())
            .unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[test]
    fn test_add_entry_rejects_blank_content() {
        let mut visit = new_visit(vec![]);
        assert!(visit
            .add_entry(SpecialtyProfile::Generic, "Notes", "  ", None, t0())
            .is_err());
    }

    #[test]
    fn test_add_entry_accepts_any_section_when_visit_has_none() {
        let mut visit = new_visit(vec![]);
        visit
            .add_entry(SpecialtyProfile::Generic, "Free Notes", "ok", None, t0())
            .unwrap();
        assert_eq!(visit.entries()[0].section, "Free Notes");
    }

    #[test]
    fn test_record_vitals_validates_readings() {
        let mut visit = new_visit(vec![]);
        let ok = Vitals {
            temperature_c: Some(37.8),
            systolic: Some(120),
            diastolic: Some(80),
        };
        visit.record_vitals(ok.clone()).unwrap();
        assert_eq!(visit.vitals(), Some(&ok));

        let inverted = Vitals {
            temperature_c: None,
            systolic: Some(80),
            diastolic: Some(120),
        };
        assert!(visit.record_vitals(inverted).is_err());
        assert!(visit.record_vitals(Vitals::default()).is_err());
        assert!(visit
            .record_vitals(Vitals {
                temperature_c: Some(60.0),
                ..Vitals::default()
            })
            .is_err());
        assert_eq!(visit.vitals(), Some(&ok));
    }

    #[test]
    fn test_record_vitals_rejected_after_end() {
        let mut visit = new_visit(vec![]);
        visit.end(t0());
        let vitals = Vitals {
            temperature_c: Some(37.0),
            ..Vitals::default()
        };
        assert!(matches!(
            visit.record_vitals(vitals).unwrap_err(),
            ClinicError::InvalidState(_)
        ));
    }

    #[test]
    fn test_update_presenting_symptom_keeps_note_when_none() {
        let new = NewVisit::new(42, "fever", "2 days", Some("first note"), vec![], t0()).unwrap();
        let mut visit = Visit::from_new(RecordId::new(1).unwrap(), new);
        visit
            .update_presenting_symptom("cough", "1 week", None)
            .unwrap();
        assert_eq!(visit.presenting_symptom(), "cough");
        assert_eq!(visit.symptom_duration(), "1 week");
        assert_eq!(visit.short_note(), Some("first note"));
    }

    #[test]
    fn test_visit_yaml_roundtrip_preserves_state() {
        let mut visit = new_visit(resolve_sections(&[]));
        visit.pause(t0()).unwrap();
        let yaml = serde_yaml::to_string(&visit).unwrap();
        let parsed: Visit = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, visit);
        assert_eq!(parsed.state(), VisitState::Paused);
    }
}
