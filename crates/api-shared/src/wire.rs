//! JSON request and response types for the clinic API.
//!
//! Every type derives `utoipa::ToSchema` so the REST crate can publish an OpenAPI document.
//! Conversions from the core domain types live here so handlers stay thin.

use chrono::{DateTime, NaiveDate, Utc};
use clinic_core::{Patient, PausedVisitSummary, Visit, VisitEntry, VisitStartResult, Vitals};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorRes {
    pub error: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreatePatientReq {
    pub first_name: String,
    pub last_name: String,
    /// Date of birth, `YYYY-MM-DD`.
    #[serde(default)]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PatientRes {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Patient> for PatientRes {
    fn from(p: Patient) -> Self {
        Self {
            id: p.id.get(),
            first_name: p.first_name,
            last_name: p.last_name,
            birth_date: p.birth_date,
            phone: p.phone,
            created_at: p.created_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListPatientsRes {
    pub patients: Vec<PatientRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StartVisitReq {
    pub patient_id: i64,
    pub symptom: String,
    /// How long the symptom has been present, free text such as "2 days".
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VisitStartRes {
    pub visit_id: i64,
    pub patient_id: i64,
    pub is_resumed: bool,
    pub started_at: DateTime<Utc>,
    pub has_paused_visit: bool,
    pub paused_visit_id: Option<i64>,
}

impl From<VisitStartResult> for VisitStartRes {
    fn from(r: VisitStartResult) -> Self {
        Self {
            visit_id: r.visit_id.get(),
            patient_id: r.patient_id.get(),
            is_resumed: r.is_resumed,
            started_at: r.started_at,
            has_paused_visit: r.has_paused_visit,
            paused_visit_id: r.paused_visit_id.map(|id| id.get()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VitalsDto {
    #[serde(default)]
    pub temperature_c: Option<f32>,
    #[serde(default)]
    pub systolic: Option<u16>,
    #[serde(default)]
    pub diastolic: Option<u16>,
}

impl From<VitalsDto> for Vitals {
    fn from(v: VitalsDto) -> Self {
        Self {
            temperature_c: v.temperature_c,
            systolic: v.systolic,
            diastolic: v.diastolic,
        }
    }
}

impl From<&Vitals> for VitalsDto {
    fn from(v: &Vitals) -> Self {
        Self {
            temperature_c: v.temperature_c,
            systolic: v.systolic,
            diastolic: v.diastolic,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VisitEntryRes {
    pub system_code: String,
    pub section: String,
    pub content: String,
    pub recorded_at: DateTime<Utc>,
}

impl From<&VisitEntry> for VisitEntryRes {
    fn from(e: &VisitEntry) -> Self {
        Self {
            system_code: e.system_code.to_string(),
            section: e.section.clone(),
            content: e.content.clone(),
            recorded_at: e.recorded_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VisitRes {
    pub id: i64,
    pub patient_id: i64,
    /// One of `active`, `paused`, `ended`.
    pub state: String,
    pub started_at: DateTime<Utc>,
    pub paused_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub presenting_symptom: String,
    pub symptom_duration: String,
    pub short_note: Option<String>,
    pub vitals: Option<VitalsDto>,
    pub sections: Vec<String>,
    pub entries: Vec<VisitEntryRes>,
}

impl From<&Visit> for VisitRes {
    fn from(v: &Visit) -> Self {
        Self {
            id: v.id().get(),
            patient_id: v.patient_id().get(),
            state: v.state().to_string(),
            started_at: v.started_at(),
            paused_at: v.paused_at(),
            ended_at: v.ended_at(),
            presenting_symptom: v.presenting_symptom().to_string(),
            symptom_duration: v.symptom_duration().to_string(),
            short_note: v.short_note().map(str::to_string),
            vitals: v.vitals().map(VitalsDto::from),
            sections: v.sections().to_vec(),
            entries: v.entries().iter().map(VisitEntryRes::from).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListVisitsRes {
    pub visits: Vec<VisitRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddEntryReq {
    /// Specialty profile the entry belongs to; defaults to `generic`.
    #[serde(default)]
    pub profile: Option<String>,
    pub section: String,
    pub content: String,
    /// Overrides the profile's system tag.
    #[serde(default)]
    pub system_code: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PausedVisitSummaryRes {
    pub visit_id: i64,
    pub patient_id: i64,
    pub patient_name: String,
    pub paused_at: DateTime<Utc>,
    pub is_stale: bool,
}

impl From<PausedVisitSummary> for PausedVisitSummaryRes {
    fn from(s: PausedVisitSummary) -> Self {
        Self {
            visit_id: s.visit_id.get(),
            patient_id: s.patient_id.get(),
            patient_name: s.patient_name,
            paused_at: s.paused_at,
            is_stale: s.is_stale,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ListPausedVisitsRes {
    pub visits: Vec<PausedVisitSummaryRes>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SectionsRes {
    pub profiles: Vec<String>,
    pub sections: Vec<String>,
}
