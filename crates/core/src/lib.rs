//! # Clinic Core
//!
//! Core business logic for the clinic visit records system.
//!
//! This crate contains:
//! - Clinical section catalog and specialty profiles (`sections`)
//! - The visit lifecycle state machine (`visit`) and patient register entity (`patient`)
//! - Storage traits with in-memory and YAML file backends (`repositories`)
//! - Visit and patient services orchestrating the above (`services`)
//!
//! **No API concerns**: authentication and HTTP servers belong in `api-rest` or `api-shared`.

pub mod config;
pub mod constants;
pub mod error;
pub mod patient;
pub mod repositories;
pub mod sections;
pub mod services;
pub mod validation;
pub mod visit;

pub use clinic_types::{NonEmptyText, RecordId, SystemCode};
pub use config::{CoreConfig, PausedVisitPolicy};
pub use constants::DEFAULT_DATA_DIR;
pub use error::{ClinicError, ClinicResult, RecordKind};
pub use patient::Patient;
pub use repositories::{ClinicStore, InMemoryStore, YamlFileStore};
pub use sections::{resolve_sections, ClinicalSections, SpecialtyProfile};
pub use services::{PatientService, PausedVisitSummary, VisitService, VisitStartResult};
pub use visit::{Visit, VisitEntry, VisitState, Vitals};
