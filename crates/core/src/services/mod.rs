//! Domain services built on the storage traits.

pub mod patients;
pub mod visits;

pub use patients::PatientService;
pub use visits::{PausedVisitSummary, VisitService, VisitStartResult};
