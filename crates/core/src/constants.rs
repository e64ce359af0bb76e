//! Constants used throughout the clinic core crate.
//!
//! This module contains storage path names and operational defaults to ensure
//! consistency across the codebase and make maintenance easier.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "clinic_data";

/// Directory name for patient records storage.
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Directory name for visit records storage.
pub const VISITS_DIR_NAME: &str = "visits";

/// File extension for stored records.
pub const RECORD_FILE_EXTENSION: &str = "yaml";

/// How many times id allocation retries when a record file already exists.
pub const ID_ALLOCATION_ATTEMPTS: usize = 5;

/// Default age after which a paused visit is reported as stale.
pub const DEFAULT_PAUSED_STALE_HOURS: i64 = 24;

/// Maximum length of free-text visit fields (symptom, duration, note, entry content).
pub const MAX_FREE_TEXT_LEN: usize = 4_000;

/// Maximum length of a patient name component.
pub const MAX_NAME_LEN: usize = 100;

/// Maximum length of a patient phone number.
pub const MAX_PHONE_LEN: usize = 32;
