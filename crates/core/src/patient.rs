//! Patient register entity.

use crate::constants::{MAX_NAME_LEN, MAX_PHONE_LEN};
use crate::validation::{validate_optional_text, validate_required_text};
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, NaiveDate, Utc};
use clinic_types::RecordId;
use serde::{Deserialize, Serialize};

/// A validated patient that has not yet been given an id by storage.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPatient {
    pub(crate) first_name: String,
    pub(crate) last_name: String,
    pub(crate) birth_date: Option<NaiveDate>,
    pub(crate) phone: Option<String>,
    pub(crate) created_at: DateTime<Utc>,
}

impl NewPatient {
    /// Validates patient registration details.
    ///
    /// `birth_date` is expected as `YYYY-MM-DD` and must not be after `created_at`.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidInput` if a name is blank or too long, or the birth date is
    /// malformed or in the future.
    pub fn new(
        first_name: &str,
        last_name: &str,
        birth_date: Option<&str>,
        phone: Option<&str>,
        created_at: DateTime<Utc>,
    ) -> ClinicResult<Self> {
        let first_name = validate_required_text("first_name", first_name, MAX_NAME_LEN)?;
        let last_name = validate_required_text("last_name", last_name, MAX_NAME_LEN)?;

        let birth_date = match birth_date.map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => {
                let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
                    ClinicError::InvalidInput(format!("birth_date '{raw}' is not YYYY-MM-DD"))
                })?;
                if date > created_at.date_naive() {
                    return Err(ClinicError::InvalidInput(
                        "birth_date cannot be in the future".into(),
                    ));
                }
                Some(date)
            }
            None => None,
        };

        let phone = validate_optional_text("phone", phone)?;
        if let Some(p) = &phone {
            if p.chars().count() > MAX_PHONE_LEN {
                return Err(ClinicError::InvalidInput(format!(
                    "phone exceeds maximum length of {MAX_PHONE_LEN} characters"
                )));
            }
        }

        Ok(Self {
            first_name: first_name.into_string(),
            last_name: last_name.into_string(),
            birth_date,
            phone,
            created_at,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub id: RecordId,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn from_new(id: RecordId, new: NewPatient) -> Self {
        Self {
            id,
            first_name: new.first_name,
            last_name: new.last_name,
            birth_date: new.birth_date,
            phone: new.phone,
            created_at: new.created_at,
            deleted_at: None,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_new_patient_trims_names() {
        let p = NewPatient::new(" Amina ", " Yusuf", Some("1990-05-17"), None, now()).unwrap();
        let patient = Patient::from_new(RecordId::new(1).unwrap(), p);
        assert_eq!(patient.full_name(), "Amina Yusuf");
        assert_eq!(
            patient.birth_date,
            Some(NaiveDate::from_ymd_opt(1990, 5, 17).unwrap())
        );
        assert!(!patient.is_deleted());
    }

    #[test]
    fn test_new_patient_rejects_blank_last_name() {
        assert!(NewPatient::new("Amina", "  ", None, None, now()).is_err());
    }

    #[test]
    fn test_new_patient_rejects_bad_birth_date() {
        assert!(NewPatient::new("A", "B", Some("17/05/1990"), None, now()).is_err());
        assert!(NewPatient::new("A", "B", Some("2030-01-01"), None, now()).is_err());
    }

    #[test]
    fn test_new_patient_blank_optional_fields_become_none() {
        let p = NewPatient::new("A", "B", Some(" "), Some(""), now()).unwrap();
        assert_eq!(p.birth_date, None);
        assert_eq!(p.phone, None);
    }
}
