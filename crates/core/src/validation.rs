//! Input validation utilities.
//!
//! This module contains functions for validating caller inputs before they reach the visit
//! and patient services.

use crate::constants::MAX_FREE_TEXT_LEN;
use crate::{ClinicError, ClinicResult};
use clinic_types::{NonEmptyText, RecordId};

/// Validates a caller-supplied identifier and converts it to a [`RecordId`].
///
/// # Errors
///
/// Returns `ClinicError::InvalidInput` naming `field` if `value` is zero or negative.
pub fn validate_record_id(field: &str, value: i64) -> ClinicResult<RecordId> {
    RecordId::new(value).map_err(|_| {
        ClinicError::InvalidInput(format!("{field} must be a positive integer, got {value}"))
    })
}

/// Validates a required free-text field.
///
/// The text is trimmed; it must be non-empty and at most `max_len` characters.
///
/// # Errors
///
/// Returns `ClinicError::InvalidInput` naming `field` if the text is blank or too long.
pub fn validate_required_text(field: &str, value: &str, max_len: usize) -> ClinicResult<NonEmptyText> {
    let text = NonEmptyText::new(value)
        .map_err(|_| ClinicError::InvalidInput(format!("{field} is required")))?;
    check_length(field, text.as_str(), max_len)?;
    Ok(text)
}

/// Validates an optional free-text field, collapsing blank input to `None`.
///
/// # Errors
///
/// Returns `ClinicError::InvalidInput` naming `field` if the text exceeds [`MAX_FREE_TEXT_LEN`].
pub fn validate_optional_text(field: &str, value: Option<&str>) -> ClinicResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => {
            check_length(field, v, MAX_FREE_TEXT_LEN)?;
            Ok(Some(v.to_owned()))
        }
        None => Ok(None),
    }
}

fn check_length(field: &str, value: &str, max_len: usize) -> ClinicResult<()> {
    if value.chars().count() > max_len {
        return Err(ClinicError::InvalidInput(format!(
            "{field} exceeds maximum length of {max_len} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_record_id_accepts_positive() {
        assert_eq!(validate_record_id("visit_id", 3).unwrap().get(), 3);
    }

    #[test]
    fn test_validate_record_id_rejects_zero() {
        let err = validate_record_id("visit_id", 0).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(msg) if msg.contains("visit_id")));
    }

    #[test]
    fn test_validate_required_text_rejects_blank() {
        let err = validate_required_text("symptom", "   ", 10).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(msg) if msg == "symptom is required"));
    }

    #[test]
    fn test_validate_required_text_rejects_too_long() {
        assert!(validate_required_text("symptom", "abcdef", 5).is_err());
        assert_eq!(
            validate_required_text("symptom", " abcde ", 5)
                .unwrap()
                .as_str(),
            "abcde"
        );
    }

    #[test]
    fn test_validate_optional_text_collapses_blank() {
        assert_eq!(validate_optional_text("note", Some("  ")).unwrap(), None);
        assert_eq!(validate_optional_text("note", None).unwrap(), None);
        assert_eq!(
            validate_optional_text("note", Some(" seen by GP ")).unwrap(),
            Some("seen by GP".to_string())
        );
    }
}
