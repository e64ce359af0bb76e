//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into core services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{DEFAULT_DATA_DIR, DEFAULT_PAUSED_STALE_HOURS};
use crate::sections::{resolve_sections, validate_profile_catalog, SpecialtyProfile};
use crate::{ClinicError, ClinicResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// What start-or-resume does when the patient already has a paused visit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PausedVisitPolicy {
    /// Report the paused visit to the caller and leave it untouched. Resuming takes a separate
    /// explicit call.
    Surface,
    /// Resume the paused visit and refresh its presenting symptom details.
    #[default]
    AutoResume,
}

impl FromStr for PausedVisitPolicy {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "surface" => Ok(PausedVisitPolicy::Surface),
            "auto-resume" | "autoresume" => Ok(PausedVisitPolicy::AutoResume),
            other => Err(ClinicError::InvalidInput(format!(
                "unknown paused visit policy: {other} (expected 'surface' or 'auto-resume')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    specialty_profiles: Vec<SpecialtyProfile>,
    paused_visit_policy: PausedVisitPolicy,
    paused_stale_after: chrono::Duration,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// Duplicate profiles are dropped, keeping the first occurrence.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidInput` if `paused_stale_after` is not positive or a built-in
    /// profile definition fails validation.
    pub fn new(
        data_dir: PathBuf,
        specialty_profiles: Vec<SpecialtyProfile>,
        paused_visit_policy: PausedVisitPolicy,
        paused_stale_after: chrono::Duration,
    ) -> ClinicResult<Self> {
        if paused_stale_after <= chrono::Duration::zero() {
            return Err(ClinicError::InvalidInput(
                "paused visit staleness threshold must be positive".into(),
            ));
        }
        validate_profile_catalog()?;

        let mut profiles = Vec::with_capacity(specialty_profiles.len());
        for p in specialty_profiles {
            if !profiles.contains(&p) {
                profiles.push(p);
            }
        }

        Ok(Self {
            data_dir,
            specialty_profiles: profiles,
            paused_visit_policy,
            paused_stale_after,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn specialty_profiles(&self) -> &[SpecialtyProfile] {
        &self.specialty_profiles
    }

    pub fn paused_visit_policy(&self) -> PausedVisitPolicy {
        self.paused_visit_policy
    }

    pub fn paused_stale_after(&self) -> chrono::Duration {
        self.paused_stale_after
    }

    /// Section list for new visits under the configured profiles.
    pub fn visit_sections(&self) -> Vec<String> {
        resolve_sections(&self.specialty_profiles)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            specialty_profiles: Vec::new(),
            paused_visit_policy: PausedVisitPolicy::default(),
            paused_stale_after: chrono::Duration::hours(DEFAULT_PAUSED_STALE_HOURS),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse a comma-separated specialty profile list from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns an empty list (generic sections only).
pub fn specialty_profiles_from_env_value(
    value: Option<String>,
) -> ClinicResult<Vec<SpecialtyProfile>> {
    match non_blank(value) {
        Some(v) => v
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::parse::<SpecialtyProfile>)
            .collect(),
        None => Ok(Vec::new()),
    }
}

/// Parse the paused visit policy from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns the default policy.
pub fn paused_visit_policy_from_env_value(
    value: Option<String>,
) -> ClinicResult<PausedVisitPolicy> {
    Ok(non_blank(value)
        .map(|v| v.parse::<PausedVisitPolicy>())
        .transpose()?
        .unwrap_or_default())
}

/// Parse the paused visit staleness threshold, in whole hours, from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_PAUSED_STALE_HOURS`].
pub fn paused_stale_after_from_env_value(value: Option<String>) -> ClinicResult<chrono::Duration> {
    let hours = match non_blank(value) {
        Some(v) => v.parse::<i64>().map_err(|_| {
            ClinicError::InvalidInput(format!("paused stale hours must be an integer, got {v}"))
        })?,
        None => DEFAULT_PAUSED_STALE_HOURS,
    };
    if hours <= 0 {
        return Err(ClinicError::InvalidInput(
            "paused stale hours must be positive".into(),
        ));
    }
    chrono::Duration::try_hours(hours).ok_or_else(|| {
        ClinicError::InvalidInput(format!("paused stale hours out of range: {hours}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_from_env_value_parses_list() {
        let profiles =
            specialty_profiles_from_env_value(Some(" obgyne, Orthopedic ,,".into())).unwrap();
        assert_eq!(
            profiles,
            vec![SpecialtyProfile::ObGyne, SpecialtyProfile::Orthopedic]
        );
    }

    #[test]
    fn test_profiles_from_env_value_defaults_to_empty() {
        assert!(specialty_profiles_from_env_value(None).unwrap().is_empty());
        assert!(specialty_profiles_from_env_value(Some("  ".into()))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_profiles_from_env_value_rejects_unknown() {
        assert!(specialty_profiles_from_env_value(Some("obgyne,dental".into())).is_err());
    }

    #[test]
    fn test_policy_from_env_value() {
        assert_eq!(
            paused_visit_policy_from_env_value(None).unwrap(),
            PausedVisitPolicy::AutoResume
        );
        assert_eq!(
            paused_visit_policy_from_env_value(Some("SURFACE".into())).unwrap(),
            PausedVisitPolicy::Surface
        );
        assert_eq!(
            paused_visit_policy_from_env_value(Some("auto_resume".into())).unwrap(),
            PausedVisitPolicy::AutoResume
        );
        assert!(paused_visit_policy_from_env_value(Some("ignore".into())).is_err());
    }

    #[test]
    fn test_stale_after_from_env_value() {
        assert_eq!(
            paused_stale_after_from_env_value(None).unwrap(),
            chrono::Duration::hours(24)
        );
        assert_eq!(
            paused_stale_after_from_env_value(Some("6".into())).unwrap(),
            chrono::Duration::hours(6)
        );
        assert!(paused_stale_after_from_env_value(Some("0".into())).is_err());
        assert!(paused_stale_after_from_env_value(Some("soon".into())).is_err());
    }

    #[test]
    fn test_stale_after_from_env_value_rejects_out_of_range() {
        assert!(matches!(
            paused_stale_after_from_env_value(Some("9999999999999".into())),
            Err(ClinicError::InvalidInput(_))
        ));
        assert!(matches!(
            paused_stale_after_from_env_value(Some("99999999999999999999".into())),
            Err(ClinicError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_config_deduplicates_profiles() {
        let cfg = CoreConfig::new(
            PathBuf::from("data"),
            vec![
                SpecialtyProfile::Ophthalmology,
                SpecialtyProfile::ObGyne,
                SpecialtyProfile::Ophthalmology,
            ],
            PausedVisitPolicy::Surface,
            chrono::Duration::hours(1),
        )
        .unwrap();
        assert_eq!(
            cfg.specialty_profiles(),
            &[SpecialtyProfile::Ophthalmology, SpecialtyProfile::ObGyne]
        );
    }

    #[test]
    fn test_config_rejects_non_positive_staleness() {
        assert!(CoreConfig::new(
            PathBuf::from("data"),
            vec![],
            PausedVisitPolicy::Surface,
            chrono::Duration::zero(),
        )
        .is_err());
    }
}
