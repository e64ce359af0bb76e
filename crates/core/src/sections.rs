//! Clinical section catalog and specialty profiles.
//!
//! A visit form is made of named free-text sections. The generic catalog in
//! [`ClinicalSections::ALL`] applies to every visit; each [`SpecialtyProfile`] contributes its
//! own history sections, examination sections and special fields, and may replace the generic
//! `History` and `Examination` sections entirely.
//!
//! Profiles are a closed set with static data. The resolver takes them as an explicit ordered
//! list, so the same input always produces the same form.

use crate::{ClinicError, ClinicResult};
use clinic_types::SystemCode;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Generic clinical sections shared by all visits.
pub struct ClinicalSections;

impl ClinicalSections {
    pub const HISTORY: &'static str = "History";
    pub const EXAMINATION: &'static str = "Examination";

    /// Generic sections, in display order.
    pub const ALL: &'static [&'static str] = &[
        "Chief Complaint",
        Self::HISTORY,
        Self::EXAMINATION,
        "Investigations",
        "Diagnosis",
        "Treatment Plan",
        "Follow Up",
    ];

    /// True if `name` is one of the generic sections a replacing profile removes.
    pub fn is_replaceable(name: &str) -> bool {
        name.eq_ignore_ascii_case(Self::HISTORY) || name.eq_ignore_ascii_case(Self::EXAMINATION)
    }
}

/// Static description of one specialty profile.
#[derive(Debug)]
pub struct ProfileDefinition {
    pub name: &'static str,
    pub system: &'static str,
    pub replaces_generic_history: bool,
    pub history_sections: &'static [&'static str],
    pub examination_sections: &'static [&'static str],
    pub special_fields: &'static [&'static str],
}

impl ProfileDefinition {
    /// All sections this profile contributes: history, then examination, then special fields.
    pub fn sections(&self) -> impl Iterator<Item = &'static str> {
        self.history_sections
            .iter()
            .chain(self.examination_sections)
            .chain(self.special_fields)
            .copied()
    }

    /// Checks the static catalog data for this profile.
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidInput` if the system tag is not a valid [`SystemCode`], if
    /// the profile contributes no sections, or if any section name is blank.
    pub fn validate(&self) -> ClinicResult<()> {
        SystemCode::new(self.system).map_err(|e| {
            ClinicError::InvalidInput(format!("profile {} has invalid system tag: {e}", self.name))
        })?;

        if self.replaces_generic_history && self.sections().next().is_none() {
            return Err(ClinicError::InvalidInput(format!(
                "profile {} replaces generic history but defines no sections",
                self.name
            )));
        }

        if self.sections().any(|s| s.trim().is_empty()) {
            return Err(ClinicError::InvalidInput(format!(
                "profile {} contains an empty section name",
                self.name
            )));
        }

        Ok(())
    }
}

static GENERIC: ProfileDefinition = ProfileDefinition {
    name: "Generic",
    system: "General",
    replaces_generic_history: false,
    history_sections: &[],
    examination_sections: &[],
    special_fields: &[],
};

static OB_GYNE: ProfileDefinition = ProfileDefinition {
    name: "ObGyne",
    system: "GyneOb",
    replaces_generic_history: true,
    history_sections: &[
        "Menstrual History",
        "Obstetric History",
        "Gynecological History",
        "Contraceptive History",
    ],
    examination_sections: &[
        "General Examination",
        "Abdominal Examination",
        "Pelvic Examination",
    ],
    special_fields: &["LMP", "EDD", "Gravida/Para"],
};

static OPHTHALMOLOGY: ProfileDefinition = ProfileDefinition {
    name: "Ophthalmology",
    system: "Ophthalmology",
    replaces_generic_history: true,
    history_sections: &["Ocular History", "Visual Symptoms"],
    examination_sections: &[
        "Visual Acuity",
        "Intraocular Pressure",
        "Slit Lamp Examination",
        "Fundus Examination",
    ],
    special_fields: &["Refraction"],
};

static ORTHOPEDIC: ProfileDefinition = ProfileDefinition {
    name: "Orthopedic",
    system: "Orthopedic",
    replaces_generic_history: false,
    history_sections: &["Injury Mechanism"],
    examination_sections: &[
        "Musculoskeletal Examination",
        "Range of Motion",
        "Neurovascular Status",
    ],
    special_fields: &["Imaging Findings"],
};

/// Specialty profiles known to the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialtyProfile {
    Generic,
    ObGyne,
    Ophthalmology,
    Orthopedic,
}

impl SpecialtyProfile {
    pub const ALL: [SpecialtyProfile; 4] = [
        SpecialtyProfile::Generic,
        SpecialtyProfile::ObGyne,
        SpecialtyProfile::Ophthalmology,
        SpecialtyProfile::Orthopedic,
    ];

    pub fn definition(self) -> &'static ProfileDefinition {
        match self {
            SpecialtyProfile::Generic => &GENERIC,
            SpecialtyProfile::ObGyne => &OB_GYNE,
            SpecialtyProfile::Ophthalmology => &OPHTHALMOLOGY,
            SpecialtyProfile::Orthopedic => &ORTHOPEDIC,
        }
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }

    pub fn replaces_generic_history(self) -> bool {
        self.definition().replaces_generic_history
    }

    /// The profile's system tag as a validated [`SystemCode`].
    ///
    /// # Errors
    ///
    /// Returns `ClinicError::InvalidInput` if the static tag is malformed.
    pub fn system_code(self) -> ClinicResult<SystemCode> {
        Ok(SystemCode::new(self.definition().system)?)
    }

    pub fn sections(self) -> impl Iterator<Item = &'static str> {
        self.definition().sections()
    }
}

impl std::fmt::Display for SpecialtyProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for SpecialtyProfile {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();

        match key.as_str() {
            "generic" => Ok(SpecialtyProfile::Generic),
            "obgyne" | "gyneob" => Ok(SpecialtyProfile::ObGyne),
            "ophthalmology" => Ok(SpecialtyProfile::Ophthalmology),
            "orthopedic" | "orthopaedic" => Ok(SpecialtyProfile::Orthopedic),
            _ => Err(ClinicError::InvalidInput(format!(
                "unknown specialty profile: {s}"
            ))),
        }
    }
}

/// Checks every built-in profile definition.
///
/// # Errors
///
/// Returns the first validation failure found.
pub fn validate_profile_catalog() -> ClinicResult<()> {
    SpecialtyProfile::ALL
        .iter()
        .try_for_each(|p| p.definition().validate())
}

/// Resolves the ordered, de-duplicated section list for a visit form.
///
/// Starts from [`ClinicalSections::ALL`], drops the generic `History` and `Examination`
/// sections if any profile replaces them, appends each profile's sections in order, and keeps
/// the first occurrence of each name (compared case-insensitively).
pub fn resolve_sections(profiles: &[SpecialtyProfile]) -> Vec<String> {
    let replaces = profiles.iter().any(|p| p.replaces_generic_history());

    let generic = ClinicalSections::ALL
        .iter()
        .copied()
        .filter(|s| !(replaces && ClinicalSections::is_replaceable(s)));
    let specialty = profiles.iter().flat_map(|p| p.sections());

    let mut seen = HashSet::new();
    generic
        .chain(specialty)
        .filter(|s| seen.insert(s.to_lowercase()))
        .map(str::to_owned)
        .collect()
}

/// Finds `name` in `sections` case-insensitively, returning the canonical spelling.
pub fn find_section<'a>(sections: &'a [String], name: &str) -> Option<&'a str> {
    let name = name.trim();
    sections
        .iter()
        .find(|s| s.eq_ignore_ascii_case(name))
        .map(String::as_str)
}
