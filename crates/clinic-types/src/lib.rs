//! Validated primitive types shared across the clinic crates.
//!
//! Each type checks its invariant once at construction, so code holding a value can rely on it
//! without re-validating.

/// Maximum length of a [`SystemCode`], in characters.
pub const MAX_SYSTEM_CODE_LEN: usize = 32;

/// Errors that can occur when creating validated types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input text exceeded the permitted length
    #[error("Text exceeds maximum length of {max} characters")]
    TooLong { max: usize },
    /// The input contained characters outside the permitted set
    #[error("Text contains invalid characters (only alphanumeric, '-', '_' allowed)")]
    InvalidCharacters,
    /// An identifier was zero or negative
    #[error("Identifier must be a positive integer, got {0}")]
    NonPositiveId(i64),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A storage-assigned record identifier. Always strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(i64);

impl RecordId {
    /// The first identifier handed out by storage.
    pub const FIRST: RecordId = RecordId(1);

    /// Creates a new `RecordId`.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::NonPositiveId)` if `value` is zero or negative.
    pub fn new(value: i64) -> Result<Self, TextError> {
        if value <= 0 {
            return Err(TextError::NonPositiveId(value));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }

    /// The identifier following this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl serde::Serialize for RecordId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for RecordId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        RecordId::new(value).map_err(serde::de::Error::custom)
    }
}

/// A short tag identifying the clinical system an entry belongs to, such as `GyneOb`.
///
/// Non-empty, at most [`MAX_SYSTEM_CODE_LEN`] characters, and restricted to ASCII
/// alphanumerics plus `-` and `_`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SystemCode(String);

impl SystemCode {
    /// Creates a new `SystemCode` from the given input after trimming whitespace.
    ///
    /// # Errors
    ///
    /// Returns a [`TextError`] if the trimmed input is empty, too long, or contains characters
    /// outside the permitted set.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.chars().count() > MAX_SYSTEM_CODE_LEN {
            return Err(TextError::TooLong {
                max: MAX_SYSTEM_CODE_LEN,
            });
        }
        let ok = trimmed
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !ok {
            return Err(TextError::InvalidCharacters);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SystemCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SystemCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for SystemCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SystemCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SystemCode::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  fever  ").unwrap();
        assert_eq!(text.as_str(), "fever");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace_only() {
        assert_eq!(NonEmptyText::new(" \t\n"), Err(TextError::Empty));
    }

    #[test]
    fn test_non_empty_text_deserialize_rejects_blank() {
        let result: Result<NonEmptyText, _> = serde_json::from_str("\"   \"");
        assert!(result.is_err());
    }

    #[test]
    fn test_record_id_rejects_zero_and_negative() {
        assert_eq!(RecordId::new(0), Err(TextError::NonPositiveId(0)));
        assert_eq!(RecordId::new(-7), Err(TextError::NonPositiveId(-7)));
        assert_eq!(RecordId::new(42).unwrap().get(), 42);
    }

    #[test]
    fn test_record_id_serializes_as_plain_integer() {
        let id = RecordId::new(9).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "9");
        let parsed: RecordId = serde_json::from_str("9").unwrap();
        assert_eq!(parsed, id);
        assert!(serde_json::from_str::<RecordId>("0").is_err());
    }

    #[test]
    fn test_system_code_accepts_known_tags() {
        assert_eq!(SystemCode::new("GyneOb").unwrap().as_str(), "GyneOb");
        assert!(SystemCode::new("ortho_spine-2").is_ok());
    }

    #[test]
    fn test_system_code_rejects_long_or_invalid_input() {
        let long = "a".repeat(MAX_SYSTEM_CODE_LEN + 1);
        assert_eq!(
            SystemCode::new(&long),
            Err(TextError::TooLong {
                max: MAX_SYSTEM_CODE_LEN
            })
        );
        assert_eq!(
            SystemCode::new("Gyne Ob"),
            Err(TextError::InvalidCharacters)
        );
        assert_eq!(SystemCode::new(""), Err(TextError::Empty));
    }
}
