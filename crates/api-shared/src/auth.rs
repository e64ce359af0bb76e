/// Request header carrying the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("Missing x-api-key header")]
    MissingKey,
    #[error("Invalid API key")]
    InvalidKey,
}

/// Validates the provided API key against the expected key configured at startup.
///
/// Returns `Ok(())` if the key is valid, or an error if invalid or missing.
pub fn validate_api_key(provided_key: Option<&str>, expected_key: &str) -> Result<(), AuthError> {
    let provided_key = provided_key.ok_or(AuthError::MissingKey)?;

    // Compare every byte so timing does not reveal the matching prefix length.
    let same_len = provided_key.len() == expected_key.len();
    let diff = provided_key
        .bytes()
        .zip(expected_key.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b));

    if same_len && diff == 0 {
        Ok(())
    } else {
        Err(AuthError::InvalidKey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_api_key_accepts_match() {
        assert_eq!(validate_api_key(Some("s3cret"), "s3cret"), Ok(()));
    }

    #[test]
    fn test_validate_api_key_rejects_missing() {
        assert_eq!(
            validate_api_key(None, "s3cret"),
            Err(AuthError::MissingKey)
        );
    }

    #[test]
    fn test_validate_api_key_rejects_prefix_and_mismatch() {
        assert_eq!(
            validate_api_key(Some("s3c"), "s3cret"),
            Err(AuthError::InvalidKey)
        );
        assert_eq!(
            validate_api_key(Some("s3cres"), "s3cret"),
            Err(AuthError::InvalidKey)
        );
    }
}
