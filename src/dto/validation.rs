//! Validation helpers for DTOs.

use validator::ValidationError;

/// Validates that a device fingerprint is 8 to 64 URL-safe characters.
///
/// Fingerprints are opaque client-generated tokens; the format check only
/// keeps obviously broken or abusive values out of the store.
pub fn validate_fingerprint(fingerprint: &str) -> Result<(), ValidationError> {
    let length = fingerprint.chars().count();
    if !(8..=64).contains(&length) {
        let mut err = ValidationError::new("fingerprint_length");
        err.message =
            Some(format!("Fingerprint must be 8 to 64 characters (got {length})").into());
        return Err(err);
    }

    if !fingerprint
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        let mut err = ValidationError::new("fingerprint_format");
        err.message =
            Some("Fingerprint must contain only alphanumerics, hyphens, and underscores".into());
        return Err(err);
    }

    Ok(())
}
