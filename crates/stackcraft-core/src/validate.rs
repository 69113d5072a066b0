//! Schema-level validation of specs
//!
//! Each spec type implements [`Validate`] with the same rules its schema
//! carries: required fields, length bounds and literal patterns.

use crate::error::{Result, StackInputError};
use crate::model::CloudResourceMetadata;
use regex::Regex;
use std::sync::LazyLock;

/// Schema rules of a spec
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

impl Validate for CloudResourceMetadata {
    fn validate(&self) -> Result<()> {
        require("metadata.name", &self.name)
    }
}

static HEX_32: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{32}$").expect("valid hex id pattern"));

/// Fails when `value` is empty or only whitespace
pub fn require(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(StackInputError::validation(field, "is required"));
    }
    Ok(())
}

/// Fails when the character count of `value` is outside `min..=max`
pub fn length_between(field: &str, value: &str, min: usize, max: usize) -> Result<()> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(StackInputError::validation(
            field,
            format!("must be between {} and {} characters (got {})", min, max, len),
        ));
    }
    Ok(())
}

/// Fails when `value` does not match `pattern`
pub fn matches(field: &str, value: &str, pattern: &Regex, expected: &str) -> Result<()> {
    if !pattern.is_match(value) {
        return Err(StackInputError::validation(
            field,
            format!("'{}' must be {}", value, expected),
        ));
    }
    Ok(())
}

/// Fails unless `value` is 32 hexadecimal characters
pub fn hex_id(field: &str, value: &str) -> Result<()> {
    matches(field, value, &HEX_32, "a 32-character hexadecimal id")
}

/// Fails when `condition` holds
pub fn reject_if(condition: bool, field: &str, message: &str) -> Result<()> {
    if condition {
        return Err(StackInputError::validation(field, message));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require() {
        assert!(require("spec.zoneName", "example.com").is_ok());
        let err = require("spec.zoneName", "  ").unwrap_err();
        assert_eq!(err.to_string(), "invalid spec.zoneName: is required");
    }

    #[test]
    fn test_length_between() {
        assert!(length_between("spec.bucketName", "abc", 3, 63).is_ok());
        assert!(length_between("spec.bucketName", "ab", 3, 63).is_err());
        assert!(length_between("spec.bucketName", &"a".repeat(64), 3, 63).is_err());
    }

    #[test]
    fn test_hex_id() {
        assert!(hex_id("spec.accountId", "00000000000000000000000000000000").is_ok());
        assert!(hex_id("spec.accountId", "test-account-123").is_err());
    }

    #[test]
    fn test_metadata_requires_name() {
        let metadata = CloudResourceMetadata::default();
        assert!(matches!(
            metadata.validate(),
            Err(StackInputError::Validation { field, .. }) if field == "metadata.name"
        ));
    }
}
