//! Request validation utilities for the HTTP layer.
//!
//! These run before a request reaches the registry, so malformed input is
//! reported as a 400 with the offending field named.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::license::MAX_VALIDITY_DAYS;

static USERNAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._@-]{1,64}$").expect("valid username regex"));

/// Longest customer id accepted; it is embedded in every key.
pub const MAX_CUSTOMER_ID_LEN: usize = 128;

/// Validation error type.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
    /// The field was absent or blank, as opposed to present but wrong.
    pub missing: bool,
}

impl ValidationError {
    fn missing(field_name: &str) -> Self {
        Self {
            field: field_name.to_string(),
            message: "is required".to_string(),
            missing: true,
        }
    }

    fn invalid(field_name: &str, message: impl Into<String>) -> Self {
        Self {
            field: field_name.to_string(),
            message: message.into(),
            missing: false,
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Require a field to be present and not blank; returns the value.
///
/// # Example
/// ```
/// use vet_license::server::validation::require;
///
/// assert_eq!(require(Some("abc"), "licenseKey").unwrap(), "abc");
/// assert!(require(Some("   "), "licenseKey").is_err());
/// assert!(require(None, "licenseKey").is_err());
/// ```
pub fn require<'a>(value: Option<&'a str>, field_name: &str) -> ValidationResult<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ValidationError::missing(field_name)),
    }
}

/// Validate string length is within bounds.
pub fn validate_length(
    value: &str,
    min: usize,
    max: usize,
    field_name: &str,
) -> ValidationResult<()> {
    let len = value.chars().count();
    if len < min {
        Err(ValidationError::invalid(
            field_name,
            format!("must be at least {} characters", min),
        ))
    } else if len > max {
        Err(ValidationError::invalid(
            field_name,
            format!("must be at most {} characters", max),
        ))
    } else {
        Ok(())
    }
}

/// Validate a customer id: present, trimmed length within bounds.
pub fn validate_customer_id(value: Option<&str>, field_name: &str) -> ValidationResult<String> {
    let value = require(value, field_name)?.trim();
    validate_length(value, 1, MAX_CUSTOMER_ID_LEN, field_name)?;
    Ok(value.to_string())
}

/// Validate a username.
///
/// Letters, digits, `.`, `_`, `-` and `@`, 1-64 chars.
///
/// # Example
/// ```
/// use vet_license::server::validation::validate_username;
///
/// assert!(validate_username(Some("ahmed"), "username").is_ok());
/// assert!(validate_username(Some("dr.sara@clinic"), "username").is_ok());
/// assert!(validate_username(Some("two words"), "username").is_err());
/// ```
pub fn validate_username(value: Option<&str>, field_name: &str) -> ValidationResult<String> {
    let value = require(value, field_name)?.trim();
    if USERNAME_REGEX.is_match(value) {
        Ok(value.to_string())
    } else {
        Err(ValidationError::invalid(
            field_name,
            "must be 1-64 letters, digits, '.', '_', '-' or '@'",
        ))
    }
}

/// Validate a day count: at least 1, at most [`MAX_VALIDITY_DAYS`].
pub fn validate_positive_days(value: Option<i64>, field_name: &str) -> ValidationResult<i64> {
    match value {
        None => Err(ValidationError::missing(field_name)),
        Some(days) if days <= 0 => {
            Err(ValidationError::invalid(field_name, "must be greater than 0"))
        }
        Some(days) if days > MAX_VALIDITY_DAYS => Err(ValidationError::invalid(
            field_name,
            format!("must be at most {MAX_VALIDITY_DAYS}"),
        )),
        Some(days) => Ok(days),
    }
}

/// Validate an optional day count with the same bounds.
pub fn validate_optional_days(value: Option<i64>, field_name: &str) -> ValidationResult<Option<i64>> {
    value
        .map(|days| validate_positive_days(Some(days), field_name))
        .transpose()
}
