//! Error types for the license registry.
//!
//! Negative validation results (expired, inactive, wrong device, ...) are
//! *not* errors; see [`crate::outcome`]. `LicenseError` covers operations
//! that could not be carried out at all.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LicenseError {
    /// Missing or invalid input.
    #[error("validation error: {0}")]
    Validation(String),

    /// No license is stored under this hash.
    #[error("license '{0}' not found")]
    LicenseNotFound(String),

    /// The license has no user with this username.
    #[error("user '{0}' not found")]
    UserNotFound(String),

    /// The username is already assigned to the license.
    #[error("user '{0}' is already assigned to this license")]
    DuplicateUser(String),

    /// Reading or writing the license file failed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LicenseError {
    pub fn license_not_found(hash: &str) -> Self {
        LicenseError::LicenseNotFound(hash.to_string())
    }

    pub fn user_not_found(username: &str) -> Self {
        LicenseError::UserNotFound(username.to_string())
    }

    /// True for either kind of missing resource.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LicenseError::LicenseNotFound(_) | LicenseError::UserNotFound(_)
        )
    }
}

/// Result type for registry operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
