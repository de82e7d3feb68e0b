//! Validation outcomes.
//!
//! A validation either succeeds with a payload or fails with one of a closed
//! set of [`InvalidReason`]s. Both are normal results, distinct from
//! [`crate::errors::LicenseError`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a license (or a user under it) did not validate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvalidReason {
    /// A required input (key, device id, username) was missing or blank
    MissingInput,
    /// No license with this key exists
    NotFound,
    /// The license expiration date has passed
    Expired,
    /// The license has been deactivated
    Inactive,
    /// The license is bound to another device
    DeviceMismatch,
    /// The license has no user roster
    NoUsersAssigned,
    /// The username is not on the roster
    UserNotAssigned,
    /// The user exists but has been disabled
    UserInactive,
}

impl InvalidReason {
    /// Human-readable reason text returned to clients.
    pub fn message(&self) -> &'static str {
        match self {
            InvalidReason::MissingInput => "Required input is missing",
            InvalidReason::NotFound => "License not found",
            InvalidReason::Expired => "License has expired",
            InvalidReason::Inactive => "License is inactive",
            InvalidReason::DeviceMismatch => "License is bound to a different device",
            InvalidReason::NoUsersAssigned => "No users are assigned to this license",
            InvalidReason::UserNotAssigned => "User is not assigned to this license",
            InvalidReason::UserInactive => "User account is inactive",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of a validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<T> {
    Valid(T),
    Invalid(InvalidReason),
}

impl<T> Verdict<T> {
    pub fn is_valid(&self) -> bool {
        matches!(self, Verdict::Valid(_))
    }

    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            Verdict::Valid(_) => None,
            Verdict::Invalid(reason) => Some(*reason),
        }
    }

    pub fn valid(self) -> Option<T> {
        match self {
            Verdict::Valid(details) => Some(details),
            Verdict::Invalid(_) => None,
        }
    }
}

/// Payload of a successful key validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValidation {
    pub customer_id: String,
    pub expiration_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub license_type: String,
}

/// Payload of a successful device-bound validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceValidation {
    pub license_name: String,
    pub expiration_date: DateTime<Utc>,
    pub bound_device_id: String,
    pub remaining_days: i64,
}

/// The user part of a successful user validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizedUser {
    pub username: String,
    pub role: String,
}

/// Payload of a successful user validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserValidation {
    pub customer_id: String,
    pub expiration_date: DateTime<Utc>,
    #[serde(rename = "type")]
    pub license_type: String,
    pub user: AuthorizedUser,
}
