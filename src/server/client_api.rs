//! Client-facing validation endpoints.
//!
//! These are called by the desktop application. A license that fails a
//! check is still a `200 OK` answer with `valid: false`; only malformed
//! requests (missing key, device or username) and server failures use
//! error statuses.
//!
//! # Endpoints
//!
//! - `POST /api/licenses/validate` - Validate a license key
//! - `POST /api/verify-license` - Validate and bind to a device
//! - `POST /api/verify-user-license` - Validate a named user under a license

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::outcome::{DeviceValidation, InvalidReason, KeyValidation, UserValidation, Verdict};
use crate::server::api_error::{ApiError, ApiJson};
use crate::server::handlers::AppState;
use crate::server::validation::require;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request to validate a license key.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest {
    #[serde(default, alias = "key")]
    pub license_key: Option<String>,
}

/// Request to validate a license on a specific device.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyLicenseRequest {
    #[serde(default, alias = "key")]
    pub license_key: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Request to validate a user login under a license.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default, alias = "key")]
    pub license_key: Option<String>,
}

/// Validation answer.
///
/// Valid: `{"valid": true, ...details}`.
/// Invalid: `{"valid": false, "reason": "License is inactive", "code": "INACTIVE"}`.
#[derive(Debug, Serialize)]
pub struct ValidationResponse<T> {
    pub valid: bool,
    #[serde(flatten)]
    pub details: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<InvalidReason>,
}

impl<T> From<Verdict<T>> for ValidationResponse<T> {
    fn from(verdict: Verdict<T>) -> Self {
        match verdict {
            Verdict::Valid(details) => Self {
                valid: true,
                details: Some(details),
                reason: None,
                code: None,
            },
            Verdict::Invalid(reason) => Self {
                valid: false,
                details: None,
                reason: Some(reason.message().to_string()),
                code: Some(reason),
            },
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Validate a license key.
///
/// # Behavior
/// - Checks the license exists, is not expired and is active
/// - On success increments the usage counter
pub async fn validate_license_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ValidateRequest>,
) -> Result<Json<ValidationResponse<KeyValidation>>, ApiError> {
    let license_key = require(req.license_key.as_deref(), "licenseKey")?;
    info!("Validate request");

    let mut registry = state.registry.lock().await;
    let verdict = registry.validate_key(license_key)?;
    Ok(Json(verdict.into()))
}

/// Validate a license for a device.
///
/// # Behavior
/// - Same checks as key validation
/// - If the license is unbound, binds it to `deviceId`
/// - If bound to another device, answers `valid: false`
pub async fn verify_license_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyLicenseRequest>,
) -> Result<Json<ValidationResponse<DeviceValidation>>, ApiError> {
    let license_key = require(req.license_key.as_deref(), "licenseKey")?;
    let device_id = require(req.device_id.as_deref(), "deviceId")?;
    info!("Device verification request for device_id={}", device_id);

    let mut registry = state.registry.lock().await;
    let verdict = registry.validate_device(license_key, device_id)?;
    Ok(Json(verdict.into()))
}

/// Validate a user login under a license.
///
/// # Behavior
/// - Same checks as key validation
/// - Then: roster not empty, user assigned, user active
/// - On success appends to the login history
pub async fn verify_user_license_handler(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyUserRequest>,
) -> Result<Json<ValidationResponse<UserValidation>>, ApiError> {
    let username = require(req.username.as_deref(), "username")?;
    let license_key = require(req.license_key.as_deref(), "licenseKey")?;
    info!("User verification request for username={}", username);

    let mut registry = state.registry.lock().await;
    let verdict = registry.validate_user(username, license_key)?;
    Ok(Json(verdict.into()))
}
