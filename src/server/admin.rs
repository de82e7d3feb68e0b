//! License management endpoints.
//!
//! # Endpoints
//!
//! - `GET /api/licenses` - List every license
//! - `POST /api/licenses` - Issue a license
//! - `GET /api/licenses/:hash` - Get a license
//! - `DELETE /api/licenses/:hash` - Delete a license
//! - `PUT /api/licenses/:hash/activate` - Activate a license
//! - `PUT /api/licenses/:hash/deactivate` - Deactivate a license
//! - `PUT /api/licenses/:hash/extend` - Extend the expiration
//! - `GET /api/licenses/:hash/users` - List assigned users
//! - `POST /api/licenses/:hash/users` - Assign a user
//! - `PUT /api/licenses/:hash/users/:username` - Enable or disable a user
//! - `DELETE /api/licenses/:hash/users/:username` - Remove a user
//! - `GET /api/licenses/:hash/logins` - Recent user logins
//! - `GET /api/stats` - Registry counters

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::license::{LicenseEntry, LoginAttempt, UserAssignment};
use crate::registry::{LicenseUsers, NewLicense, RegistryStats};
use crate::server::api_error::{ApiError, ApiJson};
use crate::server::handlers::AppState;
use crate::server::validation::{
    validate_customer_id, validate_optional_days, validate_positive_days, validate_username,
};

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for issuing a license.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLicenseRequest {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default, rename = "type")]
    pub license_type: Option<String>,
    #[serde(default)]
    pub validity_days: Option<i64>,
}

/// Request body for assigning a user.
#[derive(Debug, Default, Deserialize)]
pub struct AddUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Request body for toggling a user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Request body for extending a license.
#[derive(Debug, Default, Deserialize)]
pub struct ExtendLicenseRequest {
    #[serde(default, alias = "daysToAdd", alias = "additionalDays")]
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct LicenseResponse {
    pub success: bool,
    pub license: LicenseEntry,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub success: bool,
    pub user: UserAssignment,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LoginHistoryResponse {
    pub hash: String,
    pub logins: Vec<LoginAttempt>,
}

impl LicenseResponse {
    fn new(license: LicenseEntry) -> Json<Self> {
        Json(Self {
            success: true,
            license,
        })
    }
}

impl MessageResponse {
    fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

// ============================================================================
// License handlers
// ============================================================================

/// List every license with its hash.
///
/// `GET /api/licenses`
pub async fn list_licenses_handler(State(state): State<AppState>) -> Json<Vec<LicenseEntry>> {
    let registry = state.registry.lock().await;
    Json(registry.list())
}

/// Issue a new license.
///
/// `POST /api/licenses`
pub async fn create_license_handler(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateLicenseRequest>,
) -> Result<(StatusCode, Json<LicenseResponse>), ApiError> {
    let customer_id = validate_customer_id(payload.customer_id.as_deref(), "customerId")?;
    let validity_days = validate_optional_days(payload.validity_days, "validityDays")?;

    info!("Issuing license for customer_id={}", customer_id);

    let request = NewLicense {
        customer_id,
        license_type: payload.license_type,
        validity_days,
    };

    let mut registry = state.registry.lock().await;
    let license = registry.issue(request)?;

    Ok((StatusCode::CREATED, LicenseResponse::new(license)))
}

/// Get a license by hash.
///
/// `GET /api/licenses/:hash`
pub async fn get_license_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<LicenseEntry>, ApiError> {
    let registry = state.registry.lock().await;
    Ok(Json(registry.entry(&hash)?))
}

/// Delete a license.
///
/// `DELETE /api/licenses/:hash`
pub async fn delete_license_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut registry = state.registry.lock().await;
    registry.delete(&hash)?;
    Ok(MessageResponse::new("License deleted"))
}

/// Re-enable a license.
///
/// `PUT /api/licenses/:hash/activate`
pub async fn activate_license_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<LicenseResponse>, ApiError> {
    set_license_active(state, hash, true).await
}

/// Disable a license; validations fail with "inactive" until reactivated.
///
/// `PUT /api/licenses/:hash/deactivate`
pub async fn deactivate_license_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<LicenseResponse>, ApiError> {
    set_license_active(state, hash, false).await
}

async fn set_license_active(
    state: AppState,
    hash: String,
    active: bool,
) -> Result<Json<LicenseResponse>, ApiError> {
    let mut registry = state.registry.lock().await;
    let record = registry.set_license_active(&hash, active)?;
    Ok(LicenseResponse::new(LicenseEntry { hash, record }))
}

/// Extend a license's expiration.
///
/// `PUT /api/licenses/:hash/extend`
pub async fn extend_license_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    ApiJson(payload): ApiJson<ExtendLicenseRequest>,
) -> Result<Json<LicenseResponse>, ApiError> {
    let days = validate_positive_days(payload.days, "days")?;

    let mut registry = state.registry.lock().await;
    let record = registry.extend(&hash, days)?;
    Ok(LicenseResponse::new(LicenseEntry { hash, record }))
}

/// Registry counters.
///
/// `GET /api/stats`
pub async fn stats_handler(State(state): State<AppState>) -> Json<RegistryStats> {
    let registry = state.registry.lock().await;
    Json(registry.stats())
}

/// Recent user logins for a license.
///
/// `GET /api/licenses/:hash/logins`
pub async fn login_history_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<LoginHistoryResponse>, ApiError> {
    let registry = state.registry.lock().await;
    let logins = registry.login_history(&hash)?;
    Ok(Json(LoginHistoryResponse { hash, logins }))
}

// ============================================================================
// User roster handlers
// ============================================================================

/// List the users assigned to a license.
///
/// `GET /api/licenses/:hash/users`
pub async fn list_users_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<LicenseUsers>, ApiError> {
    let registry = state.registry.lock().await;
    Ok(Json(registry.users(&hash)?))
}

/// Assign a user to a license.
///
/// `POST /api/licenses/:hash/users`
pub async fn add_user_handler(
    State(state): State<AppState>,
    Path(hash): Path<String>,
    ApiJson(payload): ApiJson<AddUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let username = validate_username(payload.username.as_deref(), "username")?;

    let mut registry = state.registry.lock().await;
    let user = registry.add_user(&hash, &username, payload.role.as_deref())?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            success: true,
            user,
        }),
    ))
}

/// Enable or disable a user.
///
/// `PUT /api/licenses/:hash/users/:username`
pub async fn update_user_handler(
    State(state): State<AppState>,
    Path((hash, username)): Path<(String, String)>,
    ApiJson(payload): ApiJson<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let is_active = payload
        .is_active
        .ok_or_else(|| ApiError::missing_field("isActive"))?;

    let mut registry = state.registry.lock().await;
    let user = registry.set_user_active(&hash, &username, is_active)?;

    Ok(Json(UserResponse {
        success: true,
        user,
    }))
}

/// Remove a user from a license.
///
/// `DELETE /api/licenses/:hash/users/:username`
pub async fn remove_user_handler(
    State(state): State<AppState>,
    Path((hash, username)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut registry = state.registry.lock().await;
    registry.remove_user(&hash, &username)?;
    Ok(MessageResponse::new(format!("User '{username}' removed")))
}
