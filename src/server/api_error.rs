//! Standardized API error responses.
//!
//! All failed operations answer with this JSON structure:
//!
//! ```json
//! {
//!   "error": {
//!     "code": "LICENSE_NOT_FOUND",
//!     "message": "License 'ab12...' not found",
//!     "details": null
//!   }
//! }
//! ```
//!
//! Negative validation results are not errors and never use this shape;
//! they are `200 {"valid": false, "reason": ...}`.

use axum::{
    extract::{rejection::JsonRejection, FromRequest},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::errors::LicenseError;
use crate::server::validation::ValidationError;

/// Machine-readable error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // === Validation Errors (400) ===
    /// Request payload is invalid or malformed
    InvalidRequest,
    /// A required field is missing
    MissingField,
    /// A field value is invalid
    InvalidField,
    /// Username already assigned to the license
    DuplicateUser,

    // === Resource Errors (404) ===
    /// No license under the given hash
    LicenseNotFound,
    /// No such user on the license
    UserNotFound,
    /// Requested resource was not found
    NotFound,

    // === Server Errors (5xx) ===
    /// Reading or writing the license file failed
    StorageError,
    /// Server configuration error
    ConfigError,
    /// Unexpected internal server error
    InternalError,
}

impl ErrorCode {
    /// Returns the HTTP status code for this error code.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorCode::InvalidRequest
            | ErrorCode::MissingField
            | ErrorCode::InvalidField
            | ErrorCode::DuplicateUser => StatusCode::BAD_REQUEST,

            ErrorCode::LicenseNotFound | ErrorCode::UserNotFound | ErrorCode::NotFound => {
                StatusCode::NOT_FOUND
            }

            ErrorCode::StorageError | ErrorCode::ConfigError | ErrorCode::InternalError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a default human-readable message for this error code.
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::InvalidRequest => "Request payload is invalid",
            ErrorCode::MissingField => "A required field is missing",
            ErrorCode::InvalidField => "A field value is invalid",
            ErrorCode::DuplicateUser => "User is already assigned to this license",
            ErrorCode::LicenseNotFound => "The requested license does not exist",
            ErrorCode::UserNotFound => "The requested user is not assigned to this license",
            ErrorCode::NotFound => "The requested resource was not found",
            ErrorCode::StorageError => "License storage operation failed",
            ErrorCode::ConfigError => "Server configuration error",
            ErrorCode::InternalError => "An unexpected error occurred",
        }
    }
}

/// The inner error object containing code, message, and optional details.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Standardized API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ErrorBody,
}

impl ApiError {
    /// Creates a new API error with the default message for `code`.
    pub fn new(code: ErrorCode) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: code.default_message().to_string(),
                details: None,
            },
        }
    }

    /// Creates a new API error with a custom message.
    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: None,
            },
        }
    }

    /// Creates a new API error with a custom message and details.
    pub fn with_details(
        code: ErrorCode,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ErrorBody {
                code,
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        self.error.code.status_code()
    }

    /// Missing required field error.
    pub fn missing_field(field: &str) -> Self {
        Self::with_details(
            ErrorCode::MissingField,
            format!("Required field '{}' is missing", field),
            serde_json::json!({ "field": field }),
        )
    }

    /// Invalid field value error.
    pub fn invalid_field(field: &str, reason: &str) -> Self {
        Self::with_details(
            ErrorCode::InvalidField,
            format!("Invalid value for '{}': {}", field, reason),
            serde_json::json!({ "field": field }),
        )
    }

    /// Resource not found error.
    pub fn not_found(resource: &str) -> Self {
        Self::with_message(ErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn internal_error() -> Self {
        Self::new(ErrorCode::InternalError)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(self)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {}",
            self.error.code.default_message(),
            self.error.message
        )
    }
}

impl std::error::Error for ApiError {}

impl From<LicenseError> for ApiError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::Validation(msg) => ApiError::with_message(ErrorCode::InvalidField, msg),
            LicenseError::LicenseNotFound(hash) => ApiError::with_details(
                ErrorCode::LicenseNotFound,
                format!("License '{hash}' not found"),
                serde_json::json!({ "hash": hash }),
            ),
            LicenseError::UserNotFound(username) => ApiError::with_details(
                ErrorCode::UserNotFound,
                format!("User '{username}' is not assigned to this license"),
                serde_json::json!({ "username": username }),
            ),
            LicenseError::DuplicateUser(username) => ApiError::with_details(
                ErrorCode::DuplicateUser,
                format!("User '{username}' is already assigned to this license"),
                serde_json::json!({ "username": username }),
            ),
            // Internal details stay in the log.
            LicenseError::Storage(msg) => {
                error!("Storage failure: {msg}");
                ApiError::new(ErrorCode::StorageError)
            }
            LicenseError::Serialization(e) => {
                error!("Serialization failure: {e}");
                ApiError::new(ErrorCode::StorageError)
            }
            LicenseError::Config(msg) => ApiError::with_message(ErrorCode::ConfigError, msg),
            LicenseError::Io(e) => {
                error!("I/O failure: {e}");
                ApiError::internal_error()
            }
        }
    }
}

/// JSON body extractor whose rejections (bad syntax, wrong field types,
/// missing content type) answer with the [`ApiError`] envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::with_message(ErrorCode::InvalidRequest, rejection.body_text())
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        if err.missing {
            ApiError::missing_field(&err.field)
        } else {
            ApiError::invalid_field(&err.field, &err.message)
        }
    }
}
