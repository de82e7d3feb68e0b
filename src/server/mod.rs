// src/server/mod.rs

//! Server-side components.
//!
//! This module contains:
//! - `handlers`    → shared `AppState`, health check, error mapping
//! - `admin`       → license and user roster management endpoints
//! - `client_api`  → validation endpoints used by the desktop client
//! - `routes`      → router builder
//! - `api_error`   → standardized error responses
//! - `logging`     → request logging middleware
//! - `validation`  → request validation utilities

pub mod admin;
pub mod api_error;
pub mod client_api;
pub mod handlers;
pub mod logging;
pub mod routes;
pub mod validation;

pub use api_error::{ApiError, ErrorCode};
pub use client_api::{
    validate_license_handler, verify_license_handler, verify_user_license_handler,
    ValidateRequest, ValidationResponse, VerifyLicenseRequest, VerifyUserRequest,
};
pub use handlers::{health_handler, AppState};
pub use routes::build_router;
