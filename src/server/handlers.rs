use std::sync::Arc;

use axum::{
    response::{IntoResponse, Response},
    Json,
};
use tokio::sync::Mutex;

use crate::errors::LicenseError;
use crate::registry::LicenseRegistry;
use crate::server::api_error::ApiError;
use crate::server::logging::HealthResponse;

/// Shared application state for handlers.
///
/// The registry sits behind one async mutex. Each handler holds the lock for
/// its whole read-modify-write-persist sequence, so concurrent requests are
/// applied one at a time and no update is lost.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Mutex<LicenseRegistry>>,
}

impl AppState {
    pub fn new(registry: LicenseRegistry) -> Self {
        Self {
            registry: Arc::new(Mutex::new(registry)),
        }
    }
}

/// Map internal LicenseError into an HTTP response.
///
/// This lets handlers return `Result<Json<T>, LicenseError>` directly.
impl IntoResponse for LicenseError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

/// Liveness probe.
///
/// `GET /health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Fallback for unknown routes.
pub async fn fallback_handler() -> ApiError {
    ApiError::not_found("Route")
}
