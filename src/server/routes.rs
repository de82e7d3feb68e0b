use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::server::admin::{
    activate_license_handler, add_user_handler, create_license_handler,
    deactivate_license_handler, delete_license_handler, extend_license_handler,
    get_license_handler, list_licenses_handler, list_users_handler, login_history_handler,
    remove_user_handler, stats_handler, update_user_handler,
};
use crate::server::client_api::{
    validate_license_handler, verify_license_handler, verify_user_license_handler,
};
use crate::server::handlers::{fallback_handler, health_handler, AppState};
use crate::server::logging::request_logging_middleware;

/// Build the application router.
///
/// # Routes
///
/// ## Health
/// - `GET /health`
///
/// ## Client validation
/// - `POST /api/licenses/validate` - Validate a license key
/// - `POST /api/verify-license` - Validate and bind to a device
/// - `POST /api/verify-user-license` - Validate a user under a license
///
/// ## License management
/// - `GET /api/stats`
/// - `GET|POST /api/licenses`
/// - `GET|DELETE /api/licenses/:hash`
/// - `PUT /api/licenses/:hash/activate`
/// - `PUT /api/licenses/:hash/deactivate`
/// - `PUT /api/licenses/:hash/extend`
/// - `GET /api/licenses/:hash/logins`
/// - `GET|POST /api/licenses/:hash/users`
/// - `PUT|DELETE /api/licenses/:hash/users/:username`
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Client validation
        .route("/api/licenses/validate", post(validate_license_handler))
        .route("/api/verify-license", post(verify_license_handler))
        .route(
            "/api/verify-user-license",
            post(verify_user_license_handler),
        )
        // License management
        .route("/api/stats", get(stats_handler))
        .route(
            "/api/licenses",
            get(list_licenses_handler).post(create_license_handler),
        )
        .route(
            "/api/licenses/:hash",
            get(get_license_handler).delete(delete_license_handler),
        )
        .route(
            "/api/licenses/:hash/activate",
            put(activate_license_handler),
        )
        .route(
            "/api/licenses/:hash/deactivate",
            put(deactivate_license_handler),
        )
        .route("/api/licenses/:hash/extend", put(extend_license_handler))
        .route("/api/licenses/:hash/logins", get(login_history_handler))
        .route(
            "/api/licenses/:hash/users",
            get(list_users_handler).post(add_user_handler),
        )
        .route(
            "/api/licenses/:hash/users/:username",
            put(update_user_handler).delete(remove_user_handler),
        )
        .fallback(fallback_handler)
        .layer(middleware::from_fn(request_logging_middleware))
        .with_state(state)
}
