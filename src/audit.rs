//! Structured audit logging for license state changes.

use tracing::{info, info_span, warn};

/// License state change event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseEvent {
    Issued,
    Validated,
    ValidationFailed,
    DeviceBound,
    UserLogin,
    UserAdded,
    UserRemoved,
    UserEnabled,
    UserDisabled,
    Activated,
    Deactivated,
    Extended,
    Deleted,
}

impl std::fmt::Display for LicenseEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LicenseEvent::Issued => "issued",
            LicenseEvent::Validated => "validated",
            LicenseEvent::ValidationFailed => "validation_failed",
            LicenseEvent::DeviceBound => "device_bound",
            LicenseEvent::UserLogin => "user_login",
            LicenseEvent::UserAdded => "user_added",
            LicenseEvent::UserRemoved => "user_removed",
            LicenseEvent::UserEnabled => "user_enabled",
            LicenseEvent::UserDisabled => "user_disabled",
            LicenseEvent::Activated => "activated",
            LicenseEvent::Deactivated => "deactivated",
            LicenseEvent::Extended => "extended",
            LicenseEvent::Deleted => "deleted",
        };
        write!(f, "{}", s)
    }
}

/// Log a license state change event.
///
/// # Arguments
///
/// * `event` - The type of license event
/// * `license` - The license hash (never the raw key)
/// * `details` - Optional additional details about the event
pub fn log_license_event(event: LicenseEvent, license: &str, details: Option<&str>) {
    let span = info_span!(
        "license_event",
        event = %event,
        license = %license,
    );
    let _enter = span.enter();

    match event {
        LicenseEvent::ValidationFailed => {
            if let Some(d) = details {
                warn!(reason = %d, "License event occurred");
            } else {
                warn!("License event occurred");
            }
        }
        _ => {
            if let Some(d) = details {
                info!(details = %d, "License event occurred");
            } else {
                info!("License event occurred");
            }
        }
    }
}
