//! VET license server - issues, stores and validates desktop application licenses.
//!
//! # Features
//!
//! - `server` - axum HTTP surface and the `vet_license_server` binary. Enabled by default.
//!
//! The core ([`registry::LicenseRegistry`]) is always available and has no
//! HTTP dependency:
//!
//! ```rust,no_run
//! use vet_license::registry::{IssueDefaults, LicenseRegistry, NewLicense};
//! use vet_license::storage::JsonFileStore;
//!
//! let store = JsonFileStore::new("licenses.json");
//! let mut registry = LicenseRegistry::open(store, IssueDefaults::default())?;
//!
//! let issued = registry.issue(NewLicense::for_customer("c1").validity_days(30))?;
//! let verdict = registry.validate_key(&issued.record.key)?;
//! assert!(verdict.is_valid());
//! # Ok::<(), vet_license::errors::LicenseError>(())
//! ```

// Core modules (always available)
pub mod audit;
pub mod config;
pub mod errors;
pub mod license;
pub mod license_key;
pub mod outcome;
pub mod registry;
pub mod storage;

// Server-related modules (requires "server" feature)
#[cfg(feature = "server")]
#[path = "server/mod.rs"]
pub mod server;
