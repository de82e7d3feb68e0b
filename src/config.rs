//! Configuration for the license server.
//!
//! Configuration is loaded from multiple sources with the following precedence:
//! 1. Environment variables (highest priority)
//! 2. `config.toml` file
//! 3. Default values (lowest priority)
//!
//! # Environment Variables
//!
//! - `VET_SERVER_HOST` - Server bind address
//! - `VET_SERVER_PORT` (or `PORT`) - Server port
//! - `VET_STORAGE_PATH` - Path of the JSON license file
//! - `VET_LICENSE_KEY_PREFIX` - License key prefix
//! - `VET_LICENSE_DEFAULT_TYPE` - License type used when none is given
//! - `VET_DEFAULT_VALIDITY_DAYS` - Validity used when none is given
//! - `VET_LOGGING_ENABLED` - Enable the tracing subscriber
//! - `VET_LOG_LEVEL` - Log level (trace, debug, info, warn, error)

use config::Config;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::errors::{LicenseError, LicenseResult};
use crate::license::MAX_VALIDITY_DAYS;

/// Global configuration singleton.
static CONFIG: OnceLock<RegistryConfig> = OnceLock::new();

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub license: LicenseConfig,
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Where the registry is persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("licenses.json"),
        }
    }
}

/// License issuance defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LicenseConfig {
    /// Prefix for generated keys (e.g., "VET" -> "VET-<customer>-<hex>")
    pub key_prefix: String,
    /// Type assigned when the issuer does not name one
    pub default_type: String,
    /// Validity assigned when the issuer does not give one
    pub default_validity_days: i64,
}

impl Default for LicenseConfig {
    fn default() -> Self {
        Self {
            key_prefix: "VET".to_string(),
            default_type: "production".to_string(),
            default_validity_days: 365,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
        }
    }
}

fn config_err(e: config::ConfigError) -> LicenseError {
    LicenseError::Config(e.to_string())
}

impl RegistryConfig {
    /// Load configuration from file and environment.
    ///
    /// Sources are layered in this order (later sources override earlier):
    /// 1. Default values
    /// 2. `config.toml` file (optional)
    /// 3. Environment variables
    pub fn load() -> LicenseResult<Self> {
        let port_override = env::var("VET_SERVER_PORT")
            .or_else(|_| env::var("PORT"))
            .ok()
            .and_then(|v| v.parse::<i64>().ok());

        let builder = Config::builder()
            .set_default("server.host", "127.0.0.1")
            .map_err(config_err)?
            .set_default("server.port", 3000)
            .map_err(config_err)?
            .set_default("storage.path", "licenses.json")
            .map_err(config_err)?
            .set_default("license.key_prefix", "VET")
            .map_err(config_err)?
            .set_default("license.default_type", "production")
            .map_err(config_err)?
            .set_default("license.default_validity_days", 365)
            .map_err(config_err)?
            .set_default("logging.enabled", true)
            .map_err(config_err)?
            .set_default("logging.level", "info")
            .map_err(config_err)?
            // Load from config.toml (optional)
            .add_source(config::File::with_name("config").required(false))
            // Override with environment variables
            .set_override_option("server.host", env::var("VET_SERVER_HOST").ok())
            .map_err(config_err)?
            .set_override_option("server.port", port_override)
            .map_err(config_err)?
            .set_override_option("storage.path", env::var("VET_STORAGE_PATH").ok())
            .map_err(config_err)?
            .set_override_option("license.key_prefix", env::var("VET_LICENSE_KEY_PREFIX").ok())
            .map_err(config_err)?
            .set_override_option(
                "license.default_type",
                env::var("VET_LICENSE_DEFAULT_TYPE").ok(),
            )
            .map_err(config_err)?
            .set_override_option(
                "license.default_validity_days",
                env::var("VET_DEFAULT_VALIDITY_DAYS")
                    .ok()
                    .and_then(|v| v.parse::<i64>().ok()),
            )
            .map_err(config_err)?
            .set_override_option(
                "logging.enabled",
                env::var("VET_LOGGING_ENABLED")
                    .ok()
                    .and_then(|v| v.parse::<bool>().ok()),
            )
            .map_err(config_err)?
            .set_override_option("logging.level", env::var("VET_LOG_LEVEL").ok())
            .map_err(config_err)?;

        let settings = builder
            .build()
            .map_err(|e| LicenseError::Config(format!("failed to build config: {e}")))?;

        settings
            .try_deserialize()
            .map_err(|e| LicenseError::Config(format!("failed to deserialize config: {e}")))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> LicenseResult<()> {
        if self.server.port == 0 {
            return Err(LicenseError::Config(
                "server.port must be greater than 0".to_string(),
            ));
        }

        if self.storage.path.as_os_str().is_empty() {
            return Err(LicenseError::Config(
                "storage.path cannot be empty".to_string(),
            ));
        }

        let prefix = &self.license.key_prefix;
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(LicenseError::Config(format!(
                "license.key_prefix must be non-empty and alphanumeric, got '{prefix}'"
            )));
        }

        let days = self.license.default_validity_days;
        if days <= 0 || days > MAX_VALIDITY_DAYS {
            return Err(LicenseError::Config(format!(
                "license.default_validity_days must be between 1 and {MAX_VALIDITY_DAYS}, got {days}"
            )));
        }

        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(LicenseError::Config(format!(
                    "logging.level must be one of: trace, debug, info, warn, error. Got '{other}'"
                )));
            }
        }

        Ok(())
    }

    /// Socket address string the server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get the global configuration.
///
/// Loads on first access and caches the result.
pub fn get_config() -> LicenseResult<&'static RegistryConfig> {
    if let Some(config) = CONFIG.get() {
        return Ok(config);
    }

    let config = RegistryConfig::load()?;
    config.validate()?;

    // Another thread may have won the race; either value is fine.
    let _ = CONFIG.set(config);

    CONFIG
        .get()
        .ok_or_else(|| LicenseError::Config("configuration was not initialized".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RegistryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.license.key_prefix, "VET");
        assert_eq!(config.license.default_type, "production");
        assert_eq!(config.storage.path, PathBuf::from("licenses.json"));
    }

    #[test]
    fn rejects_zero_port() {
        let mut config = RegistryConfig::default();
        config.server.port = 0;
        assert!(matches!(config.validate(), Err(LicenseError::Config(_))));
    }

    #[test]
    fn rejects_bad_prefix() {
        let mut config = RegistryConfig::default();
        config.license.key_prefix = "VE T".to_string();
        assert!(config.validate().is_err());

        config.license.key_prefix = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_non_positive_validity() {
        let mut config = RegistryConfig::default();
        config.license.default_validity_days = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        let mut config = RegistryConfig::default();
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn bind_address_joins_host_and_port() {
        let config = RegistryConfig::default();
        assert_eq!(config.bind_address(), "127.0.0.1:3000");
    }
}
