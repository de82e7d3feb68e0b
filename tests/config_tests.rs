use std::env;
use std::path::PathBuf;

use serial_test::serial;
use vet_license::config::RegistryConfig;

const VARS: &[&str] = &[
    "VET_SERVER_HOST",
    "VET_SERVER_PORT",
    "PORT",
    "VET_STORAGE_PATH",
    "VET_LICENSE_KEY_PREFIX",
    "VET_DEFAULT_VALIDITY_DAYS",
    "VET_LOG_LEVEL",
];

fn clear_env() {
    for var in VARS {
        env::remove_var(var);
    }
}

#[test]
#[serial]
fn defaults_without_env() {
    clear_env();

    let config = RegistryConfig::load().unwrap();

    assert_eq!(config.server.port, 3000);
    assert_eq!(config.storage.path, PathBuf::from("licenses.json"));
    assert_eq!(config.license.key_prefix, "VET");
    assert_eq!(config.license.default_validity_days, 365);
    assert!(config.validate().is_ok());
}

#[test]
#[serial]
fn env_overrides_defaults() {
    clear_env();
    env::set_var("VET_SERVER_HOST", "0.0.0.0");
    env::set_var("VET_SERVER_PORT", "8088");
    env::set_var("VET_STORAGE_PATH", "/var/lib/vet/licenses.json");
    env::set_var("VET_DEFAULT_VALIDITY_DAYS", "30");

    let config = RegistryConfig::load().unwrap();
    clear_env();

    assert_eq!(config.bind_address(), "0.0.0.0:8088");
    assert_eq!(
        config.storage.path,
        PathBuf::from("/var/lib/vet/licenses.json")
    );
    assert_eq!(config.license.default_validity_days, 30);
}

#[test]
#[serial]
fn plain_port_is_honored() {
    clear_env();
    env::set_var("PORT", "4100");

    let config = RegistryConfig::load().unwrap();
    clear_env();

    assert_eq!(config.server.port, 4100);
}

#[test]
#[serial]
fn prefixed_port_wins_over_plain_port() {
    clear_env();
    env::set_var("PORT", "4100");
    env::set_var("VET_SERVER_PORT", "4200");

    let config = RegistryConfig::load().unwrap();
    clear_env();

    assert_eq!(config.server.port, 4200);
}

#[test]
#[serial]
fn bad_values_fail_validation() {
    clear_env();
    env::set_var("VET_LICENSE_KEY_PREFIX", "V-T");
    env::set_var("VET_LOG_LEVEL", "chatty");

    let config = RegistryConfig::load().unwrap();
    clear_env();

    assert!(config.validate().is_err());
}
