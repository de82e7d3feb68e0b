//! Registry behavior against a real license file in a temp directory.

use chrono::{Duration, Utc};
use tempfile::TempDir;

use vet_license::errors::LicenseError;
use vet_license::license::{
    LicenseRecord, LOGIN_HISTORY_LIMIT, MAX_VALIDITY_DAYS, SECONDS_PER_DAY,
};
use vet_license::license_key::hash_license_key;
use vet_license::outcome::{InvalidReason, Verdict};
use vet_license::registry::{IssueDefaults, LicenseRegistry, NewLicense};
use vet_license::storage::JsonFileStore;

fn store_in(dir: &TempDir) -> JsonFileStore {
    JsonFileStore::new(dir.path().join("licenses.json"))
}

fn open_registry(dir: &TempDir) -> LicenseRegistry {
    LicenseRegistry::open(store_in(dir), IssueDefaults::default()).unwrap()
}

/// Write a hand-built record straight to the file and reopen.
fn registry_with(dir: &TempDir, record: LicenseRecord) -> (LicenseRegistry, String) {
    let hash = hash_license_key(&record.key);
    store_in(dir).save([(&hash, &record)]).unwrap();
    (open_registry(dir), hash)
}

#[test]
fn issued_hash_is_digest_of_key() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);

    let entry = registry.issue(NewLicense::for_customer("clinic-1")).unwrap();

    assert_eq!(entry.hash, hash_license_key(&entry.record.key));
    assert!(entry.record.key.starts_with("VET-clinic-1-"));
    assert_eq!(entry.record.usage_count, 0);
    assert!(entry.record.is_active);
    assert!(entry.record.bound_device_id.is_none());
    assert!(entry.record.users.is_empty());
}

#[test]
fn registry_survives_reload() {
    let dir = TempDir::new().unwrap();
    let hash = {
        let mut registry = open_registry(&dir);
        let entry = registry
            .issue(NewLicense::for_customer("c1").license_type("trial").validity_days(10))
            .unwrap();
        registry.add_user(&entry.hash, "ahmed", Some("admin")).unwrap();
        registry.issue(NewLicense::for_customer("c2")).unwrap();
        entry.hash
    };

    let reloaded = open_registry(&dir);
    assert_eq!(reloaded.len(), 2);
    let record = reloaded.get(&hash).unwrap();
    assert_eq!(record.customer_id, "c1");
    assert_eq!(record.license_type, "trial");
    assert_eq!(record.validity_days, 10);
    assert_eq!(record.users[0].username, "ahmed");
    assert_eq!(record.users[0].role, "admin");

    let listed: Vec<_> = reloaded.list().into_iter().map(|e| e.record.customer_id).collect();
    assert_eq!(listed, vec!["c1", "c2"]);
}

#[test]
fn file_is_array_of_hash_record_pairs() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);
    let entry = registry.issue(NewLicense::for_customer("c1")).unwrap();

    let raw = std::fs::read_to_string(dir.path().join("licenses.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let pairs = json.as_array().unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0][0], entry.hash.as_str());
    assert_eq!(pairs[0][1]["customerId"], "c1");
    assert_eq!(pairs[0][1]["usageCount"], 0);
    assert_eq!(pairs[0][1]["isActive"], true);
}

#[test]
fn each_successful_validation_counts_once() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);
    let entry = registry.issue(NewLicense::for_customer("c1")).unwrap();

    for expected in 1..=3 {
        let verdict = registry.validate_key(&entry.record.key).unwrap();
        assert!(verdict.is_valid());
        assert_eq!(registry.get(&entry.hash).unwrap().usage_count, expected);
    }

    let verdict = registry.validate_key("VET-nobody-0000000000000000").unwrap();
    assert_eq!(verdict.reason(), Some(InvalidReason::NotFound));
    assert_eq!(registry.get(&entry.hash).unwrap().usage_count, 3);
}

#[test]
fn blank_key_is_missing_input() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);

    let verdict = registry.validate_key("  ").unwrap();
    assert_eq!(verdict, Verdict::Invalid(InvalidReason::MissingInput));
}

#[test]
fn expired_is_reported_before_inactive() {
    let dir = TempDir::new().unwrap();
    let mut record = LicenseRecord::new(
        "VET-old-00000000000000AA".to_string(),
        "old".to_string(),
        "production".to_string(),
        1,
        Utc::now() - Duration::days(5),
    )
    .unwrap();
    record.is_active = false;
    let key = record.key.clone();
    let (mut registry, hash) = registry_with(&dir, record);

    let verdict = registry.validate_key(&key).unwrap();
    assert_eq!(verdict.reason(), Some(InvalidReason::Expired));

    let verdict = registry.validate_device(&key, "device-a").unwrap();
    assert_eq!(verdict.reason(), Some(InvalidReason::Expired));
    assert!(registry.get(&hash).unwrap().bound_device_id.is_none());
    assert_eq!(registry.get(&hash).unwrap().usage_count, 0);
}

#[test]
fn device_binding_sticks_to_first_device() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);
    let entry = registry
        .issue(NewLicense::for_customer("c1").validity_days(10))
        .unwrap();
    let key = &entry.record.key;

    let details = registry.validate_device(key, "device-a").unwrap().valid().unwrap();
    assert_eq!(details.bound_device_id, "device-a");
    assert_eq!(details.license_name, "c1");
    assert_eq!(details.remaining_days, 10);

    let verdict = registry.validate_device(key, "device-b").unwrap();
    assert_eq!(verdict.reason(), Some(InvalidReason::DeviceMismatch));
    assert_eq!(
        registry.get(&entry.hash).unwrap().bound_device_id.as_deref(),
        Some("device-a")
    );

    assert!(registry.validate_device(key, "device-a").unwrap().is_valid());
    assert_eq!(registry.get(&entry.hash).unwrap().usage_count, 2);
}

#[test]
fn duplicate_user_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);
    let entry = registry.issue(NewLicense::for_customer("c1")).unwrap();

    let user = registry.add_user(&entry.hash, "ahmed", None).unwrap();
    assert_eq!(user.role, "user");
    assert!(user.is_active);

    let err = registry.add_user(&entry.hash, "ahmed", Some("admin")).unwrap_err();
    assert!(matches!(err, LicenseError::DuplicateUser(ref name) if name == "ahmed"));
    assert_eq!(registry.get(&entry.hash).unwrap().users.len(), 1);
}

#[test]
fn user_toggle_controls_login() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);
    let entry = registry.issue(NewLicense::for_customer("c1")).unwrap();
    let key = entry.record.key.clone();

    let verdict = registry.validate_user("ahmed", &key).unwrap();
    assert_eq!(verdict.reason(), Some(InvalidReason::NoUsersAssigned));

    registry.add_user(&entry.hash, "ahmed", Some("vet")).unwrap();
    let details = registry.validate_user("ahmed", &key).unwrap().valid().unwrap();
    assert_eq!(details.user.username, "ahmed");
    assert_eq!(details.user.role, "vet");
    assert_eq!(details.customer_id, "c1");

    registry.set_user_active(&entry.hash, "ahmed", false).unwrap();
    let verdict = registry.validate_user("ahmed", &key).unwrap();
    assert_eq!(verdict.reason(), Some(InvalidReason::UserInactive));

    registry.set_user_active(&entry.hash, "ahmed", true).unwrap();
    assert!(registry.validate_user("ahmed", &key).unwrap().is_valid());

    let record = registry.get(&entry.hash).unwrap();
    assert_eq!(record.login_history.len(), 2);
    assert!(record.login_history.iter().all(|l| l.success));
}

#[test]
fn removed_user_is_no_longer_assigned() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);
    let entry = registry.issue(NewLicense::for_customer("c1")).unwrap();
    registry.add_user(&entry.hash, "ahmed", None).unwrap();
    registry.add_user(&entry.hash, "sara", None).unwrap();

    registry.remove_user(&entry.hash, "ahmed").unwrap();

    let verdict = registry.validate_user("ahmed", &entry.record.key).unwrap();
    assert_eq!(verdict.reason(), Some(InvalidReason::UserNotAssigned));

    let err = registry.remove_user(&entry.hash, "ahmed").unwrap_err();
    assert!(matches!(err, LicenseError::UserNotFound(_)));
}

#[test]
fn extend_adds_whole_days() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);
    let entry = registry
        .issue(NewLicense::for_customer("c1").validity_days(30))
        .unwrap();

    let updated = registry.extend(&entry.hash, 30).unwrap();

    let added = updated.expiration_date - entry.record.expiration_date;
    assert_eq!(added.num_seconds(), 30 * SECONDS_PER_DAY);
    assert_eq!(updated.validity_days, 60);

    assert!(matches!(
        registry.extend(&entry.hash, 0),
        Err(LicenseError::Validation(_))
    ));
    assert!(registry.extend("missing", 5).unwrap_err().is_not_found());
}

#[test]
fn oversized_day_counts_are_validation_errors() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);

    let err = registry
        .issue(NewLicense::for_customer("c1").validity_days(100_000_000))
        .unwrap_err();
    assert!(matches!(err, LicenseError::Validation(_)));
    assert!(registry.is_empty());

    let entry = registry
        .issue(NewLicense::for_customer("c1").validity_days(MAX_VALIDITY_DAYS))
        .unwrap();
    let err = registry.extend(&entry.hash, 100_000_000).unwrap_err();
    assert!(matches!(err, LicenseError::Validation(_)));
    assert!(matches!(
        registry.extend(&entry.hash, i64::MAX),
        Err(LicenseError::Validation(_))
    ));

    let record = registry.get(&entry.hash).unwrap();
    assert_eq!(record.validity_days, MAX_VALIDITY_DAYS);
    assert_eq!(record.expiration_date, entry.record.expiration_date);
}

#[test]
fn login_history_keeps_most_recent() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);
    let entry = registry.issue(NewLicense::for_customer("c1")).unwrap();
    registry.add_user(&entry.hash, "first", None).unwrap();
    registry.add_user(&entry.hash, "second", None).unwrap();

    assert!(registry.validate_user("first", &entry.record.key).unwrap().is_valid());
    for _ in 0..LOGIN_HISTORY_LIMIT + 5 {
        assert!(registry.validate_user("second", &entry.record.key).unwrap().is_valid());
    }

    let history = registry.login_history(&entry.hash).unwrap();
    assert_eq!(history.len(), LOGIN_HISTORY_LIMIT);
    assert!(history.iter().all(|l| l.username == "second"));
    assert_eq!(
        registry.get(&entry.hash).unwrap().usage_count,
        (LOGIN_HISTORY_LIMIT + 6) as u64
    );
}

#[test]
fn deactivated_license_reports_inactive() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);
    let entry = registry
        .issue(NewLicense::for_customer("c1").license_type("production").validity_days(365))
        .unwrap();

    let details = registry.validate_key(&entry.record.key).unwrap().valid().unwrap();
    assert_eq!(details.customer_id, "c1");
    assert_eq!(details.license_type, "production");

    registry.set_license_active(&entry.hash, false).unwrap();
    let verdict = registry.validate_key(&entry.record.key).unwrap();
    let reason = verdict.reason().unwrap();
    assert_eq!(reason, InvalidReason::Inactive);
    assert_eq!(reason.message(), "License is inactive");

    registry.set_license_active(&entry.hash, true).unwrap();
    assert!(registry.validate_key(&entry.record.key).unwrap().is_valid());
}

#[test]
fn delete_removes_license_from_file() {
    let dir = TempDir::new().unwrap();
    let mut registry = open_registry(&dir);
    let keep = registry.issue(NewLicense::for_customer("keep")).unwrap();
    let gone = registry.issue(NewLicense::for_customer("gone")).unwrap();

    registry.delete(&gone.hash).unwrap();
    assert!(registry.delete(&gone.hash).unwrap_err().is_not_found());

    let reloaded = open_registry(&dir);
    assert_eq!(reloaded.len(), 1);
    assert!(reloaded.get(&keep.hash).is_ok());
    let verdict = open_registry(&dir).validate_key(&gone.record.key).unwrap();
    assert_eq!(verdict.reason(), Some(InvalidReason::NotFound));
}

#[test]
fn stats_count_expired_and_available() {
    let dir = TempDir::new().unwrap();
    let expired = LicenseRecord::new(
        "VET-old-00000000000000BB".to_string(),
        "old".to_string(),
        "production".to_string(),
        1,
        Utc::now() - Duration::days(3),
    )
    .unwrap();
    let (mut registry, _) = registry_with(&dir, expired);
    let soon = registry
        .issue(NewLicense::for_customer("soon").validity_days(10))
        .unwrap();
    registry.issue(NewLicense::for_customer("later")).unwrap();
    registry.set_license_active(&soon.hash, false).unwrap();

    let stats = registry.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.active, 2);
    assert_eq!(stats.inactive, 1);
    assert_eq!(stats.expired, 1);
    assert_eq!(stats.expiring_in_30_days, 1);
    assert_eq!(stats.available, 1);
}

#[test]
fn corrupt_file_fails_to_open() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("licenses.json"), "{not json").unwrap();

    let err = LicenseRegistry::open(store_in(&dir), IssueDefaults::default()).unwrap_err();
    assert!(matches!(err, LicenseError::Storage(_)));
}
