//! The license registry.
//!
//! Owns every [`LicenseRecord`] in memory, keyed by the hash of its key, and
//! writes the whole map back to its [`JsonFileStore`] after each mutation.
//!
//! Mutations are staged on a copy of the record and only swapped in once the
//! checks pass. If the file write then fails the previous state is restored,
//! so memory and disk never disagree.
//!
//! The registry itself is not synchronized; callers that share it wrap it in
//! a mutex and hold the lock for the whole operation.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::audit::{log_license_event, LicenseEvent};
use crate::config::{LicenseConfig, RegistryConfig};
use crate::errors::{LicenseError, LicenseResult};
use crate::license::{
    DeviceBinding, LicenseEntry, LicenseRecord, LoginAttempt, UserAssignment, MAX_VALIDITY_DAYS,
};
use crate::license_key::{generate_license_key, hash_license_key, validate_license_key_format};
use crate::outcome::{
    AuthorizedUser, DeviceValidation, InvalidReason, KeyValidation, UserValidation, Verdict,
};
use crate::storage::JsonFileStore;

/// Days ahead counted as "expiring soon" in [`RegistryStats`].
pub const EXPIRING_SOON_DAYS: i64 = 30;

/// Default role for newly added users.
pub const DEFAULT_ROLE: &str = "user";

/// How many fresh keys to try before giving up on a hash collision.
const KEY_ATTEMPTS: usize = 10;

/// Values applied when an issue request leaves them out.
#[derive(Debug, Clone)]
pub struct IssueDefaults {
    pub key_prefix: String,
    pub license_type: String,
    pub validity_days: i64,
}

impl Default for IssueDefaults {
    fn default() -> Self {
        (&LicenseConfig::default()).into()
    }
}

impl From<&LicenseConfig> for IssueDefaults {
    fn from(config: &LicenseConfig) -> Self {
        Self {
            key_prefix: config.key_prefix.clone(),
            license_type: config.default_type.clone(),
            validity_days: config.default_validity_days,
        }
    }
}

/// Request to issue a new license.
#[derive(Debug, Clone, Default)]
pub struct NewLicense {
    pub customer_id: String,
    pub license_type: Option<String>,
    pub validity_days: Option<i64>,
}

impl NewLicense {
    pub fn for_customer(customer_id: impl Into<String>) -> Self {
        Self {
            customer_id: customer_id.into(),
            ..Self::default()
        }
    }

    pub fn license_type(mut self, license_type: impl Into<String>) -> Self {
        self.license_type = Some(license_type.into());
        self
    }

    pub fn validity_days(mut self, days: i64) -> Self {
        self.validity_days = Some(days);
        self
    }
}

/// Registry-wide counters, computed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub expired: usize,
    #[serde(rename = "expiringIn30Days")]
    pub expiring_in_30_days: usize,
    pub available: usize,
}

/// A license's roster together with its identifying fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseUsers {
    pub license_key: String,
    pub customer_id: String,
    pub users: Vec<UserAssignment>,
}

#[derive(Debug)]
pub struct LicenseRegistry {
    store: JsonFileStore,
    defaults: IssueDefaults,
    licenses: HashMap<String, LicenseRecord>,
    /// Hashes in insertion order, for listing.
    order: Vec<String>,
}

impl LicenseRegistry {
    /// Load the registry from `store`.
    pub fn open(store: JsonFileStore, defaults: IssueDefaults) -> LicenseResult<Self> {
        let mut licenses = HashMap::new();
        let mut order = Vec::new();

        for (hash, record) in store.load()? {
            if licenses.insert(hash.clone(), record).is_some() {
                warn!(license = %hash, "Duplicate license hash in file, keeping the last entry");
            } else {
                order.push(hash);
            }
        }

        info!(
            path = %store.path().display(),
            count = order.len(),
            "License registry loaded"
        );

        Ok(Self {
            store,
            defaults,
            licenses,
            order,
        })
    }

    /// Load the registry described by `config`.
    pub fn from_config(config: &RegistryConfig) -> LicenseResult<Self> {
        Self::open(
            JsonFileStore::new(&config.storage.path),
            (&config.license).into(),
        )
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Fetch a record by hash.
    pub fn get(&self, hash: &str) -> LicenseResult<&LicenseRecord> {
        self.licenses
            .get(hash)
            .ok_or_else(|| LicenseError::license_not_found(hash))
    }

    /// Fetch a record by hash, with the hash attached.
    pub fn entry(&self, hash: &str) -> LicenseResult<LicenseEntry> {
        let record = self.get(hash)?;
        Ok(LicenseEntry {
            hash: hash.to_string(),
            record: record.clone(),
        })
    }

    /// Every record with its hash, in insertion order.
    pub fn list(&self) -> Vec<LicenseEntry> {
        self.iter()
            .map(|(hash, record)| LicenseEntry {
                hash: hash.clone(),
                record: record.clone(),
            })
            .collect()
    }

    /// The user roster of a license.
    pub fn users(&self, hash: &str) -> LicenseResult<LicenseUsers> {
        let record = self.get(hash)?;
        Ok(LicenseUsers {
            license_key: record.key.clone(),
            customer_id: record.customer_id.clone(),
            users: record.users.clone(),
        })
    }

    /// Recorded logins of a license, oldest first.
    pub fn login_history(&self, hash: &str) -> LicenseResult<Vec<LoginAttempt>> {
        Ok(self.get(hash)?.login_history.iter().cloned().collect())
    }

    pub fn stats(&self) -> RegistryStats {
        self.stats_at(Utc::now())
    }

    /// Classify every record against `now`.
    pub fn stats_at(&self, now: DateTime<Utc>) -> RegistryStats {
        let mut stats = RegistryStats {
            total: 0,
            active: 0,
            inactive: 0,
            expired: 0,
            expiring_in_30_days: 0,
            available: 0,
        };

        for record in self.licenses.values() {
            stats.total += 1;
            if record.is_active {
                stats.active += 1;
            } else {
                stats.inactive += 1;
            }
            if record.is_expired_at(now) {
                stats.expired += 1;
            } else if record.expires_within(now, EXPIRING_SOON_DAYS) {
                stats.expiring_in_30_days += 1;
            }
        }

        stats.available = stats.total - stats.active;
        stats
    }

    // ------------------------------------------------------------------
    // Issue / delete
    // ------------------------------------------------------------------

    /// Issue a new license and persist it.
    pub fn issue(&mut self, request: NewLicense) -> LicenseResult<LicenseEntry> {
        let customer_id = request.customer_id.trim();
        if customer_id.is_empty() {
            return Err(LicenseError::Validation(
                "customerId is required".to_string(),
            ));
        }

        let validity_days = request.validity_days.unwrap_or(self.defaults.validity_days);
        if validity_days <= 0 || validity_days > MAX_VALIDITY_DAYS {
            return Err(LicenseError::Validation(format!(
                "validityDays must be between 1 and {MAX_VALIDITY_DAYS}"
            )));
        }

        let license_type = request
            .license_type
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.defaults.license_type.clone());

        let (key, hash) = self.fresh_key(customer_id)?;
        let record = LicenseRecord::new(
            key,
            customer_id.to_string(),
            license_type,
            validity_days,
            Utc::now(),
        )?;

        self.licenses.insert(hash.clone(), record.clone());
        self.order.push(hash.clone());

        if let Err(e) = self.persist() {
            self.licenses.remove(&hash);
            self.order.pop();
            return Err(e);
        }

        log_license_event(
            LicenseEvent::Issued,
            &hash,
            Some(&format!("customer={customer_id} days={validity_days}")),
        );

        Ok(LicenseEntry { hash, record })
    }

    /// Remove a license and persist.
    pub fn delete(&mut self, hash: &str) -> LicenseResult<()> {
        let position = self
            .order
            .iter()
            .position(|h| h == hash)
            .ok_or_else(|| LicenseError::license_not_found(hash))?;

        let removed_hash = self.order.remove(position);
        let removed = self.licenses.remove(hash);

        if let Err(e) = self.persist() {
            self.order.insert(position, removed_hash);
            if let Some(record) = removed {
                self.licenses.insert(hash.to_string(), record);
            }
            return Err(e);
        }

        log_license_event(LicenseEvent::Deleted, hash, None);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Validate a license by key.
    ///
    /// Checks, first failure wins: key present, license exists, not expired,
    /// active. Only success mutates (usage counter).
    pub fn validate_key(&mut self, license_key: &str) -> LicenseResult<Verdict<KeyValidation>> {
        let now = Utc::now();
        let (hash, mut updated) = match self.usable_license(license_key, now) {
            Ok(found) => found,
            Err(reason) => return Ok(self.reject(license_key, reason)),
        };

        updated.record_usage();
        let details = KeyValidation {
            customer_id: updated.customer_id.clone(),
            expiration_date: updated.expiration_date,
            license_type: updated.license_type.clone(),
        };
        self.replace(&hash, updated)?;

        log_license_event(LicenseEvent::Validated, &hash, None);
        Ok(Verdict::Valid(details))
    }

    /// Validate a license for a device, binding it on first use.
    ///
    /// Same checks as [`validate_key`](Self::validate_key), then the device
    /// binding transition. A mismatch leaves the record untouched.
    pub fn validate_device(
        &mut self,
        license_key: &str,
        device_id: &str,
    ) -> LicenseResult<Verdict<DeviceValidation>> {
        let now = Utc::now();
        if device_id.trim().is_empty() {
            return Ok(self.reject(license_key, InvalidReason::MissingInput));
        }

        let (hash, mut updated) = match self.usable_license(license_key, now) {
            Ok(found) => found,
            Err(reason) => return Ok(self.reject(license_key, reason)),
        };

        let binding = match updated.bind_device(device_id) {
            Ok(binding) => binding,
            Err(reason) => return Ok(self.reject(license_key, reason)),
        };

        updated.record_usage();
        let details = DeviceValidation {
            license_name: updated.customer_id.clone(),
            expiration_date: updated.expiration_date,
            bound_device_id: device_id.to_string(),
            remaining_days: updated.remaining_days_at(now),
        };
        self.replace(&hash, updated)?;

        if binding == DeviceBinding::NewlyBound {
            log_license_event(
                LicenseEvent::DeviceBound,
                &hash,
                Some(&format!("device={device_id}")),
            );
        }
        log_license_event(LicenseEvent::Validated, &hash, None);
        Ok(Verdict::Valid(details))
    }

    /// Validate a named user under a license and record the login.
    ///
    /// Checks: inputs present, license exists, not expired, active, roster
    /// non-empty, user on roster, user active. Failures are not recorded.
    pub fn validate_user(
        &mut self,
        username: &str,
        license_key: &str,
    ) -> LicenseResult<Verdict<UserValidation>> {
        let now = Utc::now();
        if username.trim().is_empty() {
            return Ok(self.reject(license_key, InvalidReason::MissingInput));
        }

        let (hash, mut updated) = match self.usable_license(license_key, now) {
            Ok(found) => found,
            Err(reason) => return Ok(self.reject(license_key, reason)),
        };

        let user = match updated.authorize_user(username) {
            Ok(user) => AuthorizedUser {
                username: user.username.clone(),
                role: user.role.clone(),
            },
            Err(reason) => return Ok(self.reject(license_key, reason)),
        };

        updated.record_login(LoginAttempt {
            username: user.username.clone(),
            timestamp: now,
            success: true,
        });
        updated.record_usage();

        let details = UserValidation {
            customer_id: updated.customer_id.clone(),
            expiration_date: updated.expiration_date,
            license_type: updated.license_type.clone(),
            user,
        };
        self.replace(&hash, updated)?;

        log_license_event(
            LicenseEvent::UserLogin,
            &hash,
            Some(&format!("user={username}")),
        );
        Ok(Verdict::Valid(details))
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    /// Add a user to a license's roster.
    pub fn add_user(
        &mut self,
        hash: &str,
        username: &str,
        role: Option<&str>,
    ) -> LicenseResult<UserAssignment> {
        let username = username.trim();
        if username.is_empty() {
            return Err(LicenseError::Validation("username is required".to_string()));
        }

        let mut updated = self.get(hash)?.clone();
        if updated.find_user(username).is_some() {
            return Err(LicenseError::DuplicateUser(username.to_string()));
        }

        let role = role
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROLE);
        let user = UserAssignment::new(username.to_string(), role.to_string(), Utc::now());
        updated.users.push(user.clone());
        self.replace(hash, updated)?;

        log_license_event(
            LicenseEvent::UserAdded,
            hash,
            Some(&format!("user={username} role={role}")),
        );
        Ok(user)
    }

    /// Enable or disable one user.
    pub fn set_user_active(
        &mut self,
        hash: &str,
        username: &str,
        is_active: bool,
    ) -> LicenseResult<UserAssignment> {
        let mut updated = self.get(hash)?.clone();
        let user = updated
            .find_user_mut(username)
            .ok_or_else(|| LicenseError::user_not_found(username))?;
        user.is_active = is_active;
        let user = user.clone();
        self.replace(hash, updated)?;

        let event = if is_active {
            LicenseEvent::UserEnabled
        } else {
            LicenseEvent::UserDisabled
        };
        log_license_event(event, hash, Some(&format!("user={username}")));
        Ok(user)
    }

    /// Remove one user from the roster.
    pub fn remove_user(&mut self, hash: &str, username: &str) -> LicenseResult<()> {
        let mut updated = self.get(hash)?.clone();
        let position = updated
            .users
            .iter()
            .position(|u| u.username == username)
            .ok_or_else(|| LicenseError::user_not_found(username))?;
        updated.users.remove(position);
        self.replace(hash, updated)?;

        log_license_event(
            LicenseEvent::UserRemoved,
            hash,
            Some(&format!("user={username}")),
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // License state
    // ------------------------------------------------------------------

    /// Activate or deactivate a license.
    pub fn set_license_active(&mut self, hash: &str, active: bool) -> LicenseResult<LicenseRecord> {
        let mut updated = self.get(hash)?.clone();
        updated.is_active = active;
        self.replace(hash, updated.clone())?;

        let event = if active {
            LicenseEvent::Activated
        } else {
            LicenseEvent::Deactivated
        };
        log_license_event(event, hash, None);
        Ok(updated)
    }

    /// Push a license's expiration out by `days_to_add` days.
    pub fn extend(&mut self, hash: &str, days_to_add: i64) -> LicenseResult<LicenseRecord> {
        if days_to_add <= 0 || days_to_add > MAX_VALIDITY_DAYS {
            return Err(LicenseError::Validation(format!(
                "days must be between 1 and {MAX_VALIDITY_DAYS}"
            )));
        }

        let mut updated = self.get(hash)?.clone();
        updated.extend_by_days(days_to_add)?;
        self.replace(hash, updated.clone())?;

        log_license_event(
            LicenseEvent::Extended,
            hash,
            Some(&format!(
                "days={days_to_add} expires={}",
                updated.expiration_date.to_rfc3339()
            )),
        );
        Ok(updated)
    }

    /// Rewrite the license file from memory.
    pub fn flush(&self) -> LicenseResult<()> {
        self.persist()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn iter(&self) -> impl Iterator<Item = (&String, &LicenseRecord)> + '_ {
        self.order
            .iter()
            .filter_map(|hash| self.licenses.get_key_value(hash))
    }

    fn persist(&self) -> LicenseResult<()> {
        self.store.save(self.iter())
    }

    /// Swap in a staged record and persist, restoring the old one on failure.
    fn replace(&mut self, hash: &str, updated: LicenseRecord) -> LicenseResult<()> {
        let previous = self.licenses.insert(hash.to_string(), updated);
        if let Err(e) = self.persist() {
            if let Some(previous) = previous {
                self.licenses.insert(hash.to_string(), previous);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Common validation prefix: key present, license exists, usable now.
    ///
    /// Returns the hash and a working copy of the record.
    fn usable_license(
        &self,
        license_key: &str,
        now: DateTime<Utc>,
    ) -> Result<(String, LicenseRecord), InvalidReason> {
        if license_key.trim().is_empty() {
            return Err(InvalidReason::MissingInput);
        }

        let hash = hash_license_key(license_key);
        let record = self.licenses.get(&hash).ok_or(InvalidReason::NotFound)?;
        record.check_usable(now)?;
        Ok((hash, record.clone()))
    }

    fn reject<T>(&self, license_key: &str, reason: InvalidReason) -> Verdict<T> {
        let license = if license_key.trim().is_empty() {
            "-".to_string()
        } else {
            hash_license_key(license_key)
        };
        let malformed = reason == InvalidReason::NotFound
            && !validate_license_key_format(license_key.trim(), &self.defaults.key_prefix);
        let details = if malformed {
            format!("{} (key does not match {}-<customer>-<hex>)", reason, self.defaults.key_prefix)
        } else {
            reason.message().to_string()
        };
        log_license_event(LicenseEvent::ValidationFailed, &license, Some(&details));
        Verdict::Invalid(reason)
    }

    fn fresh_key(&self, customer_id: &str) -> LicenseResult<(String, String)> {
        for _ in 0..KEY_ATTEMPTS {
            let key = generate_license_key(&self.defaults.key_prefix, customer_id);
            let hash = hash_license_key(&key);
            if !self.licenses.contains_key(&hash) {
                return Ok((key, hash));
            }
        }

        Err(LicenseError::Storage(format!(
            "failed to generate a unique license key after {KEY_ATTEMPTS} attempts"
        )))
    }
}
