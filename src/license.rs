//! License records and the per-license user roster.
//!
//! Field names serialize in camelCase so the persisted file and the HTTP
//! payloads share one shape.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{LicenseError, LicenseResult};
use crate::outcome::InvalidReason;

/// Maximum number of login attempts kept per license.
pub const LOGIN_HISTORY_LIMIT: usize = 100;

/// Seconds in one licensing day.
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Largest validity or extension accepted in a single request (100 years).
pub const MAX_VALIDITY_DAYS: i64 = 36_500;

/// One issued license.
///
/// The registry hash is deliberately not a field: it only lives as the map
/// key, see [`LicenseEntry`] for the combined view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    pub key: String,
    pub customer_id: String,
    #[serde(rename = "type")]
    pub license_type: String,
    pub created: DateTime<Utc>,
    pub expiration_date: DateTime<Utc>,
    pub validity_days: i64,
    #[serde(default)]
    pub bound_device_id: Option<String>,
    #[serde(default)]
    pub usage_count: u64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub users: Vec<UserAssignment>,
    #[serde(default)]
    pub login_history: VecDeque<LoginAttempt>,
}

/// A named user authorized under a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAssignment {
    pub username: String,
    pub role: String,
    pub added_at: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// A recorded user login against a license.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginAttempt {
    pub username: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

/// A record together with its registry hash.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LicenseEntry {
    pub hash: String,
    #[serde(flatten)]
    pub record: LicenseRecord,
}

/// Result of presenting a device id to a license.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceBinding {
    /// The license was unbound and is now bound to the presented device.
    NewlyBound,
    /// The license was already bound to the presented device.
    AlreadyBound,
}

fn default_true() -> bool {
    true
}

fn days_out_of_range(days: i64) -> LicenseError {
    LicenseError::Validation(format!("{days} days is out of range for an expiration date"))
}

impl LicenseRecord {
    /// Build a fresh, active, unbound record.
    ///
    /// Fails if the expiration date cannot be represented.
    pub fn new(
        key: String,
        customer_id: String,
        license_type: String,
        validity_days: i64,
        now: DateTime<Utc>,
    ) -> LicenseResult<Self> {
        let expiration_date = Duration::try_days(validity_days)
            .and_then(|d| now.checked_add_signed(d))
            .ok_or_else(|| days_out_of_range(validity_days))?;

        Ok(Self {
            key,
            customer_id,
            license_type,
            created: now,
            expiration_date,
            validity_days,
            bound_device_id: None,
            usage_count: 0,
            is_active: true,
            users: Vec::new(),
            login_history: VecDeque::new(),
        })
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date < now
    }

    /// Expiring within `days` from `now`, and not yet expired.
    pub fn expires_within(&self, now: DateTime<Utc>, days: i64) -> bool {
        !self.is_expired_at(now) && self.expiration_date <= now + Duration::days(days)
    }

    /// Whole days left until expiration, rounded up.
    pub fn remaining_days_at(&self, now: DateTime<Utc>) -> i64 {
        let millis = (self.expiration_date - now).num_milliseconds();
        let day_millis = SECONDS_PER_DAY * 1000;
        millis.div_euclid(day_millis) + i64::from(millis.rem_euclid(day_millis) != 0)
    }

    /// Checks shared by every validation path: expiry, then activation.
    pub fn check_usable(&self, now: DateTime<Utc>) -> Result<(), InvalidReason> {
        if self.is_expired_at(now) {
            return Err(InvalidReason::Expired);
        }
        if !self.is_active {
            return Err(InvalidReason::Inactive);
        }
        Ok(())
    }

    /// Device binding transition.
    ///
    /// `unbound --D--> bound(D)`; `bound(D) --D--> bound(D)`;
    /// `bound(D) --E--> DeviceMismatch` with no change.
    pub fn bind_device(&mut self, device_id: &str) -> Result<DeviceBinding, InvalidReason> {
        match self.bound_device_id.as_deref() {
            None => {
                self.bound_device_id = Some(device_id.to_string());
                Ok(DeviceBinding::NewlyBound)
            }
            Some(bound) if bound == device_id => Ok(DeviceBinding::AlreadyBound),
            Some(_) => Err(InvalidReason::DeviceMismatch),
        }
    }

    /// Roster checks for a user login: any users, this user, user active.
    pub fn authorize_user(&self, username: &str) -> Result<&UserAssignment, InvalidReason> {
        if self.users.is_empty() {
            return Err(InvalidReason::NoUsersAssigned);
        }
        let user = self
            .find_user(username)
            .ok_or(InvalidReason::UserNotAssigned)?;
        if !user.is_active {
            return Err(InvalidReason::UserInactive);
        }
        Ok(user)
    }

    pub fn find_user(&self, username: &str) -> Option<&UserAssignment> {
        self.users.iter().find(|u| u.username == username)
    }

    pub fn find_user_mut(&mut self, username: &str) -> Option<&mut UserAssignment> {
        self.users.iter_mut().find(|u| u.username == username)
    }

    /// Append a login, evicting the oldest entries beyond the limit.
    pub fn record_login(&mut self, attempt: LoginAttempt) {
        self.login_history.push_back(attempt);
        while self.login_history.len() > LOGIN_HISTORY_LIMIT {
            self.login_history.pop_front();
        }
    }

    /// Push the expiration out by `days` whole days.
    ///
    /// Leaves the record untouched if the result would overflow.
    pub fn extend_by_days(&mut self, days: i64) -> LicenseResult<()> {
        let expiration_date = days
            .checked_mul(SECONDS_PER_DAY)
            .and_then(Duration::try_seconds)
            .and_then(|d| self.expiration_date.checked_add_signed(d))
            .ok_or_else(|| days_out_of_range(days))?;
        let validity_days = self
            .validity_days
            .checked_add(days)
            .ok_or_else(|| days_out_of_range(days))?;

        self.expiration_date = expiration_date;
        self.validity_days = validity_days;
        Ok(())
    }

    pub fn record_usage(&mut self) {
        self.usage_count = self.usage_count.saturating_add(1);
    }
}

impl UserAssignment {
    pub fn new(username: String, role: String, now: DateTime<Utc>) -> Self {
        Self {
            username,
            role,
            added_at: now,
            is_active: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(now: DateTime<Utc>) -> LicenseRecord {
        LicenseRecord::new(
            "VET-c1-0123456789ABCDEF".to_string(),
            "c1".to_string(),
            "production".to_string(),
            30,
            now,
        )
        .unwrap()
    }

    #[test]
    fn new_record_defaults() {
        let now = Utc::now();
        let r = record(now);
        assert!(r.is_active);
        assert_eq!(r.usage_count, 0);
        assert!(r.bound_device_id.is_none());
        assert!(r.users.is_empty());
        assert!(r.login_history.is_empty());
        assert_eq!(r.expiration_date - r.created, Duration::days(30));
    }

    #[test]
    fn expired_takes_precedence_over_inactive() {
        let now = Utc::now();
        let mut r = record(now - Duration::days(40));
        r.is_active = false;
        assert_eq!(r.check_usable(now), Err(InvalidReason::Expired));
    }

    #[test]
    fn inactive_license_is_not_usable() {
        let now = Utc::now();
        let mut r = record(now);
        r.is_active = false;
        assert_eq!(r.check_usable(now), Err(InvalidReason::Inactive));
    }

    #[test]
    fn device_binding_is_one_way() {
        let mut r = record(Utc::now());
        assert_eq!(r.bind_device("A"), Ok(DeviceBinding::NewlyBound));
        assert_eq!(r.bind_device("A"), Ok(DeviceBinding::AlreadyBound));
        assert_eq!(r.bind_device("B"), Err(InvalidReason::DeviceMismatch));
        assert_eq!(r.bound_device_id.as_deref(), Some("A"));
    }

    #[test]
    fn user_authorization_order() {
        let now = Utc::now();
        let mut r = record(now);
        assert_eq!(
            r.authorize_user("ahmed").unwrap_err(),
            InvalidReason::NoUsersAssigned
        );

        r.users
            .push(UserAssignment::new("sara".into(), "user".into(), now));
        assert_eq!(
            r.authorize_user("ahmed").unwrap_err(),
            InvalidReason::UserNotAssigned
        );

        r.users
            .push(UserAssignment::new("ahmed".into(), "admin".into(), now));
        r.find_user_mut("ahmed").unwrap().is_active = false;
        assert_eq!(
            r.authorize_user("ahmed").unwrap_err(),
            InvalidReason::UserInactive
        );
    }

    #[test]
    fn login_history_is_bounded_fifo() {
        let now = Utc::now();
        let mut r = record(now);
        for i in 0..(LOGIN_HISTORY_LIMIT + 5) {
            r.record_login(LoginAttempt {
                username: format!("u{i}"),
                timestamp: now,
                success: true,
            });
        }
        assert_eq!(r.login_history.len(), LOGIN_HISTORY_LIMIT);
        assert_eq!(r.login_history.front().unwrap().username, "u5");
        assert_eq!(
            r.login_history.back().unwrap().username,
            format!("u{}", LOGIN_HISTORY_LIMIT + 4)
        );
    }

    #[test]
    fn remaining_days_rounds_up() {
        let now = Utc::now();
        let r = record(now);
        assert_eq!(r.remaining_days_at(now), 30);
        assert_eq!(r.remaining_days_at(now + Duration::hours(1)), 30);
        assert_eq!(r.remaining_days_at(now + Duration::days(29) + Duration::hours(23)), 1);
    }

    #[test]
    fn extend_adds_whole_days() {
        let now = Utc::now();
        let mut r = record(now);
        let before = r.expiration_date;
        r.extend_by_days(30).unwrap();
        assert_eq!((r.expiration_date - before).num_seconds(), 30 * SECONDS_PER_DAY);
        assert_eq!(r.validity_days, 60);
    }

    #[test]
    fn oversized_day_counts_are_rejected() {
        let now = Utc::now();
        let err = LicenseRecord::new(
            "VET-c1-0123456789ABCDEF".to_string(),
            "c1".to_string(),
            "production".to_string(),
            100_000_000,
            now,
        )
        .unwrap_err();
        assert!(matches!(err, LicenseError::Validation(_)));

        let mut r = record(now);
        let before = r.clone();
        assert!(r.extend_by_days(100_000_000).is_err());
        assert!(r.extend_by_days(i64::MAX).is_err());
        assert_eq!(r, before);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let r = record(Utc::now());
        let json = serde_json::to_value(&r).unwrap();
        for field in [
            "key",
            "customerId",
            "type",
            "created",
            "expirationDate",
            "validityDays",
            "boundDeviceId",
            "usageCount",
            "isActive",
            "users",
            "loginHistory",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert!(json.get("hash").is_none());
    }

    #[test]
    fn entry_flattens_record_next_to_hash() {
        let r = record(Utc::now());
        let entry = LicenseEntry {
            hash: "abc".to_string(),
            record: r,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["hash"], "abc");
        assert_eq!(json["customerId"], "c1");
    }
}
