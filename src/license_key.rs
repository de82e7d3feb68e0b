//! License key generation and hashing.
//!
//! Keys are opaque display strings of the form `PREFIX-<customerId>-<16 hex>`.
//! They are not signed; the registry only ever identifies a license by the
//! SHA-256 digest of its key.
//!
//! # Example
//!
//! ```rust
//! use vet_license::license_key::{generate_license_key, hash_license_key};
//!
//! let key = generate_license_key("VET", "clinic-42");
//! assert!(key.starts_with("VET-clinic-42-"));
//! assert_eq!(hash_license_key(&key).len(), 64);
//! ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Number of random bytes in the key suffix (rendered as 16 hex chars).
const KEY_SUFFIX_BYTES: usize = 8;

/// Generate the random suffix of a key.
fn generate_suffix() -> String {
    let mut bytes = [0u8; KEY_SUFFIX_BYTES];
    rand::rng().fill(&mut bytes);
    hex::encode_upper(bytes)
}

/// Generate a fresh license key for a customer.
///
/// Every call yields a new random suffix, so two keys for the same customer
/// differ with overwhelming probability.
pub fn generate_license_key(prefix: &str, customer_id: &str) -> String {
    format!("{}-{}-{}", prefix, customer_id, generate_suffix())
}

/// Deterministic digest of a license key, used as the registry identifier.
///
/// Lowercase hex SHA-256, 64 characters.
pub fn hash_license_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check that a key has the `PREFIX-<customer>-<16 hex>` shape.
///
/// The customer segment may itself contain dashes, so only the prefix and
/// the trailing suffix are inspected.
pub fn validate_license_key_format(key: &str, prefix: &str) -> bool {
    let Some(rest) = key
        .strip_prefix(prefix)
        .and_then(|r| r.strip_prefix('-'))
    else {
        return false;
    };

    let Some((customer, suffix)) = rest.rsplit_once('-') else {
        return false;
    };

    !customer.is_empty()
        && suffix.len() == KEY_SUFFIX_BYTES * 2
        && suffix.chars().all(|c| c.is_ascii_hexdigit())
}
