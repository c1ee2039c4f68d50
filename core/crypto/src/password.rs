//! Master password hashing and verification.
//!
//! Hashes are stored as a single self-describing record:
//!
//! ```text
//! $argon2id$v=19$m=65536,t=3,p=2$<salt>$<hash>
//! ```
//!
//! Salt and hash use the standard base64 alphabet without padding. The
//! record carries its own parameters, so verification keeps working if the
//! defaults for new vaults change.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use std::fmt;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::kdf::{argon2id_into, KdfParams};
use crate::keys::{Salt, KEY_LENGTH, PASSWORD_SALT_LENGTH};
use passweb_common::{Error, Result};

/// Algorithm identifier written into every record.
pub const ALGORITHM_ID: &str = "argon2id";

/// Argon2 version 1.3, as written in the record.
const VERSION: u32 = 0x13;

/// Shortest salt Argon2 accepts.
const MIN_SALT_LENGTH: usize = 8;

/// Parsed form of an encoded password hash record.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHashRecord {
    params: KdfParams,
    salt: Salt,
    hash: Vec<u8>,
}

impl PasswordHashRecord {
    /// Parse an encoded record.
    ///
    /// # Errors
    /// - `MalformedHash` if the field count, identifiers, parameters or
    ///   base64 payloads are not as expected
    pub fn parse(encoded: &str) -> Result<Self> {
        let parts: Vec<&str> = encoded.split('$').collect();
        if parts.len() != 6 || !parts[0].is_empty() {
            return Err(malformed("expected 6 '$'-separated fields"));
        }

        if parts[1] != ALGORITHM_ID {
            return Err(malformed(format!("unsupported algorithm '{}'", parts[1])));
        }

        let version = parts[2]
            .strip_prefix("v=")
            .and_then(|v| v.parse::<u32>().ok())
            .ok_or_else(|| malformed("invalid version field"))?;
        if version != VERSION {
            return Err(malformed(format!("unsupported version {}", version)));
        }

        let params = parse_params(parts[3])?;

        let salt = STANDARD_NO_PAD
            .decode(parts[4])
            .map_err(|e| malformed(format!("invalid salt encoding: {}", e)))?;
        let hash = STANDARD_NO_PAD
            .decode(parts[5])
            .map_err(|e| malformed(format!("invalid hash encoding: {}", e)))?;

        if hash.is_empty() {
            return Err(malformed("empty hash"));
        }
        if salt.len() < MIN_SALT_LENGTH {
            return Err(malformed("salt too short"));
        }

        // Reject out-of-range parameters before spending any work.
        params
            .to_argon2(hash.len())
            .map_err(|e| malformed(e.to_string()))?;

        Ok(Self {
            params,
            salt: Salt::from_bytes(salt),
            hash,
        })
    }

    /// Parameters embedded in the record.
    pub fn params(&self) -> &KdfParams {
        &self.params
    }

    /// Salt embedded in the record.
    pub fn salt(&self) -> &Salt {
        &self.salt
    }

    /// Re-derive from `password` and compare in constant time.
    pub fn matches(&self, password: &[u8]) -> Result<bool> {
        let mut derived = Zeroizing::new(vec![0u8; self.hash.len()]);
        argon2id_into(password, self.salt.as_bytes(), &self.params, &mut derived)?;

        Ok(derived.as_slice().ct_eq(self.hash.as_slice()).into())
    }
}

impl fmt::Display for PasswordHashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${}$v={}$m={},t={},p={}${}${}",
            ALGORITHM_ID,
            VERSION,
            self.params.memory_cost,
            self.params.time_cost,
            self.params.parallelism,
            self.salt.to_base64(),
            STANDARD_NO_PAD.encode(&self.hash),
        )
    }
}

impl fmt::Debug for PasswordHashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordHashRecord")
            .field("params", &self.params)
            .field("salt", &self.salt)
            .finish_non_exhaustive()
    }
}

/// Hash a master password with the standard parameters.
///
/// # Errors
/// - Returns error if password is empty
/// - Returns error if the entropy source fails
pub fn hash_password(password: &[u8]) -> Result<String> {
    hash_password_with(password, &KdfParams::standard())
}

/// Hash a master password with explicit parameters.
///
/// # Postconditions
/// - Returns an encoded record starting with `$argon2id$`
/// - A fresh random salt is used on every call
pub fn hash_password_with(password: &[u8], params: &KdfParams) -> Result<String> {
    if password.is_empty() {
        return Err(Error::InvalidInput("Password cannot be empty".to_string()));
    }

    let salt = Salt::generate(PASSWORD_SALT_LENGTH)?;
    let mut hash = vec![0u8; KEY_LENGTH];
    argon2id_into(password, salt.as_bytes(), params, &mut hash)?;

    let record = PasswordHashRecord {
        params: *params,
        salt,
        hash,
    };
    Ok(record.to_string())
}

/// Verify a password against an encoded record.
///
/// # Returns
/// - `Ok(true)` if password is correct
/// - `Ok(false)` if password is incorrect
///
/// # Errors
/// - `MalformedHash` if the record is damaged; this is never reported as a
///   wrong password
pub fn verify_password(password: &[u8], encoded: &str) -> Result<bool> {
    PasswordHashRecord::parse(encoded)?.matches(password)
}

fn parse_params(field: &str) -> Result<KdfParams> {
    let mut memory_cost = None;
    let mut time_cost = None;
    let mut parallelism = None;

    for pair in field.split(',') {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| malformed("invalid parameter field"))?;
        let value: u32 = value
            .parse()
            .map_err(|_| malformed(format!("invalid value for '{}'", name)))?;

        let slot = match name {
            "m" => &mut memory_cost,
            "t" => &mut time_cost,
            "p" => &mut parallelism,
            other => return Err(malformed(format!("unknown parameter '{}'", other))),
        };
        if slot.replace(value).is_some() {
            return Err(malformed(format!("duplicate parameter '{}'", name)));
        }
    }

    match (memory_cost, time_cost, parallelism) {
        (Some(memory_cost), Some(time_cost), Some(parallelism)) => Ok(KdfParams {
            memory_cost,
            time_cost,
            parallelism,
        }),
        _ => Err(malformed("missing parameter")),
    }
}

fn malformed(reason: impl Into<String>) -> Error {
    Error::MalformedHash(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hash(password: &str) -> String {
        hash_password_with(password.as_bytes(), &KdfParams::testing()).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = fast_hash("my-pass!");

        assert!(hash.starts_with("$argon2id$v=19$m=8192,t=1,p=1$"));
        assert!(verify_password(b"my-pass!", &hash).unwrap());
        assert!(!verify_password(b"fake-pass!", &hash).unwrap());
    }

    #[test]
    fn test_setup_login_scenario_with_standard_params() {
        let hash = hash_password(b"S3cr3t!").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("$m=65536,t=3,p=2$"));
        assert!(verify_password(b"S3cr3t!", &hash).unwrap());
        assert!(!verify_password(b"wrong", &hash).unwrap());
    }

    #[test]
    fn test_fresh_salt_each_time() {
        let hash1 = fast_hash("same");
        let hash2 = fast_hash("same");

        assert_ne!(hash1, hash2);
        assert!(verify_password(b"same", &hash1).unwrap());
        assert!(verify_password(b"same", &hash2).unwrap());
    }

    #[test]
    fn test_record_roundtrip() {
        let hash = fast_hash("roundtrip");
        let record = PasswordHashRecord::parse(&hash).unwrap();

        assert_eq!(record.to_string(), hash);
        assert_eq!(record.params(), &KdfParams::testing());
        assert_eq!(record.salt().len(), PASSWORD_SALT_LENGTH);
    }

    #[test]
    fn test_malformed_hash_is_not_wrong_password() {
        let result = verify_password(b"my-pass!", "fake-hash");
        assert!(matches!(result, Err(Error::MalformedHash(_))));
    }

    #[test]
    fn test_malformed_variants() {
        let good = fast_hash("pw");
        let parts: Vec<&str> = good.split('$').collect();
        let (salt, hash) = (parts[4], parts[5]);

        let cases = [
            String::new(),
            format!("$argon2i$v=19$m=8192,t=1,p=1${salt}${hash}"),
            format!("$argon2id$v=16$m=8192,t=1,p=1${salt}${hash}"),
            format!("$argon2id$v=19$m=8192,t=1${salt}${hash}"),
            format!("$argon2id$v=19$m=8192,t=1,p=1,p=1${salt}${hash}"),
            format!("$argon2id$v=19$m=x,t=1,p=1${salt}${hash}"),
            format!("$argon2id$v=19$m=8192,t=0,p=1${salt}${hash}"),
            format!("$argon2id$v=19$m=4294967295,t=1,p=1${salt}${hash}"),
            format!("$argon2id$v=19$m=8192,t=4294967295,p=1${salt}${hash}"),
            format!("$argon2id$v=19$m=8192,t=1,p=65${salt}${hash}"),
            format!("$argon2id$v=19$m=8192,t=1,p=1$!!!${hash}"),
            format!("$argon2id$v=19$m=8192,t=1,p=1$c2FsdA${hash}"),
            format!("$argon2id$v=19$m=8192,t=1,p=1${salt}$"),
            format!("argon2id$v=19$m=8192,t=1,p=1${salt}${hash}$"),
            format!("{good}$extra"),
        ];

        for case in cases {
            let result = verify_password(b"pw", &case);
            assert!(
                matches!(result, Err(Error::MalformedHash(_))),
                "expected MalformedHash for {case:?}, got {result:?}"
            );
        }
    }

    #[test]
    fn test_empty_password_rejected() {
        let result = hash_password_with(b"", &KdfParams::testing());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_debug_hides_hash() {
        let hash = fast_hash("pw");
        let record = PasswordHashRecord::parse(&hash).unwrap();
        let encoded_hash = hash.rsplit('$').next().unwrap();

        assert!(!format!("{:?}", record).contains(encoded_hash));
    }
}
