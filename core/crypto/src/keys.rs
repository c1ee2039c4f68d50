//! Key and salt types with secure memory handling.
//!
//! Key material zeroizes itself on drop so derived keys do not outlive the
//! single operation that needed them.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use passweb_common::{Error, Result};

/// Length of encryption keys in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of the salt embedded in password hash records.
pub const PASSWORD_SALT_LENGTH: usize = 16;

/// Length of the salt used to derive the data encryption key.
pub const DATA_SALT_LENGTH: usize = 32;

/// Key used to seal the entry collection.
///
/// Re-derived from the master password on every load and save; never cached.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DataKey {
    key: [u8; KEY_LENGTH],
}

impl DataKey {
    /// Create a data key from raw bytes.
    pub fn from_bytes(key: [u8; KEY_LENGTH]) -> Self {
        Self { key }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn as_bytes(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataKey([REDACTED])")
    }
}

/// Random salt for Argon2id.
#[derive(Clone, PartialEq, Eq)]
pub struct Salt(Vec<u8>);

impl Salt {
    /// Generate a random salt of `len` bytes from the OS entropy source.
    ///
    /// # Errors
    /// - Returns error if the entropy source is unavailable
    pub fn generate(len: usize) -> Result<Self> {
        let mut salt = vec![0u8; len];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|e| Error::Crypto(format!("Entropy source failed: {}", e)))?;
        Ok(Self(salt))
    }

    /// Create from bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Decode a salt stored as unpadded standard base64.
    ///
    /// Padded input is accepted as well.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let trimmed = encoded.trim_end_matches('=');
        STANDARD_NO_PAD
            .decode(trimmed)
            .map(Self)
            .map_err(|e| Error::InvalidInput(format!("Invalid salt encoding: {}", e)))
    }

    /// Encode as unpadded standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD_NO_PAD.encode(&self.0)
    }

    /// Get the salt bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Salt length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", self.to_base64())
    }
}
