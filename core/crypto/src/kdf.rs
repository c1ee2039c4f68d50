//! Key derivation using Argon2id.
//!
//! Argon2id is a memory-hard password hashing function that provides
//! resistance to both GPU and time-memory trade-off attacks.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use crate::keys::{DataKey, Salt, KEY_LENGTH};
use passweb_common::{Error, Result};

/// Largest accepted memory cost in KiB (4 GiB).
pub const MAX_MEMORY_COST: u32 = 4 * 1024 * 1024;

/// Largest accepted number of iterations.
pub const MAX_TIME_COST: u32 = 64;

/// Largest accepted degree of parallelism.
pub const MAX_PARALLELISM: u32 = 64;

/// Parameters for Argon2id key derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Memory cost in KiB (e.g., 65536 = 64 MiB).
    pub memory_cost: u32,
    /// Number of iterations.
    pub time_cost: u32,
    /// Degree of parallelism.
    pub parallelism: u32,
}

impl KdfParams {
    /// Parameters used for new vaults.
    ///
    /// 64 MiB, 3 passes, 2 lanes.
    pub const fn standard() -> Self {
        Self {
            memory_cost: 65536, // 64 MiB
            time_cost: 3,
            parallelism: 2,
        }
    }

    /// Higher security parameters that may take several seconds.
    pub const fn sensitive() -> Self {
        Self {
            memory_cost: 262144, // 256 MiB
            time_cost: 4,
            parallelism: 4,
        }
    }

    /// Cheap parameters for unit tests. Never use for real vaults.
    pub const fn testing() -> Self {
        Self {
            memory_cost: 8192, // 8 MiB
            time_cost: 1,
            parallelism: 1,
        }
    }

    /// Check that the parameters are within bounds and accepted by Argon2.
    ///
    /// Parameters may come from files on disk; values past the bounds are
    /// rejected before any memory is allocated.
    pub fn validate(&self) -> Result<()> {
        self.to_argon2(KEY_LENGTH).map(|_| ())
    }

    pub(crate) fn to_argon2(&self, output_len: usize) -> Result<Params> {
        if self.memory_cost > MAX_MEMORY_COST
            || self.time_cost > MAX_TIME_COST
            || self.parallelism > MAX_PARALLELISM
        {
            return Err(Error::Crypto(format!(
                "KDF parameters out of range: m={}, t={}, p={}",
                self.memory_cost, self.time_cost, self.parallelism
            )));
        }

        Params::new(
            self.memory_cost,
            self.time_cost,
            self.parallelism,
            Some(output_len),
        )
        .map_err(|e| Error::Crypto(format!("Invalid KDF parameters: {}", e)))
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::standard()
    }
}

/// Run Argon2id over `password` and `salt`, filling `output`.
///
/// The output length is taken from `output`.
pub(crate) fn argon2id_into(
    password: &[u8],
    salt: &[u8],
    params: &KdfParams,
    output: &mut [u8],
) -> Result<()> {
    let argon2 = Argon2::new(
        Algorithm::Argon2id,
        Version::V0x13,
        params.to_argon2(output.len())?,
    );

    argon2
        .hash_password_into(password, salt, output)
        .map_err(|e| Error::Crypto(format!("Key derivation failed: {}", e)))
}

/// Derive the data encryption key from the master password and the vault's
/// data salt.
///
/// # Preconditions
/// - `password` must not be empty
/// - `salt` must be the vault's data salt, not the password-hash salt
///
/// # Postconditions
/// - The derived key is deterministic given the same inputs
///
/// # Errors
/// - Returns error if password is empty
/// - Returns error if Argon2id parameters or salt are invalid
pub fn derive_data_key(password: &[u8], salt: &Salt, params: &KdfParams) -> Result<DataKey> {
    if password.is_empty() {
        return Err(Error::InvalidInput("Password cannot be empty".to_string()));
    }

    let mut key_bytes = [0u8; KEY_LENGTH];
    argon2id_into(password, salt.as_bytes(), params, &mut key_bytes)?;

    Ok(DataKey::from_bytes(key_bytes))
}
