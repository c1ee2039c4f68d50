//! Vault configuration and on-disk layout.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use passweb_common::{Error, Result};
use passweb_crypto::KdfParams;

/// Metadata file name in the vault directory.
pub const METADATA_FILENAME: &str = "meta.json";

/// Encrypted entry collection file name in the vault directory.
pub const ENTRIES_FILENAME: &str = "entries.json";

/// Lifetime of a session token.
pub const SESSION_TTL: Duration = Duration::from_secs(10 * 60);

/// How often expired sessions are swept from memory.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Upper bound accepted for `session_ttl`.
const MAX_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Runtime configuration for a vault.
///
/// Only affects newly created records: existing password hashes carry their
/// own parameters and existing vaults record their data-key parameters in
/// the metadata file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Argon2id parameters for new master password hashes.
    pub password_kdf: KdfParams,
    /// Argon2id parameters for the data key of new vaults.
    pub data_kdf: KdfParams,
    /// Absolute lifetime of a session token.
    pub session_ttl: Duration,
    /// Interval of the background sweep of expired sessions.
    pub sweep_interval: Duration,
}

impl VaultConfig {
    /// Cheap parameters and short timings for tests.
    pub fn testing() -> Self {
        Self {
            password_kdf: KdfParams::testing(),
            data_kdf: KdfParams::testing(),
            session_ttl: SESSION_TTL,
            sweep_interval: Duration::from_millis(50),
        }
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    /// - KDF parameters rejected by Argon2
    /// - Zero or excessive session TTL
    /// - Zero sweep interval
    pub fn validate(&self) -> Result<()> {
        self.password_kdf.validate()?;
        self.data_kdf.validate()?;

        if self.session_ttl.is_zero() || self.session_ttl > MAX_SESSION_TTL {
            return Err(Error::InvalidInput(format!(
                "Session TTL must be between 1s and {}s",
                MAX_SESSION_TTL.as_secs()
            )));
        }
        if self.sweep_interval.is_zero() {
            return Err(Error::InvalidInput(
                "Sweep interval must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            password_kdf: KdfParams::standard(),
            data_kdf: KdfParams::standard(),
            session_ttl: SESSION_TTL,
            sweep_interval: SWEEP_INTERVAL,
        }
    }
}
