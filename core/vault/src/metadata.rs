//! Vault metadata store.
//!
//! Holds the master password verification record and the salt for the data
//! key. Written exactly once, at setup, and never modified afterwards.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use tracing::info;

use crate::config::METADATA_FILENAME;
use crate::fs::{read_optional, write_new, VaultDir};
use passweb_common::{Error, Result};
use passweb_crypto::{KdfParams, PasswordHashRecord, Salt, DATA_SALT_LENGTH};

/// Persistent vault metadata, one record per vault directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultMetadata {
    /// Encoded Argon2id verification record of the master password.
    pub master_hash: String,
    /// Base64 salt for data-key derivation. Immutable once generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_salt: Option<String>,
    /// Argon2id parameters for the data key. Absent means the standard set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_kdf: Option<KdfParams>,
}

impl VaultMetadata {
    /// Decode the data salt.
    ///
    /// # Errors
    /// - `VaultNotInitialized` if the record predates entry encryption and
    ///   has no data salt
    /// - `Serialization` if the stored salt is not valid base64
    pub fn data_salt(&self) -> Result<Salt> {
        let encoded = self
            .data_salt
            .as_deref()
            .ok_or(Error::VaultNotInitialized)?;

        Salt::from_base64(encoded)
            .map_err(|e| Error::Serialization(format!("Invalid data salt in metadata: {}", e)))
    }

    /// Parameters for deriving the data key.
    ///
    /// # Errors
    /// - `Serialization` if the stored parameters are out of range
    pub fn data_kdf(&self) -> Result<KdfParams> {
        let params = self.data_kdf.unwrap_or_default();
        params
            .validate()
            .map_err(|e| Error::Serialization(format!("Invalid data KDF in metadata: {}", e)))?;
        Ok(params)
    }
}

/// Write the metadata record for a new vault.
///
/// A fresh data salt is generated here. The record is created atomically and
/// an existing record is never overwritten.
///
/// # Errors
/// - `MalformedHash` if `master_hash` is not a valid record
/// - `AlreadyInitialized` if the vault already has metadata
/// - `Storage` on any other I/O failure
pub async fn save(
    dir: &VaultDir,
    master_hash: String,
    data_kdf: KdfParams,
) -> Result<VaultMetadata> {
    PasswordHashRecord::parse(&master_hash)?;

    let metadata = VaultMetadata {
        master_hash,
        data_salt: Some(Salt::generate(DATA_SALT_LENGTH)?.to_base64()),
        data_kdf: Some(data_kdf),
    };

    let json = serde_json::to_vec_pretty(&metadata)
        .map_err(|e| Error::Serialization(e.to_string()))?;

    let path = dir.file(METADATA_FILENAME);
    write_new(&path, &json).await.map_err(|e| match e.kind() {
        ErrorKind::AlreadyExists => Error::AlreadyInitialized,
        _ => Error::Storage(e),
    })?;

    info!(path = %path.display(), "Vault metadata written");
    Ok(metadata)
}

/// Load the metadata record.
///
/// # Returns
/// - `Ok(None)` if the vault has not been set up yet (first run)
/// - `Ok(Some(_))` otherwise
///
/// # Errors
/// - `Storage` on I/O failure other than a missing file
/// - `Serialization` if the file is not valid metadata JSON
pub async fn load(dir: &VaultDir) -> Result<Option<VaultMetadata>> {
    let Some(data) = read_optional(&dir.file(METADATA_FILENAME)).await? else {
        return Ok(None);
    };

    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|e| Error::Serialization(format!("Invalid vault metadata: {}", e)))
}
