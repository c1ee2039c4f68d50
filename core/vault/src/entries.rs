//! Encrypted entry store.
//!
//! The whole collection is serialized to JSON, sealed with a key derived from
//! the master password and the vault's data salt, and written as a single
//! base64url string. Every save rewrites the file; there are no partial
//! updates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::blocking;
use crate::config::ENTRIES_FILENAME;
use crate::fs::{read_optional, write_atomic, VaultDir};
use passweb_common::{Error, MasterPassword, Result};
use passweb_crypto::{
    decrypt_from_string, derive_data_key, encrypt_to_string, DataKey, KdfParams, Salt,
};

/// A stored credential record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Random identifier, unrelated to content.
    pub id: String,
    pub title: String,
    pub url: String,
    pub username: String,
    pub password: String,
    pub notes: String,
    /// Set at creation and never changed.
    pub created_at: DateTime<Utc>,
}

impl Entry {
    /// Create an entry with a fresh id and the current timestamp.
    pub fn new(fields: NewEntry) -> Self {
        let NewEntry {
            title,
            url,
            username,
            password,
            notes,
        } = fields;

        Self {
            id: Uuid::new_v4().to_string(),
            title,
            url,
            username,
            password,
            notes,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Caller-supplied fields of a new entry.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewEntry {
    pub title: String,
    pub url: String,
    pub username: String,
    pub password: String,
    pub notes: String,
}

impl fmt::Debug for NewEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewEntry")
            .field("title", &self.title)
            .field("url", &self.url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

async fn data_key(password: &MasterPassword, salt: &Salt, params: &KdfParams) -> Result<DataKey> {
    let password = password.clone();
    let salt = salt.clone();
    let params = *params;
    blocking::run(move || derive_data_key(password.as_bytes(), &salt, &params)).await
}

/// Encrypt and persist the full entry collection.
///
/// # Postconditions
/// - The previous file is replaced atomically; a crash leaves either the old
///   or the new collection on disk
///
/// # Errors
/// - `InvalidInput` if password is empty
/// - `Crypto` if the salt or parameters are rejected by Argon2
/// - `Storage` on I/O failure
pub async fn save(
    dir: &VaultDir,
    entries: &[Entry],
    password: &MasterPassword,
    salt: &Salt,
    params: &KdfParams,
) -> Result<()> {
    let plaintext = Zeroizing::new(
        serde_json::to_vec(entries).map_err(|e| Error::Serialization(e.to_string()))?,
    );

    let key = data_key(password, salt, params).await?;
    let sealed = encrypt_to_string(key.as_bytes(), &plaintext)?;

    write_atomic(&dir.file(ENTRIES_FILENAME), sealed.as_bytes()).await?;

    debug!(count = entries.len(), "Entries saved");
    Ok(())
}

/// Load and decrypt the entry collection.
///
/// # Returns
/// - An empty collection if the file is absent or zero-length
///
/// # Errors
/// - `AuthenticationFailed` if the password is wrong or the file was
///   tampered with
/// - `MalformedCiphertext` if the file is not a valid encoded blob
/// - `Serialization` if the decrypted payload is not an entry list
/// - `Storage` on I/O failure
pub async fn load(
    dir: &VaultDir,
    password: &MasterPassword,
    salt: &Salt,
    params: &KdfParams,
) -> Result<Vec<Entry>> {
    let Some(raw) = read_optional(&dir.file(ENTRIES_FILENAME)).await? else {
        return Ok(Vec::new());
    };

    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let token = std::str::from_utf8(&raw)
        .map_err(|_| Error::MalformedCiphertext("Entry store is not valid UTF-8".to_string()))?;

    let key = data_key(password, salt, params).await?;
    let plaintext = Zeroizing::new(decrypt_from_string(key.as_bytes(), token)?);

    let entries: Vec<Entry> = serde_json::from_slice(&plaintext)
        .map_err(|e| Error::Serialization(format!("Invalid entry collection: {}", e)))?;

    debug!(count = entries.len(), "Entries loaded");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use passweb_crypto::DATA_SALT_LENGTH;
    use tempfile::TempDir;

    fn sample_entry() -> Entry {
        Entry::new(NewEntry {
            title: "Test".to_string(),
            url: "https://example.com".to_string(),
            username: "user123".to_string(),
            password: "pass123".to_string(),
            notes: "Test entry".to_string(),
        })
    }

    fn setup() -> (TempDir, VaultDir, MasterPassword, Salt) {
        let temp = TempDir::new().unwrap();
        let dir = VaultDir::from_path(temp.path());
        let salt = Salt::generate(DATA_SALT_LENGTH).unwrap();
        (temp, dir, MasterPassword::new("my-pass"), salt)
    }

    #[tokio::test]
    async fn test_save_load_roundtrip() {
        let (_temp, dir, password, salt) = setup();
        let params = KdfParams::testing();
        let entry = sample_entry();

        save(&dir, &[entry.clone()], &password, &salt, &params)
            .await
            .unwrap();
        let loaded = load(&dir, &password, &salt, &params).await.unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].title, "Test");
        assert_eq!(loaded[0].username, "user123");
        assert_eq!(loaded[0].password, "pass123");
        assert_eq!(loaded[0], entry);
    }

    #[tokio::test]
    async fn test_load_absent_is_empty() {
        let (_temp, dir, password, salt) = setup();

        let loaded = load(&dir, &password, &salt, &KdfParams::testing())
            .await
            .unwrap();

        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_load_zero_length_is_empty() {
        let (_temp, dir, password, salt) = setup();
        tokio::fs::write(dir.file(ENTRIES_FILENAME), b"").await.unwrap();

        let loaded = load(&dir, &password, &salt, &KdfParams::testing())
            .await
            .unwrap();

        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_whitespace_only_file_is_malformed() {
        let (_temp, dir, password, salt) = setup();
        tokio::fs::write(dir.file(ENTRIES_FILENAME), b" \n\t\n").await.unwrap();

        let result = load(&dir, &password, &salt, &KdfParams::testing()).await;

        assert!(matches!(result, Err(Error::MalformedCiphertext(_))));
    }

    #[tokio::test]
    async fn test_trailing_newline_is_tolerated() {
        let (_temp, dir, password, salt) = setup();
        let params = KdfParams::testing();
        save(&dir, &[sample_entry()], &password, &salt, &params)
            .await
            .unwrap();

        let path = dir.file(ENTRIES_FILENAME);
        let mut raw = tokio::fs::read(&path).await.unwrap();
        raw.push(b'\n');
        tokio::fs::write(&path, &raw).await.unwrap();

        let loaded = load(&dir, &password, &salt, &params).await.unwrap();
        assert_eq!(loaded.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_collection_roundtrip() {
        let (_temp, dir, password, salt) = setup();
        let params = KdfParams::testing();

        save(&dir, &[], &password, &salt, &params).await.unwrap();
        let loaded = load(&dir, &password, &salt, &params).await.unwrap();

        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn test_wrong_password_fails_authentication() {
        let (_temp, dir, password, salt) = setup();
        let params = KdfParams::testing();
        save(&dir, &[sample_entry()], &password, &salt, &params)
            .await
            .unwrap();

        let result = load(&dir, &MasterPassword::new("fake-pass"), &salt, &params).await;

        assert!(matches!(result, Err(Error::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_wrong_salt_fails_authentication() {
        let (_temp, dir, password, salt) = setup();
        let params = KdfParams::testing();
        save(&dir, &[sample_entry()], &password, &salt, &params)
            .await
            .unwrap();

        let other_salt = Salt::generate(DATA_SALT_LENGTH).unwrap();
        let result = load(&dir, &password, &other_salt, &params).await;

        assert!(matches!(result, Err(Error::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_file_is_single_base64url_string() {
        let (_temp, dir, password, salt) = setup();
        save(&dir, &[sample_entry()], &password, &salt, &KdfParams::testing())
            .await
            .unwrap();

        let raw = tokio::fs::read_to_string(dir.file(ENTRIES_FILENAME))
            .await
            .unwrap();

        assert!(!raw.contains("user123"));
        assert!(raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '=')));
    }

    #[tokio::test]
    async fn test_corrupted_file_fails_authentication() {
        let (_temp, dir, password, salt) = setup();
        let params = KdfParams::testing();
        save(&dir, &[sample_entry()], &password, &salt, &params)
            .await
            .unwrap();

        let path = dir.file(ENTRIES_FILENAME);
        let mut raw = tokio::fs::read(&path).await.unwrap();
        // Swap one base64 character for another valid one in the middle.
        let middle = raw.len() / 2;
        raw[middle] = if raw[middle] == b'A' { b'B' } else { b'A' };
        tokio::fs::write(&path, &raw).await.unwrap();

        let result = load(&dir, &password, &salt, &params).await;
        assert!(matches!(result, Err(Error::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_garbage_file_is_malformed() {
        let (_temp, dir, password, salt) = setup();
        tokio::fs::write(dir.file(ENTRIES_FILENAME), b"%%%").await.unwrap();

        let result = load(&dir, &password, &salt, &KdfParams::testing()).await;
        assert!(matches!(result, Err(Error::MalformedCiphertext(_))));
    }

    #[tokio::test]
    async fn test_save_replaces_previous_collection() {
        let (_temp, dir, password, salt) = setup();
        let params = KdfParams::testing();

        save(&dir, &[sample_entry()], &password, &salt, &params)
            .await
            .unwrap();
        save(&dir, &[sample_entry(), sample_entry()], &password, &salt, &params)
            .await
            .unwrap();

        let loaded = load(&dir, &password, &salt, &params).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_ne!(loaded[0].id, loaded[1].id);
    }

    #[test]
    fn test_debug_redacts_password() {
        let entry = sample_entry();
        let debug = format!("{:?}", entry);

        assert!(debug.contains("user123"));
        assert!(!debug.contains("pass123"));
    }

    #[test]
    fn test_new_entry_defaults_missing_fields() {
        let fields: NewEntry = serde_json::from_str(r#"{"title":"Only title"}"#).unwrap();
        let entry = Entry::new(fields);

        assert_eq!(entry.title, "Only title");
        assert!(entry.url.is_empty());
        assert!(Uuid::parse_str(&entry.id).is_ok());
    }
}
