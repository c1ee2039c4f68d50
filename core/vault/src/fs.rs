//! Vault directory handle and crash-safe file writes.
//!
//! Every file is first written to a uniquely named temporary file in the same
//! directory (owner-only permissions, fsynced) and only then moved into place,
//! so a crash mid-write never leaves a truncated vault file behind.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use passweb_common::Result;

/// Handle to a vault storage directory.
#[derive(Debug, Clone)]
pub struct VaultDir {
    root: PathBuf,
}

impl VaultDir {
    /// Open a vault directory, creating it with owner-only permissions if it
    /// does not exist.
    ///
    /// # Errors
    /// - Permission denied
    /// - Path exists but is not a directory
    pub async fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(&root).await?;

        Ok(Self { root })
    }

    /// Wrap an existing directory without touching the filesystem.
    pub fn from_path(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Get the directory path.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Path of a file inside the vault directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

/// Read a file, returning `None` if it does not exist.
pub(crate) async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Replace `path` with `data` atomically (temp file, then rename).
pub(crate) async fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let temp = write_temp(path, data).await?;

    if let Err(e) = fs::rename(&temp, path).await {
        discard(&temp).await;
        return Err(e.into());
    }

    debug!(path = %path.display(), bytes = data.len(), "File replaced");
    Ok(())
}

/// Create `path` with `data`, failing with `ErrorKind::AlreadyExists` if the
/// file is already present. An existing file is never modified.
pub(crate) async fn write_new(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp = write_temp(path, data).await?;

    // Linking fails if the target exists, unlike rename which replaces it.
    let linked = fs::hard_link(&temp, path).await;
    discard(&temp).await;
    linked?;

    debug!(path = %path.display(), bytes = data.len(), "File created");
    Ok(())
}

async fn write_temp(path: &Path, data: &[u8]) -> std::io::Result<PathBuf> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| std::io::Error::new(ErrorKind::InvalidInput, "Invalid file name"))?;
    let temp = path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()));

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let result = async {
        let mut file = options.open(&temp).await?;
        file.write_all(data).await?;
        file.sync_all().await
    }
    .await;

    match result {
        Ok(()) => Ok(temp),
        Err(e) => {
            discard(&temp).await;
            Err(e)
        }
    }
}

async fn discard(temp: &Path) {
    if let Err(e) = fs::remove_file(temp).await {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %temp.display(), error = %e, "Failed to remove temporary file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn leftover_temp_files(dir: &Path) -> usize {
        let mut count = 0;
        let mut entries = fs::read_dir(dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            if entry.file_name().to_string_lossy().ends_with(".tmp") {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn test_create_makes_missing_directory() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("nested").join("vault");

        let dir = VaultDir::create(&root).await.unwrap();
        assert!(dir.path().is_dir());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&root).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o700);
        }
    }

    #[tokio::test]
    async fn test_read_optional_missing() {
        let temp = TempDir::new().unwrap();
        let result = read_optional(&temp.path().join("absent")).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_write_atomic_replaces_content() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("data");

        write_atomic(&path, b"first").await.unwrap();
        write_atomic(&path, b"second").await.unwrap();

        assert_eq!(fs::read(&path).await.unwrap(), b"second");
        assert_eq!(leftover_temp_files(temp.path()).await, 0);

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[tokio::test]
    async fn test_write_new_never_overwrites() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("once");

        write_new(&path, b"original").await.unwrap();
        let err = write_new(&path, b"replacement").await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&path).await.unwrap(), b"original");
        assert_eq!(leftover_temp_files(temp.path()).await, 0);
    }

    #[tokio::test]
    async fn test_write_into_missing_directory_fails() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("missing").join("file");

        assert!(write_atomic(&path, b"data").await.is_err());
    }
}
