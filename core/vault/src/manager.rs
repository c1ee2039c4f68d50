//! Vault facade.
//!
//! Ties the metadata store, the entry store and the session manager into the
//! operations a front end needs: setup, login, logout and entry access.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::blocking;
use crate::config::VaultConfig;
use crate::entries::{self, Entry, NewEntry};
use crate::fs::VaultDir;
use crate::metadata::{self, VaultMetadata};
use crate::session::{Clock, SessionManager, SweeperHandle, SystemClock};
use passweb_common::{Error, MasterPassword, Result, SessionToken};
use passweb_crypto::{hash_password_with, verify_password};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    pub token: SessionToken,
    /// Lifetime of the token from the moment it was issued.
    pub expires_in: Duration,
}

/// An opened vault directory with its session state.
pub struct Vault {
    dir: VaultDir,
    config: VaultConfig,
    sessions: Arc<SessionManager>,
    sweeper: Mutex<Option<SweeperHandle>>,
    /// Serializes load-append-save of the entry collection.
    entries_lock: Mutex<()>,
}

impl Vault {
    /// Open the vault at `path` and start the session sweeper.
    ///
    /// The directory is created if missing; the vault itself is not set up.
    ///
    /// # Errors
    /// - `InvalidInput` if the configuration is rejected
    /// - `Storage` if the directory cannot be created
    pub async fn open(path: impl AsRef<Path>, config: VaultConfig) -> Result<Self> {
        Self::open_with_clock(path, config, Arc::new(SystemClock)).await
    }

    /// Open with an explicit session clock.
    pub async fn open_with_clock(
        path: impl AsRef<Path>,
        config: VaultConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;
        let dir = VaultDir::create(path).await?;

        let sessions = Arc::new(SessionManager::new(clock, config.session_ttl));
        let sweeper = sessions.spawn_sweeper(config.sweep_interval);

        info!(path = %dir.path().display(), "Vault opened");
        Ok(Self {
            dir,
            config,
            sessions,
            sweeper: Mutex::new(Some(sweeper)),
            entries_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &VaultDir {
        &self.dir
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    /// Whether the vault has a master password.
    pub async fn is_initialized(&self) -> Result<bool> {
        Ok(metadata::load(&self.dir).await?.is_some())
    }

    /// Set the master password of a new vault.
    ///
    /// # Errors
    /// - `InvalidInput` if the password is empty
    /// - `AlreadyInitialized` if the vault was set up before
    pub async fn setup(&self, password: &MasterPassword) -> Result<()> {
        if password.is_empty() {
            return Err(Error::InvalidInput("Password cannot be empty".to_string()));
        }
        if self.is_initialized().await? {
            return Err(Error::AlreadyInitialized);
        }

        let params = self.config.password_kdf;
        let pw = password.clone();
        let master_hash = blocking::run(move || hash_password_with(pw.as_bytes(), &params)).await?;

        // A concurrent setup that won the race surfaces here as AlreadyInitialized.
        metadata::save(&self.dir, master_hash, self.config.data_kdf).await?;

        info!("Vault set up");
        Ok(())
    }

    /// Verify the master password and open a session.
    ///
    /// # Errors
    /// - `VaultNotInitialized` if setup has not run
    /// - `AuthenticationFailed` if the password is wrong
    /// - `MalformedHash` if the stored record is damaged
    pub async fn login(&self, password: &MasterPassword) -> Result<LoginGrant> {
        self.verify_master(password).await?;

        let token = self.sessions.create_session().await?;
        info!(session = ?token, "Login succeeded");

        Ok(LoginGrant {
            token,
            expires_in: self.sessions.ttl(),
        })
    }

    /// End a session. Unknown tokens are ignored.
    pub async fn logout(&self, token: &SessionToken) {
        self.sessions.delete_session(token).await;
        debug!(session = ?token, "Logged out");
    }

    /// Check that `token` belongs to a live session.
    ///
    /// # Errors
    /// - `InvalidSession` if the token is unknown, revoked or expired
    pub async fn authorize(&self, token: &SessionToken) -> Result<()> {
        if self.sessions.is_valid(token).await {
            Ok(())
        } else {
            Err(Error::InvalidSession)
        }
    }

    /// Decrypt and return all entries.
    ///
    /// The master password is required again on top of the session because
    /// the data key is derived from it and never kept in memory.
    pub async fn list_entries(
        &self,
        token: &SessionToken,
        password: &MasterPassword,
    ) -> Result<Vec<Entry>> {
        self.authorize(token).await?;
        let meta = self.verify_master(password).await?;

        entries::load(&self.dir, password, &meta.data_salt()?, &meta.data_kdf()?).await
    }

    /// Append a new entry and persist the collection.
    ///
    /// # Returns
    /// - The stored entry with its assigned id and creation time
    pub async fn add_entry(
        &self,
        token: &SessionToken,
        password: &MasterPassword,
        fields: NewEntry,
    ) -> Result<Entry> {
        self.authorize(token).await?;
        let meta = self.verify_master(password).await?;
        let salt = meta.data_salt()?;
        let params = meta.data_kdf()?;

        let _guard = self.entries_lock.lock().await;

        let mut all = entries::load(&self.dir, password, &salt, &params).await?;
        let entry = Entry::new(fields);
        all.push(entry.clone());
        entries::save(&self.dir, &all, password, &salt, &params).await?;

        info!(id = %entry.id, count = all.len(), "Entry added");
        Ok(entry)
    }

    /// Stop background tasks. Safe to call more than once.
    pub async fn shutdown(&self) {
        if let Some(sweeper) = self.sweeper.lock().await.take() {
            sweeper.shutdown().await;
            info!("Vault shut down");
        }
    }

    async fn verify_master(&self, password: &MasterPassword) -> Result<VaultMetadata> {
        let meta = metadata::load(&self.dir)
            .await?
            .ok_or(Error::VaultNotInitialized)?;

        if password.is_empty() {
            warn!("Rejected empty master password");
            return Err(Error::AuthenticationFailed);
        }

        let pw = password.clone();
        let encoded = meta.master_hash.clone();
        let matches = blocking::run(move || verify_password(pw.as_bytes(), &encoded)).await?;
        if !matches {
            warn!("Master password verification failed");
            return Err(Error::AuthenticationFailed);
        }

        Ok(meta)
    }
}
