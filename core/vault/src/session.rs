//! Session management.
//!
//! A session token stands in for "the master password was verified" for a
//! fixed window. Tokens live only in memory: they are never persisted and
//! do not survive a restart.
//!
//! Each token is either active, or terminal (expired or revoked). Terminal
//! states are indistinguishable to [`SessionManager::is_valid`], and an
//! expired token is never revived, even if the sweeper has not removed it
//! yet.

use rand::{rngs::OsRng, RngCore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SESSION_TTL;
use passweb_common::{Error, Result, SessionToken};

/// Random bytes per token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Source of the current time for expiry decisions.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

/// Monotonic system clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let offset = *self.offset.lock().unwrap_or_else(|e| e.into_inner());
        self.origin + offset
    }
}

/// In-memory map of session tokens to absolute expiry times.
///
/// Validity checks take a shared lock; creation, deletion and sweeping take
/// the exclusive lock. No I/O happens while the lock is held.
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionToken, Instant>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a manager with an explicit clock and TTL.
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            ttl,
        }
    }

    /// System clock and the standard 10 minute TTL.
    pub fn with_defaults() -> Self {
        Self::new(Arc::new(SystemClock), SESSION_TTL)
    }

    /// Lifetime of newly created sessions.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new session token valid for the configured TTL.
    ///
    /// # Postconditions
    /// - The returned token was not mapped to any session before this call
    ///
    /// # Errors
    /// - `Crypto` if the entropy source fails
    pub async fn create_session(&self) -> Result<SessionToken> {
        loop {
            let token = generate_token()?;

            let mut sessions = self.sessions.write().await;
            if sessions.contains_key(&token) {
                warn!("Session token collision, regenerating");
                continue;
            }

            let expires_at = self.clock.now() + self.ttl;
            sessions.insert(token.clone(), expires_at);
            debug!(session = ?token, active = sessions.len(), "Session created");
            return Ok(token);
        }
    }

    /// Whether `token` is present and not yet expired. Never mutates state.
    pub async fn is_valid(&self, token: &SessionToken) -> bool {
        let sessions = self.sessions.read().await;
        match sessions.get(token) {
            Some(expires_at) => self.clock.now() < *expires_at,
            None => false,
        }
    }

    /// Revoke `token`. Removing an unknown token is a no-op.
    pub async fn delete_session(&self, token: &SessionToken) {
        let removed = self.sessions.write().await.remove(token).is_some();
        if removed {
            debug!(session = ?token, "Session revoked");
        }
    }

    /// Remove every expired session, returning how many were dropped.
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, expires_at| now < *expires_at);
        before - sessions.len()
    }

    /// Number of tokens currently held, expired or not.
    pub async fn active_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Start the periodic sweep of expired sessions.
    ///
    /// The task holds only a weak reference and ends by itself once the
    /// manager is dropped; call [`SweeperHandle::shutdown`] to stop it
    /// deterministically.
    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> SweeperHandle {
        let cancel = CancellationToken::new();
        let task = tokio::spawn(sweep_loop(Arc::downgrade(self), every, cancel.clone()));

        info!(interval_ms = every.as_millis() as u64, "Session sweeper started");
        SweeperHandle {
            cancel,
            task: Some(task),
        }
    }
}

async fn sweep_loop(manager: Weak<SessionManager>, every: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                let removed = manager.sweep_expired().await;
                if removed > 0 {
                    debug!(removed, "Expired sessions swept");
                }
            }
        }
    }

    debug!("Session sweeper stopped");
}

/// Handle to the background sweep task.
///
/// Dropping the handle cancels the task without waiting for it.
#[derive(Debug)]
pub struct SweeperHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait until the task has exited.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Session sweeper task failed");
            }
        }
    }

    /// Whether the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn generate_token() -> Result<SessionToken> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Crypto(format!("Entropy source failed: {}", e)))?;
    Ok(SessionToken::new(hex::encode(bytes)))
}
