//! Offloading of CPU-bound work.
//!
//! Argon2 derivations take hundreds of milliseconds and tens of MiB by
//! design; they run on the blocking pool so async workers stay free to
//! answer session checks.

use passweb_common::{Error, Result};

/// Run `f` on the blocking thread pool and wait for its result.
pub(crate) async fn run<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("Blocking task failed: {}", e)))?
}
