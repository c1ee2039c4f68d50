//! Vault engine for passweb.
//!
//! This module provides:
//! - Vault directory handling with crash-safe writes
//! - The metadata record (master password hash and data salt)
//! - The encrypted entry store
//! - In-memory sessions with expiry and background sweeping
//!
//! # Architecture
//! [`Vault`] is the entry point used by front ends. It verifies the master
//! password against the metadata, issues session tokens, and re-derives the
//! data key from the password on every entry access. No key material is kept
//! between calls.

mod blocking;
pub mod config;
pub mod entries;
pub mod fs;
pub mod manager;
pub mod metadata;
pub mod session;

pub use config::{VaultConfig, ENTRIES_FILENAME, METADATA_FILENAME, SESSION_TTL, SWEEP_INTERVAL};
pub use entries::{Entry, NewEntry};
pub use fs::VaultDir;
pub use manager::{LoginGrant, Vault};
pub use metadata::VaultMetadata;
pub use session::{Clock, ManualClock, SessionManager, SweeperHandle, SystemClock};
