//! Common utilities and types shared across passweb crates.
//!
//! This module provides the error taxonomy used by every layer of the vault
//! and the small newtypes that carry secrets between them.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{MasterPassword, SessionToken};
