//! Common error types for passweb.

use thiserror::Error;

/// Top-level error type for vault operations.
///
/// `AuthenticationFailed` covers both a wrong password and a tampered or
/// corrupted ciphertext; the two are indistinguishable to callers.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading or writing a vault file failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// The stored password hash record does not have the expected format.
    #[error("Malformed password hash: {0}")]
    MalformedHash(String),

    /// The stored ciphertext could not be decoded or is truncated.
    #[error("Malformed ciphertext: {0}")]
    MalformedCiphertext(String),

    /// Wrong password, or the ciphertext failed authentication.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// The vault has no metadata record yet.
    #[error("Vault is not initialized")]
    VaultNotInitialized,

    /// The vault already has a metadata record.
    #[error("Vault is already initialized")]
    AlreadyInitialized,

    /// Session token is unknown, expired or revoked.
    #[error("Invalid session")]
    InvalidSession,

    /// Cryptographic setup failed (bad parameters, bad key length).
    #[error("Cryptographic error: {0}")]
    Crypto(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input provided.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A background task failed to complete.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the error indicates damaged vault data rather than bad input.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::MalformedHash(_) | Error::MalformedCiphertext(_))
    }
}

/// Result type alias using the common Error.
pub type Result<T> = std::result::Result<T, Error>;
