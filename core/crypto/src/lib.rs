//! Cryptographic primitives for passweb.
//!
//! This module provides:
//! - Master password hashing into a self-describing Argon2id record
//! - Data-key derivation using Argon2id over a separate salt
//! - Authenticated encryption using AES-256-GCM
//! - Key types with automatic zeroization
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext or key material is ever logged
//! - Hash comparison is constant-time

pub mod aead;
pub mod kdf;
pub mod keys;
pub mod password;

pub use aead::{decrypt, decrypt_from_string, encrypt, encrypt_to_string};
pub use kdf::{derive_data_key, KdfParams, MAX_MEMORY_COST, MAX_PARALLELISM, MAX_TIME_COST};
pub use keys::{DataKey, Salt, DATA_SALT_LENGTH, KEY_LENGTH};
pub use password::{hash_password, hash_password_with, verify_password, PasswordHashRecord};
