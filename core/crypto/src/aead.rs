//! Authenticated encryption using AES-256-GCM.
//!
//! Output layout is `nonce || ciphertext || tag`. A fresh 96-bit nonce is
//! drawn from the OS for every call, so a key may seal many payloads as long
//! as the nonce space is not exhausted.

use aes_gcm::{
    aead::{generic_array::GenericArray, Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm,
};
use base64::{engine::general_purpose::URL_SAFE, Engine as _};

use crate::keys::KEY_LENGTH;
use passweb_common::{Error, Result};

/// Nonce size for AES-GCM (12 bytes).
pub const NONCE_SIZE: usize = 12;

/// Authentication tag size (16 bytes).
pub const TAG_SIZE: usize = 16;

fn cipher_for(key: &[u8]) -> Result<Aes256Gcm> {
    if key.len() != KEY_LENGTH {
        return Err(Error::Crypto(format!(
            "Invalid key length: expected {}, got {}",
            KEY_LENGTH,
            key.len()
        )));
    }

    Ok(Aes256Gcm::new(GenericArray::from_slice(key)))
}

/// Encrypt plaintext using AES-256-GCM.
///
/// # Preconditions
/// - `key` must be exactly KEY_LENGTH bytes
/// - `plaintext` can be any size, including empty
///
/// # Postconditions
/// - Returns nonce || ciphertext || tag
/// - The nonce is randomly generated
/// - The output length is plaintext length + NONCE_SIZE + TAG_SIZE
///
/// # Errors
/// - Returns error if key length is incorrect
pub fn encrypt(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher_for(key)?;
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypt `nonce || ciphertext || tag` produced by [`encrypt`].
///
/// # Errors
/// - `Crypto` if key length is incorrect
/// - `MalformedCiphertext` if the input is shorter than a nonce
/// - `AuthenticationFailed` if the tag does not verify, whether because of
///   a wrong key or tampered data
pub fn decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let cipher = cipher_for(key)?;

    if data.len() < NONCE_SIZE {
        return Err(Error::MalformedCiphertext(format!(
            "Ciphertext too short: {} bytes",
            data.len()
        )));
    }

    let (nonce_bytes, sealed) = data.split_at(NONCE_SIZE);

    cipher
        .decrypt(GenericArray::from_slice(nonce_bytes), sealed)
        .map_err(|_| Error::AuthenticationFailed)
}

/// Encrypt and encode the result as URL-safe base64.
pub fn encrypt_to_string(key: &[u8], plaintext: &[u8]) -> Result<String> {
    encrypt(key, plaintext).map(|sealed| URL_SAFE.encode(sealed))
}

/// Decode a URL-safe base64 token and decrypt it.
///
/// # Errors
/// - `MalformedCiphertext` if the token is not valid base64 or too short
/// - `AuthenticationFailed` if the tag does not verify
pub fn decrypt_from_string(key: &[u8], token: &str) -> Result<Vec<u8>> {
    let data = URL_SAFE
        .decode(token.trim())
        .map_err(|e| Error::MalformedCiphertext(format!("Invalid base64: {}", e)))?;
    decrypt(key, &data)
}
