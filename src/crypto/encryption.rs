// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! XChaCha20-Poly1305 Encryption/Decryption
//!
//! Implements authenticated encryption using XChaCha20-Poly1305 AEAD
//! (Authenticated Encryption with Additional Data). Bridge payloads are
//! opaque to the relay, so both confidentiality and authenticity come from
//! this layer alone.

use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    XChaCha20Poly1305, XNonce,
};
use rand::{rngs::OsRng, RngCore};

use super::error::CryptoError;

/// Nonce size for XChaCha20-Poly1305
pub const NONCE_SIZE: usize = 24;

/// Key size (256 bits)
pub const KEY_SIZE: usize = 32;

/// Generate a fresh random 24-byte nonce
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

fn cipher_for(key: &[u8]) -> Result<XChaCha20Poly1305, CryptoError> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::InvalidKey {
            key_type: "session_key".to_string(),
            reason: format!("expected {} bytes, got {}", KEY_SIZE, key.len()),
        });
    }

    XChaCha20Poly1305::new_from_slice(key).map_err(|e| CryptoError::InvalidKey {
        key_type: "session_key".to_string(),
        reason: e.to_string(),
    })
}

fn check_nonce(nonce: &[u8]) -> Result<(), CryptoError> {
    if nonce.len() != NONCE_SIZE {
        return Err(CryptoError::InvalidNonce {
            expected_size: NONCE_SIZE,
            actual_size: nonce.len(),
        });
    }
    Ok(())
}

/// Decrypt data using XChaCha20-Poly1305 AEAD
///
/// # Arguments
///
/// * `ciphertext` - Encrypted data (includes authentication tag)
/// * `nonce` - 24-byte nonce (unique per encryption)
/// * `aad` - Additional authenticated data (optional, can be empty)
/// * `key` - 32-byte encryption key
///
/// # Errors
///
/// Returns error if:
/// - Authentication tag verification fails (tampered data or wrong key)
/// - Nonce size is not 24 bytes
/// - Key size is not 32 bytes
pub fn decrypt_with_aead(
    ciphertext: &[u8],
    nonce: &[u8],
    aad: &[u8],
    key: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_nonce(nonce)?;
    let cipher = cipher_for(key)?;

    let payload = Payload {
        msg: ciphertext,
        aad,
    };

    cipher
        .decrypt(XNonce::from_slice(nonce), payload)
        .map_err(|e| CryptoError::DecryptionFailed {
            operation: "bridge_payload".to_string(),
            reason: format!("authentication error: {}", e),
        })
}

/// Encrypt data using XChaCha20-Poly1305 AEAD
///
/// Returns the ciphertext with the 16-byte authentication tag appended.
///
/// # Security
///
/// **CRITICAL**: Never reuse the same nonce with the same key!
/// Use [`generate_nonce`] for every call.
pub fn encrypt_with_aead(
    plaintext: &[u8],
    nonce: &[u8],
    aad: &[u8],
    key: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    check_nonce(nonce)?;
    let cipher = cipher_for(key)?;

    let payload = Payload {
        msg: plaintext,
        aad,
    };

    cipher
        .encrypt(XNonce::from_slice(nonce), payload)
        .map_err(|e| CryptoError::EncryptionFailed {
            reason: e.to_string(),
        })
}
