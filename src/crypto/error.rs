// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto Error Types
//!
//! Error types for the symmetric primitives used to protect bridge payloads.
//!
//! ## Error Variants
//!
//! - **DecryptionFailed**: AEAD decryption failed (wrong key, corrupted ciphertext, auth tag mismatch)
//! - **EncryptionFailed**: AEAD encryption failed
//! - **InvalidKey**: Key has the wrong size or is not valid hex
//! - **InvalidNonce**: Nonce size validation failed (XChaCha20 requires 24 bytes)
//! - **InvalidPayload**: Encrypted payload validation failed (missing fields, wrong format)
//!
//! All variants carry enough context to tell which operation failed without
//! ever including key material.

use std::fmt;

/// Error type for all symmetric cryptographic operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// AEAD decryption failed
    ///
    /// This error occurs when:
    /// - Authentication tag verification fails (ciphertext tampered or wrong key)
    /// - Ciphertext is corrupted
    /// - AAD doesn't match
    DecryptionFailed {
        /// Which operation was being performed
        operation: String,
        /// Specific failure reason
        reason: String,
    },

    /// AEAD encryption failed
    EncryptionFailed {
        /// Specific failure reason
        reason: String,
    },

    /// Invalid symmetric key
    InvalidKey {
        /// Type of key that failed (e.g., "session_key", "next_key")
        key_type: String,
        /// Specific failure reason
        reason: String,
    },

    /// Invalid nonce size
    ///
    /// XChaCha20-Poly1305 requires exactly 24-byte nonces.
    InvalidNonce {
        /// Expected nonce size (always 24 for XChaCha20)
        expected_size: usize,
        /// Actual nonce size provided
        actual_size: usize,
    },

    /// Encrypted payload validation failed
    InvalidPayload {
        /// Which field failed validation
        field: String,
        /// Specific failure reason
        reason: String,
    },
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::DecryptionFailed { operation, reason } => {
                write!(f, "Decryption failed during {}: {}", operation, reason)
            }
            CryptoError::EncryptionFailed { reason } => {
                write!(f, "Encryption failed: {}", reason)
            }
            CryptoError::InvalidKey { key_type, reason } => {
                write!(f, "Invalid key ({}): {}", key_type, reason)
            }
            CryptoError::InvalidNonce {
                expected_size,
                actual_size,
            } => {
                write!(
                    f,
                    "Invalid nonce size: expected {} bytes, got {} bytes",
                    expected_size, actual_size
                )
            }
            CryptoError::InvalidPayload { field, reason } => {
                write!(f, "Invalid payload field '{}': {}", field, reason)
            }
        }
    }
}

impl std::error::Error for CryptoError {}

// Conversion from hex decode errors
impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidPayload {
            field: "hex_field".to_string(),
            reason: format!("hex decode error: {}", err),
        }
    }
}

// Conversion from chacha20poly1305 errors
impl From<chacha20poly1305::aead::Error> for CryptoError {
    fn from(err: chacha20poly1305::aead::Error) -> Self {
        CryptoError::DecryptionFailed {
            operation: "AEAD".to_string(),
            reason: format!("chacha20poly1305 error: {}", err),
        }
    }
}
