// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Payload codec contract and the AEAD reference codec
//!
//! The session engine never touches ciphertext directly: it hands calls and
//! the current key to a [`PayloadCodec`] and gets back an opaque string for
//! the relay (or the reverse). The encryption algorithm is therefore a
//! replaceable strategy.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::trace;

use super::call::MethodCall;
use super::json_rpc;
use crate::crypto::{decrypt_with_aead, encrypt_with_aead, generate_nonce, CryptoError, SymmetricKey};

#[derive(Debug, Error)]
pub enum CodecError {
    /// The payload decrypted to a call that cannot be honoured.
    /// Carries the call id so the peer can be answered.
    #[error("Invalid method call {id}: {message}")]
    InvalidMethod { id: u64, message: String },

    #[error("Malformed payload: {0}")]
    Malformed(String),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CodecError {
    pub fn invalid_method(id: u64, message: impl Into<String>) -> Self {
        CodecError::InvalidMethod {
            id,
            message: message.into(),
        }
    }
}

/// Converts calls to and from the opaque payloads carried by the relay
pub trait PayloadCodec: Send + Sync {
    /// Decrypt and validate an inbound payload
    fn parse(&self, payload: &str, key: &SymmetricKey) -> Result<MethodCall, CodecError>;

    /// Encrypt an outgoing call
    fn prepare(&self, call: &MethodCall, key: &SymmetricKey) -> Result<String, CodecError>;
}

/// Wire form of an encrypted payload
#[derive(Debug, Serialize, Deserialize)]
pub struct EncryptedPayload {
    /// Hex ciphertext including the authentication tag
    pub data: String,
    /// Hex 24-byte nonce
    pub nonce: String,
}

/// JSON-RPC over XChaCha20-Poly1305
#[derive(Debug, Default, Clone, Copy)]
pub struct AeadPayloadCodec;

impl AeadPayloadCodec {
    pub fn new() -> Self {
        Self
    }
}

impl PayloadCodec for AeadPayloadCodec {
    fn parse(&self, payload: &str, key: &SymmetricKey) -> Result<MethodCall, CodecError> {
        let encrypted: EncryptedPayload = serde_json::from_str(payload)
            .map_err(|e| CodecError::Malformed(format!("encrypted payload: {}", e)))?;
        let ciphertext = hex::decode(&encrypted.data).map_err(CryptoError::from)?;
        let nonce = hex::decode(&encrypted.nonce).map_err(CryptoError::from)?;

        let plaintext = decrypt_with_aead(&ciphertext, &nonce, b"", key.as_bytes())?;
        trace!("Decrypted {} byte payload", plaintext.len());
        json_rpc::decode(&plaintext)
    }

    fn prepare(&self, call: &MethodCall, key: &SymmetricKey) -> Result<String, CodecError> {
        let plaintext = json_rpc::encode(call)?;
        let nonce = generate_nonce();
        let ciphertext = encrypt_with_aead(plaintext.as_bytes(), &nonce, b"", key.as_bytes())?;

        let payload = EncryptedPayload {
            data: hex::encode(ciphertext),
            nonce: hex::encode(nonce),
        };
        Ok(serde_json::to_string(&payload)?)
    }
}
