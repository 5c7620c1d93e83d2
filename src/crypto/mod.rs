// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Payload Encryption Module
//!
//! Cryptographic primitives used to keep bridge traffic opaque to the relay:
//!
//! - **Encryption**: XChaCha20-Poly1305 AEAD for call payloads
//! - **Symmetric Keys**: 256-bit session keys, generated from the OS CSPRNG
//!   and exchanged as hex strings
//!
//! ## Security Considerations
//!
//! - Session keys are held in memory only, never persisted
//! - A fresh random nonce is drawn for every encryption
//! - Key material never appears in `Debug` output or log lines

pub mod encryption;
pub mod error;
pub mod symmetric_key;

pub use encryption::{decrypt_with_aead, encrypt_with_aead, generate_nonce, KEY_SIZE, NONCE_SIZE};
pub use error::CryptoError;
pub use symmetric_key::SymmetricKey;
