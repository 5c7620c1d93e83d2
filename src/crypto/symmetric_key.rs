// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session symmetric keys
//!
//! A bridge session is protected by a single 256-bit key shared by both
//! peers. The key travels as 64 lowercase hex characters inside pairing URIs
//! and `wc_exchangeKey` calls.

use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use super::encryption::KEY_SIZE;
use super::error::CryptoError;

/// 256-bit symmetric key
///
/// `Debug` deliberately prints a short fingerprint only, so keys can sit in
/// structs that get logged.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    /// Wrap raw key bytes
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Generate a new key from the OS CSPRNG
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Hex encoding used on the wire
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short, non-reversible tag for log lines
    pub fn fingerprint(&self) -> String {
        hex::encode(&self.0[..2])
    }
}

impl FromStr for SymmetricKey {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidKey {
            key_type: "symmetric_key".to_string(),
            reason: format!("hex decode error: {}", e),
        })?;
        let len = bytes.len();
        let bytes: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| CryptoError::InvalidKey {
            key_type: "symmetric_key".to_string(),
            reason: format!("expected {} bytes, got {}", KEY_SIZE, len),
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SymmetricKey({}..)", self.fingerprint())
    }
}

impl Serialize for SymmetricKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SymmetricKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
