// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod session;
pub mod transport;

pub use session::SessionConfig;
pub use transport::TransportConfig;

use crate::crypto::CryptoError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid pairing URI: {0}")]
    InvalidUri(String),

    #[error("Pairing URI is missing {0}")]
    MissingField(&'static str),

    #[error("Invalid bridge URL: {0}")]
    InvalidBridge(String),

    #[error("Invalid session key: {0}")]
    InvalidKey(#[from] CryptoError),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}
