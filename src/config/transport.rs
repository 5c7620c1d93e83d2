// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::ConfigError;

/// Relay socket tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub connect_timeout_secs: u64,
    /// Zero disables keep-alive pings
    pub ping_interval_secs: u64,
    /// Outgoing messages kept while the socket is down. The oldest are
    /// dropped once full; zero disables buffering.
    pub max_buffered_messages: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            ping_interval_secs: 30,
            max_buffered_messages: 256,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    transport: Option<TransportConfig>,
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_secs > 0).then(|| Duration::from_secs(self.ping_interval_secs))
    }

    /// Load the `[transport]` table from a TOML file
    ///
    /// Missing table or keys fall back to defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&content)?;
        Ok(file.transport.unwrap_or_default())
    }

    /// Load from environment variables
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Apply `BRIDGE_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("BRIDGE_CONNECT_TIMEOUT_SECS") {
            if let Ok(num) = val.parse() {
                self.connect_timeout_secs = num;
            }
        }

        if let Ok(val) = std::env::var("BRIDGE_PING_INTERVAL_SECS") {
            if let Ok(num) = val.parse() {
                self.ping_interval_secs = num;
            }
        }

        if let Ok(val) = std::env::var("BRIDGE_MAX_BUFFERED_MESSAGES") {
            if let Ok(num) = val.parse() {
                self.max_buffered_messages = num;
            }
        }

        self
    }
}
