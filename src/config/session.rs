// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session configuration and pairing URIs
//!
//! A dApp shows a pairing URI (usually as a QR code) of the form
//!
//! ```text
//! wc:<handshake topic>@<version>?bridge=<url-encoded relay url>&key=<64 hex chars>
//! ```
//!
//! which carries everything the wallet needs to reach it: the relay, the
//! topic the dApp listens on for the handshake, and the initial shared key.

use url::Url;

use super::ConfigError;
use crate::crypto::SymmetricKey;
use crate::protocol::PeerData;

pub const WC_URI_SCHEME: &str = "wc";
pub const DEFAULT_PROTOCOL_VERSION: u32 = 1;

/// Immutable configuration of one bridge session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Topic agreed out-of-band for the handshake
    pub handshake_topic: String,
    /// Relay URL
    pub bridge: String,
    /// Initial symmetric key
    pub key: SymmetricKey,
    /// Protocol version from the pairing URI
    pub version: u32,
    /// Local identity; `client_data.id` is the topic this side subscribes to
    pub client_data: PeerData,
}

impl SessionConfig {
    pub fn new(
        handshake_topic: impl Into<String>,
        bridge: impl Into<String>,
        key: SymmetricKey,
        client_data: PeerData,
    ) -> Self {
        Self {
            handshake_topic: handshake_topic.into(),
            bridge: bridge.into(),
            key,
            version: DEFAULT_PROTOCOL_VERSION,
            client_data,
        }
    }

    /// Parse a `wc:` pairing URI
    pub fn from_wc_uri(uri: &str, client_data: PeerData) -> Result<Self, ConfigError> {
        let parsed = Url::parse(uri.trim()).map_err(|e| ConfigError::InvalidUri(e.to_string()))?;
        if parsed.scheme() != WC_URI_SCHEME {
            return Err(ConfigError::InvalidUri(format!(
                "expected '{}:' scheme, got '{}:'",
                WC_URI_SCHEME,
                parsed.scheme()
            )));
        }

        let (topic, version) = match parsed.path().split_once('@') {
            Some((topic, version)) => (
                topic,
                version
                    .parse::<u32>()
                    .map_err(|_| ConfigError::InvalidUri(format!("bad version '{}'", version)))?,
            ),
            None => (parsed.path(), DEFAULT_PROTOCOL_VERSION),
        };
        if topic.is_empty() {
            return Err(ConfigError::MissingField("handshake topic"));
        }

        let mut bridge = None;
        let mut key = None;
        for (name, value) in parsed.query_pairs() {
            match name.as_ref() {
                "bridge" => bridge = Some(value.into_owned()),
                "key" => key = Some(value.into_owned()),
                _ => {}
            }
        }

        let bridge = bridge.ok_or(ConfigError::MissingField("bridge"))?;
        let bridge_url =
            Url::parse(&bridge).map_err(|e| ConfigError::InvalidBridge(e.to_string()))?;
        if !matches!(bridge_url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(ConfigError::InvalidBridge(format!(
                "unsupported scheme '{}'",
                bridge_url.scheme()
            )));
        }

        let key = key
            .ok_or(ConfigError::MissingField("key"))?
            .parse::<SymmetricKey>()?;

        Ok(Self {
            handshake_topic: topic.to_string(),
            bridge,
            key,
            version,
            client_data,
        })
    }

    /// Render the pairing URI for this session
    pub fn to_wc_uri(&self) -> String {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("bridge", &self.bridge)
            .append_pair("key", &self.key.to_hex())
            .finish();
        format!(
            "{}:{}@{}?{}",
            WC_URI_SCHEME, self.handshake_topic, self.version, query
        )
    }
}
