// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Relay transport contract
//!
//! A transport is a duplex, topic-addressed pub/sub channel to the bridge.
//! Failures never cross this boundary as errors: socket problems surface as
//! a `Disconnected` status and malformed frames are logged and dropped.

pub mod mock;
pub mod websocket;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use mock::{MockTransport, MockTransportBuilder};
pub use websocket::{WebSocketTransport, WebSocketTransportBuilder};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    Connected,
    Disconnected,
}

/// Relay frame kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// Subscribe the sender to a topic
    Sub,
    /// Publish a payload to a topic
    Pub,
    /// Any relay control frame this crate does not use (acks etc.)
    #[serde(other)]
    Other,
}

/// Relay envelope, `{"topic", "type", "payload", "silent"}` on the wire
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayMessage {
    pub topic: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub silent: bool,
}

impl RelayMessage {
    pub fn subscribe(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            kind: MessageKind::Sub,
            payload: String::new(),
            silent: true,
        }
    }

    pub fn publish(topic: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            kind: MessageKind::Pub,
            payload: payload.into(),
            silent: false,
        }
    }

    pub fn is_publish(&self) -> bool {
        self.kind == MessageKind::Pub
    }
}

pub type StatusHandler = Arc<dyn Fn(TransportStatus) + Send + Sync>;
pub type MessageHandler = Arc<dyn Fn(RelayMessage) + Send + Sync>;

pub trait Transport: Send + Sync {
    /// Establish the socket if none exists.
    ///
    /// Returns `true` only when this call started a new connection.
    fn connect(&self) -> bool;

    /// Queue a message; buffered until connected.
    fn send(&self, message: RelayMessage);

    fn status(&self) -> TransportStatus;

    /// Tear down the socket. Idempotent.
    fn close(&self);
}

/// Creates transports bound to a relay URL and the owner's handlers
pub trait TransportBuilder: Send + Sync {
    fn build(
        &self,
        url: &str,
        on_status: StatusHandler,
        on_message: MessageHandler,
    ) -> Arc<dyn Transport>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Invalid relay URL: {0}")]
    InvalidUrl(String),

    #[error("Connection to {url} timed out after {secs}s")]
    ConnectTimeout { url: String, secs: u64 },

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to encode relay frame: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),
}
