// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Peer session engine
//!
//! Drives one wallet-side session over a relay: handshake, key rotation,
//! request/response correlation, the call queue used while a rotation is in
//! flight, and listener dispatch.

pub mod callbacks;
pub mod engine;
pub mod key_state;
pub mod queue;
pub mod requests;

pub use callbacks::{CallbackRegistry, SessionCallback};
pub use engine::{BridgeSession, PAYLOAD_ERROR_CODE};
pub use key_state::KeyState;
pub use queue::{CallQueue, QueuedCall};
pub use requests::{CallResponse, PendingRequests, ResponseCallback};

use thiserror::Error;

use crate::protocol::CodecError;

/// Lifecycle of a session, derived from the engine's fields
///
/// Key rotation is orthogonal; see [`BridgeSession::is_key_rotating`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Constructed, transport not connected
    Initialized,
    /// Connected and subscribed, no peer yet
    AwaitingHandshake,
    /// Peer asked to pair; waiting for `approve()` or `reject()`
    HandshakeReceived,
    /// Accounts approved
    Active,
    /// Closed locally or by the peer
    Closed,
}

/// What happened to an outgoing call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Encrypted and handed to the transport
    Sent,
    /// Held until the in-flight key rotation resolves
    Queued,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No session request has been received")]
    NoHandshake,

    #[error("Peer topic is not known yet")]
    NoPeer,

    #[error("Session is closed")]
    Closed,

    #[error("Failed to encode call: {0}")]
    Codec(#[from] CodecError),
}
