// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod cli;
pub mod config;
pub mod crypto;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-export main types
pub use config::{ConfigError, SessionConfig, TransportConfig};
pub use crypto::{CryptoError, SymmetricKey};
pub use protocol::{
    AeadPayloadCodec, CodecError, MethodCall, PayloadCodec, PeerData, PeerMeta, RpcError,
    SessionParams, TransactionRequest,
};
pub use session::{
    BridgeSession, CallResponse, Delivery, ResponseCallback, SessionCallback, SessionError,
    SessionState,
};
pub use transport::{
    RelayMessage, Transport, TransportBuilder, TransportError, TransportStatus,
    WebSocketTransportBuilder,
};
