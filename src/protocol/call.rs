// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decrypted call envelopes exchanged between the wallet and a dApp.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::crypto::SymmetricKey;

/// Human-readable description of a peer (dApp or wallet)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icons: Option<Vec<String>>,
}

impl PeerMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Identity of one side of a session: its relay topic plus metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerData {
    /// Topic the peer subscribes to on the relay
    pub id: String,
    pub meta: Option<PeerMeta>,
}

impl PeerData {
    pub fn new(id: impl Into<String>, meta: Option<PeerMeta>) -> Self {
        Self {
            id: id.into(),
            meta,
        }
    }

    /// Fresh client identity with a random UUIDv4 topic
    pub fn random(meta: Option<PeerMeta>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), meta)
    }
}

/// Parameters of a session approval, rejection or update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionParams {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accounts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SessionParams {
    pub fn approved(chain_id: u64, accounts: Vec<String>) -> Self {
        Self {
            approved: true,
            chain_id: Some(chain_id),
            accounts: Some(accounts),
            message: None,
        }
    }

    pub fn rejected() -> Self {
        Self {
            approved: false,
            chain_id: None,
            accounts: None,
            message: None,
        }
    }

    /// Map form carried inside a `Response` result
    pub fn into_value(self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Error object of a JSON-RPC response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// `eth_sendTransaction` request from a dApp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub id: u64,
    pub from: String,
    pub to: String,
    pub nonce: Option<String>,
    pub gas_price: Option<String>,
    pub gas_limit: Option<String>,
    pub value: String,
    pub data: String,
}

/// Closed set of calls understood by the session engine
///
/// `Unsupported` carries any well-formed JSON-RPC request whose method is
/// outside this set; the engine logs and drops it.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodCall {
    SessionRequest {
        id: u64,
        peer: PeerData,
    },
    SessionUpdate {
        id: u64,
        params: SessionParams,
    },
    ExchangeKey {
        id: u64,
        next_key: SymmetricKey,
        peer: PeerData,
    },
    SendTransaction(TransactionRequest),
    Response {
        id: u64,
        result: Option<Value>,
        error: Option<RpcError>,
    },
    Unsupported {
        id: u64,
        method: String,
    },
}

impl MethodCall {
    pub fn id(&self) -> u64 {
        match self {
            MethodCall::SessionRequest { id, .. }
            | MethodCall::SessionUpdate { id, .. }
            | MethodCall::ExchangeKey { id, .. }
            | MethodCall::Response { id, .. }
            | MethodCall::Unsupported { id, .. } => *id,
            MethodCall::SendTransaction(tx) => tx.id,
        }
    }

    /// Successful response carrying `result`
    pub fn response(id: u64, result: Value) -> Self {
        MethodCall::Response {
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response
    pub fn error_response(id: u64, code: i64, message: impl Into<String>) -> Self {
        MethodCall::Response {
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Short name for log lines
    pub fn kind(&self) -> &str {
        match self {
            MethodCall::SessionRequest { .. } => "session_request",
            MethodCall::SessionUpdate { .. } => "session_update",
            MethodCall::ExchangeKey { .. } => "exchange_key",
            MethodCall::SendTransaction(_) => "send_transaction",
            MethodCall::Response { .. } => "response",
            MethodCall::Unsupported { method, .. } => method,
        }
    }
}
