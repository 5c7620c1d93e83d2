// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! JSON-RPC 2.0 mapping for [`MethodCall`]
//!
//! Requests carry their arguments as a single-element `params` array, as the
//! dApp side of the bridge protocol expects. A message with no `method` but a
//! `result` or `error` member is a response.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::call::{MethodCall, PeerData, PeerMeta, RpcError, SessionParams, TransactionRequest};
use super::codec::CodecError;
use crate::crypto::SymmetricKey;

pub const METHOD_SESSION_REQUEST: &str = "wc_sessionRequest";
pub const METHOD_SESSION_UPDATE: &str = "wc_sessionUpdate";
pub const METHOD_EXCHANGE_KEY: &str = "wc_exchangeKey";
pub const METHOD_SEND_TRANSACTION: &str = "eth_sendTransaction";

const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PeerParams {
    peer_id: String,
    #[serde(default)]
    peer_meta: Option<PeerMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chain_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeKeyParams {
    peer_id: String,
    #[serde(default)]
    peer_meta: Option<PeerMeta>,
    next_key: SymmetricKey,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionParams {
    from: String,
    to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    nonce: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gas_price: Option<String>,
    #[serde(default, alias = "gas", skip_serializing_if = "Option::is_none")]
    gas_limit: Option<String>,
    #[serde(default = "default_value")]
    value: String,
    #[serde(default = "default_data")]
    data: String,
}

fn default_value() -> String {
    "0x0".to_string()
}

fn default_data() -> String {
    "0x".to_string()
}

/// Serialize a call into its JSON-RPC text form
pub fn encode(call: &MethodCall) -> Result<String, CodecError> {
    let value = match call {
        MethodCall::SessionRequest { id, peer } => request(
            *id,
            METHOD_SESSION_REQUEST,
            serde_json::to_value(PeerParams {
                peer_id: peer.id.clone(),
                peer_meta: peer.meta.clone(),
                chain_id: None,
            })?,
        ),
        MethodCall::SessionUpdate { id, params } => {
            request(*id, METHOD_SESSION_UPDATE, serde_json::to_value(params)?)
        }
        MethodCall::ExchangeKey { id, next_key, peer } => request(
            *id,
            METHOD_EXCHANGE_KEY,
            serde_json::to_value(ExchangeKeyParams {
                peer_id: peer.id.clone(),
                peer_meta: peer.meta.clone(),
                next_key: *next_key,
            })?,
        ),
        MethodCall::SendTransaction(tx) => request(
            tx.id,
            METHOD_SEND_TRANSACTION,
            serde_json::to_value(TransactionParams {
                from: tx.from.clone(),
                to: tx.to.clone(),
                nonce: tx.nonce.clone(),
                gas_price: tx.gas_price.clone(),
                gas_limit: tx.gas_limit.clone(),
                value: tx.value.clone(),
                data: tx.data.clone(),
            })?,
        ),
        MethodCall::Response { id, result, error } => match error {
            Some(error) => json!({
                "id": id,
                "jsonrpc": JSONRPC_VERSION,
                "error": error,
            }),
            None => json!({
                "id": id,
                "jsonrpc": JSONRPC_VERSION,
                "result": result.clone().unwrap_or(Value::Null),
            }),
        },
        MethodCall::Unsupported { id, method } => request(*id, method, Value::Null),
    };
    Ok(serde_json::to_string(&value)?)
}

fn request(id: u64, method: &str, params: Value) -> Value {
    let params = if params.is_null() {
        json!([])
    } else {
        json!([params])
    };
    json!({
        "id": id,
        "jsonrpc": JSONRPC_VERSION,
        "method": method,
        "params": params,
    })
}

/// Parse JSON-RPC text into a call
///
/// Messages that are not JSON objects or have no numeric `id` fail with
/// [`CodecError::Malformed`]. Once the id is known, any problem with the
/// method parameters is reported as [`CodecError::InvalidMethod`] so the
/// caller can answer the peer.
pub fn decode(text: &[u8]) -> Result<MethodCall, CodecError> {
    let value: Value = serde_json::from_slice(text)?;
    let object = value
        .as_object()
        .ok_or_else(|| CodecError::Malformed("message is not a JSON object".to_string()))?;
    let id = object
        .get("id")
        .and_then(Value::as_u64)
        .ok_or_else(|| CodecError::Malformed("missing numeric id".to_string()))?;

    let method = match object.get("method") {
        Some(Value::String(method)) => method.as_str(),
        Some(_) => return Err(CodecError::invalid_method(id, "method is not a string")),
        None => {
            if !object.contains_key("result") && !object.contains_key("error") {
                return Err(CodecError::invalid_method(
                    id,
                    "neither method nor result present",
                ));
            }
            let error = match object.get("error") {
                None | Some(Value::Null) => None,
                Some(error) => Some(
                    serde_json::from_value::<RpcError>(error.clone())
                        .map_err(|e| CodecError::invalid_method(id, e.to_string()))?,
                ),
            };
            let result = object.get("result").filter(|r| !r.is_null()).cloned();
            return Ok(MethodCall::Response { id, result, error });
        }
    };

    let first_param = || -> Result<Value, CodecError> {
        object
            .get("params")
            .and_then(Value::as_array)
            .and_then(|params| params.first())
            .cloned()
            .ok_or_else(|| CodecError::invalid_method(id, format!("{}: missing params", method)))
    };
    let invalid = |e: serde_json::Error| CodecError::invalid_method(id, format!("{}: {}", method, e));

    let call = match method {
        METHOD_SESSION_REQUEST => {
            let params: PeerParams = serde_json::from_value(first_param()?).map_err(invalid)?;
            MethodCall::SessionRequest {
                id,
                peer: PeerData::new(params.peer_id, params.peer_meta),
            }
        }
        METHOD_SESSION_UPDATE => {
            let params: SessionParams = serde_json::from_value(first_param()?).map_err(invalid)?;
            MethodCall::SessionUpdate { id, params }
        }
        METHOD_EXCHANGE_KEY => {
            let params: ExchangeKeyParams =
                serde_json::from_value(first_param()?).map_err(invalid)?;
            MethodCall::ExchangeKey {
                id,
                next_key: params.next_key,
                peer: PeerData::new(params.peer_id, params.peer_meta),
            }
        }
        METHOD_SEND_TRANSACTION => {
            let params: TransactionParams =
                serde_json::from_value(first_param()?).map_err(invalid)?;
            MethodCall::SendTransaction(TransactionRequest {
                id,
                from: params.from,
                to: params.to,
                nonce: params.nonce,
                gas_price: params.gas_price,
                gas_limit: params.gas_limit,
                value: params.value,
                data: params.data,
            })
        }
        other => MethodCall::Unsupported {
            id,
            method: other.to_string(),
        },
    };
    Ok(call)
}
