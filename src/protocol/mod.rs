// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod call;
pub mod codec;
pub mod json_rpc;

pub use call::{MethodCall, PeerData, PeerMeta, RpcError, SessionParams, TransactionRequest};
pub use codec::{AeadPayloadCodec, CodecError, EncryptedPayload, PayloadCodec};
