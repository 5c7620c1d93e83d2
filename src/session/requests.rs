// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Outstanding requests awaiting a peer response

use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

use crate::protocol::RpcError;

/// Response delivered to a pending request callback
#[derive(Debug, Clone, PartialEq)]
pub struct CallResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

impl CallResponse {
    /// `true` only for a literal `true` result
    pub fn is_true(&self) -> bool {
        self.result == Some(Value::Bool(true))
    }
}

pub type ResponseCallback = Box<dyn FnOnce(CallResponse) + Send>;

/// Call-id to callback map; each callback is handed out at most once
#[derive(Default)]
pub struct PendingRequests {
    callbacks: Mutex<HashMap<u64, ResponseCallback>>,
}

impl PendingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<u64, ResponseCallback>> {
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, id: u64, callback: ResponseCallback) {
        if self.lock().insert(id, callback).is_some() {
            warn!("Replaced pending callback for duplicate call id {}", id);
        }
    }

    /// Remove and return the callback for `id`
    pub fn take(&self, id: u64) -> Option<ResponseCallback> {
        self.lock().remove(&id)
    }

    #[cfg(test)]
    fn contains(&self, id: u64) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
