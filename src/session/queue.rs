// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Calls held back while a key rotation is in flight

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::requests::ResponseCallback;
use crate::protocol::MethodCall;

pub struct QueuedCall {
    pub topic: String,
    pub call: MethodCall,
    pub callback: Option<ResponseCallback>,
}

impl fmt::Debug for QueuedCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueuedCall")
            .field("topic", &self.topic)
            .field("call", &self.call)
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Thread-safe FIFO of [`QueuedCall`]s
#[derive(Debug, Default)]
pub struct CallQueue {
    calls: Mutex<VecDeque<QueuedCall>>,
}

impl CallQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<QueuedCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push_back(&self, call: QueuedCall) {
        self.lock().push_back(call);
    }

    pub fn pop_front(&self) -> Option<QueuedCall> {
        self.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
