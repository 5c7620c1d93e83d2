// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory transport for tests and offline tooling
//!
//! Records everything handed to `send()` and lets the caller inject inbound
//! frames or connection drops. Handlers run synchronously on the caller's
//! thread, never while the internal lock is held.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{
    MessageHandler, RelayMessage, StatusHandler, Transport, TransportBuilder, TransportStatus,
};

#[derive(Default)]
struct MockState {
    connected: bool,
    sent: Vec<RelayMessage>,
    buffered: VecDeque<RelayMessage>,
    connects: usize,
    closes: usize,
}

pub struct MockTransport {
    url: String,
    on_status: StatusHandler,
    on_message: MessageHandler,
    state: Mutex<MockState>,
}

impl MockTransport {
    pub fn new(url: impl Into<String>, on_status: StatusHandler, on_message: MessageHandler) -> Self {
        Self {
            url: url.into(),
            on_status,
            on_message,
            state: Mutex::new(MockState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Messages handed to the relay so far, in order
    pub fn sent(&self) -> Vec<RelayMessage> {
        self.lock().sent.clone()
    }

    /// Drain the sent log
    pub fn take_sent(&self) -> Vec<RelayMessage> {
        std::mem::take(&mut self.lock().sent)
    }

    /// Published payloads for `topic`, in order
    pub fn published_to(&self, topic: &str) -> Vec<String> {
        self.lock()
            .sent
            .iter()
            .filter(|m| m.is_publish() && m.topic == topic)
            .map(|m| m.payload.clone())
            .collect()
    }

    /// Number of sockets actually established
    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    /// Inject an inbound frame as if the relay delivered it
    pub fn deliver(&self, message: RelayMessage) {
        (self.on_message)(message);
    }

    /// Simulate the socket dropping underneath its owner
    pub fn drop_connection(&self) {
        let was_connected = std::mem::replace(&mut self.lock().connected, false);
        if was_connected {
            (self.on_status)(TransportStatus::Disconnected);
        }
    }
}

impl Transport for MockTransport {
    fn connect(&self) -> bool {
        {
            let mut state = self.lock();
            if state.connected {
                return false;
            }
            state.connected = true;
            state.connects += 1;
            let buffered: Vec<_> = state.buffered.drain(..).collect();
            state.sent.extend(buffered);
        }
        (self.on_status)(TransportStatus::Connected);
        true
    }

    fn send(&self, message: RelayMessage) {
        let mut state = self.lock();
        if state.connected {
            state.sent.push(message);
        } else {
            state.buffered.push_back(message);
        }
    }

    fn status(&self) -> TransportStatus {
        if self.lock().connected {
            TransportStatus::Connected
        } else {
            TransportStatus::Disconnected
        }
    }

    fn close(&self) {
        let was_connected = {
            let mut state = self.lock();
            state.closes += 1;
            std::mem::replace(&mut state.connected, false)
        };
        if was_connected {
            (self.on_status)(TransportStatus::Disconnected);
        }
    }
}

/// Builder that keeps a handle on every transport it creates
#[derive(Default)]
pub struct MockTransportBuilder {
    built: Mutex<Vec<Arc<MockTransport>>>,
}

impl MockTransportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Most recently built transport
    pub fn transport(&self) -> Option<Arc<MockTransport>> {
        self.built
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl TransportBuilder for MockTransportBuilder {
    fn build(
        &self,
        url: &str,
        on_status: StatusHandler,
        on_message: MessageHandler,
    ) -> Arc<dyn Transport> {
        let transport = Arc::new(MockTransport::new(url, on_status, on_message));
        self.built
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transport.clone());
        transport
    }
}
