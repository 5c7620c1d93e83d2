// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Session engine
//!
//! The engine has no scheduler of its own. It is driven by transport handlers
//! (running on the transport's I/O task) and by application calls, which may
//! arrive concurrently. The key lock is taken before the queue and request
//! locks. No engine lock is held while a listener runs or while the
//! transport connects or closes, since those call back into the session.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, error, info, warn};

use super::callbacks::{CallbackRegistry, SessionCallback};
use super::key_state::KeyState;
use super::queue::{CallQueue, QueuedCall};
use super::requests::{CallResponse, PendingRequests, ResponseCallback};
use super::{Delivery, SessionError, SessionState};
use crate::config::SessionConfig;
use crate::crypto::SymmetricKey;
use crate::protocol::{CodecError, MethodCall, PayloadCodec, PeerMeta, SessionParams};
use crate::transport::{
    MessageHandler, RelayMessage, StatusHandler, Transport, TransportBuilder, TransportStatus,
};

/// Error code sent back for payloads that decrypt but cannot be honoured
pub const PAYLOAD_ERROR_CODE: i64 = 42;

#[derive(Debug, Default)]
struct PeerState {
    handshake_id: Option<u64>,
    peer_id: Option<String>,
    peer_meta: Option<PeerMeta>,
    approved_accounts: Option<Vec<String>>,
}

/// Wallet side of one relay session
pub struct BridgeSession {
    config: SessionConfig,
    codec: Arc<dyn PayloadCodec>,
    transport: Arc<dyn Transport>,
    keys: Mutex<KeyState>,
    peer: Mutex<PeerState>,
    requests: PendingRequests,
    queue: CallQueue,
    callbacks: CallbackRegistry,
    last_call_id: AtomicU64,
    closed: AtomicBool,
    this: Weak<BridgeSession>,
}

impl BridgeSession {
    /// Create a session and its transport.
    ///
    /// The transport handlers only hold a weak reference back to the
    /// session, so dropping the last `Arc` tears everything down.
    pub fn new(
        config: SessionConfig,
        codec: Arc<dyn PayloadCodec>,
        transport_builder: &dyn TransportBuilder,
    ) -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<Self>| {
            let on_status: StatusHandler = {
                let this = this.clone();
                Arc::new(move |status| {
                    if let Some(session) = this.upgrade() {
                        session.handle_status(status);
                    }
                })
            };
            let on_message: MessageHandler = {
                let this = this.clone();
                Arc::new(move |message| {
                    if let Some(session) = this.upgrade() {
                        session.handle_message(message);
                    }
                })
            };
            let transport = transport_builder.build(&config.bridge, on_status, on_message);

            Self {
                keys: Mutex::new(KeyState::new(config.key)),
                config,
                codec,
                transport,
                peer: Mutex::new(PeerState::default()),
                requests: PendingRequests::new(),
                queue: CallQueue::new(),
                callbacks: CallbackRegistry::new(),
                last_call_id: AtomicU64::new(0),
                closed: AtomicBool::new(false),
                this: this.clone(),
            }
        })
    }

    fn lock_keys(&self) -> MutexGuard<'_, KeyState> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_peer(&self) -> MutexGuard<'_, PeerState> {
        self.peer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.is_closed() {
            Err(SessionError::Closed)
        } else {
            Ok(())
        }
    }

    /// Connect and subscribe to the handshake topic.
    ///
    /// Returns `true` when this call established the connection; a second
    /// call while connected does nothing. Call again after a disconnect to
    /// reconnect.
    pub fn init(&self) -> bool {
        if self.is_closed() {
            warn!("init() on closed session {}", self.config.handshake_topic);
            return false;
        }
        if !self.transport.connect() {
            debug!("Transport to {} already connected", self.config.bridge);
            return false;
        }

        info!(
            "🔗 Bridge session connecting to {} (handshake topic {})",
            self.config.bridge, self.config.handshake_topic
        );
        self.transport
            .send(RelayMessage::subscribe(self.config.handshake_topic.clone()));
        true
    }

    /// Approve the pending session request
    pub fn approve(&self, accounts: Vec<String>, chain_id: u64) -> Result<Delivery, SessionError> {
        self.ensure_open()?;
        let handshake_id = self.handshake_id().ok_or(SessionError::NoHandshake)?;
        info!(
            "✅ Approving session {} with {} account(s) on chain {}",
            handshake_id,
            accounts.len(),
            chain_id
        );
        self.lock_peer().approved_accounts = Some(accounts.clone());

        let params = SessionParams::approved(chain_id, accounts);
        self.send(MethodCall::response(handshake_id, params.into_value()), None)
    }

    /// Push new accounts or chain to an established peer
    pub fn update(&self, accounts: Vec<String>, chain_id: u64) -> Result<Delivery, SessionError> {
        self.ensure_open()?;
        if self.peer_id().is_none() {
            return Err(SessionError::NoPeer);
        }
        info!(
            "Updating session: {} account(s) on chain {}",
            accounts.len(),
            chain_id
        );
        self.lock_peer().approved_accounts = Some(accounts.clone());

        let call = MethodCall::SessionUpdate {
            id: self.new_call_id(),
            params: SessionParams::approved(chain_id, accounts),
        };
        self.send(call, None)
    }

    /// Decline the pending session request. Local state is left untouched.
    pub fn reject(&self) -> Result<Delivery, SessionError> {
        self.ensure_open()?;
        let handshake_id = self.handshake_id().ok_or(SessionError::NoHandshake)?;
        info!("❌ Rejecting session request {}", handshake_id);
        self.send(
            MethodCall::response(handshake_id, SessionParams::rejected().into_value()),
            None,
        )
    }

    /// Answer a peer request successfully
    pub fn approve_request(&self, id: u64, result: Value) -> Result<Delivery, SessionError> {
        self.ensure_open()?;
        self.send(MethodCall::response(id, result), None)
    }

    /// Answer a peer request with an error
    pub fn reject_request(
        &self,
        id: u64,
        code: i64,
        message: &str,
    ) -> Result<Delivery, SessionError> {
        self.ensure_open()?;
        self.send(MethodCall::error_response(id, code, message), None)
    }

    /// Close the transport and forget the approved accounts. The peer is not
    /// notified and pending callbacks are left as they are.
    pub fn close(&self) {
        if self.internal_close() {
            info!("Closed bridge session {}", self.config.handshake_topic);
        }
    }

    fn internal_close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.lock_peer().approved_accounts = None;
        self.transport.close();
        true
    }

    /// Register a listener. The session only keeps a weak reference.
    pub fn add_callback<C: SessionCallback + 'static>(&self, callback: &Arc<C>) {
        let weak: Weak<C> = Arc::downgrade(callback);
        self.callbacks.add(weak);
    }

    pub fn remove_callback<C: SessionCallback + 'static>(&self, callback: &Arc<C>) {
        let weak: Weak<C> = Arc::downgrade(callback);
        let weak: Weak<dyn SessionCallback> = weak;
        self.callbacks.remove(&weak);
    }

    /// Send `call` to the peer topic, registering `callback` for its
    /// response. Held in the queue while a key rotation is in flight.
    pub fn send(
        &self,
        call: MethodCall,
        callback: Option<ResponseCallback>,
    ) -> Result<Delivery, SessionError> {
        self.send_to(call, None, false, callback)
    }

    fn send_to(
        &self,
        call: MethodCall,
        topic: Option<String>,
        force: bool,
        callback: Option<ResponseCallback>,
    ) -> Result<Delivery, SessionError> {
        let Some(topic) = topic.or_else(|| self.peer_id()) else {
            debug!("No peer topic yet, not sending {} ({})", call.kind(), call.id());
            return Err(SessionError::NoPeer);
        };
        self.dispatch(
            QueuedCall {
                topic,
                call,
                callback,
            },
            force,
        )
    }

    fn dispatch(&self, queued: QueuedCall, force: bool) -> Result<Delivery, SessionError> {
        let keys = self.lock_keys();
        if !force && (keys.is_rotating() || !self.queue.is_empty()) {
            debug!(
                "Key rotation in flight, queueing {} ({})",
                queued.call.kind(),
                queued.call.id()
            );
            self.queue.push_back(queued);
            return Ok(Delivery::Queued);
        }
        self.publish(&keys, queued)?;
        Ok(Delivery::Sent)
    }

    /// Encrypt with the current key and hand to the transport.
    /// Runs under the key lock so publish order matches key order.
    fn publish(&self, keys: &KeyState, queued: QueuedCall) -> Result<(), CodecError> {
        let payload = self.codec.prepare(&queued.call, keys.current())?;
        let QueuedCall {
            topic,
            call,
            callback,
        } = queued;
        if let Some(callback) = callback {
            self.requests.insert(call.id(), callback);
        }
        debug!("Sending {} ({}) to {}", call.kind(), call.id(), topic);
        self.transport.send(RelayMessage::publish(topic, payload));
        Ok(())
    }

    fn handle_status(&self, status: TransportStatus) {
        info!(
            "Bridge transport for {} is {:?}",
            self.config.handshake_topic, status
        );
        if status == TransportStatus::Connected {
            self.transport
                .send(RelayMessage::subscribe(self.config.client_data.id.clone()));
        }
        self.callbacks
            .notify("on_status", |listener| listener.on_status(status));
    }

    fn handle_message(&self, message: RelayMessage) {
        if !message.is_publish() {
            debug!("Ignoring non-publish frame on {}", message.topic);
            return;
        }
        if self.is_closed() {
            debug!("Session closed, dropping frame on {}", message.topic);
            return;
        }

        let parsed = {
            let keys = self.lock_keys();
            self.codec.parse(&message.payload, keys.current())
        };
        let call = match parsed {
            Ok(call) => call,
            Err(e) => {
                self.handle_payload_error(e);
                return;
            }
        };
        debug!("Received {} ({}) on {}", call.kind(), call.id(), message.topic);

        match call {
            MethodCall::SessionRequest { id, peer } => {
                info!("📨 Session request {} from peer {}", id, peer.id);
                {
                    let mut state = self.lock_peer();
                    state.handshake_id = Some(id);
                    state.peer_id = Some(peer.id.clone());
                    state.peer_meta = peer.meta.clone();
                }
                self.exchange_key();
                self.callbacks
                    .notify("session_request", |listener| listener.session_request(&peer));
            }
            MethodCall::SessionUpdate { params, .. } => {
                if params.approved {
                    debug!("Peer sent an approved session update, nothing to do");
                    return;
                }
                info!(
                    "Peer closed the session: {}",
                    params.message.as_deref().unwrap_or("no reason given")
                );
                self.internal_close();
                self.callbacks.notify("session_closed", |listener| {
                    listener.session_closed(params.message.as_deref())
                });
            }
            MethodCall::ExchangeKey { id, next_key, peer } => {
                info!("🔑 Peer {} rotated the session key", peer.id);
                {
                    let mut state = self.lock_peer();
                    if state.peer_id.is_none() {
                        state.peer_id = Some(peer.id.clone());
                    }
                    if peer.meta.is_some() {
                        state.peer_meta = peer.meta.clone();
                    }
                }
                if let Err(e) = self.send(MethodCall::response(id, Value::Bool(true)), None) {
                    warn!("Could not confirm key exchange {}: {}", id, e);
                }
                self.swap_keys(Some(next_key));
            }
            MethodCall::SendTransaction(transaction) => {
                let authorized = self
                    .lock_peer()
                    .approved_accounts
                    .as_ref()
                    .map_or(false, |accounts| {
                        accounts
                            .iter()
                            .any(|account| account.eq_ignore_ascii_case(&transaction.from))
                    });
                if !authorized {
                    self.handle_payload_error(CodecError::invalid_method(
                        transaction.id,
                        format!("Account {} is not approved", transaction.from),
                    ));
                    return;
                }
                info!(
                    "Transaction request {} from {} to {}",
                    transaction.id, transaction.from, transaction.to
                );
                self.callbacks.notify("send_transaction", |listener| {
                    listener.send_transaction(&transaction)
                });
            }
            MethodCall::Response { id, result, error } => match self.requests.take(id) {
                Some(callback) => callback(CallResponse { id, result, error }),
                None => debug!("No pending request for response {}", id),
            },
            MethodCall::Unsupported { id, method } => {
                warn!("Dropping unsupported method {} ({})", method, id);
            }
        }
    }

    fn handle_payload_error(&self, error: CodecError) {
        match error {
            CodecError::InvalidMethod { id, message } => {
                warn!("Rejecting call {}: {}", id, message);
                if let Err(e) = self.reject_request(id, PAYLOAD_ERROR_CODE, &message) {
                    warn!("Could not reject call {}: {}", id, e);
                }
            }
            other => warn!("Dropping undecodable payload: {}", other),
        }
    }

    /// Propose a fresh key. Everything but the proposal itself waits in the
    /// queue until the peer answers.
    fn exchange_key(&self) {
        let next_key = SymmetricKey::generate();
        self.lock_keys().begin_rotation(next_key);

        let call = MethodCall::ExchangeKey {
            id: self.new_call_id(),
            next_key,
            peer: self.config.client_data.clone(),
        };
        info!("🔑 Starting key rotation ({})", call.id());

        let this = self.this.clone();
        let callback: ResponseCallback = Box::new(move |response| {
            if let Some(session) = this.upgrade() {
                session.handle_exchange_key_response(response);
            }
        });
        if let Err(e) = self.send_to(call, None, true, Some(callback)) {
            error!("Key exchange not sent, keeping current key: {}", e);
            let mut keys = self.lock_keys();
            keys.abort_rotation();
            self.drain_queue(&keys);
        }
    }

    fn handle_exchange_key_response(&self, response: CallResponse) {
        if response.is_true() {
            self.swap_keys(None);
        } else {
            warn!(
                "Peer refused key rotation {} ({:?}), keeping current key",
                response.id, response.error
            );
            let mut keys = self.lock_keys();
            keys.abort_rotation();
            self.drain_queue(&keys);
        }
    }

    /// Make `new_key` (or the pending key) current, then release the queue
    fn swap_keys(&self, new_key: Option<SymmetricKey>) {
        let mut keys = self.lock_keys();
        if keys.swap(new_key) {
            info!("🔑 Session key rotated");
        } else {
            debug!("No pending key to swap");
        }
        self.drain_queue(&keys);
    }

    /// Resubmit queued calls in order.
    ///
    /// Called with the key lock held right after a rotation resolves, so no
    /// new rotation can start mid-drain and no direct send can overtake a
    /// queued one.
    fn drain_queue(&self, keys: &KeyState) {
        let mut sent = 0usize;
        while let Some(queued) = self.queue.pop_front() {
            let id = queued.call.id();
            match self.publish(keys, queued) {
                Ok(()) => sent += 1,
                Err(e) => error!("Dropping queued call {}: {}", id, e),
            }
        }
        if sent > 0 {
            info!("Drained {} queued call(s)", sent);
        }
    }

    /// Millisecond timestamp id, strictly increasing per session
    pub fn new_call_id(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        let previous = self
            .last_call_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        if self.is_closed() {
            return SessionState::Closed;
        }
        let state = self.lock_peer();
        if state
            .approved_accounts
            .as_ref()
            .map_or(false, |accounts| !accounts.is_empty())
        {
            SessionState::Active
        } else if state.handshake_id.is_some() {
            SessionState::HandshakeReceived
        } else if self.transport.status() == TransportStatus::Connected {
            SessionState::AwaitingHandshake
        } else {
            SessionState::Initialized
        }
    }

    pub fn transport_status(&self) -> TransportStatus {
        self.transport.status()
    }

    pub fn handshake_id(&self) -> Option<u64> {
        self.lock_peer().handshake_id
    }

    pub fn peer_id(&self) -> Option<String> {
        self.lock_peer().peer_id.clone()
    }

    pub fn peer_meta(&self) -> Option<PeerMeta> {
        self.lock_peer().peer_meta.clone()
    }

    pub fn approved_accounts(&self) -> Option<Vec<String>> {
        self.lock_peer().approved_accounts.clone()
    }

    pub fn is_key_rotating(&self) -> bool {
        self.lock_keys().is_rotating()
    }

    pub fn queued_calls(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }
}
