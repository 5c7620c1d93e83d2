// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! WebSocket relay transport
//!
//! One socket task per connection. The task owns the stream; callers talk to
//! it through an unbounded channel, so `send()` never blocks on I/O.
//!
//! # Buffering
//!
//! Messages sent while no socket is connected are kept in a bounded FIFO and
//! written before anything else once the socket comes up.

use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};
use tracing::{debug, info, warn};
use url::Url;

use super::{
    MessageHandler, RelayMessage, StatusHandler, Transport, TransportBuilder, TransportError,
    TransportStatus,
};
use crate::config::TransportConfig;

/// Map an `http(s)` bridge URL onto the matching WebSocket scheme
pub fn relay_url(bridge: &str) -> Result<Url, TransportError> {
    let mut url = Url::parse(bridge).map_err(|e| TransportError::InvalidUrl(e.to_string()))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "unsupported scheme '{}'",
                other
            )))
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| TransportError::InvalidUrl(format!("cannot use scheme '{}'", scheme)))?;
    Ok(url)
}

pub struct WebSocketTransportBuilder {
    config: TransportConfig,
    runtime: Handle,
}

impl WebSocketTransportBuilder {
    /// Builder bound to the current tokio runtime
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let runtime = Handle::try_current().map_err(|e| TransportError::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(config, runtime))
    }

    pub fn with_handle(config: TransportConfig, runtime: Handle) -> Self {
        Self { config, runtime }
    }
}

impl TransportBuilder for WebSocketTransportBuilder {
    fn build(
        &self,
        url: &str,
        on_status: StatusHandler,
        on_message: MessageHandler,
    ) -> Arc<dyn Transport> {
        Arc::new(WebSocketTransport::new(
            url,
            self.config.clone(),
            self.runtime.clone(),
            on_status,
            on_message,
        ))
    }
}

struct SocketHandle {
    outbound: mpsc::UnboundedSender<RelayMessage>,
    generation: u64,
}

#[derive(Default)]
struct SocketState {
    socket: Option<SocketHandle>,
    connected: bool,
    buffer: VecDeque<RelayMessage>,
    generation: u64,
}

struct Shared {
    url: String,
    config: TransportConfig,
    on_status: StatusHandler,
    on_message: MessageHandler,
    state: Mutex<SocketState>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SocketState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_current(state: &SocketState, generation: u64) -> bool {
        state
            .socket
            .as_ref()
            .map_or(false, |socket| socket.generation == generation)
    }

    /// Flip to connected and take the backlog.
    /// `None` when the socket was closed while connecting.
    fn mark_connected(&self, generation: u64) -> Option<Vec<RelayMessage>> {
        let mut state = self.lock();
        if !Self::is_current(&state, generation) {
            return None;
        }
        state.connected = true;
        Some(state.buffer.drain(..).collect())
    }

    /// Hold `message` until the socket is up.
    ///
    /// The backlog is flushed in FIFO order, but once it is full the oldest
    /// entries are dropped to make room, so a long outage loses messages.
    /// A limit of zero disables buffering.
    fn buffer(&self, state: &mut SocketState, message: RelayMessage) {
        let limit = self.config.max_buffered_messages;
        if limit == 0 {
            warn!(
                "Relay not connected and buffering disabled, dropping message for topic {}",
                message.topic
            );
            return;
        }
        while state.buffer.len() >= limit {
            let Some(dropped) = state.buffer.pop_front() else {
                break;
            };
            warn!(
                "Relay buffer full ({}), dropping oldest message for topic {}",
                limit, dropped.topic
            );
        }
        state.buffer.push_back(message);
    }

    fn finish(&self, generation: u64) {
        let notify = {
            let mut state = self.lock();
            if Self::is_current(&state, generation) {
                state.socket = None;
                state.connected = false;
                true
            } else {
                false
            }
        };
        if notify {
            info!("Relay connection to {} lost", self.url);
            (self.on_status)(TransportStatus::Disconnected);
        }
    }

    fn deliver(&self, text: &str) {
        match serde_json::from_str::<RelayMessage>(text) {
            Ok(message) if message.is_publish() => (self.on_message)(message),
            Ok(message) => debug!("Ignoring {:?} frame on topic {}", message.kind, message.topic),
            Err(e) => warn!("Dropping unparsable relay frame: {}", e),
        }
    }
}

/// Relay transport over a tokio-tungstenite client socket
pub struct WebSocketTransport {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl WebSocketTransport {
    pub fn new(
        url: impl Into<String>,
        config: TransportConfig,
        runtime: Handle,
        on_status: StatusHandler,
        on_message: MessageHandler,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                url: url.into(),
                config,
                on_status,
                on_message,
                state: Mutex::new(SocketState::default()),
            }),
            runtime,
        }
    }

    /// Number of messages waiting for a connection
    pub fn buffered(&self) -> usize {
        self.shared.lock().buffer.len()
    }
}

impl Transport for WebSocketTransport {
    fn connect(&self) -> bool {
        let (generation, outbound_rx) = {
            let mut state = self.shared.lock();
            if state.socket.is_some() {
                return false;
            }
            state.generation += 1;
            let generation = state.generation;
            let (outbound, outbound_rx) = mpsc::unbounded_channel();
            state.socket = Some(SocketHandle {
                outbound,
                generation,
            });
            (generation, outbound_rx)
        };

        debug!("Opening relay connection #{} to {}", generation, self.shared.url);
        self.runtime
            .spawn(run_socket(self.shared.clone(), generation, outbound_rx));
        true
    }

    fn send(&self, message: RelayMessage) {
        let mut state = self.shared.lock();
        let message = match (&state.socket, state.connected) {
            (Some(socket), true) => match socket.outbound.send(message) {
                Ok(()) => return,
                Err(mpsc::error::SendError(message)) => message,
            },
            _ => message,
        };
        self.shared.buffer(&mut state, message);
    }

    fn status(&self) -> TransportStatus {
        if self.shared.lock().connected {
            TransportStatus::Connected
        } else {
            TransportStatus::Disconnected
        }
    }

    fn close(&self) {
        let (closed, was_connected) = {
            let mut state = self.shared.lock();
            let was_connected = std::mem::replace(&mut state.connected, false);
            (state.socket.take(), was_connected)
        };
        // Dropping the sender ends the socket task, which sends a close frame.
        if let Some(socket) = closed {
            info!("Closing relay connection #{} to {}", socket.generation, self.shared.url);
            drop(socket);
            if was_connected {
                (self.shared.on_status)(TransportStatus::Disconnected);
            }
        }
    }
}

async fn run_socket(
    shared: Arc<Shared>,
    generation: u64,
    mut outbound: mpsc::UnboundedReceiver<RelayMessage>,
) {
    if let Err(e) = drive_socket(&shared, generation, &mut outbound).await {
        warn!("Relay connection #{} failed: {}", generation, e);
    }
    shared.finish(generation);
}

fn encode(message: &RelayMessage) -> Result<WsMessage, TransportError> {
    Ok(WsMessage::Text(serde_json::to_string(message)?))
}

async fn drive_socket(
    shared: &Shared,
    generation: u64,
    outbound: &mut mpsc::UnboundedReceiver<RelayMessage>,
) -> Result<(), TransportError> {
    let url = relay_url(&shared.url)?;
    let timeout = shared.config.connect_timeout();
    let (ws, _response) = tokio::time::timeout(timeout, connect_async(url.as_str()))
        .await
        .map_err(|_| TransportError::ConnectTimeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        })??;
    let (mut sink, mut stream) = ws.split();

    let backlog = match shared.mark_connected(generation) {
        Some(backlog) => backlog,
        None => {
            let _ = sink.send(WsMessage::Close(None)).await;
            return Ok(());
        }
    };
    info!("Relay connection #{} established to {}", generation, url);
    (shared.on_status)(TransportStatus::Connected);

    if !backlog.is_empty() {
        debug!("Flushing {} buffered relay messages", backlog.len());
    }
    for message in &backlog {
        sink.send(encode(message)?).await?;
    }

    let mut ping = shared.config.ping_interval().map(|period| {
        tokio::time::interval_at(tokio::time::Instant::now() + period, period)
    });

    loop {
        tokio::select! {
            outgoing = outbound.recv() => match outgoing {
                Some(message) => sink.send(encode(&message)?).await?,
                None => {
                    let _ = sink.send(WsMessage::Close(None)).await;
                    return Ok(());
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => shared.deliver(&text),
                Some(Ok(WsMessage::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => shared.deliver(&text),
                    Err(_) => warn!("Dropping non UTF-8 relay frame"),
                },
                Some(Ok(WsMessage::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            _ = async {
                match ping.as_mut() {
                    Some(interval) => {
                        interval.tick().await;
                    }
                    None => futures::future::pending::<()>().await,
                }
            } => sink.send(WsMessage::Ping(Vec::new())).await?,
        }
    }
}
