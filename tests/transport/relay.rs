// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Minimal in-process relay for exercising the WebSocket transport

#![allow(dead_code)]

use bridge_session::transport::{MessageHandler, RelayMessage, StatusHandler};
use bridge_session::TransportStatus;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::protocol::Message;

const WAIT: Duration = Duration::from_secs(5);

pub enum RelayFrame {
    Text(String),
    Close,
}

pub struct TestRelay {
    /// `http://` address of the relay
    pub url: String,
    /// Frames received from clients, parsed
    pub received: mpsc::UnboundedReceiver<RelayMessage>,
    /// Frames to push to the connected client
    pub outbound: mpsc::UnboundedSender<RelayFrame>,
    /// One entry per accepted connection
    pub connections: mpsc::UnboundedReceiver<()>,
}

impl TestRelay {
    pub fn push(&self, message: &RelayMessage) {
        let text = serde_json::to_string(message).expect("serialize frame");
        let _ = self.outbound.send(RelayFrame::Text(text));
    }

    pub fn push_raw(&self, text: &str) {
        let _ = self.outbound.send(RelayFrame::Text(text.to_string()));
    }

    pub fn drop_client(&self) {
        let _ = self.outbound.send(RelayFrame::Close);
    }

    pub async fn next_message(&mut self) -> RelayMessage {
        recv(&mut self.received).await
    }

    pub async fn next_connection(&mut self) {
        recv(&mut self.connections).await
    }
}

/// Serve connections one after another on an ephemeral port
pub async fn spawn_relay() -> TestRelay {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind relay");
    let addr = listener.local_addr().expect("relay address");
    let (received_tx, received) = mpsc::unbounded_channel();
    let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<RelayFrame>();
    let (connections_tx, connections) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((tcp, _peer)) = listener.accept().await {
            let Ok(ws) = accept_async(tcp).await else {
                continue;
            };
            let _ = connections_tx.send(());
            let (mut sink, mut stream) = ws.split();

            loop {
                tokio::select! {
                    frame = stream.next() => match frame {
                        Some(Ok(Message::Text(text))) => {
                            if let Ok(message) = serde_json::from_str::<RelayMessage>(&text) {
                                let _ = received_tx.send(message);
                            }
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    },
                    outgoing = outbound_rx.recv() => match outgoing {
                        Some(RelayFrame::Text(text)) => {
                            if sink.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Some(RelayFrame::Close) => {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                        None => return,
                    },
                }
            }
        }
    });

    TestRelay {
        url: format!("http://{}", addr),
        received,
        outbound,
        connections,
    }
}

pub async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for relay event")
        .expect("channel closed")
}

/// Transport handlers that forward into channels
pub fn channel_handlers() -> (
    StatusHandler,
    mpsc::UnboundedReceiver<TransportStatus>,
    MessageHandler,
    mpsc::UnboundedReceiver<RelayMessage>,
) {
    let (status_tx, status_rx) = mpsc::unbounded_channel();
    let (message_tx, message_rx) = mpsc::unbounded_channel();
    let on_status: StatusHandler = Arc::new(move |status| {
        let _ = status_tx.send(status);
    });
    let on_message: MessageHandler = Arc::new(move |message| {
        let _ = message_tx.send(message);
    });
    (on_status, status_rx, on_message, message_rx)
}
