// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Pairing URIs and configuration files feeding a session

use bridge_session::config::{ConfigError, TransportConfig};
use bridge_session::transport::MockTransportBuilder;
use bridge_session::{AeadPayloadCodec, BridgeSession, PeerData, SessionConfig, SessionState};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const URI: &str = "wc:8a5e5bdc-a0e4-4702-ba63-8f1a5655744f@1?bridge=https%3A%2F%2Fbridge.example.org&key=41791102999c339c844880b23950704cc43aa840f3739e365323cda4dfa89e7a";

#[test]
fn test_session_from_pairing_uri() {
    let client = PeerData::random(None);
    let config = SessionConfig::from_wc_uri(URI, client.clone()).unwrap();

    let builder = MockTransportBuilder::new();
    let session = BridgeSession::new(config, Arc::new(AeadPayloadCodec::new()), &builder);
    let transport = builder.transport().unwrap();

    assert_eq!(transport.url(), "https://bridge.example.org");
    assert_eq!(session.config().client_data, client);
    assert_eq!(session.state(), SessionState::Initialized);

    session.init();
    let topics: Vec<String> = transport.sent().into_iter().map(|m| m.topic).collect();
    assert!(topics.contains(&"8a5e5bdc-a0e4-4702-ba63-8f1a5655744f".to_string()));
    assert!(topics.contains(&client.id));
}

#[test]
fn test_random_client_ids_differ() {
    let a = PeerData::random(None);
    let b = PeerData::random(None);
    assert_ne!(a.id, b.id);
    assert!(uuid::Uuid::parse_str(&a.id).is_ok());
}

#[test]
fn test_unsupported_bridge_scheme() {
    let uri = "wc:topic@1?bridge=ftp%3A%2F%2Fbridge.example.org&key=41791102999c339c844880b23950704cc43aa840f3739e365323cda4dfa89e7a";
    let err = SessionConfig::from_wc_uri(uri, PeerData::random(None)).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidBridge(_)));
}

#[test]
fn test_transport_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[transport]\nconnect_timeout_secs = 3\nping_interval_secs = 0\nmax_buffered_messages = 8"
    )
    .unwrap();

    let config = TransportConfig::from_file(file.path()).unwrap();
    assert_eq!(config.connect_timeout().as_secs(), 3);
    assert!(config.ping_interval().is_none());
    assert_eq!(config.max_buffered_messages, 8);
}

#[test]
fn test_transport_config_file_with_bad_toml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "[transport\nconnect_timeout_secs = ").unwrap();

    let err = TransportConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Toml(_)));
}
