// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Dispatch of peer-initiated calls

use super::support::*;
use bridge_session::session::PAYLOAD_ERROR_CODE;
use bridge_session::transport::RelayMessage;
use bridge_session::{
    MethodCall, SessionParams, SessionState, SymmetricKey, Transport, TransportStatus,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Session that completed the handshake and approved `ACCOUNT`
fn active_session() -> (
    std::sync::Arc<bridge_session::BridgeSession>,
    DappPeer,
    Arc<Recorder>,
) {
    let (session, mut dapp) = new_session();
    let recorder = Arc::new(Recorder::default());
    session.add_callback(&recorder);
    dapp.handshake(1);
    session.approve(vec![ACCOUNT.to_string()], 1).unwrap();
    dapp.receive();
    (session, dapp, recorder)
}

fn error_code(call: &MethodCall) -> Option<i64> {
    match call {
        MethodCall::Response {
            error: Some(error), ..
        } => Some(error.code),
        _ => None,
    }
}

#[test]
fn test_transaction_from_approved_account_is_dispatched() {
    let (_session, mut dapp, recorder) = active_session();

    // Address comparison ignores case
    dapp.send(&transaction(300, &ACCOUNT.to_lowercase()));

    let transactions = recorder.transactions.lock().unwrap();
    assert_eq!(transactions.len(), 1);
    let tx = &transactions[0];
    assert_eq!(tx.id, 300);
    assert_eq!(tx.to, "0x00000000000000000000000000000000000000bb");
    assert_eq!(tx.value, "0xde0b6b3a7640000");
    assert_eq!(tx.gas_limit.as_deref(), Some("0x5208"));
    assert_eq!(tx.gas_price.as_deref(), Some("0x3b9aca00"));
    assert_eq!(tx.nonce.as_deref(), Some("0x1"));
    assert!(dapp.receive().is_empty());
}

#[test]
fn test_transaction_from_unknown_account_is_rejected() {
    let (session, mut dapp, recorder) = active_session();

    dapp.send(&transaction(301, "0x00000000000000000000000000000000000000ff"));

    assert!(recorder.transactions.lock().unwrap().is_empty());
    let calls = dapp.receive();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id(), 301);
    assert_eq!(error_code(&calls[0]), Some(PAYLOAD_ERROR_CODE));
    assert_eq!(session.state(), SessionState::Active);
}

#[test]
fn test_transaction_before_approval_is_rejected() {
    let (_session, mut dapp) = new_session();
    dapp.handshake(1);

    dapp.send(&transaction(302, ACCOUNT));

    let calls = dapp.receive();
    assert_eq!(calls.len(), 1);
    assert_eq!(error_code(&calls[0]), Some(PAYLOAD_ERROR_CODE));
}

#[test]
fn test_malformed_params_are_answered_with_error() {
    let (_session, mut dapp, recorder) = active_session();

    dapp.send_raw(
        r#"{"id":77,"jsonrpc":"2.0","method":"eth_sendTransaction","params":[{"to":"0x1"}]}"#,
    );

    assert!(recorder.transactions.lock().unwrap().is_empty());
    let calls = dapp.receive();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].id(), 77);
    assert_eq!(error_code(&calls[0]), Some(PAYLOAD_ERROR_CODE));
}

#[test]
fn test_peer_rejection_update_closes_session() {
    let (session, dapp, recorder) = active_session();

    dapp.send(&MethodCall::SessionUpdate {
        id: 400,
        params: SessionParams {
            message: Some("user disconnected".to_string()),
            ..SessionParams::rejected()
        },
    });

    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.approved_accounts().is_none());
    assert_eq!(dapp.transport.status(), TransportStatus::Disconnected);
    assert_eq!(
        *recorder.closed.lock().unwrap(),
        vec![Some("user disconnected".to_string())]
    );
    assert_eq!(
        recorder.statuses.lock().unwrap().last(),
        Some(&TransportStatus::Disconnected)
    );
}

#[test]
fn test_local_close_clears_approved_accounts() {
    let (session, mut dapp, recorder) = active_session();
    assert_eq!(session.approved_accounts(), Some(vec![ACCOUNT.to_string()]));

    session.close();

    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.approved_accounts().is_none());
    assert!(recorder.closed.lock().unwrap().is_empty());
    assert!(dapp.receive().is_empty());
}

#[test]
fn test_approved_update_from_peer_is_ignored() {
    let (session, mut dapp, recorder) = active_session();

    dapp.send(&MethodCall::SessionUpdate {
        id: 401,
        params: SessionParams::approved(1, vec![ACCOUNT.to_string()]),
    });

    assert_eq!(session.state(), SessionState::Active);
    assert!(recorder.closed.lock().unwrap().is_empty());
    assert!(dapp.receive().is_empty());
}

#[test]
fn test_peer_initiated_key_exchange() {
    let (session, mut dapp, _recorder) = active_session();
    let peer_key = SymmetricKey::generate();

    dapp.send(&MethodCall::ExchangeKey {
        id: 500,
        next_key: peer_key,
        peer: dapp.data.clone(),
    });

    // Confirmation goes out under the key the peer used
    let calls = dapp.receive();
    assert_eq!(calls, vec![MethodCall::response(500, Value::Bool(true))]);
    assert!(!session.is_key_rotating());

    dapp.key = peer_key;
    session.approve_request(501, json!("0xabc")).unwrap();
    assert_eq!(
        dapp.receive(),
        vec![MethodCall::response(501, json!("0xabc"))]
    );
}

#[test]
fn test_key_exchange_records_unknown_peer() {
    let (session, mut dapp) = new_session();
    let peer_key = SymmetricKey::generate();

    dapp.send(&MethodCall::ExchangeKey {
        id: 600,
        next_key: peer_key,
        peer: dapp.data.clone(),
    });

    assert_eq!(session.peer_id().as_deref(), Some(DAPP_TOPIC));
    assert_eq!(
        dapp.receive(),
        vec![MethodCall::response(600, Value::Bool(true))]
    );
}

#[test]
fn test_unsupported_method_is_dropped() {
    let (session, mut dapp, recorder) = active_session();

    dapp.send_raw(r#"{"id":9,"jsonrpc":"2.0","method":"eth_sign","params":["0x1","0x2"]}"#);

    assert!(dapp.receive().is_empty());
    assert!(recorder.transactions.lock().unwrap().is_empty());
    assert_eq!(session.state(), SessionState::Active);
}

#[test]
fn test_garbage_payload_is_dropped() {
    let (session, mut dapp, _recorder) = active_session();

    dapp.transport
        .deliver(RelayMessage::publish(WALLET_TOPIC, "not json at all"));
    dapp.send_raw("[1, 2, 3]");

    assert!(dapp.receive().is_empty());
    assert_eq!(session.state(), SessionState::Active);
}

#[test]
fn test_subscribe_frames_are_ignored() {
    let (session, mut dapp, recorder) = active_session();

    dapp.transport.deliver(RelayMessage::subscribe(WALLET_TOPIC));

    assert!(dapp.receive().is_empty());
    assert!(recorder.transactions.lock().unwrap().is_empty());
    assert_eq!(session.state(), SessionState::Active);
}
