// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! JSON shapes seen by the peer once a payload is decrypted

use bridge_session::crypto::{decrypt_with_aead, encrypt_with_aead, generate_nonce, NONCE_SIZE};
use bridge_session::protocol::EncryptedPayload;
use bridge_session::{
    AeadPayloadCodec, CodecError, MethodCall, PayloadCodec, PeerData, PeerMeta, SessionParams,
    SymmetricKey,
};
use serde_json::{json, Value};

fn open(payload: &str, key: &SymmetricKey) -> Value {
    let encrypted: EncryptedPayload = serde_json::from_str(payload).unwrap();
    let nonce = hex::decode(&encrypted.nonce).unwrap();
    assert_eq!(nonce.len(), NONCE_SIZE);
    let plaintext = decrypt_with_aead(
        &hex::decode(&encrypted.data).unwrap(),
        &nonce,
        b"",
        key.as_bytes(),
    )
    .unwrap();
    serde_json::from_slice(&plaintext).unwrap()
}

fn seal(text: &str, key: &SymmetricKey) -> String {
    let nonce = generate_nonce();
    let data = encrypt_with_aead(text.as_bytes(), &nonce, b"", key.as_bytes()).unwrap();
    json!({"data": hex::encode(data), "nonce": hex::encode(nonce)}).to_string()
}

#[test]
fn test_exchange_key_wire_shape() {
    let key = SymmetricKey::generate();
    let next_key = SymmetricKey::from_bytes([0xab; 32]);
    let call = MethodCall::ExchangeKey {
        id: 1_700_000_000_000,
        next_key,
        peer: PeerData::new("wallet-topic", Some(PeerMeta::named("Wallet"))),
    };

    let message = open(&AeadPayloadCodec::new().prepare(&call, &key).unwrap(), &key);

    assert_eq!(message["jsonrpc"], "2.0");
    assert_eq!(message["id"], 1_700_000_000_000u64);
    assert_eq!(message["method"], "wc_exchangeKey");
    let params = &message["params"][0];
    assert_eq!(params["peerId"], "wallet-topic");
    assert_eq!(params["peerMeta"]["name"], "Wallet");
    assert_eq!(params["nextKey"], "ab".repeat(32));
}

#[test]
fn test_session_approval_wire_shape() {
    let key = SymmetricKey::generate();
    let call = MethodCall::response(
        42,
        SessionParams::approved(1, vec!["0xabc".to_string()]).into_value(),
    );

    let message = open(&AeadPayloadCodec::new().prepare(&call, &key).unwrap(), &key);

    assert_eq!(
        message,
        json!({
            "id": 42,
            "jsonrpc": "2.0",
            "result": {"approved": true, "chainId": 1, "accounts": ["0xabc"]}
        })
    );
}

#[test]
fn test_error_response_wire_shape() {
    let key = SymmetricKey::generate();
    let call = MethodCall::error_response(9, 42, "Account 0x1 is not approved");

    let message = open(&AeadPayloadCodec::new().prepare(&call, &key).unwrap(), &key);

    assert_eq!(message["error"]["code"], 42);
    assert_eq!(message["error"]["message"], "Account 0x1 is not approved");
    assert!(message.get("result").is_none());
}

#[test]
fn test_parses_dapp_session_request() {
    let key = SymmetricKey::generate();
    let text = r#"{
        "id": 1571048471226354,
        "jsonrpc": "2.0",
        "method": "wc_sessionRequest",
        "params": [{
            "peerId": "d1b5d3ba-6e1c-4c0f-8b28-0a35b3f0e5a1",
            "peerMeta": {
                "description": "Example dApp",
                "url": "https://dapp.example.org",
                "icons": ["https://dapp.example.org/icon.png"],
                "name": "Example"
            },
            "chainId": null
        }]
    }"#;

    let call = AeadPayloadCodec::new().parse(&seal(text, &key), &key).unwrap();
    match call {
        MethodCall::SessionRequest { id, peer } => {
            assert_eq!(id, 1571048471226354);
            assert_eq!(peer.id, "d1b5d3ba-6e1c-4c0f-8b28-0a35b3f0e5a1");
            let meta = peer.meta.unwrap();
            assert_eq!(meta.name.as_deref(), Some("Example"));
            assert_eq!(
                meta.icons,
                Some(vec!["https://dapp.example.org/icon.png".to_string()])
            );
        }
        other => panic!("unexpected call {:?}", other),
    }
}

#[test]
fn test_parses_peer_close_update() {
    let key = SymmetricKey::generate();
    let text = r#"{"id":5,"jsonrpc":"2.0","method":"wc_sessionUpdate","params":[{"approved":false,"chainId":null,"accounts":null}]}"#;

    let call = AeadPayloadCodec::new().parse(&seal(text, &key), &key).unwrap();
    assert_eq!(
        call,
        MethodCall::SessionUpdate {
            id: 5,
            params: SessionParams::rejected(),
        }
    );
}

#[test]
fn test_bad_params_report_call_id() {
    let key = SymmetricKey::generate();
    let text = r#"{"id":31,"jsonrpc":"2.0","method":"wc_exchangeKey","params":[{"peerId":"p","nextKey":"zz"}]}"#;

    match AeadPayloadCodec::new().parse(&seal(text, &key), &key) {
        Err(CodecError::InvalidMethod { id, .. }) => assert_eq!(id, 31),
        other => panic!("expected InvalidMethod, got {:?}", other),
    }
}

#[test]
fn test_tampered_payload_is_rejected() {
    let key = SymmetricKey::generate();
    let payload = AeadPayloadCodec::new()
        .prepare(&MethodCall::response(1, Value::Bool(true)), &key)
        .unwrap();

    let mut encrypted: EncryptedPayload = serde_json::from_str(&payload).unwrap();
    let mut data = hex::decode(&encrypted.data).unwrap();
    data[0] ^= 0x01;
    encrypted.data = hex::encode(data);
    let tampered = serde_json::to_string(&encrypted).unwrap();

    assert!(matches!(
        AeadPayloadCodec::new().parse(&tampered, &key),
        Err(CodecError::Crypto(_))
    ));
}
