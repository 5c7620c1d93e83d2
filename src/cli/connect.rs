// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Args;
use ethers::types::Address;
use ethers::utils::to_checksum;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::config::{SessionConfig, TransportConfig};
use crate::protocol::{AeadPayloadCodec, PeerData, PeerMeta, TransactionRequest};
use crate::session::{BridgeSession, SessionCallback};
use crate::transport::{TransportStatus, WebSocketTransportBuilder};

/// EIP-1193 "user rejected the request"
pub const USER_REJECTED_CODE: i64 = 4001;

/// Arguments for connect command
#[derive(Args, Debug)]
pub struct ConnectArgs {
    /// Pairing URI (can also be set via BRIDGE_URI env var)
    #[arg(long, env = "BRIDGE_URI")]
    pub uri: Option<String>,

    /// Account to expose to the dApp (repeatable)
    #[arg(long = "account", required = true)]
    pub accounts: Vec<String>,

    /// Chain ID to report (e.g., 1 for Ethereum mainnet)
    #[arg(long)]
    pub chain_id: u64,

    /// Wallet name shown to the dApp
    #[arg(long, default_value = "bridge-cli")]
    pub name: String,

    /// TOML file with a [transport] table
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Reject the session request instead of approving it
    #[arg(long)]
    pub reject: bool,
}

/// Arguments for parse-uri command
#[derive(Args, Debug)]
pub struct ParseUriArgs {
    /// Pairing URI to inspect
    pub uri: String,
}

/// Validate account arguments as Ethereum addresses, returned checksummed
pub fn parse_accounts(accounts: &[String]) -> Result<Vec<String>> {
    accounts
        .iter()
        .map(|account| {
            Address::from_str(account)
                .map(|address| to_checksum(&address, None))
                .map_err(|e| anyhow!("Invalid account '{}': {}", account, e))
        })
        .collect()
}

/// Answers session events on behalf of the CLI user
struct AutoResponder {
    session: Weak<BridgeSession>,
    accounts: Vec<String>,
    chain_id: u64,
    approve: bool,
    closed: Arc<Notify>,
}

impl SessionCallback for AutoResponder {
    fn on_status(&self, status: TransportStatus) {
        match status {
            TransportStatus::Connected => info!("🌐 Connected to bridge"),
            TransportStatus::Disconnected => warn!("Bridge connection lost"),
        }
    }

    fn session_request(&self, peer: &PeerData) {
        let Some(session) = self.session.upgrade() else {
            return;
        };
        let name = peer
            .meta
            .as_ref()
            .and_then(|meta| meta.name.as_deref())
            .unwrap_or("unknown dApp");
        println!("\n📋 Session request:");
        println!("  Peer:  {}", peer.id);
        println!("  Name:  {}", name);
        if let Some(url) = peer.meta.as_ref().and_then(|meta| meta.url.as_deref()) {
            println!("  URL:   {}", url);
        }

        let result = if self.approve {
            session.approve(self.accounts.clone(), self.chain_id)
        } else {
            session.reject()
        };
        match result {
            Ok(delivery) => info!(
                "{} session ({:?})",
                if self.approve { "Approved" } else { "Rejected" },
                delivery
            ),
            Err(e) => error!("Failed to answer session request: {}", e),
        }
    }

    fn session_closed(&self, message: Option<&str>) {
        println!("👋 Session closed: {}", message.unwrap_or("no reason given"));
        self.closed.notify_one();
    }

    fn send_transaction(&self, transaction: &TransactionRequest) {
        println!("\n💸 Transaction request {}:", transaction.id);
        println!("  From:  {}", transaction.from);
        println!("  To:    {}", transaction.to);
        println!("  Value: {}", transaction.value);
        println!("  Data:  {}", transaction.data);

        if let Some(session) = self.session.upgrade() {
            if let Err(e) = session.reject_request(
                transaction.id,
                USER_REJECTED_CODE,
                "bridge-cli does not sign transactions",
            ) {
                error!("Failed to reject transaction {}: {}", transaction.id, e);
            }
        }
    }
}

/// Join a session and answer it until the peer closes or Ctrl-C
pub async fn connect(args: ConnectArgs) -> Result<()> {
    // Load environment variables from .env file if it exists
    dotenv::dotenv().ok();

    let uri = args
        .uri
        .or_else(|| env::var("BRIDGE_URI").ok())
        .ok_or_else(|| anyhow!("Pairing URI required. Use --uri or set BRIDGE_URI env var"))?;
    let accounts = parse_accounts(&args.accounts)?;

    let transport_config = match &args.config {
        Some(path) => TransportConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?
            .with_env_overrides(),
        None => TransportConfig::from_env(),
    };

    let client = PeerData::random(Some(PeerMeta::named(args.name.clone())));
    let config = SessionConfig::from_wc_uri(&uri, client)?;
    println!("🔗 Joining session {} via {}", config.handshake_topic, config.bridge);

    let builder = WebSocketTransportBuilder::new(transport_config)?;
    let session = BridgeSession::new(config, Arc::new(AeadPayloadCodec::new()), &builder);

    let closed = Arc::new(Notify::new());
    let responder = Arc::new(AutoResponder {
        session: Arc::downgrade(&session),
        accounts,
        chain_id: args.chain_id,
        approve: !args.reject,
        closed: closed.clone(),
    });
    session.add_callback(&responder);
    session.init();

    tokio::select! {
        _ = closed.notified() => {}
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
            println!("\n⏹  Interrupted, closing session");
            session.close();
        }
    }

    session.remove_callback(&responder);
    Ok(())
}

/// Print the fields of a pairing URI
pub fn parse_uri(args: ParseUriArgs) -> Result<()> {
    let config = SessionConfig::from_wc_uri(&args.uri, PeerData::random(None))?;

    println!("\n📋 Pairing URI:");
    println!("  Handshake topic: {}", config.handshake_topic);
    println!("  Version:         {}", config.version);
    println!("  Bridge:          {}", config.bridge);
    println!("  Key:             {}..", config.key.fingerprint());
    Ok(())
}
