// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod connect;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Bridge session CLI
#[derive(Parser, Debug)]
#[command(name = "bridge-cli")]
#[command(version)]
#[command(about = "Pair a wallet with a dApp over a WalletConnect bridge", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Join the session from a pairing URI and answer its requests
    Connect(connect::ConnectArgs),

    /// Validate and print a pairing URI
    ParseUri(connect::ParseUriArgs),
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Connect(args) => connect::connect(args).await,
        Commands::ParseUri(args) => connect::parse_uri(args),
    }
}
