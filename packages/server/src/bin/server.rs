//! Session-scoped WebSocket chat relay.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-server
//! cargo run --bin hiroba-server -- --host 0.0.0.0 --port 3000
//! cargo run --bin hiroba-server -- --config relay.toml --announce-leave
//! ```

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use hiroba_server::{
    config::RelayConfig,
    ui::{AppState, Server},
};
use hiroba_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "hiroba-server")]
#[command(about = "Session-scoped WebSocket chat relay", long_about = None)]
struct Args {
    /// Path to a TOML config file
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Host address to bind the server to (overrides the config file)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port number to bind the server to (overrides the config file)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Record and broadcast a message when a participant leaves
    #[arg(long)]
    announce_leave: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let mut config = match RelayConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Config error: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.announce_leave {
        config.announce_leave = true;
    }
    tracing::debug!(?config, "Configuration loaded");

    // Initialize dependencies in order:
    // 1. Policy
    // 2. AppState (Repository, ConnectionManager, Router, UseCases)
    // 3. Server

    // 1. Resolve the relay policy
    let policy = config.policy();

    // 2. Wire the relay
    let state = AppState::build(&policy, Arc::new(SystemClock));

    // 3. Create and run the server
    let server = Server::new(state);
    if let Err(e) = server.run(&config.host, config.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
