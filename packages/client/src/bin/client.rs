//! Terminal chat client for the hiroba relay.
//!
//! Joins a session as a participant (or watches it as a viewer), prints the replayed
//! history and live messages, and sends lines typed at the prompt.
//! Automatically reconnects on disconnection (max 5 attempts with 5 second interval).
//! A client ID that is already in use ends the client without retrying.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin hiroba-client -- --session-id standup --client-id Alice
//! cargo run --bin hiroba-client -- -s standup --viewer
//! ```

use clap::Parser;
use hiroba_client::{domain::ClientOptions, run_client};
use hiroba_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "hiroba-client")]
#[command(about = "Terminal client for the hiroba chat relay", long_about = None)]
struct Args {
    /// Relay base URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080")]
    url: String,

    /// Session to join or watch
    #[arg(short = 's', long)]
    session_id: String,

    /// Client ID for identifying messages (must be unique within the session)
    #[arg(short = 'c', long)]
    client_id: Option<String>,

    /// Session password
    #[arg(long)]
    session_password: Option<String>,

    /// Per-user password bound to the client ID
    #[arg(long)]
    user_password: Option<String>,

    /// Watch the session read-only
    #[arg(long)]
    viewer: bool,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    let options = match ClientOptions::new(
        args.url,
        args.session_id,
        args.client_id,
        args.session_password,
        args.user_password,
        args.viewer,
    ) {
        Ok(options) => options,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    // Run the client
    if let Err(e) = run_client(options).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
