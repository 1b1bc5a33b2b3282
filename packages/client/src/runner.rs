//! Client execution logic with reconnection support.

use std::time::Duration;

use crate::{
    domain::{ClientMode, ClientOptions, should_attempt_reconnect, should_exit_immediately},
    error::ClientError,
    session::{SessionOutcome, run_client_session},
    ui::spawn_line_reader,
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Run the client with reconnection logic
///
/// Returns `Ok` when the user exits or the session ends; refusals and exhausted
/// reconnection attempts are errors.
pub async fn run_client(options: ClientOptions) -> Result<(), ClientError> {
    let mut input = match &options.mode {
        ClientMode::Participant { client_id, .. } => Some(spawn_line_reader(client_id)),
        ClientMode::Viewer => None,
    };
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Connecting to {} session '{}' (attempt {}/{})",
            options.url,
            options.session_id,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        match run_client_session(&options, input.as_mut()).await {
            Ok(SessionOutcome::UserExit) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Ok(SessionOutcome::SessionEnded) => {
                tracing::info!("Session '{}' has ended", options.session_id);
                return Ok(());
            }
            Err(e) if should_exit_immediately(&e) => {
                tracing::error!("{}", e);
                return Err(e);
            }
            Err(e) => {
                tracing::warn!("Connection lost: {}", e);

                if !should_attempt_reconnect(&e, reconnect_count, MAX_RECONNECT_ATTEMPTS) {
                    tracing::error!(
                        "Failed to reconnect after {} attempts. Exiting.",
                        MAX_RECONNECT_ATTEMPTS
                    );
                    return Err(ClientError::ReconnectExhausted(MAX_RECONNECT_ATTEMPTS));
                }
                reconnect_count += 1;

                tracing::info!(
                    "Reconnecting in {} seconds... (attempt {}/{})",
                    RECONNECT_INTERVAL_SECS,
                    reconnect_count,
                    MAX_RECONNECT_ATTEMPTS
                );
                tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
            }
        }
    }
}
