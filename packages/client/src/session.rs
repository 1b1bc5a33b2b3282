//! WebSocket client session management.

use std::fmt::Display;

use futures_util::{Sink, SinkExt, StreamExt};
use hiroba_server::infrastructure::dto::websocket::{MessageType, WireMessage};
use hiroba_shared::time::{now_millis, timestamp_to_rfc3339};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::{
    domain::{ClientOptions, close_error},
    error::ClientError,
    formatter::MessageFormatter,
    ui::redisplay_prompt,
};

/// How a session that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The user pressed Ctrl+C / Ctrl+D
    UserExit,
    /// The relay announced `session_end`
    SessionEnded,
}

/// Run one connection to the relay until it ends.
///
/// Participants announce themselves with a `join` frame as soon as the socket is open
/// and send every line received on `input` as a chat message. Viewers pass no input.
pub async fn run_client_session(
    options: &ClientOptions,
    mut input: Option<&mut mpsc::UnboundedReceiver<String>>,
) -> Result<SessionOutcome, ClientError> {
    let url = options.endpoint_url();
    let (ws_stream, _response) = connect_async(&url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    tracing::info!("Connected to chat relay!");
    print!(
        "{}",
        MessageFormatter::format_connected(&options.session_id, options.client_id())
    );

    let (mut write, mut read) = ws_stream.split();
    let client_id = options.client_id();

    if let Some(client_id) = client_id {
        send_frame(&mut write, &WireMessage::join(client_id, now_rfc3339())).await?;
    }

    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<WireMessage>(text.as_str()) {
                        Ok(frame) => {
                            print!("{}", MessageFormatter::format_frame(&frame));
                            if frame.r#type == MessageType::SessionEnd {
                                return Ok(SessionOutcome::SessionEnded);
                            }
                        }
                        Err(_) => print!("{}", MessageFormatter::format_raw_message(text.as_str())),
                    }
                    if let Some(client_id) = client_id {
                        redisplay_prompt(client_id);
                    }
                }
                Some(Ok(Message::Binary(data))) => {
                    print!("{}", MessageFormatter::format_binary_message(data.len()));
                }
                Some(Ok(Message::Close(frame))) => {
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.as_str().to_string()))
                        .unwrap_or((1005, String::new()));
                    tracing::info!("Server closed the connection ({}): {}", code, reason);
                    return Err(close_error(code, &reason, client_id));
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return Err(ClientError::ConnectionError(e.to_string()));
                }
                None => {
                    return Err(ClientError::ConnectionError("Connection lost".to_string()));
                }
            },
            line = next_line(&mut input) => {
                let (Some(line), Some(client_id)) = (line, client_id) else {
                    write.send(Message::Close(None)).await.ok();
                    return Ok(SessionOutcome::UserExit);
                };
                send_frame(&mut write, &WireMessage::chat(client_id, line, now_rfc3339())).await?;
            }
            _ = tokio::signal::ctrl_c() => {
                write.send(Message::Close(None)).await.ok();
                return Ok(SessionOutcome::UserExit);
            }
        }
    }
}

/// Next line of user input; never resolves for viewers
async fn next_line(input: &mut Option<&mut mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match input {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn send_frame<S>(write: &mut S, frame: &WireMessage) -> Result<(), ClientError>
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    let json = serde_json::to_string(frame)
        .map_err(|e| ClientError::ConnectionError(format!("failed to encode frame: {}", e)))?;
    write
        .send(Message::text(json))
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))
}

fn now_rfc3339() -> String {
    timestamp_to_rfc3339(now_millis())
}
