//! WebSocket connection handlers.
//!
//! The upgrade is always accepted; a refused connection (unknown or ended session,
//! wrong password, client id in use) receives a close frame with code 1008 and a
//! human-readable reason.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use serde::Deserialize;
use tokio::sync::{Notify, mpsc};

use crate::{
    domain::{
        ClientId, Connection, ConnectionLink, OutboundFrame, RelayError, SessionId,
    },
    infrastructure::dto::{
        conversion::message_body,
        websocket::{MessageType, WireMessage},
    },
    ui::state::AppState,
    usecase::ParticipantRequest,
};

/// Query parameters of the participant endpoint
#[derive(Debug, Deserialize)]
pub struct ParticipantQuery {
    pub session_id: String,
    pub client_id: String,
    #[serde(default)]
    pub session_password: Option<String>,
    #[serde(default)]
    pub user_password: Option<String>,
}

/// Query parameters of the viewer endpoint
#[derive(Debug, Deserialize)]
pub struct ViewerQuery {
    pub session_id: String,
}

pub async fn participant_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ParticipantQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_participant(socket, state, query))
}

pub async fn viewer_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ViewerQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_viewer(socket, state, query))
}

fn participant_request(query: ParticipantQuery) -> Result<ParticipantRequest, RelayError> {
    let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());
    Ok(ParticipantRequest {
        session_id: SessionId::new(query.session_id)?,
        client_id: ClientId::new(query.client_id)?,
        session_password: non_empty(query.session_password),
        user_password: non_empty(query.user_password),
    })
}

fn connection_link() -> (
    ConnectionLink,
    mpsc::UnboundedReceiver<OutboundFrame>,
    Arc<Notify>,
) {
    let (tx, rx) = mpsc::unbounded_channel();
    let terminator = Arc::new(Notify::new());
    let link = ConnectionLink {
        sender: tx,
        terminator: terminator.clone(),
    };
    (link, rx, terminator)
}

async fn handle_participant(socket: WebSocket, state: Arc<AppState>, query: ParticipantQuery) {
    let request = match participant_request(query) {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!("Invalid participant query: {}", e);
            return refuse(socket, e).await;
        }
    };
    let label = format!("{}@{}", request.client_id, request.session_id);

    let (link, rx, terminator) = connection_link();
    let connection = match state.connect_participant_usecase.execute(request, link).await {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("Refusing participant '{}': {}", label, e);
            return refuse(socket, e).await;
        }
    };

    run_connection(socket, state, connection, rx, terminator).await;
}

async fn handle_viewer(socket: WebSocket, state: Arc<AppState>, query: ViewerQuery) {
    let session_id = match SessionId::new(query.session_id) {
        Ok(session_id) => session_id,
        Err(e) => return refuse(socket, e.into()).await,
    };

    let (link, rx, terminator) = connection_link();
    let connection = match state
        .connect_viewer_usecase
        .execute(session_id.clone(), link)
        .await
    {
        Ok(connection) => connection,
        Err(e) => {
            tracing::warn!("Refusing viewer of '{}': {}", session_id, e);
            return refuse(socket, e).await;
        }
    };

    run_connection(socket, state, connection, rx, terminator).await;
}

/// Close a socket that was never registered
async fn refuse(mut socket: WebSocket, error: RelayError) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: error.close_reason().to_string().into(),
    };
    if let Err(e) = socket.send(Message::Close(Some(frame))).await {
        tracing::debug!("Failed to send close frame: {}", e);
    }
}

/// Drives a registered connection until either side closes
async fn run_connection(
    socket: WebSocket,
    state: Arc<AppState>,
    connection: Connection,
    rx: mpsc::UnboundedReceiver<OutboundFrame>,
    terminator: Arc<Notify>,
) {
    let (sender, mut receiver) = socket.split();

    let mut send_task = pusher_loop(rx, sender, terminator);

    let recv_state = state.clone();
    let recv_connection = connection.clone();
    let mut recv_task = tokio::spawn(async move {
        let mut joined = false;
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("WebSocket error on '{}': {}", recv_connection.label(), e);
                    break;
                }
            };

            match msg {
                Message::Text(text) if recv_connection.is_participant() => {
                    handle_inbound(&recv_state, &recv_connection, &mut joined, text.as_str())
                        .await;
                }
                Message::Text(_) => {
                    // viewer は読み取り専用
                    tracing::debug!("Ignoring frame from '{}'", recv_connection.label());
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // どちらかのタスクが終了したら、もう一方も終了させる
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.disconnect_usecase.execute(&connection).await;
    tracing::info!("Connection '{}' closed", connection.label());
}

/// Spawns a task that drains the connection's outbound queue into the WebSocket sink.
///
/// A `Close` frame ends the task after it is sent. The terminator ends it
/// immediately, even while a send is pending.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<OutboundFrame>,
    mut sender: SplitSink<WebSocket, Message>,
    terminator: Arc<Notify>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                frame = rx.recv() => frame,
                _ = terminator.notified() => break,
            };
            let Some(frame) = frame else { break };

            let (message, last) = match frame {
                OutboundFrame::Message(message) => {
                    match serde_json::to_string(&WireMessage::from(&message)) {
                        Ok(json) => (Message::Text(json.into()), false),
                        Err(e) => {
                            tracing::error!("Failed to encode message: {}", e);
                            continue;
                        }
                    }
                }
                OutboundFrame::Close { code, reason } => (
                    Message::Close(Some(CloseFrame {
                        code,
                        reason: reason.into(),
                    })),
                    true,
                ),
            };

            let sent = tokio::select! {
                result = sender.send(message) => result.is_ok(),
                _ = terminator.notified() => false,
            };
            if !sent || last {
                break;
            }
        }
    })
}

/// Handle one text frame from a participant
async fn handle_inbound(state: &AppState, connection: &Connection, joined: &mut bool, text: &str) {
    let frame = match serde_json::from_str::<WireMessage>(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!("Dropping malformed frame from '{}': {}", connection.label(), e);
            return;
        }
    };

    // 送信者の ID は接続に束縛されたものを使う
    if let Some(claimed) = spoofed_client_id(connection, &frame) {
        tracing::warn!(
            "Frame from '{}' claims client_id '{}'; using the bound identity",
            connection.label(),
            claimed
        );
    }

    match frame.r#type {
        MessageType::Join => {
            if *joined {
                tracing::debug!("Ignoring repeated join from '{}'", connection.label());
                return;
            }
            *joined = true;
            if let Err(e) = state.connect_participant_usecase.announce_join(connection).await {
                tracing::warn!("Failed to record join of '{}': {}", connection.label(), e);
            }
        }
        MessageType::Message => {
            let body = match message_body(&frame, state.max_message_length) {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!("Dropping message from '{}': {}", connection.label(), e);
                    return;
                }
            };
            if let Err(e) = state.send_message_usecase.execute(connection, body).await {
                tracing::warn!("Failed to relay message from '{}': {}", connection.label(), e);
            }
        }
        other => {
            tracing::debug!(
                "Ignoring frame of type {:?} from '{}'",
                other,
                connection.label()
            );
        }
    }
}

/// The `client_id` a frame claims when it differs from the connection's bound identity
fn spoofed_client_id<'a>(connection: &Connection, frame: &'a WireMessage) -> Option<&'a str> {
    let claimed = frame.client_id.as_deref()?;
    let bound = connection.client_id.as_ref().map(|id| id.as_str());
    (bound != Some(claimed)).then_some(claimed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionId, ConnectionRole, ConnectionState, Timestamp};

    fn alice_connection() -> Connection {
        Connection {
            id: ConnectionId::generate(),
            role: ConnectionRole::Participant,
            session_id: SessionId::new("s1".to_string()).unwrap(),
            client_id: Some(ClientId::new("alice".to_string()).unwrap()),
            joined_at: Timestamp::new(0),
            state: ConnectionState::Open,
        }
    }

    #[test]
    fn test_frame_claiming_another_client_id_is_detected() {
        // テスト項目: 接続に束縛された ID と異なる client_id を名乗るフレームを検出する
        // given (前提条件):
        let connection = alice_connection();

        // when (操作):
        let spoofed = WireMessage::chat("mallory", "hi".to_string(), String::new());
        let own = WireMessage::chat("alice", "hi".to_string(), String::new());
        let mut anonymous = own.clone();
        anonymous.client_id = None;

        // then (期待する結果):
        assert_eq!(spoofed_client_id(&connection, &spoofed), Some("mallory"));
        assert_eq!(spoofed_client_id(&connection, &own), None);
        assert_eq!(spoofed_client_id(&connection, &anonymous), None);
    }
}
