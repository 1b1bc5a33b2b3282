//! WebSocket を使った ConnectionManager 実装
//!
//! ## 責務
//!
//! - 接続ごとの writer チャンネル（`PusherChannel`）と terminator の保持
//! - participant のクライアント ID の一意性チェック（セッション単位）
//! - 接続へのフレーム送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! WebSocket の生成は UI 層（`ui/handler/websocket.rs`）で行われます。
//! この実装は生成されたチャンネルを受け取り、フレームを積むだけです。
//! 送信はチャンネルへの enqueue なので、ネットワーク I/O を待つことはありません。
//!
//! 接続の集合はセッション ID ごとに分かれており、
//! あるセッションへの配信が別のセッションのロックを取ることはありません。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    ClientId, Connection, ConnectionId, ConnectionLink, ConnectionManager, ConnectionRequest,
    ConnectionRole, ConnectionState, EvictedConnection, MessagePushError, OutboundFrame,
    RelayError, SessionId, ValueObjectError,
};

/// 登録済みの接続と、そのソケットへのハンドル
#[derive(Debug)]
struct Entry {
    connection: Connection,
    link: ConnectionLink,
}

impl Entry {
    fn send(&self, frame: OutboundFrame) -> Result<(), MessagePushError> {
        self.link
            .sender
            .send(frame)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }

    fn closed(&self) -> Connection {
        Connection {
            state: ConnectionState::Closed,
            ..self.connection.clone()
        }
    }
}

/// 1 セッション分の接続集合
#[derive(Debug, Default)]
struct SessionConnections {
    /// Key: client_id（セッション内で一意）
    participants: HashMap<ClientId, Entry>,
    /// Key: connection id
    viewers: HashMap<ConnectionId, Entry>,
}

impl SessionConnections {
    fn find(&self, connection: &Connection) -> Option<&Entry> {
        let entry = match (&connection.role, &connection.client_id) {
            (ConnectionRole::Participant, Some(client_id)) => self.participants.get(client_id),
            (ConnectionRole::Viewer, _) => self.viewers.get(&connection.id),
            (ConnectionRole::Participant, None) => None,
        };
        // 同じ client_id でも別の接続（再接続後）なら対象外
        entry.filter(|entry| entry.connection.id == connection.id)
    }

    fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.participants.values().chain(self.viewers.values())
    }
}

type SharedConnections = Arc<Mutex<SessionConnections>>;

/// WebSocket を使った ConnectionManager 実装
#[derive(Default)]
pub struct WebSocketConnectionManager {
    /// Key: session_id, Value: そのセッションに束縛された接続集合
    sessions: RwLock<HashMap<SessionId, SharedConnections>>,
}

impl WebSocketConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    async fn connections(&self, session_id: &SessionId) -> Option<SharedConnections> {
        self.sessions.read().await.get(session_id).cloned()
    }

    async fn connections_or_insert(&self, session_id: &SessionId) -> SharedConnections {
        if let Some(existing) = self.connections(session_id).await {
            return existing;
        }
        let mut sessions = self.sessions.write().await;
        sessions.entry(session_id.clone()).or_default().clone()
    }

    async fn snapshot(
        &self,
        session_id: &SessionId,
        select: fn(&SessionConnections) -> Vec<Connection>,
    ) -> Vec<Connection> {
        match self.connections(session_id).await {
            Some(connections) => select(&*connections.lock().await),
            None => Vec::new(),
        }
    }
}

#[async_trait]
impl ConnectionManager for WebSocketConnectionManager {
    async fn register(
        &self,
        request: ConnectionRequest,
        link: ConnectionLink,
    ) -> Result<Connection, RelayError> {
        let shared = self.connections_or_insert(&request.session_id).await;
        let mut connections = shared.lock().await;

        let connection = Connection {
            id: ConnectionId::generate(),
            role: request.role,
            session_id: request.session_id,
            client_id: request.client_id,
            joined_at: request.joined_at,
            state: ConnectionState::Open,
        };

        match connection.role {
            ConnectionRole::Participant => {
                let client_id = connection
                    .client_id
                    .clone()
                    .ok_or(ValueObjectError::Empty("client_id"))?;
                if connections.participants.contains_key(&client_id) {
                    return Err(RelayError::IdentityConflict(client_id.into_string()));
                }
                connections.participants.insert(
                    client_id,
                    Entry {
                        connection: connection.clone(),
                        link,
                    },
                );
            }
            ConnectionRole::Viewer => {
                connections.viewers.insert(
                    connection.id,
                    Entry {
                        connection: connection.clone(),
                        link,
                    },
                );
            }
        }

        tracing::debug!(connection = %connection.label(), "Connection registered");
        Ok(connection)
    }

    async fn unregister(&self, connection: &Connection) -> Option<Connection> {
        let shared = self.connections(&connection.session_id).await?;
        let mut connections = shared.lock().await;

        connections.find(connection)?;
        let removed = match (&connection.role, &connection.client_id) {
            (ConnectionRole::Participant, Some(client_id)) => {
                connections.participants.remove(client_id)
            }
            _ => connections.viewers.remove(&connection.id),
        }?;

        tracing::debug!(connection = %connection.label(), "Connection unregistered");
        Some(removed.closed())
    }

    async fn participants(&self, session_id: &SessionId) -> Vec<Connection> {
        self.snapshot(session_id, |c| {
            let mut list: Vec<Connection> =
                c.participants.values().map(|e| e.connection.clone()).collect();
            list.sort_by(|a, b| a.client_id.cmp(&b.client_id));
            list
        })
        .await
    }

    async fn viewers(&self, session_id: &SessionId) -> Vec<Connection> {
        self.snapshot(session_id, |c| {
            let mut list: Vec<Connection> =
                c.viewers.values().map(|e| e.connection.clone()).collect();
            list.sort_by_key(|c| c.joined_at);
            list
        })
        .await
    }

    async fn push_to(
        &self,
        connection: &Connection,
        frame: OutboundFrame,
    ) -> Result<(), MessagePushError> {
        let not_found = || MessagePushError::ClientNotFound(connection.label());

        let shared = self
            .connections(&connection.session_id)
            .await
            .ok_or_else(not_found)?;
        let connections = shared.lock().await;
        connections.find(connection).ok_or_else(not_found)?.send(frame)
    }

    async fn broadcast(&self, session_id: &SessionId, frame: OutboundFrame) -> Vec<Connection> {
        let Some(shared) = self.connections(session_id).await else {
            return Vec::new();
        };
        let connections = shared.lock().await;

        let mut failed = Vec::new();
        for entry in connections.entries() {
            // ブロードキャストでは一部の送信失敗を許容
            if let Err(e) = entry.send(frame.clone()) {
                tracing::warn!(
                    connection = %entry.connection.label(),
                    "Failed to push frame: {}",
                    e
                );
                failed.push(entry.connection.clone());
            }
        }
        failed
    }

    async fn evict_session(
        &self,
        session_id: &SessionId,
        frame: OutboundFrame,
    ) -> Vec<EvictedConnection> {
        let Some(shared) = self.sessions.write().await.remove(session_id) else {
            return Vec::new();
        };
        let mut connections = shared.lock().await;

        let participants = std::mem::take(&mut connections.participants);
        let viewers = std::mem::take(&mut connections.viewers);
        participants
            .into_values()
            .chain(viewers.into_values())
            .map(|entry| {
                // 受信側が既に閉じていても evict は続行する
                let _ = entry.send(frame.clone());
                EvictedConnection {
                    connection: entry.closed(),
                    terminator: entry.link.terminator,
                }
            })
            .collect()
    }
}
