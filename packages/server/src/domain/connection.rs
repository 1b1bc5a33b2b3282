//! Connection Manager trait 定義
//!
//! ライブなソケットの登録・解除と、接続へのフレーム送信（push / broadcast）の抽象化。
//! ソケットそのものは UI 層が生成し、ここでは送信用チャンネルだけを受け取る。

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{Notify, mpsc};

use super::{
    entity::{ChatMessage, Connection, ConnectionRole},
    error::RelayError,
    value_object::{ClientId, SessionId, Timestamp},
};

/// Frame queued for one socket's writer task
///
/// Encoding into the wire format happens in the writer task, outside any session lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundFrame {
    /// Stored message, live or replayed
    Message(ChatMessage),
    /// Close the socket with the given code and reason
    Close { code: u16, reason: String },
}

/// Channel drained by a socket's writer task
pub type PusherChannel = mpsc::UnboundedSender<OutboundFrame>;

/// Handles the manager keeps for one socket
#[derive(Debug, Clone)]
pub struct ConnectionLink {
    pub sender: PusherChannel,
    /// Notified to tear the socket down regardless of queued frames
    pub terminator: Arc<Notify>,
}

/// What a socket asks to be registered as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionRequest {
    pub role: ConnectionRole,
    pub session_id: SessionId,
    pub client_id: Option<ClientId>,
    pub joined_at: Timestamp,
}

/// Connection removed together with its session
#[derive(Debug, Clone)]
pub struct EvictedConnection {
    pub connection: Connection,
    pub terminator: Arc<Notify>,
}

/// Push failures on a single connection
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("connection '{0}' is not registered")]
    ClientNotFound(String),

    #[error("failed to push message: {0}")]
    PushFailed(String),
}

impl From<MessagePushError> for RelayError {
    fn from(error: MessagePushError) -> Self {
        RelayError::Transport(error.to_string())
    }
}

/// Connection Manager trait
///
/// 接続ごとの役割（participant / viewer）、紐づくセッション、参加時刻を管理する。
#[async_trait]
pub trait ConnectionManager: Send + Sync {
    /// 接続を登録して `Open` にする
    ///
    /// participant は同一セッション内でクライアント ID が重複すると `IdentityConflict`。
    async fn register(
        &self,
        request: ConnectionRequest,
        link: ConnectionLink,
    ) -> Result<Connection, RelayError>;

    /// 接続を解除して `Closed` にする。未登録（解除済み）なら `None`
    async fn unregister(&self, connection: &Connection) -> Option<Connection>;

    /// セッションの participant 接続一覧
    async fn participants(&self, session_id: &SessionId) -> Vec<Connection>;

    /// セッションにスコープされた viewer 接続一覧
    async fn viewers(&self, session_id: &SessionId) -> Vec<Connection>;

    /// 特定の接続にフレームを送信
    async fn push_to(
        &self,
        connection: &Connection,
        frame: OutboundFrame,
    ) -> Result<(), MessagePushError>;

    /// セッションの全接続（participant と viewer）にフレームを送信
    ///
    /// 送信に失敗した接続を返す。失敗は他の接続への配信に影響しない。
    async fn broadcast(&self, session_id: &SessionId, frame: OutboundFrame) -> Vec<Connection>;

    /// セッションの全接続に最後のフレームを積んでから登録を外す
    async fn evict_session(
        &self,
        session_id: &SessionId,
        frame: OutboundFrame,
    ) -> Vec<EvictedConnection>;
}
