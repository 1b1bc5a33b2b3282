//! Replay Engine
//!
//! 接続直後に、その接続が閲覧を許される履歴メッセージを送り出す。
//! 呼び出し側はセッションの gate を保持していること（新しいメッセージの配信より先に
//! リプレイがキューに積まれることを保証するため）。

use std::sync::Arc;

use crate::domain::{
    ChatMessage, Connection, ConnectionManager, ConnectionRole, MessageStore, OutboundFrame,
    RelayError, replay,
};

pub struct ReplayEngine {
    store: Arc<dyn MessageStore>,
    connections: Arc<dyn ConnectionManager>,
    /// Duplicate-join guard (milliseconds)
    rejoin_window_ms: i64,
}

impl ReplayEngine {
    pub fn new(
        store: Arc<dyn MessageStore>,
        connections: Arc<dyn ConnectionManager>,
        rejoin_window_ms: i64,
    ) -> Self {
        Self {
            store,
            connections,
            rejoin_window_ms,
        }
    }

    /// Messages `connection` is entitled to see right now, in sequence order
    pub async fn entitled(&self, connection: &Connection) -> Result<Vec<ChatMessage>, RelayError> {
        let session_id = &connection.session_id;
        match (connection.role, &connection.client_id) {
            (ConnectionRole::Viewer, _) => Ok(replay::viewer_view(self.store.all(session_id).await?)),
            (ConnectionRole::Participant, Some(client_id)) => {
                let log = self.store.all(session_id).await?;
                let Some(join_time) = replay::earliest_join_time(&log, client_id) else {
                    return Ok(Vec::new());
                };
                let since_join = self.store.since(session_id, join_time).await?;
                Ok(replay::participant_view(
                    since_join,
                    client_id,
                    join_time,
                    self.rejoin_window_ms,
                ))
            }
            (ConnectionRole::Participant, None) => Ok(Vec::new()),
        }
    }

    /// Stream the entitled history to `connection`; returns how many messages were queued
    ///
    /// Stops at the first failed push: a closed connection gets no partial retry.
    pub async fn replay(&self, connection: &Connection) -> Result<usize, RelayError> {
        let messages = self.entitled(connection).await?;
        let mut sent = 0;
        for message in messages {
            if let Err(e) = self
                .connections
                .push_to(connection, OutboundFrame::Message(message))
                .await
            {
                tracing::warn!(
                    connection = %connection.label(),
                    "Replay aborted after {} messages: {}",
                    sent,
                    e
                );
                break;
            }
            sent += 1;
        }
        Ok(sent)
    }
}
