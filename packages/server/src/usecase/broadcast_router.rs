//! Broadcast Router
//!
//! セッション単位の排他区間（gate）と、追記 → fan-out の原子性を受け持つ。
//!
//! - 追記と fan-out は同じ gate の中で行うため、接続が seq N を N-1 より先に受け取ることはない
//! - fan-out は各接続のチャンネルへの enqueue のみで、ネットワーク I/O を待たない
//! - 送信に失敗した接続は切断扱いとして登録解除し、他の接続への配信は続ける
//!
//! gate はセッション ID ごとに独立しており、別セッションの処理とは競合しない。
//! セッションが削除されると、その gate も `forget` で取り除かれる。

use std::{collections::HashMap, collections::VecDeque, sync::Arc};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{
    ChatMessage, Connection, ConnectionManager, MessageDraft, MessageStore, OutboundFrame,
    RelayError, SessionId, Timestamp,
};

/// Held while a session's log or connection set is being changed
pub type SessionGate = OwnedMutexGuard<()>;

pub struct BroadcastRouter {
    store: Arc<dyn MessageStore>,
    connections: Arc<dyn ConnectionManager>,
    announce_leave: bool,
    gates: Mutex<HashMap<SessionId, Arc<Mutex<()>>>>,
}

impl BroadcastRouter {
    pub fn new(
        store: Arc<dyn MessageStore>,
        connections: Arc<dyn ConnectionManager>,
        announce_leave: bool,
    ) -> Self {
        Self {
            store,
            connections,
            announce_leave,
            gates: Mutex::new(HashMap::new()),
        }
    }

    /// Enter the critical section of `session_id`
    pub async fn lock(&self, session_id: &SessionId) -> SessionGate {
        let gate = {
            let mut gates = self.gates.lock().await;
            gates.entry(session_id.clone()).or_default().clone()
        };
        gate.lock_owned().await
    }

    /// Drop the gate of a deleted session; the caller must hold it
    pub async fn forget(&self, session_id: &SessionId) {
        self.gates.lock().await.remove(session_id);
    }

    #[cfg(test)]
    pub(crate) async fn has_gate(&self, session_id: &SessionId) -> bool {
        self.gates.lock().await.contains_key(session_id)
    }

    /// Append a message and fan it out to every connection of its session
    pub async fn publish(
        &self,
        session_id: &SessionId,
        draft: MessageDraft,
    ) -> Result<ChatMessage, RelayError> {
        let _gate = self.lock(session_id).await;
        self.publish_locked(session_id, draft).await
    }

    /// `publish` for callers that already hold the session gate
    pub async fn publish_locked(
        &self,
        session_id: &SessionId,
        draft: MessageDraft,
    ) -> Result<ChatMessage, RelayError> {
        let message = self.store.append(session_id, draft).await?;
        tracing::debug!(
            session_id = %session_id,
            seq = message.sequence.value(),
            kind = message.kind.as_str(),
            "Message appended"
        );
        self.fan_out_locked(&message).await;
        Ok(message)
    }

    /// Deliver a stored message; the caller must hold the session gate
    ///
    /// Connections whose channel is gone are unregistered. When leave events are
    /// enabled their departure is appended and fanned out as well.
    pub async fn fan_out_locked(&self, message: &ChatMessage) {
        let session_id = &message.session_id;
        let mut pending = VecDeque::from([message.clone()]);

        while let Some(message) = pending.pop_front() {
            let failed = self
                .connections
                .broadcast(session_id, OutboundFrame::Message(message.clone()))
                .await;

            for connection in failed {
                let Some(closed) = self.connections.unregister(&connection).await else {
                    continue;
                };
                tracing::warn!(
                    connection = %closed.label(),
                    "Dropped connection after failed delivery"
                );
                if let Some(draft) = self.leave_draft(&closed, message.timestamp) {
                    match self.store.append(session_id, draft).await {
                        Ok(left) => pending.push_back(left),
                        Err(e) => tracing::debug!("Leave event not recorded: {}", e),
                    }
                }
            }
        }
    }

    /// Unregister a connection under the session gate, announcing the leave if enabled
    pub async fn disconnect(&self, connection: &Connection, now: Timestamp) {
        let _gate = self.lock(&connection.session_id).await;

        let Some(closed) = self.connections.unregister(connection).await else {
            // already evicted (session end) or dropped after a failed delivery
            return;
        };
        tracing::info!(connection = %closed.label(), "Connection closed");

        if let Some(draft) = self.leave_draft(&closed, now) {
            match self.publish_locked(&closed.session_id, draft).await {
                Ok(_) | Err(RelayError::SessionEnded(_)) => {}
                Err(e) => tracing::warn!("Failed to announce leave: {}", e),
            }
        }
    }

    fn leave_draft(&self, connection: &Connection, now: Timestamp) -> Option<MessageDraft> {
        if !self.announce_leave {
            return None;
        }
        connection
            .client_id
            .clone()
            .map(|client_id| MessageDraft::left(client_id, now))
    }
}
