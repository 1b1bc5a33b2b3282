//! UseCase: セッションの参照系（詳細、メッセージ、統計）
//!
//! いずれも読み取り専用で、セッションの gate は取らない。

use std::sync::Arc;

use crate::domain::{
    ChatMessage, ClientId, ConnectionManager, MessageQuery, MessageStore, RelayError, Session,
    SessionId, SessionRegistry, SessionStatistics,
};

/// Session metadata together with its live state
#[derive(Debug, Clone)]
pub struct SessionDetail {
    pub session: Session,
    /// Currently connected participants, sorted
    pub participants: Vec<ClientId>,
    pub viewer_count: usize,
    pub total_messages: usize,
}

/// セッション詳細取得のユースケース
pub struct GetSessionDetailUseCase {
    registry: Arc<dyn SessionRegistry>,
    store: Arc<dyn MessageStore>,
    connections: Arc<dyn ConnectionManager>,
}

impl GetSessionDetailUseCase {
    pub fn new(
        registry: Arc<dyn SessionRegistry>,
        store: Arc<dyn MessageStore>,
        connections: Arc<dyn ConnectionManager>,
    ) -> Self {
        Self {
            registry,
            store,
            connections,
        }
    }

    pub async fn execute(&self, session_id: &SessionId) -> Result<SessionDetail, RelayError> {
        let session = self.registry.get(session_id).await?;
        let total_messages = self.store.count(session_id).await?;
        let participants = self
            .connections
            .participants(session_id)
            .await
            .into_iter()
            .filter_map(|c| c.client_id)
            .collect();
        let viewer_count = self.connections.viewers(session_id).await.len();

        Ok(SessionDetail {
            session,
            participants,
            viewer_count,
            total_messages,
        })
    }
}

/// メッセージログ取得のユースケース
pub struct GetSessionMessagesUseCase {
    store: Arc<dyn MessageStore>,
}

impl GetSessionMessagesUseCase {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// 全ログをシーケンス順に、フィルタを適用して返す
    pub async fn execute(
        &self,
        session_id: &SessionId,
        query: &MessageQuery,
    ) -> Result<Vec<ChatMessage>, RelayError> {
        let messages = self.store.all(session_id).await?;
        Ok(query.apply(messages))
    }
}

/// 統計取得のユースケース
pub struct GetSessionStatisticsUseCase {
    store: Arc<dyn MessageStore>,
}

impl GetSessionStatisticsUseCase {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    pub async fn execute(&self, session_id: &SessionId) -> Result<SessionStatistics, RelayError> {
        let messages = self.store.all(session_id).await?;
        Ok(SessionStatistics::compute(&messages))
    }
}
