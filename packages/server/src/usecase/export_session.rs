//! UseCase: セッションのエクスポート
//!
//! 詳細・全ログ・統計をひとまとめにして返す。CSV / JSON への整形は UI 層が行う。

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{
    ChatMessage, ConnectionManager, MessageStore, RelayError, SessionId, SessionRegistry,
    SessionStatistics, Timestamp,
};

use super::{GetSessionDetailUseCase, SessionDetail};

/// Everything an export document is built from
#[derive(Debug, Clone)]
pub struct SessionExport {
    pub detail: SessionDetail,
    pub messages: Vec<ChatMessage>,
    pub statistics: SessionStatistics,
    pub exported_at: Timestamp,
}

/// セッションエクスポートのユースケース
pub struct ExportSessionUseCase {
    detail: GetSessionDetailUseCase,
    store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
}

impl ExportSessionUseCase {
    pub fn new(
        registry: Arc<dyn SessionRegistry>,
        store: Arc<dyn MessageStore>,
        connections: Arc<dyn ConnectionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            detail: GetSessionDetailUseCase::new(registry, store.clone(), connections),
            store,
            clock,
        }
    }

    pub async fn execute(&self, session_id: &SessionId) -> Result<SessionExport, RelayError> {
        let detail = self.detail.execute(session_id).await?;
        let messages = self.store.all(session_id).await?;
        let statistics = SessionStatistics::compute(&messages);

        Ok(SessionExport {
            detail,
            messages,
            statistics,
            exported_at: Timestamp::new(self.clock.now_millis()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageDraft;
    use crate::usecase::test_support::Fixture;

    #[tokio::test]
    async fn test_export_collects_log_and_statistics() {
        // テスト項目: エクスポートには全ログ（system を含む）と message のみの統計が入る
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.create_session("s1").await;
        fixture
            .append("s1", MessageDraft::joined(Fixture::cid("alice"), fixture.now()))
            .await;
        fixture.append("s1", fixture.chat("alice", "hello world")).await;
        let usecase = ExportSessionUseCase::new(
            fixture.repository.clone(),
            fixture.repository.clone(),
            fixture.connections.clone(),
            fixture.clock.clone(),
        );

        // when (操作):
        let export = usecase.execute(&Fixture::sid("s1")).await.unwrap();

        // then (期待する結果):
        assert_eq!(export.messages.len(), 2);
        assert_eq!(export.detail.total_messages, 2);
        assert_eq!(export.statistics.total_messages, 1);
        assert_eq!(export.statistics.total_words, 2);
        assert_eq!(export.exported_at, fixture.now());
    }

    #[tokio::test]
    async fn test_export_unknown_session_is_not_found() {
        // テスト項目: 存在しないセッションのエクスポートは SessionNotFound
        let fixture = Fixture::new();
        let usecase = ExportSessionUseCase::new(
            fixture.repository.clone(),
            fixture.repository.clone(),
            fixture.connections.clone(),
            fixture.clock.clone(),
        );

        let result = usecase.execute(&Fixture::sid("ghost")).await;

        assert!(matches!(result, Err(RelayError::SessionNotFound(_))));
    }
}
