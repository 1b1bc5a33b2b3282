//! UseCase: セッション一覧の取得

use std::sync::Arc;

use crate::domain::{Session, SessionRegistry, SessionStatus};

/// セッション一覧取得のユースケース
pub struct ListSessionsUseCase {
    registry: Arc<dyn SessionRegistry>,
}

impl ListSessionsUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>) -> Self {
        Self { registry }
    }

    /// 作成日時の降順。`status` を指定するとその状態のセッションだけを返す
    pub async fn execute(&self, status: Option<SessionStatus>) -> Vec<Session> {
        let sessions = self.registry.list().await;
        match status {
            Some(status) => sessions.into_iter().filter(|s| s.status == status).collect(),
            None => sessions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CreateSession, SessionId, Timestamp, repository::MockSessionRegistry};

    fn session(id: &str, ended: bool) -> Session {
        let mut session = Session::new(
            SessionId::new(id.to_string()).unwrap(),
            Timestamp::new(0),
            &CreateSession::default(),
        );
        if ended {
            session.end(Timestamp::new(1));
        }
        session
    }

    #[tokio::test]
    async fn test_list_sessions_filters_by_status() {
        // テスト項目: status 指定で active / ended のセッションだけを返す
        // given (前提条件):
        let mut registry = MockSessionRegistry::new();
        registry
            .expect_list()
            .returning(|| vec![session("live", false), session("done", true)]);
        let usecase = ListSessionsUseCase::new(Arc::new(registry));

        // when (操作):
        let all = usecase.execute(None).await;
        let active = usecase.execute(Some(SessionStatus::Active)).await;
        let ended = usecase.execute(Some(SessionStatus::Ended)).await;

        // then (期待する結果):
        assert_eq!(all.len(), 2);
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id.as_str(), "live");
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0].id.as_str(), "done");
    }
}
