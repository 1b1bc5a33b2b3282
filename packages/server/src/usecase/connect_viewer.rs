//! UseCase: viewer 接続処理
//!
//! viewer は 1 つのセッションにスコープされた読み取り専用の接続。
//! ID の重複チェックは行わず、接続時にログ全体をリプレイする。

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{
    Connection, ConnectionLink, ConnectionManager, ConnectionRequest, ConnectionRole, RelayError,
    SessionId, SessionRegistry, Timestamp,
};

use super::{BroadcastRouter, ReplayEngine};

/// viewer 接続のユースケース
pub struct ConnectViewerUseCase {
    registry: Arc<dyn SessionRegistry>,
    connections: Arc<dyn ConnectionManager>,
    router: Arc<BroadcastRouter>,
    replay: Arc<ReplayEngine>,
    clock: Arc<dyn Clock>,
}

impl ConnectViewerUseCase {
    pub fn new(
        registry: Arc<dyn SessionRegistry>,
        connections: Arc<dyn ConnectionManager>,
        router: Arc<BroadcastRouter>,
        replay: Arc<ReplayEngine>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            connections,
            router,
            replay,
            clock,
        }
    }

    /// viewer 接続を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Connection)` - 登録済みの接続（Open）
    /// * `Err(RelayError)` - `SessionNotFound` / `SessionEnded`
    pub async fn execute(
        &self,
        session_id: SessionId,
        link: ConnectionLink,
    ) -> Result<Connection, RelayError> {
        if self.registry.get(&session_id).await?.is_ended() {
            return Err(RelayError::SessionEnded(session_id.into_string()));
        }

        let _gate = self.router.lock(&session_id).await;
        if self.registry.get(&session_id).await?.is_ended() {
            return Err(RelayError::SessionEnded(session_id.into_string()));
        }

        let connection = self
            .connections
            .register(
                ConnectionRequest {
                    role: ConnectionRole::Viewer,
                    session_id,
                    client_id: None,
                    joined_at: Timestamp::new(self.clock.now_millis()),
                },
                link,
            )
            .await?;

        let replayed = self.replay.replay(&connection).await?;
        tracing::info!(connection = %connection.label(), replayed, "Viewer registered");

        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CreateSession, MessageDraft, Session, repository::MockSessionRegistry,
    };
    use crate::usecase::test_support::Fixture;

    fn usecase_with_registry(
        fixture: &Fixture,
        registry: Arc<dyn SessionRegistry>,
    ) -> ConnectViewerUseCase {
        ConnectViewerUseCase::new(
            registry,
            fixture.connections.clone(),
            fixture.router.clone(),
            fixture.replay.clone(),
            fixture.clock.clone(),
        )
    }

    #[tokio::test]
    async fn test_unknown_session_is_not_found() {
        // テスト項目: 存在しないセッションへの viewer 接続は SessionNotFound で、登録されない
        // given (前提条件):
        let fixture = Fixture::new();
        let mut registry = MockSessionRegistry::new();
        registry
            .expect_get()
            .times(1)
            .returning(|id| Err(RelayError::SessionNotFound(id.to_string())));
        let usecase = usecase_with_registry(&fixture, Arc::new(registry));

        // when (操作):
        let (link, _rx) = Fixture::link();
        let result = usecase.execute(Fixture::sid("ghost"), link).await;

        // then (期待する結果):
        assert_eq!(result, Err(RelayError::SessionNotFound("ghost".to_string())));
        assert!(fixture.connections.viewers(&Fixture::sid("ghost")).await.is_empty());
    }

    #[tokio::test]
    async fn test_ended_session_refuses_viewer() {
        // テスト項目: 終了済みセッションへの viewer 接続は SessionEnded
        // given (前提条件):
        let fixture = Fixture::new();
        let mut registry = MockSessionRegistry::new();
        registry.expect_get().returning(|id| {
            let mut session = Session::new(id.clone(), Timestamp::new(0), &CreateSession::default());
            session.end(Timestamp::new(1));
            Ok(session)
        });
        let usecase = usecase_with_registry(&fixture, Arc::new(registry));

        // when (操作):
        let (link, _rx) = Fixture::link();
        let result = usecase.execute(Fixture::sid("s1"), link).await;

        // then (期待する結果):
        assert_eq!(result, Err(RelayError::SessionEnded("s1".to_string())));
    }

    #[tokio::test]
    async fn test_viewer_gets_full_history_and_no_identity_check() {
        // テスト項目: viewer は全履歴を受け取り、複数接続しても拒否されない
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.create_session("s1").await;
        fixture
            .append("s1", MessageDraft::joined(Fixture::cid("A"), fixture.now()))
            .await;
        fixture.append("s1", fixture.chat("A", "m1")).await;
        let usecase = usecase_with_registry(&fixture, fixture.repository.clone());

        // when (操作):
        let (first, mut first_rx) = Fixture::link();
        let (second, mut second_rx) = Fixture::link();
        let v1 = usecase.execute(Fixture::sid("s1"), first).await;
        let v2 = usecase.execute(Fixture::sid("s1"), second).await;

        // then (期待する結果):
        assert!(v1.is_ok() && v2.is_ok());
        assert_eq!(Fixture::drain(&mut first_rx).len(), 2);
        assert_eq!(Fixture::drain(&mut second_rx).len(), 2);
        assert_eq!(fixture.connections.viewers(&Fixture::sid("s1")).await.len(), 2);
    }
}
