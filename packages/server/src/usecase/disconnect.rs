//! UseCase: 切断処理
//!
//! participant / viewer のどちらの接続にも使う。
//! 登録解除はセッションの gate の中で行い、設定が有効なら leave イベントを追記・配信する。

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{Connection, Timestamp};

use super::BroadcastRouter;

/// 切断のユースケース
pub struct DisconnectUseCase {
    router: Arc<BroadcastRouter>,
    clock: Arc<dyn Clock>,
}

impl DisconnectUseCase {
    pub fn new(router: Arc<BroadcastRouter>, clock: Arc<dyn Clock>) -> Self {
        Self { router, clock }
    }

    /// 切断を実行
    ///
    /// 既に登録解除されている接続（セッション終了で evict 済み、配信失敗で除外済み）では何もしない。
    pub async fn execute(&self, connection: &Connection) {
        let now = Timestamp::new(self.clock.now_millis());
        self.router.disconnect(connection, now).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionManager, ConnectionRole, MessageStore};
    use crate::usecase::test_support::Fixture;

    #[tokio::test]
    async fn test_disconnect_releases_identity() {
        // テスト項目: 切断すると client_id の束縛が解放される
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = DisconnectUseCase::new(fixture.router.clone(), fixture.clock.clone());
        fixture.create_session("s1").await;
        let (alice, _rx) = fixture.register(ConnectionRole::Participant, "s1", Some("alice")).await;

        // when (操作):
        usecase.execute(&alice).await;

        // then (期待する結果):
        assert!(fixture.connections.participants(&Fixture::sid("s1")).await.is_empty());
        assert_eq!(fixture.repository.count(&Fixture::sid("s1")).await, Ok(0));
    }

    #[tokio::test]
    async fn test_disconnect_announces_leave_when_enabled() {
        // テスト項目: announce_leave 有効時は leave イベントがログに残る
        // given (前提条件):
        let fixture = Fixture::with_announce_leave(true);
        let usecase = DisconnectUseCase::new(fixture.router.clone(), fixture.clock.clone());
        fixture.create_session("s1").await;
        let (alice, _rx) = fixture.register(ConnectionRole::Participant, "s1", Some("alice")).await;

        // when (操作):
        usecase.execute(&alice).await;

        // then (期待する結果):
        let log = fixture.repository.all(&Fixture::sid("s1")).await.unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].body.as_str(), "Client alice has left the room");
        assert_eq!(log[0].author.as_str(), "alice");
    }

    #[tokio::test]
    async fn test_viewer_disconnect_never_announces() {
        // テスト項目: viewer の切断では leave イベントを出さない
        let fixture = Fixture::with_announce_leave(true);
        let usecase = DisconnectUseCase::new(fixture.router.clone(), fixture.clock.clone());
        fixture.create_session("s1").await;
        let (viewer, _rx) = fixture.register(ConnectionRole::Viewer, "s1", None).await;

        usecase.execute(&viewer).await;

        assert!(fixture.connections.viewers(&Fixture::sid("s1")).await.is_empty());
        assert_eq!(fixture.repository.count(&Fixture::sid("s1")).await, Ok(0));
    }
}
