//! UseCase: 終了済みセッションの削除
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DeleteSessionUseCase::execute() メソッド
//! - Registry のレコードとメッセージログ、Router の gate が取り除かれること
//!
//! ### どのような状況を想定しているか
//! - 正常系：終了済みセッションの削除
//! - 異常系：進行中のセッション、存在しないセッション

use std::sync::Arc;

use crate::domain::{RelayError, Session, SessionId, SessionRegistry};

use super::BroadcastRouter;

/// セッション削除のユースケース
pub struct DeleteSessionUseCase {
    registry: Arc<dyn SessionRegistry>,
    router: Arc<BroadcastRouter>,
}

impl DeleteSessionUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>, router: Arc<BroadcastRouter>) -> Self {
        Self { registry, router }
    }

    /// 終了済みセッションを削除し、削除したセッションを返す
    ///
    /// 進行中のセッションは `SessionActive` で拒否する。
    pub async fn execute(&self, session_id: &SessionId) -> Result<Session, RelayError> {
        // 存在しないセッションのために gate を作らない
        self.registry.get(session_id).await?;

        let _gate = self.router.lock(session_id).await;
        let session = self.registry.delete(session_id).await?;
        self.router.forget(session_id).await;

        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageStore, SessionStatus};
    use crate::usecase::test_support::Fixture;

    fn usecase(fixture: &Fixture) -> DeleteSessionUseCase {
        DeleteSessionUseCase::new(fixture.repository.clone(), fixture.router.clone())
    }

    #[tokio::test]
    async fn test_delete_ended_session_removes_record_and_gate() {
        // テスト項目: 終了済みセッションを削除すると、レコード・ログ・gate がすべて消える
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.create_session("s1").await;
        fixture
            .router
            .publish(&Fixture::sid("s1"), fixture.chat("alice", "hi"))
            .await
            .unwrap();
        fixture.repository.end(&Fixture::sid("s1"), fixture.now()).await.unwrap();
        assert!(fixture.router.has_gate(&Fixture::sid("s1")).await);

        // when (操作):
        let deleted = usecase(&fixture).execute(&Fixture::sid("s1")).await;

        // then (期待する結果):
        assert_eq!(deleted.unwrap().status, SessionStatus::Ended);
        assert!(!fixture.router.has_gate(&Fixture::sid("s1")).await);
        assert!(matches!(
            fixture.repository.all(&Fixture::sid("s1")).await,
            Err(RelayError::SessionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_active_session_is_not_deleted() {
        // テスト項目: 進行中のセッションは SessionActive で拒否され、残り続ける
        // given (前提条件):
        let fixture = Fixture::new();
        fixture.create_session("s1").await;

        // when (操作):
        let result = usecase(&fixture).execute(&Fixture::sid("s1")).await;

        // then (期待する結果):
        assert_eq!(result.err(), Some(RelayError::SessionActive("s1".to_string())));
        assert!(fixture.repository.get(&Fixture::sid("s1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_unknown_session_creates_no_gate() {
        // テスト項目: 存在しないセッションの削除は SessionNotFound で、gate も作られない
        let fixture = Fixture::new();

        let result = usecase(&fixture).execute(&Fixture::sid("ghost")).await;

        assert!(matches!(result, Err(RelayError::SessionNotFound(_))));
        assert!(!fixture.router.has_gate(&Fixture::sid("ghost")).await);
    }
}
