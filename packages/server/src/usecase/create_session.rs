//! UseCase: セッションの明示的な作成

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{CreateSession, RelayError, Session, SessionRegistry, Timestamp};

/// セッション作成のユースケース（ID について冪等）
pub struct CreateSessionUseCase {
    registry: Arc<dyn SessionRegistry>,
    clock: Arc<dyn Clock>,
}

impl CreateSessionUseCase {
    pub fn new(registry: Arc<dyn SessionRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    pub async fn execute(&self, request: CreateSession) -> Result<Session, RelayError> {
        let now = Timestamp::new(self.clock.now_millis());
        self.registry.create_or_get(request, now).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SessionId, SessionMetadata, repository::MockSessionRegistry};
    use hiroba_shared::time::FixedClock;
    use mockall::predicate::eq;

    #[tokio::test]
    async fn test_create_session_stamps_relay_time() {
        // テスト項目: 作成時刻はリレーの時計で付けられ、要求はそのまま Registry に渡る
        // given (前提条件):
        let request = CreateSession {
            metadata: SessionMetadata {
                purpose: Some("retro".to_string()),
                notes: None,
            },
            ..CreateSession::default()
        };
        let mut registry = MockSessionRegistry::new();
        registry
            .expect_create_or_get()
            .with(eq(request.clone()), eq(Timestamp::new(42)))
            .times(1)
            .returning(|request, now| {
                let id = SessionId::new("generated".to_string()).unwrap();
                Ok(Session::new(id, now, &request))
            });
        let usecase = CreateSessionUseCase::new(Arc::new(registry), Arc::new(FixedClock::new(42)));

        // when (操作):
        let session = usecase.execute(request).await.unwrap();

        // then (期待する結果):
        assert_eq!(session.created_at, Timestamp::new(42));
        assert_eq!(session.metadata.purpose.as_deref(), Some("retro"));
    }
}
