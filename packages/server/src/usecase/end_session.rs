//! UseCase: セッション終了処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - EndSessionUseCase::execute() メソッド
//! - session_end の記録と配信、接続の evict、猶予期間後の強制切断
//!
//! ### なぜこのテストが必要か
//! - 全接続がちょうど 1 回 session_end を受け取ってから閉じられることを保証
//! - 終了後の追記が SessionEnded になり、2 回目の終了が何もしないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：participant と viewer が接続中のセッションを終了
//! - エッジケース：終了済みセッションの再終了、存在しないセッション

use std::{sync::Arc, time::Duration};

use hiroba_shared::time::Clock;

use crate::domain::{
    ConnectionManager, MessageDraft, MessageStore, OutboundFrame, RelayError, Session,
    SessionId, SessionRegistry, Timestamp,
};

use super::BroadcastRouter;

/// WebSocket close code sent after `session_end` (normal closure)
pub const SESSION_END_CLOSE_CODE: u16 = 1000;

/// セッション終了のユースケース
pub struct EndSessionUseCase {
    registry: Arc<dyn SessionRegistry>,
    store: Arc<dyn MessageStore>,
    connections: Arc<dyn ConnectionManager>,
    router: Arc<BroadcastRouter>,
    clock: Arc<dyn Clock>,
    grace_period: Duration,
}

impl EndSessionUseCase {
    pub fn new(
        registry: Arc<dyn SessionRegistry>,
        store: Arc<dyn MessageStore>,
        connections: Arc<dyn ConnectionManager>,
        router: Arc<BroadcastRouter>,
        clock: Arc<dyn Clock>,
        grace_period: Duration,
    ) -> Self {
        Self {
            registry,
            store,
            connections,
            router,
            clock,
            grace_period,
        }
    }

    /// セッション終了を実行
    ///
    /// 1. `session_end` をログの最後のエントリとして追記
    /// 2. セッションを終了状態にする
    /// 3. 全接続に `session_end` を配信し、Close フレームを積んで evict
    /// 4. 猶予期間後、残っているソケットを強制的に閉じる
    ///
    /// 終了済みなら何もせずに現在のセッションを返す。
    pub async fn execute(&self, session_id: &SessionId) -> Result<Session, RelayError> {
        self.registry.get(session_id).await?;

        let _gate = self.router.lock(session_id).await;
        let session = self.registry.get(session_id).await?;
        if session.is_ended() {
            tracing::debug!(session_id = %session_id, "Session already ended");
            return Ok(session);
        }

        let now = Timestamp::new(self.clock.now_millis());
        let notice = self
            .store
            .append(session_id, MessageDraft::session_end(now))
            .await?;
        self.registry.end(session_id, now).await?;

        let failed = self
            .connections
            .broadcast(session_id, OutboundFrame::Message(notice))
            .await;
        let evicted = self
            .connections
            .evict_session(
                session_id,
                OutboundFrame::Close {
                    code: SESSION_END_CLOSE_CODE,
                    reason: RelayError::SessionEnded(session_id.to_string())
                        .close_reason()
                        .to_string(),
                },
            )
            .await;
        tracing::info!(
            session_id = %session_id,
            notified = evicted.len().saturating_sub(failed.len()),
            "Session ended"
        );

        let terminators: Vec<_> = evicted.into_iter().map(|e| e.terminator).collect();
        let grace_period = self.grace_period;
        tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;
            for terminator in terminators {
                terminator.notify_one();
            }
        });

        self.registry.get(session_id).await
    }
}
