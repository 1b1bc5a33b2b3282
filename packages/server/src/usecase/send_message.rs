//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - participant の発言がログに追記され、セッション内の全接続（送信者自身と viewer を含む）に届くこと
//!
//! ### なぜこのテストが必要か
//! - 他セッションへ漏れないこと、viewer が発言できないことを保証
//! - 終了済みセッションへの発言が SessionEnded になることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：発言とブロードキャスト
//! - 異常系：viewer からの発言、終了済みセッション

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{
    ChatMessage, Connection, MessageBody, MessageDraft, RelayError, Timestamp, ValueObjectError,
};

use super::BroadcastRouter;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    router: Arc<BroadcastRouter>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(router: Arc<BroadcastRouter>, clock: Arc<dyn Clock>) -> Self {
        Self { router, clock }
    }

    /// メッセージ送信を実行
    ///
    /// タイムスタンプはリレーの時計で付け直す（クライアントの値は信用しない）。
    ///
    /// # Returns
    ///
    /// * `Ok(ChatMessage)` - 追記・配信済みのメッセージ
    /// * `Err(RelayError)` - viewer からの送信、終了済みセッション
    pub async fn execute(
        &self,
        connection: &Connection,
        body: MessageBody,
    ) -> Result<ChatMessage, RelayError> {
        let author = connection
            .client_id
            .clone()
            .ok_or(ValueObjectError::Empty("client_id"))?;
        let now = Timestamp::new(self.clock.now_millis());

        let message = self
            .router
            .publish(&connection.session_id, MessageDraft::chat(author, body, now))
            .await?;
        tracing::debug!(
            connection = %connection.label(),
            seq = message.sequence.value(),
            "Message relayed"
        );
        Ok(message)
    }
}
