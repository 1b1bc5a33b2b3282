//! Repository trait 定義
//!
//! Session Registry と Message Store のインターフェース。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//! Registry がセッションとそのメッセージログを排他的に所有するため、
//! 両 trait は同じ実装で提供される想定です。

use async_trait::async_trait;

use super::{
    entity::{ChatMessage, CreateSession, MessageDraft, Session},
    error::RelayError,
    value_object::{ClientId, PasswordHash, SessionId, Timestamp},
};

/// Session Registry trait
///
/// セッション ID からメタデータ（パスワード、作成時刻、終了状態）を引く。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionRegistry: Send + Sync {
    /// セッションを作成、既に存在する場合はパスワードを検証して返す（ID について冪等）
    async fn create_or_get(
        &self,
        request: CreateSession,
        now: Timestamp,
    ) -> Result<Session, RelayError>;

    /// セッションを終了状態にする
    ///
    /// 新たに終了した場合は `Ok(true)`、既に終了済みなら `Ok(false)`（エラーではない）。
    async fn end(&self, session_id: &SessionId, now: Timestamp) -> Result<bool, RelayError>;

    /// セッションを取得
    async fn get(&self, session_id: &SessionId) -> Result<Session, RelayError>;

    /// 全セッションを作成日時の降順で取得
    async fn list(&self) -> Vec<Session>;

    /// 参加者のユーザーパスワードを検証する（保存はしない）
    ///
    /// 未登録のクライアント ID に初めてパスワードが指定された場合は、その hash を返す。
    async fn authorize_participant(
        &self,
        session_id: &SessionId,
        client_id: &ClientId,
        user_password: Option<String>,
    ) -> Result<Option<PasswordHash>, RelayError>;

    /// 登録に成功した接続のユーザーパスワードを紐づける（既存の紐づけは変更しない）
    async fn bind_user_password(
        &self,
        session_id: &SessionId,
        client_id: &ClientId,
        hash: PasswordHash,
    ) -> Result<(), RelayError>;

    /// 終了済みセッションをメッセージログごと削除する
    ///
    /// 存在しなければ `SessionNotFound`、まだ終了していなければ `SessionActive`。
    async fn delete(&self, session_id: &SessionId) -> Result<Session, RelayError>;
}

/// Message Store trait
///
/// セッションごとの追記専用ログ。リプレイの唯一の情報源。
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// メッセージを追記し、シーケンス番号を振った保存済みメッセージを返す
    ///
    /// 終了済みセッションへの追記は `SessionEnded` で失敗する。
    async fn append(
        &self,
        session_id: &SessionId,
        draft: MessageDraft,
    ) -> Result<ChatMessage, RelayError>;

    /// カットオフ以降（timestamp >= cutoff）のメッセージをシーケンス順に取得
    async fn since(
        &self,
        session_id: &SessionId,
        cutoff: Timestamp,
    ) -> Result<Vec<ChatMessage>, RelayError>;

    /// 全メッセージをシーケンス順に取得
    async fn all(&self, session_id: &SessionId) -> Result<Vec<ChatMessage>, RelayError>;

    /// メッセージ件数
    async fn count(&self, session_id: &SessionId) -> Result<usize, RelayError>;
}
