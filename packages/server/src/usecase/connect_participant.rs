//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::execute() / announce_join()
//! - セッションの暗黙作成、パスワード検証、クライアント ID の重複チェック、リプレイ
//! - 拒否された接続がユーザーパスワードを紐づけないこと
//!
//! ### なぜこのテストが必要か
//! - 同じ ID の 2 本目の接続を拒否し、切断後の再接続は受け付けることを保証
//! - リプレイが登録直後・join メッセージの追記前に行われることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：初回接続、再接続（リプレイあり）
//! - 異常系：重複した client_id、パスワード不一致、終了済みセッション

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::domain::{
    ChatMessage, ClientId, Connection, ConnectionLink, ConnectionManager, ConnectionRequest,
    ConnectionRole, CreateSession, MessageDraft, RelayError, SessionId, SessionRegistry,
    Timestamp, ValueObjectError,
};

use super::{BroadcastRouter, ReplayEngine};

/// Connection parameters of the participant endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantRequest {
    pub session_id: SessionId,
    pub client_id: ClientId,
    pub session_password: Option<String>,
    pub user_password: Option<String>,
}

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    registry: Arc<dyn SessionRegistry>,
    connections: Arc<dyn ConnectionManager>,
    router: Arc<BroadcastRouter>,
    replay: Arc<ReplayEngine>,
    clock: Arc<dyn Clock>,
}

impl ConnectParticipantUseCase {
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

    /// 参加者接続を実行
    ///
    /// セッションが無ければ作成し、認証と ID の重複チェックを経て登録する。
    /// 初めて指定されたユーザーパスワードは、登録に成功した接続のものだけが紐づく。
    /// 登録と同じ gate の中でリプレイをキューに積むため、以降のライブ配信より必ず先に届く。
    ///
    /// # Returns
    ///
    /// * `Ok(Connection)` - 登録済みの接続（Open）
    /// * `Err(RelayError)` - `AuthError` / `SessionEnded` / `IdentityConflict`
    pub async fn execute(
        &self,
        request: ParticipantRequest,
        link: ConnectionLink,
    ) -> Result<Connection, RelayError> {
        let now = Timestamp::new(self.clock.now_millis());

        // 1. セッションの作成または取得（既存ならセッションパスワードを検証）
        let session = self
            .registry
            .create_or_get(
                CreateSession::on_join(request.session_id.clone(), request.session_password),
                now,
            )
            .await?;
        if session.is_ended() {
            return Err(RelayError::SessionEnded(session.id.into_string()));
        }

        // 2. gate の中で認証、登録、リプレイ
        let _gate = self.router.lock(&request.session_id).await;

        // gate を待つ間に終了した可能性がある
        if self.registry.get(&request.session_id).await?.is_ended() {
            return Err(RelayError::SessionEnded(request.session_id.into_string()));
        }

        // ユーザーパスワードは検証のみ。初回指定の紐づけは登録に成功してから行う
        let claim = self
            .registry
            .authorize_participant(&request.session_id, &request.client_id, request.user_password)
            .await?;

        let connection = self
            .connections
            .register(
                ConnectionRequest {
                    role: ConnectionRole::Participant,
                    session_id: request.session_id,
                    client_id: Some(request.client_id),
                    joined_at: now,
                },
                link,
            )
            .await?;

        if let (Some(hash), Some(client_id)) = (claim, &connection.client_id)
            && let Err(e) = self
                .registry
                .bind_user_password(&connection.session_id, client_id, hash)
                .await
        {
            self.connections.unregister(&connection).await;
            return Err(e);
        }

        let replayed = self.replay.replay(&connection).await?;
        tracing::info!(
            connection = %connection.label(),
            replayed,
            "Participant registered"
        );

        Ok(connection)
    }

    /// join イベントを追記して全接続に配信
    ///
    /// 接続ごとに一度だけ呼ばれる想定（2 回目以降の join フレームは UI 層で無視する）。
    pub async fn announce_join(&self, connection: &Connection) -> Result<ChatMessage, RelayError> {
        let client_id = connection
            .client_id
            .clone()
            .ok_or(ValueObjectError::Empty("client_id"))?;
        let now = Timestamp::new(self.clock.now_millis());
        self.router
            .publish(&connection.session_id, MessageDraft::joined(client_id, now))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectionState, MessageKind};
    use crate::usecase::test_support::Fixture;

    fn usecase(fixture: &Fixture) -> ConnectParticipantUseCase {
        ConnectParticipantUseCase::new(
            fixture.repository.clone(),
            fixture.connections.clone(),
            fixture.router.clone(),
            fixture.replay.clone(),
            fixture.clock.clone(),
        )
    }

    fn request(session: &str, client: &str) -> ParticipantRequest {
        ParticipantRequest {
            session_id: Fixture::sid(session),
            client_id: Fixture::cid(client),
            session_password: None,
            user_password: None,
        }
    }

    #[tokio::test]
    async fn test_connect_participant_creates_session_on_first_join() {
        // テスト項目: 初回参加でセッションが作成され、接続が Open になる
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture);
        let (link, _rx) = Fixture::link();

        // when (操作):
        let result = usecase.execute(request("s1", "alice"), link).await;

        // then (期待する結果):
        let connection = result.unwrap();
        assert_eq!(connection.state, ConnectionState::Open);
        assert_eq!(connection.joined_at, fixture.now());
        assert!(fixture.repository.get(&Fixture::sid("s1")).await.is_ok());
    }

    #[tokio::test]
    async fn test_connect_participant_duplicate_error() {
        // テスト項目: 接続中の client_id での 2 本目の接続は IdentityConflict になる
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture);
        let (first, _rx1) = Fixture::link();
        usecase.execute(request("s1", "alice"), first).await.unwrap();

        // when (操作): 同じ client_id で接続を試みる
        let (second, _rx2) = Fixture::link();
        let result = usecase.execute(request("s1", "alice"), second).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RelayError::IdentityConflict("alice".to_string()))
        );
        assert_eq!(fixture.connections.participants(&Fixture::sid("s1")).await.len(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_after_disconnect_succeeds() {
        // テスト項目: 切断後は同じ client_id で再接続できる（冪等な再登録）
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture);
        let (first, _rx1) = Fixture::link();
        let connection = usecase.execute(request("s1", "alice"), first).await.unwrap();
        fixture.router.disconnect(&connection, fixture.now()).await;

        // when (操作):
        let (second, _rx2) = Fixture::link();
        let result = usecase.execute(request("s1", "alice"), second).await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_session_password_is_auth_error() {
        // テスト項目: パスワード付きセッションに誤ったパスワードで接続すると AuthError
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture);
        let (first, _rx1) = Fixture::link();
        let mut with_password = request("s1", "alice");
        with_password.session_password = Some("pw".to_string());
        usecase.execute(with_password, first).await.unwrap();

        // when (操作):
        let (second, _rx2) = Fixture::link();
        let mut wrong = request("s1", "bob");
        wrong.session_password = Some("nope".to_string());
        let result = usecase.execute(wrong, second).await;

        // then (期待する結果):
        assert!(matches!(result, Err(RelayError::AuthError(_))));
        assert_eq!(fixture.connections.participants(&Fixture::sid("s1")).await.len(), 1);
    }

    #[tokio::test]
    async fn test_ended_session_refuses_participant() {
        // テスト項目: 終了済みセッションへの接続は SessionEnded
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture);
        fixture.create_session("s1").await;
        fixture.repository.end(&Fixture::sid("s1"), fixture.now()).await.unwrap();

        // when (操作):
        let (link, _rx) = Fixture::link();
        let result = usecase.execute(request("s1", "alice"), link).await;

        // then (期待する結果):
        assert_eq!(result, Err(RelayError::SessionEnded("s1".to_string())));
    }

    #[tokio::test]
    async fn test_first_time_joiner_gets_no_replay() {
        // テスト項目: A が join・発言した後に初めて参加する B には何もリプレイされない
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture);
        let (a_link, _a_rx) = Fixture::link();
        let a = usecase.execute(request("s1", "A"), a_link).await.unwrap();
        usecase.announce_join(&a).await.unwrap();
        fixture
            .router
            .publish(&a.session_id, fixture.chat("A", "hi"))
            .await
            .unwrap();

        // when (操作):
        let (b_link, mut b_rx) = Fixture::link();
        let b = usecase.execute(request("s1", "B"), b_link).await.unwrap();

        // then (期待する結果): リプレイは空、その後の B の join は B 自身にも届く
        assert!(Fixture::drain(&mut b_rx).is_empty());
        let joined = usecase.announce_join(&b).await.unwrap();
        assert_eq!(joined.sequence.value(), 3);
        assert_eq!(Fixture::drain(&mut b_rx), vec![joined]);
    }

    #[tokio::test]
    async fn test_reconnect_replays_history_before_live_messages() {
        // テスト項目: 再接続時のリプレイは、その後のライブ配信より先にキューに積まれる
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture);
        let (first, _rx1) = Fixture::link();
        let a = usecase.execute(request("s1", "A"), first).await.unwrap();
        usecase.announce_join(&a).await.unwrap();
        fixture.clock.advance(10);
        fixture
            .router
            .publish(&a.session_id, fixture.chat("A", "m1"))
            .await
            .unwrap();
        fixture.router.disconnect(&a, fixture.now()).await;

        // when (操作): 200ms 後に再接続し、join を送ってから新しい発言
        fixture.clock.advance(200);
        let (second, mut rx) = Fixture::link();
        let again = usecase.execute(request("s1", "A"), second).await.unwrap();
        usecase.announce_join(&again).await.unwrap();
        fixture
            .router
            .publish(&again.session_id, fixture.chat("A", "m2"))
            .await
            .unwrap();

        // then (期待する結果): m1（リプレイ）→ join（ライブ）→ m2（ライブ）
        let received = Fixture::drain(&mut rx);
        let kinds: Vec<(MessageKind, &str)> = received
            .iter()
            .map(|m| (m.kind, m.body.as_str()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (MessageKind::Message, "m1"),
                (MessageKind::System, "Client A has joined the room"),
                (MessageKind::Message, "m2"),
            ]
        );
    }

    #[tokio::test]
    async fn test_refused_duplicate_does_not_claim_user_password() {
        // テスト項目: IdentityConflict で拒否された接続のユーザーパスワードは紐づかず、
        //             本人は切断後もパスワードなしで再接続できる
        // given (前提条件): alice がパスワードなしで接続中
        let fixture = Fixture::new();
        let usecase = usecase(&fixture);
        let (first, _rx1) = Fixture::link();
        let alice = usecase.execute(request("s1", "alice"), first).await.unwrap();

        // when (操作): 同じ ID・別のユーザーパスワードで接続を試み、alice が切断・再接続する
        let (second, _rx2) = Fixture::link();
        let mut intruder = request("s1", "alice");
        intruder.user_password = Some("evil".to_string());
        let refused = usecase.execute(intruder, second).await;
        fixture.router.disconnect(&alice, fixture.now()).await;
        let (third, _rx3) = Fixture::link();
        let again = usecase.execute(request("s1", "alice"), third).await;

        // then (期待する結果):
        assert_eq!(
            refused,
            Err(RelayError::IdentityConflict("alice".to_string()))
        );
        assert!(again.is_ok());
        let session = fixture.repository.get(&Fixture::sid("s1")).await.unwrap();
        assert!(session.protected_users().is_empty());
    }

    #[tokio::test]
    async fn test_user_password_is_bound_after_successful_register() {
        // テスト項目: 登録に成功した接続のユーザーパスワードは紐づき、以降は一致が必要になる
        // given (前提条件):
        let fixture = Fixture::new();
        let usecase = usecase(&fixture);
        let (first, _rx1) = Fixture::link();
        let mut with_password = request("s1", "alice");
        with_password.user_password = Some("a-pass".to_string());
        let alice = usecase.execute(with_password, first).await.unwrap();
        fixture.router.disconnect(&alice, fixture.now()).await;

        // when (操作):
        let (second, _rx2) = Fixture::link();
        let without = usecase.execute(request("s1", "alice"), second).await;

        // then (期待する結果):
        assert!(matches!(without, Err(RelayError::AuthError(_))));
        let session = fixture.repository.get(&Fixture::sid("s1")).await.unwrap();
        assert_eq!(session.protected_users(), vec!["alice".to_string()]);
    }
}
