//! Server state shared by the handlers.

use std::sync::Arc;

use hiroba_shared::time::Clock;

use crate::{
    infrastructure::{
        connection::WebSocketConnectionManager, repository::InMemorySessionRepository,
    },
    usecase::{
        BroadcastRouter, ConnectParticipantUseCase, ConnectViewerUseCase, CreateSessionUseCase,
        DeleteSessionUseCase, DisconnectUseCase, EndSessionUseCase, ExportSessionUseCase,
        GetSessionDetailUseCase, GetSessionMessagesUseCase, GetSessionStatisticsUseCase,
        ListSessionsUseCase, RelayPolicy, ReplayEngine, SendMessageUseCase,
    },
};

/// Shared application state
pub struct AppState {
    /// ConnectParticipantUseCase（参加者接続のユースケース）
    pub connect_participant_usecase: Arc<ConnectParticipantUseCase>,
    /// ConnectViewerUseCase（viewer 接続のユースケース）
    pub connect_viewer_usecase: Arc<ConnectViewerUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// DisconnectUseCase（切断のユースケース）
    pub disconnect_usecase: Arc<DisconnectUseCase>,
    /// CreateSessionUseCase（セッション作成のユースケース）
    pub create_session_usecase: Arc<CreateSessionUseCase>,
    /// EndSessionUseCase（セッション終了のユースケース）
    pub end_session_usecase: Arc<EndSessionUseCase>,
    /// DeleteSessionUseCase（終了済みセッション削除のユースケース）
    pub delete_session_usecase: Arc<DeleteSessionUseCase>,
    /// ListSessionsUseCase（セッション一覧取得のユースケース）
    pub list_sessions_usecase: Arc<ListSessionsUseCase>,
    /// GetSessionDetailUseCase（セッション詳細取得のユースケース）
    pub get_session_detail_usecase: Arc<GetSessionDetailUseCase>,
    /// GetSessionMessagesUseCase（メッセージログ取得のユースケース）
    pub get_session_messages_usecase: Arc<GetSessionMessagesUseCase>,
    /// GetSessionStatisticsUseCase（統計取得のユースケース）
    pub get_session_statistics_usecase: Arc<GetSessionStatisticsUseCase>,
    /// ExportSessionUseCase（CSV / JSON エクスポートのユースケース）
    pub export_session_usecase: Arc<ExportSessionUseCase>,
    /// Maximum body length accepted on inbound chat frames
    pub max_message_length: usize,
}

impl AppState {
    /// Wire the in-memory relay for the given policy
    pub fn build(policy: &RelayPolicy, clock: Arc<dyn Clock>) -> Self {
        // 1. Repository（Session Registry と Message Store を兼ねる）
        let repository = Arc::new(InMemorySessionRepository::new());

        // 2. ConnectionManager
        let connections = Arc::new(WebSocketConnectionManager::new());

        // 3. Broadcast Router / Replay Engine
        let router = Arc::new(BroadcastRouter::new(
            repository.clone(),
            connections.clone(),
            policy.announce_leave,
        ));
        let replay = Arc::new(ReplayEngine::new(
            repository.clone(),
            connections.clone(),
            policy.rejoin_window_ms,
        ));

        // 4. UseCases
        Self {
            connect_participant_usecase: Arc::new(ConnectParticipantUseCase::new(
                repository.clone(),
                connections.clone(),
                router.clone(),
                replay.clone(),
                clock.clone(),
            )),
            connect_viewer_usecase: Arc::new(ConnectViewerUseCase::new(
                repository.clone(),
                connections.clone(),
                router.clone(),
                replay,
                clock.clone(),
            )),
            send_message_usecase: Arc::new(SendMessageUseCase::new(router.clone(), clock.clone())),
            disconnect_usecase: Arc::new(DisconnectUseCase::new(router.clone(), clock.clone())),
            create_session_usecase: Arc::new(CreateSessionUseCase::new(
                repository.clone(),
                clock.clone(),
            )),
            end_session_usecase: Arc::new(EndSessionUseCase::new(
                repository.clone(),
                repository.clone(),
                connections.clone(),
                router.clone(),
                clock.clone(),
                policy.close_grace_period,
            )),
            delete_session_usecase: Arc::new(DeleteSessionUseCase::new(repository.clone(), router)),
            list_sessions_usecase: Arc::new(ListSessionsUseCase::new(repository.clone())),
            get_session_detail_usecase: Arc::new(GetSessionDetailUseCase::new(
                repository.clone(),
                repository.clone(),
                connections.clone(),
            )),
            export_session_usecase: Arc::new(ExportSessionUseCase::new(
                repository.clone(),
                repository.clone(),
                connections,
                clock,
            )),
            get_session_messages_usecase: Arc::new(GetSessionMessagesUseCase::new(
                repository.clone(),
            )),
            get_session_statistics_usecase: Arc::new(GetSessionStatisticsUseCase::new(repository)),
            max_message_length: policy.max_message_length,
        }
    }
}
