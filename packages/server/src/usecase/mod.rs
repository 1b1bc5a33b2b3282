//! UseCase layer
//!
//! 1 操作 1 構造体。依存は `Arc<dyn Trait>` で受け取り、Infrastructure 層を直接知らない。
//! `BroadcastRouter` がセッション単位の排他区間を持ち、書き込み系のユースケースはすべてそこを通る。

pub mod broadcast_router;
pub mod connect_participant;
pub mod connect_viewer;
pub mod create_session;
pub mod delete_session;
pub mod disconnect;
pub mod end_session;
pub mod export_session;
pub mod list_sessions;
pub mod policy;
pub mod replay_engine;
pub mod send_message;
pub mod session_query;

#[cfg(test)]
pub(crate) mod test_support;

pub use broadcast_router::{BroadcastRouter, SessionGate};
pub use connect_participant::{ConnectParticipantUseCase, ParticipantRequest};
pub use connect_viewer::ConnectViewerUseCase;
pub use create_session::CreateSessionUseCase;
pub use delete_session::DeleteSessionUseCase;
pub use disconnect::DisconnectUseCase;
pub use end_session::{EndSessionUseCase, SESSION_END_CLOSE_CODE};
pub use export_session::{ExportSessionUseCase, SessionExport};
pub use list_sessions::ListSessionsUseCase;
pub use policy::RelayPolicy;
pub use replay_engine::ReplayEngine;
pub use send_message::SendMessageUseCase;
pub use session_query::{
    GetSessionDetailUseCase, GetSessionMessagesUseCase, GetSessionStatisticsUseCase,
    SessionDetail,
};
