//! Fixtures shared by the usecase tests: real in-memory infrastructure and a manual clock.

use std::{sync::Arc, time::Duration};

use hiroba_shared::time::{Clock, ManualClock};
use tokio::sync::{Notify, mpsc};

use crate::{
    domain::{
        ChatMessage, ClientId, Connection, ConnectionLink, ConnectionManager, ConnectionRequest,
        ConnectionRole, CreateSession, MessageBody, MessageDraft, MessageStore, OutboundFrame,
        SessionId, SessionRegistry, Timestamp,
    },
    infrastructure::{
        connection::WebSocketConnectionManager, repository::InMemorySessionRepository,
    },
    usecase::{BroadcastRouter, RelayPolicy, ReplayEngine},
};

pub(crate) const START_MILLIS: i64 = 1_700_000_000_000;

pub(crate) struct Fixture {
    pub repository: Arc<InMemorySessionRepository>,
    pub connections: Arc<WebSocketConnectionManager>,
    pub router: Arc<BroadcastRouter>,
    pub replay: Arc<ReplayEngine>,
    pub clock: Arc<ManualClock>,
    pub policy: RelayPolicy,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_policy(RelayPolicy {
            close_grace_period: Duration::from_millis(50),
            ..RelayPolicy::default()
        })
    }

    pub fn with_announce_leave(announce_leave: bool) -> Self {
        Self::with_policy(RelayPolicy {
            announce_leave,
            close_grace_period: Duration::from_millis(50),
            ..RelayPolicy::default()
        })
    }

    pub fn with_policy(policy: RelayPolicy) -> Self {
        let repository = Arc::new(InMemorySessionRepository::new());
        let connections = Arc::new(WebSocketConnectionManager::new());
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
        Self {
            repository,
            connections,
            router,
            replay,
            clock: Arc::new(ManualClock::new(START_MILLIS)),
            policy,
        }
    }

    pub fn sid(value: &str) -> SessionId {
        SessionId::new(value.to_string()).unwrap()
    }

    pub fn cid(value: &str) -> ClientId {
        ClientId::new(value.to_string()).unwrap()
    }

    pub fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    pub fn chat(&self, who: &str, text: &str) -> MessageDraft {
        MessageDraft::chat(
            Self::cid(who),
            MessageBody::new(text.to_string()).unwrap(),
            self.now(),
        )
    }

    pub async fn create_session(&self, id: &str) {
        self.repository
            .create_or_get(CreateSession::on_join(Self::sid(id), None), self.now())
            .await
            .unwrap();
    }

    pub async fn append(&self, id: &str, draft: MessageDraft) -> ChatMessage {
        self.repository.append(&Self::sid(id), draft).await.unwrap()
    }

    pub fn link() -> (ConnectionLink, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ConnectionLink {
                sender: tx,
                terminator: Arc::new(Notify::new()),
            },
            rx,
        )
    }

    /// Register directly with the connection manager, bypassing the connect usecases
    pub async fn register(
        &self,
        role: ConnectionRole,
        session: &str,
        client: Option<&str>,
    ) -> (Connection, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (link, rx) = Self::link();
        let connection = self
            .connections
            .register(
                ConnectionRequest {
                    role,
                    session_id: Self::sid(session),
                    client_id: client.map(Self::cid),
                    joined_at: self.now(),
                },
                link,
            )
            .await
            .unwrap();
        (connection, rx)
    }

    /// Every frame queued so far
    pub fn drain_frames(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Vec<OutboundFrame> {
        let mut frames = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// Messages queued so far (close frames are skipped)
    pub fn drain(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> Vec<ChatMessage> {
        Self::drain_frames(rx)
            .into_iter()
            .filter_map(|frame| match frame {
                OutboundFrame::Message(message) => Some(message),
                OutboundFrame::Close { .. } => None,
            })
            .collect()
    }
}
