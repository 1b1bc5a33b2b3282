//! Entities of the relay domain: sessions, their message log, and connections.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    error::RelayError,
    value_object::{
        ClientId, ConnectionId, MessageBody, PasswordHash, SYSTEM_AUTHOR, SequenceNumber,
        SessionId, Timestamp, ValueObjectError,
    },
};

// ========================================
// Messages
// ========================================

/// Kind of a stored message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    System,
    SessionEnd,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::System => "system",
            Self::SessionEnd => "session_end",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
        match value {
            "message" => Ok(Self::Message),
            "system" => Ok(Self::System),
            "session_end" => Ok(Self::SessionEnd),
            other => Err(ValueObjectError::Unknown {
                field: "type",
                value: other.to_string(),
            }),
        }
    }
}

/// Presence change carried by a `system` message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceEvent {
    Joined,
    Left,
}

/// Author of a message: a participant, or the relay itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Author {
    System,
    Client(ClientId),
}

impl Author {
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => SYSTEM_AUTHOR,
            Self::Client(id) => id.as_str(),
        }
    }

    pub fn client_id(&self) -> Option<&ClientId> {
        match self {
            Self::System => None,
            Self::Client(id) => Some(id),
        }
    }
}

/// A message that has not been appended yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub author: Author,
    pub kind: MessageKind,
    pub presence: Option<PresenceEvent>,
    pub body: MessageBody,
    pub timestamp: Timestamp,
}

impl MessageDraft {
    /// Chat message written by a participant
    pub fn chat(author: ClientId, body: MessageBody, timestamp: Timestamp) -> Self {
        Self {
            author: Author::Client(author),
            kind: MessageKind::Message,
            presence: None,
            body,
            timestamp,
        }
    }

    /// `system` message announcing that a participant joined
    pub fn joined(client_id: ClientId, timestamp: Timestamp) -> Self {
        let body = MessageBody::system(format!("Client {} has joined the room", client_id));
        Self {
            author: Author::Client(client_id),
            kind: MessageKind::System,
            presence: Some(PresenceEvent::Joined),
            body,
            timestamp,
        }
    }

    /// `system` message announcing that a participant left
    pub fn left(client_id: ClientId, timestamp: Timestamp) -> Self {
        let body = MessageBody::system(format!("Client {} has left the room", client_id));
        Self {
            author: Author::Client(client_id),
            kind: MessageKind::System,
            presence: Some(PresenceEvent::Left),
            body,
            timestamp,
        }
    }

    /// Final notice of an ended session
    pub fn session_end(timestamp: Timestamp) -> Self {
        Self {
            author: Author::System,
            kind: MessageKind::SessionEnd,
            presence: None,
            body: MessageBody::system("Session has been ended.".to_string()),
            timestamp,
        }
    }
}

/// A message appended to a session log; immutable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub session_id: SessionId,
    pub sequence: SequenceNumber,
    pub author: Author,
    pub kind: MessageKind,
    pub presence: Option<PresenceEvent>,
    pub body: MessageBody,
    pub timestamp: Timestamp,
}

impl ChatMessage {
    /// Whether this is the join announcement of `client_id`
    pub fn is_join_of(&self, client_id: &ClientId) -> bool {
        self.kind == MessageKind::System
            && self.presence == Some(PresenceEvent::Joined)
            && self.author.client_id() == Some(client_id)
    }
}

/// Append-only message log of one session
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    messages: Vec<ChatMessage>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a draft and return the stored message
    ///
    /// Sequence numbers are gapless from 1. The timestamp is clamped so that it
    /// never goes backwards within the log.
    pub fn append(&mut self, session_id: &SessionId, draft: MessageDraft) -> ChatMessage {
        let (sequence, floor) = match self.messages.last() {
            Some(last) => (last.sequence.next(), last.timestamp),
            None => (SequenceNumber::FIRST, draft.timestamp),
        };
        let message = ChatMessage {
            session_id: session_id.clone(),
            sequence,
            author: draft.author,
            kind: draft.kind,
            presence: draft.presence,
            body: draft.body,
            timestamp: draft.timestamp.max(floor),
        };
        self.messages.push(message.clone());
        message
    }

    /// Messages with timestamp >= `cutoff`, in sequence order
    pub fn since(&self, cutoff: Timestamp) -> Vec<ChatMessage> {
        // timestamps are non-decreasing, so everything after the first match qualifies
        let start = self.messages.partition_point(|m| m.timestamp < cutoff);
        self.messages[start..].to_vec()
    }

    pub fn all(&self) -> Vec<ChatMessage> {
        self.messages.clone()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

// ========================================
// Sessions
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Ended,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Ended => "ended",
        }
    }

    pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
        match value {
            "active" => Ok(Self::Active),
            "ended" => Ok(Self::Ended),
            other => Err(ValueObjectError::Unknown {
                field: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Free-form notes attached to a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub purpose: Option<String>,
    pub notes: Option<String>,
}

/// Request to create a session (or fetch it when it already exists)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateSession {
    /// Generated by the registry when absent
    pub session_id: Option<SessionId>,
    pub password: Option<String>,
    pub require_user_password: bool,
    pub disable_user_password: bool,
    pub metadata: SessionMetadata,
}

impl CreateSession {
    /// Implicit creation on the first participant join
    pub fn on_join(session_id: SessionId, password: Option<String>) -> Self {
        Self {
            session_id: Some(session_id),
            password,
            ..Self::default()
        }
    }
}

/// Session metadata owned by the registry
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub created_at: Timestamp,
    pub ended_at: Option<Timestamp>,
    pub status: SessionStatus,
    pub password_hash: Option<PasswordHash>,
    pub require_user_password: bool,
    pub disable_user_password: bool,
    pub user_passwords: HashMap<ClientId, PasswordHash>,
    pub metadata: SessionMetadata,
}

impl Session {
    pub fn new(id: SessionId, created_at: Timestamp, request: &CreateSession) -> Self {
        Self {
            id,
            created_at,
            ended_at: None,
            status: SessionStatus::Active,
            password_hash: request
                .password
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(PasswordHash::from_plain),
            require_user_password: request.require_user_password,
            disable_user_password: request.disable_user_password,
            user_passwords: HashMap::new(),
            metadata: request.metadata.clone(),
        }
    }

    pub fn is_ended(&self) -> bool {
        self.status == SessionStatus::Ended
    }

    pub fn is_password_protected(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Check the session password; sessions without one accept anything
    pub fn verify_password(&self, password: Option<&str>) -> Result<(), RelayError> {
        match (&self.password_hash, password) {
            (None, _) => Ok(()),
            (Some(hash), Some(candidate)) if hash.verify(candidate) => Ok(()),
            (Some(_), _) => Err(RelayError::AuthError(format!(
                "invalid password for session '{}'",
                self.id
            ))),
        }
    }

    /// Check the per-user password rules for a joining participant
    ///
    /// Nothing is stored here. A first password for an unclaimed client id comes
    /// back as `Some(hash)` and is bound with `bind_user_password` once the
    /// connection has actually been registered.
    pub fn authorize_user(
        &self,
        client_id: &ClientId,
        user_password: Option<&str>,
    ) -> Result<Option<PasswordHash>, RelayError> {
        if self.disable_user_password {
            return Ok(None);
        }
        let user_password = user_password.filter(|p| !p.is_empty());

        if let Some(hash) = self.user_passwords.get(client_id) {
            return match user_password {
                Some(candidate) if hash.verify(candidate) => Ok(None),
                _ => Err(RelayError::AuthError(format!(
                    "invalid password for client '{}'",
                    client_id
                ))),
            };
        }

        match user_password {
            Some(password) => Ok(Some(PasswordHash::from_plain(password))),
            None if self.require_user_password => Err(RelayError::AuthError(format!(
                "session '{}' requires a user password",
                self.id
            ))),
            None => Ok(None),
        }
    }

    /// Bind a claimed user password; an existing binding is never replaced
    pub fn bind_user_password(&mut self, client_id: &ClientId, hash: PasswordHash) {
        self.user_passwords.entry(client_id.clone()).or_insert(hash);
    }

    /// Mark the session ended; returns false when it already was
    pub fn end(&mut self, now: Timestamp) -> bool {
        if self.is_ended() {
            return false;
        }
        self.status = SessionStatus::Ended;
        self.ended_at = Some(now);
        true
    }

    /// Client ids that have a registered user password, sorted
    pub fn protected_users(&self) -> Vec<String> {
        let mut users: Vec<String> = self
            .user_passwords
            .keys()
            .map(|id| id.as_str().to_string())
            .collect();
        users.sort();
        users
    }

    /// Lifetime of an ended session in milliseconds
    pub fn duration_millis(&self) -> Option<i64> {
        self.ended_at.map(|end| end.millis_since(self.created_at))
    }
}

// ========================================
// Connections
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionRole {
    Participant,
    Viewer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// A live socket as tracked by the connection manager
///
/// The session is referenced by id only and looked up on each use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub role: ConnectionRole,
    pub session_id: SessionId,
    /// Bound identity; participants only
    pub client_id: Option<ClientId>,
    pub joined_at: Timestamp,
    pub state: ConnectionState,
}

impl Connection {
    pub fn is_participant(&self) -> bool {
        self.role == ConnectionRole::Participant
    }

    /// Short label for logs
    pub fn label(&self) -> String {
        match &self.client_id {
            Some(client_id) => format!("{}@{}", client_id, self.session_id),
            None => format!("viewer:{}@{}", self.id, self.session_id),
        }
    }
}
