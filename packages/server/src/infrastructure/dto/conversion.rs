//! Conversion logic between DTOs and domain entities.

use hiroba_shared::time::timestamp_to_rfc3339;

use crate::domain::{
    ChatMessage, ClientId, CreateSession, MessageBody, MessageKind, MessageQuery, RelayError,
    Session, SessionId, SessionMetadata, SessionStatistics, SessionStatus,
};
use crate::infrastructure::dto::{export::ExportFormat, http, websocket as ws};

// ========================================
// DTO → Domain
// ========================================

impl TryFrom<http::CreateSessionDto> for CreateSession {
    type Error = RelayError;

    fn try_from(dto: http::CreateSessionDto) -> Result<Self, Self::Error> {
        let session_id = dto
            .session_id
            .filter(|id| !id.is_empty())
            .map(SessionId::new)
            .transpose()?;
        Ok(Self {
            session_id,
            password: dto.password,
            require_user_password: dto.require_user_password,
            disable_user_password: dto.disable_user_password,
            metadata: SessionMetadata {
                purpose: dto.purpose,
                notes: dto.notes,
            },
        })
    }
}

impl TryFrom<http::MessagesQuery> for MessageQuery {
    type Error = RelayError;

    fn try_from(query: http::MessagesQuery) -> Result<Self, Self::Error> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Ok(Self {
            client_id: non_empty(query.client_id).map(ClientId::new).transpose()?,
            kind: non_empty(query.r#type)
                .map(|t| MessageKind::parse(&t))
                .transpose()?,
            keyword: non_empty(query.q),
        })
    }
}

impl http::ListSessionsQuery {
    pub fn status(&self) -> Result<Option<SessionStatus>, RelayError> {
        Ok(self
            .status
            .as_deref()
            .filter(|s| !s.is_empty())
            .map(SessionStatus::parse)
            .transpose()?)
    }
}

impl http::ExportQuery {
    /// Requested export format; JSON when absent
    pub fn format(&self) -> Result<ExportFormat, RelayError> {
        Ok(self
            .format
            .as_deref()
            .filter(|f| !f.is_empty())
            .map(ExportFormat::parse)
            .transpose()?
            .unwrap_or_default())
    }
}

/// Body text of an inbound chat frame, bounded by the configured limit
pub fn message_body(frame: &ws::WireMessage, max_chars: usize) -> Result<MessageBody, RelayError> {
    Ok(MessageBody::with_limit(frame.message.clone(), max_chars)?)
}

// ========================================
// Domain → DTO
// ========================================

fn wire_type(kind: MessageKind) -> ws::MessageType {
    match kind {
        MessageKind::Message => ws::MessageType::Message,
        MessageKind::System => ws::MessageType::System,
        MessageKind::SessionEnd => ws::MessageType::SessionEnd,
    }
}

impl From<&ChatMessage> for ws::WireMessage {
    fn from(model: &ChatMessage) -> Self {
        Self {
            r#type: wire_type(model.kind),
            client_id: model.author.client_id().map(|id| id.as_str().to_string()),
            message: model.body.as_str().to_string(),
            timestamp: Some(timestamp_to_rfc3339(model.timestamp.value())),
            seq: Some(model.sequence.value()),
        }
    }
}

impl From<&ChatMessage> for http::HistoryMessageDto {
    fn from(model: &ChatMessage) -> Self {
        Self {
            seq: model.sequence.value(),
            message_type: model.kind.as_str().to_string(),
            client_id: model.author.as_str().to_string(),
            content: model.body.as_str().to_string(),
            timestamp: timestamp_to_rfc3339(model.timestamp.value()),
        }
    }
}

impl From<&Session> for http::SessionSummaryDto {
    fn from(model: &Session) -> Self {
        Self {
            session_id: model.id.as_str().to_string(),
            active: !model.is_ended(),
            status: model.status.as_str().to_string(),
            created_at: timestamp_to_rfc3339(model.created_at.value()),
            ended_at: model.ended_at.map(|t| timestamp_to_rfc3339(t.value())),
            password_protected: model.is_password_protected(),
        }
    }
}

impl http::SessionStatisticsDto {
    pub fn from_domain(session_id: &SessionId, stats: SessionStatistics) -> Self {
        Self {
            session_id: session_id.as_str().to_string(),
            total_messages: stats.total_messages,
            total_chars: stats.total_chars,
            total_words: stats.total_words,
            participants: stats.participants,
            user_stats: stats
                .user_stats
                .into_iter()
                .map(|(user, s)| {
                    (
                        user,
                        http::UserStatisticsDto {
                            count: s.count,
                            chars: s.chars,
                            words: s.words,
                        },
                    )
                })
                .collect(),
        }
    }
}
