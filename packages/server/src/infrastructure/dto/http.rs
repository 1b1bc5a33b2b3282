//! HTTP API request/response bodies.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDto {
    pub error: String,
}

/// Body of `POST /api/sessions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSessionDto {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub require_user_password: bool,
    #[serde(default)]
    pub disable_user_password: bool,
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummaryDto {
    pub session_id: String,
    pub active: bool,
    pub status: String,
    pub created_at: String,
    pub ended_at: Option<String>,
    pub password_protected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionListDto {
    pub sessions: Vec<SessionSummaryDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDetailDto {
    pub session_id: String,
    pub active: bool,
    pub status: String,
    pub created_at: String,
    pub ended_at: Option<String>,
    pub password_protected: bool,
    pub require_user_password: bool,
    pub disable_user_password: bool,
    pub protected_users: Vec<String>,
    pub participants: Vec<String>,
    pub viewer_count: usize,
    pub total_messages: usize,
    /// `HH:MM:SS`, only once the session has ended
    pub duration: Option<String>,
    pub purpose: Option<String>,
    pub notes: Option<String>,
}

/// One entry of a session log as served over HTTP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryMessageDto {
    pub seq: u64,
    pub message_type: String,
    pub client_id: String,
    pub content: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMessagesDto {
    pub session_id: String,
    pub messages: Vec<HistoryMessageDto>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStatisticsDto {
    pub count: usize,
    pub chars: usize,
    pub words: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatisticsDto {
    pub session_id: String,
    pub total_messages: usize,
    pub total_chars: usize,
    pub total_words: usize,
    pub participants: Vec<String>,
    pub user_stats: BTreeMap<String, UserStatisticsDto>,
}

/// Query of `GET /api/sessions`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListSessionsQuery {
    pub status: Option<String>,
}

/// Query of `GET /api/sessions/{id}/export`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// Query of `GET /api/sessions/{id}/messages`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessagesQuery {
    pub client_id: Option<String>,
    pub r#type: Option<String>,
    pub q: Option<String>,
}
