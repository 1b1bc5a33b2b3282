//! Session export documents.
//!
//! - `csv`: the full log, one row per entry
//! - `json`: the full log with export metadata
//! - `contributions`: per-user chat statistics as CSV
//! - `summary`: session detail and statistics as JSON

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{ChatMessage, SessionStatistics, ValueObjectError};

use super::http::{HistoryMessageDto, SessionDetailDto, SessionStatisticsDto};

const MESSAGE_HEADER: [&str; 8] = [
    "message_id",
    "session_id",
    "client_id",
    "message_type",
    "content",
    "timestamp",
    "char_count",
    "word_count",
];

const CONTRIBUTION_HEADER: [&str; 6] = [
    "client_id",
    "message_count",
    "total_chars",
    "total_words",
    "avg_chars_per_message",
    "avg_words_per_message",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    #[default]
    Json,
    Contributions,
    Summary,
}

impl ExportFormat {
    pub fn parse(value: &str) -> Result<Self, ValueObjectError> {
        match value {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "contributions" => Ok(Self::Contributions),
            "summary" => Ok(Self::Summary),
            other => Err(ValueObjectError::Unknown {
                field: "format",
                value: other.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Contributions => "contributions",
            Self::Summary => "summary",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv | Self::Contributions => "text/csv; charset=utf-8",
            Self::Json | Self::Summary => "application/json",
        }
    }

    /// `messages_<session>_<YYYYmmdd_HHMMSS>.csv` and friends
    pub fn file_name(&self, session_id: &str, exported_at_millis: i64) -> String {
        let stamp = DateTime::<Utc>::from_timestamp_millis(exported_at_millis)
            .unwrap_or_default()
            .format("%Y%m%d_%H%M%S");
        let (prefix, extension) = match self {
            Self::Csv => ("messages", "csv"),
            Self::Json => ("messages", "json"),
            Self::Contributions => ("user_contributions", "csv"),
            Self::Summary => ("session_summary", "json"),
        };
        format!("{}_{}_{}.{}", prefix, session_id, stamp, extension)
    }
}

#[derive(Serialize)]
struct MessageRow<'a> {
    message_id: u64,
    session_id: &'a str,
    client_id: &'a str,
    message_type: &'a str,
    content: &'a str,
    timestamp: String,
    char_count: usize,
    word_count: usize,
}

#[derive(Serialize)]
struct ContributionRow<'a> {
    client_id: &'a str,
    message_count: usize,
    total_chars: usize,
    total_words: usize,
    avg_chars_per_message: String,
    avg_words_per_message: String,
}

/// `GET /api/sessions/{id}/export?format=json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagesExportDto {
    pub session_id: String,
    pub exported_at: String,
    pub total_messages: usize,
    pub messages: Vec<HistoryMessageDto>,
}

/// `GET /api/sessions/{id}/export?format=summary`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummaryExportDto {
    pub session: SessionDetailDto,
    pub statistics: SessionStatisticsDto,
    pub exported_at: String,
}

/// Full log as CSV; the header is written even for an empty log
pub fn messages_csv(messages: &[ChatMessage]) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(MESSAGE_HEADER)?;

    for message in messages {
        let history = HistoryMessageDto::from(message);
        writer.serialize(MessageRow {
            message_id: history.seq,
            session_id: message.session_id.as_str(),
            client_id: &history.client_id,
            message_type: &history.message_type,
            content: &history.content,
            timestamp: history.timestamp.clone(),
            char_count: message.body.char_count(),
            word_count: message.body.word_count(),
        })?;
    }

    into_string(writer)
}

/// Per-user chat statistics as CSV, averages with two decimals
pub fn contributions_csv(statistics: &SessionStatistics) -> Result<String, csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(CONTRIBUTION_HEADER)?;

    for (client_id, user) in &statistics.user_stats {
        let average = |total: usize| {
            if user.count == 0 {
                0.0
            } else {
                total as f64 / user.count as f64
            }
        };
        writer.serialize(ContributionRow {
            client_id,
            message_count: user.count,
            total_chars: user.chars,
            total_words: user.words,
            avg_chars_per_message: format!("{:.2}", average(user.chars)),
            avg_words_per_message: format!("{:.2}", average(user.words)),
        })?;
    }

    into_string(writer)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String, csv::Error> {
    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e).into())
}
