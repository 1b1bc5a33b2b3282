//! Message formatting utilities for client display.

use chrono::{DateTime, Utc};
use hiroba_server::infrastructure::dto::websocket::{MessageType, WireMessage};

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format an inbound frame according to its type
    pub fn format_frame(frame: &WireMessage) -> String {
        let at = Self::display_time(frame.timestamp.as_deref());
        match frame.r#type {
            MessageType::Message => Self::format_chat_message(
                frame.client_id.as_deref().unwrap_or("?"),
                &frame.message,
                frame.seq,
                &at,
            ),
            MessageType::System => Self::format_system_message(&frame.message, &at),
            MessageType::SessionEnd => Self::format_session_end(&at),
            MessageType::Join => Self::format_raw_message(&frame.message),
        }
    }

    /// Format a chat message
    ///
    /// # Arguments
    ///
    /// * `from` - The client ID of the sender
    /// * `content` - The message content
    /// * `seq` - Sequence number within the session, if the relay assigned one
    /// * `sent_at` - Display time of the message
    pub fn format_chat_message(from: &str, content: &str, seq: Option<u64>, sent_at: &str) -> String {
        let seq = seq.map(|s| format!("#{} ", s)).unwrap_or_default();
        format!(
            "\n\n------------------------------------------------------------\n\
             {}@{}: {}\n\
             sent at {}\n\
             ------------------------------------------------------------\n",
            seq, from, content, sent_at
        )
    }

    /// Format a presence notification (`... has joined the room`)
    pub fn format_system_message(content: &str, at: &str) -> String {
        format!("\n* {} ({})\n", content, at)
    }

    pub fn format_session_end(at: &str) -> String {
        format!(
            "\n============================================================\n\
             Session has been ended at {}.\n\
             ============================================================\n",
            at
        )
    }

    /// Format a binary message notification
    pub fn format_binary_message(byte_count: usize) -> String {
        format!("\n← Received {} bytes of binary data\n", byte_count)
    }

    /// Format a raw text message (when parsing fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }

    /// Greeting printed once the socket is open
    pub fn format_connected(session_id: &str, client_id: Option<&str>) -> String {
        match client_id {
            Some(client_id) => format!(
                "\nYou are '{}' in session '{}'. Type messages and press Enter to send. Press Ctrl+C to exit.\n",
                client_id, session_id
            ),
            None => format!(
                "\nWatching session '{}' (read-only). Press Ctrl+C to exit.\n",
                session_id
            ),
        }
    }

    /// `YYYY-mm-dd HH:MM:SS` (UTC) from an RFC 3339 wire timestamp
    pub fn display_time(timestamp: Option<&str>) -> String {
        match timestamp.and_then(|t| DateTime::parse_from_rfc3339(t).ok()) {
            Some(time) => time
                .with_timezone(&Utc)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            None => timestamp.unwrap_or("-").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(r#type: MessageType, client_id: Option<&str>, message: &str) -> WireMessage {
        WireMessage {
            r#type,
            client_id: client_id.map(str::to_string),
            message: message.to_string(),
            timestamp: Some("2023-01-01T00:00:00.000Z".to_string()),
            seq: Some(7),
        }
    }

    #[test]
    fn test_format_chat_frame() {
        // テスト項目: チャットメッセージが送信者・シーケンス番号・時刻付きでフォーマットされる
        // given (前提条件):
        let frame = frame(MessageType::Message, Some("alice"), "Hello, world!");

        // when (操作):
        let result = MessageFormatter::format_frame(&frame);

        // then (期待する結果):
        assert!(result.contains("#7 @alice: Hello, world!"));
        assert!(result.contains("sent at 2023-01-01 00:00:00"));
        assert!(result.contains("------------------------------------------------------------"));
    }

    #[test]
    fn test_format_system_frame() {
        // テスト項目: join/leave の system メッセージは 1 行で表示される
        let frame = frame(MessageType::System, Some("bob"), "Client bob has joined the room");

        let result = MessageFormatter::format_frame(&frame);

        assert_eq!(result, "\n* Client bob has joined the room (2023-01-01 00:00:00)\n");
    }

    #[test]
    fn test_format_session_end_frame() {
        // テスト項目: session_end は終了の告知として表示される
        let frame = frame(MessageType::SessionEnd, None, "Session has been ended.");

        let result = MessageFormatter::format_frame(&frame);

        assert!(result.contains("Session has been ended at 2023-01-01 00:00:00."));
    }

    #[test]
    fn test_display_time_falls_back_to_raw_value() {
        // テスト項目: 解釈できないタイムスタンプはそのまま、欠落は "-" で表示される
        assert_eq!(MessageFormatter::display_time(Some("yesterday")), "yesterday");
        assert_eq!(MessageFormatter::display_time(None), "-");
    }

    #[test]
    fn test_format_connected_for_viewer() {
        // テスト項目: viewer には読み取り専用である旨が表示される
        let result = MessageFormatter::format_connected("s1", None);

        assert!(result.contains("Watching session 's1' (read-only)"));
    }

    #[test]
    fn test_format_binary_message() {
        // テスト項目: バイナリメッセージ通知が正しくフォーマットされる
        let result = MessageFormatter::format_binary_message(1024);

        assert!(result.contains("1024 bytes"));
        assert!(result.contains("Received"));
    }
}
