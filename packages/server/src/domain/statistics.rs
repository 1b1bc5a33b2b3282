//! Per-session message statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use super::entity::{ChatMessage, MessageKind};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UserStatistics {
    pub count: usize,
    pub chars: usize,
    pub words: usize,
}

/// Counts over chat messages only; `system` and `session_end` entries are ignored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatistics {
    pub total_messages: usize,
    pub total_chars: usize,
    pub total_words: usize,
    pub participants: Vec<String>,
    pub user_stats: BTreeMap<String, UserStatistics>,
}

impl SessionStatistics {
    pub fn compute(messages: &[ChatMessage]) -> Self {
        let mut stats = Self::default();

        for message in messages.iter().filter(|m| m.kind == MessageKind::Message) {
            let chars = message.body.char_count();
            let words = message.body.word_count();

            stats.total_messages += 1;
            stats.total_chars += chars;
            stats.total_words += words;

            let user = stats
                .user_stats
                .entry(message.author.as_str().to_string())
                .or_default();
            user.count += 1;
            user.chars += chars;
            user.words += words;
        }

        // BTreeMap keys are already sorted
        stats.participants = stats.user_stats.keys().cloned().collect();
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        entity::{MessageDraft, MessageLog},
        value_object::{ClientId, MessageBody, SessionId, Timestamp},
    };

    #[test]
    fn test_statistics_count_chat_messages_only() {
        // テスト項目: 統計は message 種別のみを対象に、ユーザーごとに集計される
        // given (前提条件):
        let session_id = SessionId::new("s1".to_string()).unwrap();
        let bob = ClientId::new("bob".to_string()).unwrap();
        let alice = ClientId::new("alice".to_string()).unwrap();
        let mut log = MessageLog::new();
        log.append(&session_id, MessageDraft::joined(bob.clone(), Timestamp::new(1)));
        for (who, text) in [(&bob, "hello world"), (&alice, "hi"), (&bob, "again")] {
            log.append(
                &session_id,
                MessageDraft::chat(
                    who.clone(),
                    MessageBody::new(text.to_string()).unwrap(),
                    Timestamp::new(2),
                ),
            );
        }
        log.append(&session_id, MessageDraft::session_end(Timestamp::new(3)));

        // when (操作):
        let stats = SessionStatistics::compute(log.messages());

        // then (期待する結果):
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.total_chars, 11 + 2 + 5);
        assert_eq!(stats.total_words, 4);
        assert_eq!(stats.participants, vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(
            stats.user_stats.get("bob"),
            Some(&UserStatistics {
                count: 2,
                chars: 16,
                words: 3
            })
        );
    }

    #[test]
    fn test_statistics_of_empty_log() {
        // テスト項目: 空のログでは全て 0
        let stats = SessionStatistics::compute(&[]);
        assert_eq!(stats, SessionStatistics::default());
    }
}
