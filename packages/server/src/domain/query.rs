//! Filters for reading a session log.

use super::{
    entity::{ChatMessage, MessageKind},
    value_object::ClientId,
};

/// Conjunction of optional filters over a message log
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    /// Author of the message (join/leave notices count for the client they concern)
    pub client_id: Option<ClientId>,
    pub kind: Option<MessageKind>,
    /// Case-insensitive substring of the body
    pub keyword: Option<String>,
}

impl MessageQuery {
    pub fn is_empty(&self) -> bool {
        self.client_id.is_none() && self.kind.is_none() && self.keyword.is_none()
    }

    pub fn matches(&self, message: &ChatMessage) -> bool {
        if let Some(client_id) = &self.client_id
            && message.author.client_id() != Some(client_id)
        {
            return false;
        }
        if let Some(kind) = self.kind
            && message.kind != kind
        {
            return false;
        }
        if let Some(keyword) = &self.keyword {
            let needle = keyword.to_lowercase();
            if !message.body.as_str().to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }

    /// Keep matching messages, preserving order
    pub fn apply(&self, messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
        if self.is_empty() {
            return messages;
        }
        messages.into_iter().filter(|m| self.matches(m)).collect()
    }
}
