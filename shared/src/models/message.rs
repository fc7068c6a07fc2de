use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";
pub const ROLE_SYSTEM: &str = "system";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
    #[serde(default)]
    /// Reference file attached to this message, if any
    pub file_uri: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    /// Create a new message stamped with the current time
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: role.into(),
            content: content.into(),
            file_uri: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_carries_role_and_content() {
        let message = ChatMessage::new(ROLE_USER, "hello");
        assert_eq!(message.role, ROLE_USER);
        assert_eq!(message.content, "hello");
        assert!(message.file_uri.is_none());
    }

    #[test]
    fn message_ids_are_unique() {
        let a = ChatMessage::new(ROLE_USER, "a");
        let b = ChatMessage::new(ROLE_USER, "b");
        assert_ne!(a.id, b.id);
    }
}
