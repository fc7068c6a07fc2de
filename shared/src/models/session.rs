use super::message::ChatMessage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User-tunable session settings. Stored verbatim on the session; the
/// generation pipeline does not interpret them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub user_persona: Option<String>,
    #[serde(default)]
    pub world_time: Option<String>,
    #[serde(default)]
    pub output_language: Option<String>,
    #[serde(default)]
    pub additional_context: Option<String>,
    #[serde(default)]
    pub enable_web_search: Option<bool>,
}

impl SessionSettings {
    /// Overlays any provided values onto the stored settings.
    pub fn merge(&mut self, update: &SessionSettings) {
        if update.user_persona.is_some() {
            self.user_persona = update.user_persona.clone();
        }
        if update.world_time.is_some() {
            self.world_time = update.world_time.clone();
        }
        if update.output_language.is_some() {
            self.output_language = update.output_language.clone();
        }
        if update.additional_context.is_some() {
            self.additional_context = update.additional_context.clone();
        }
        if update.enable_web_search.is_some() {
            self.enable_web_search = update.enable_web_search;
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub character_id: Uuid,
    pub title: String,
    #[serde(flatten)]
    pub settings: SessionSettings,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn new(character_id: Uuid, title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            character_id,
            title: title.into(),
            settings: SessionSettings::default(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateSessionRequest {
    pub character_id: Uuid,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub settings: SessionSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UpdateSessionRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(flatten)]
    pub settings: SessionSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub message: Option<String>,
    pub character_id: Uuid,
    #[serde(default)]
    pub chat_session_id: Option<Uuid>,
    #[serde(default)]
    pub file_uri: Option<String>,
    /// Applied only when this request opens a new session.
    #[serde(flatten)]
    pub settings: SessionSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SendMessageResponse {
    pub user_message: ChatMessage,
    pub ai_message: ChatMessage,
    pub chat_session_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_overlays_only_provided_values() {
        let mut settings = SessionSettings {
            user_persona: Some("Traveler".to_string()),
            world_time: Some("Dusk".to_string()),
            ..SessionSettings::default()
        };
        settings.merge(&SessionSettings {
            world_time: Some("Dawn".to_string()),
            enable_web_search: Some(true),
            ..SessionSettings::default()
        });

        assert_eq!(settings.user_persona.as_deref(), Some("Traveler"));
        assert_eq!(settings.world_time.as_deref(), Some("Dawn"));
        assert_eq!(settings.enable_web_search, Some(true));
    }

    #[test]
    fn new_session_starts_without_messages() {
        let session = ChatSession::new(Uuid::new_v4(), "Chat with Aria");
        assert!(session.messages.is_empty());
        assert_eq!(session.title, "Chat with Aria");
    }
}
