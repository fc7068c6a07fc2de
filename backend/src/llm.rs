use crate::dbs::{Database, DbError};
use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestAssistantMessageContent,
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
};
use shared::models::{ChatMessage, LlmSettings, ROLE_ASSISTANT, ROLE_SYSTEM, ROLE_USER};
use uuid::Uuid;

/// Fixed acknowledgement inserted after the opening prompt so the model
/// commits to the persona before the real history starts.
pub const PERSONA_ACK: &str = "Understood. I will now act as the character.";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("database error: {0}")]
    Db(#[from] DbError),
    #[error("completion request failed: {0}")]
    OpenAI(#[from] OpenAIError),
    #[error("session has no messages to generate from")]
    EmptySession,
    #[error("model returned an empty completion")]
    EmptyCompletion,
}

/// Reconstructs the model conversation from stored history. The first
/// stored message is the composed opening prompt; it is sent as a user
/// turn followed by a fixed assistant acknowledgement, then the rest of
/// the history mapped by role.
fn build_conversation(
    messages: &[ChatMessage],
) -> Result<Vec<ChatCompletionRequestMessage>, GenerateError> {
    let (opening, history) = messages.split_first().ok_or(GenerateError::EmptySession)?;

    let mut conversation: Vec<ChatCompletionRequestMessage> = Vec::new();

    let opening_msg = ChatCompletionRequestUserMessageArgs::default()
        .content(opening.content.clone())
        .build()
        .unwrap_or_default();
    conversation.push(ChatCompletionRequestMessage::User(opening_msg));

    let ack = ChatCompletionRequestAssistantMessageArgs::default()
        .content(ChatCompletionRequestAssistantMessageContent::Text(
            PERSONA_ACK.to_string(),
        ))
        .build()
        .unwrap_or_default();
    conversation.push(ChatCompletionRequestMessage::Assistant(ack));

    for msg in history {
        let content = msg.content.clone();
        let req_msg = if msg.role == ROLE_USER {
            let user_msg = ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .unwrap_or_default();
            ChatCompletionRequestMessage::User(user_msg)
        } else if msg.role == ROLE_ASSISTANT {
            let assistant_msg = ChatCompletionRequestAssistantMessageArgs::default()
                .content(ChatCompletionRequestAssistantMessageContent::Text(content))
                .build()
                .unwrap_or_default();
            ChatCompletionRequestMessage::Assistant(assistant_msg)
        } else if msg.role == ROLE_SYSTEM {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()
                .unwrap_or_default();
            ChatCompletionRequestMessage::System(system_msg)
        } else {
            continue;
        };
        conversation.push(req_msg);
    }

    Ok(conversation)
}

/// Generates the assistant reply for a session, persists it and returns it.
pub async fn generate_reply(
    db: &dyn Database,
    session_id: Uuid,
    settings: &LlmSettings,
) -> Result<ChatMessage, GenerateError> {
    let messages = db.get_messages(session_id).await?;
    let conversation = build_conversation(&messages)?;

    let config = OpenAIConfig::new()
        .with_api_key(settings.api_key.clone())
        .with_api_base(settings.api_base.clone());
    let client = Client::with_config(config);

    let request = CreateChatCompletionRequestArgs::default()
        .model(settings.model.clone())
        .messages(conversation)
        .temperature(settings.temperature)
        .max_tokens(settings.max_tokens)
        .build()?;

    let response = client.chat().create(request).await?;

    let content = response
        .choices
        .into_iter()
        .find_map(|choice| choice.message.content.filter(|c| !c.is_empty()))
        .ok_or(GenerateError::EmptyCompletion)?;

    let reply = ChatMessage::new(ROLE_ASSISTANT, content);
    db.append_message(session_id, reply.clone()).await?;
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::types::chat::ChatCompletionRequestUserMessageContent;

    fn user_text(msg: &ChatCompletionRequestMessage) -> &str {
        match msg {
            ChatCompletionRequestMessage::User(user) => match &user.content {
                ChatCompletionRequestUserMessageContent::Text(text) => text,
                other => panic!("unexpected user content: {other:?}"),
            },
            other => panic!("expected user message, got {other:?}"),
        }
    }

    fn assistant_text(msg: &ChatCompletionRequestMessage) -> &str {
        match msg {
            ChatCompletionRequestMessage::Assistant(assistant) => match &assistant.content {
                Some(ChatCompletionRequestAssistantMessageContent::Text(text)) => text,
                other => panic!("unexpected assistant content: {other:?}"),
            },
            other => panic!("expected assistant message, got {other:?}"),
        }
    }

    #[test]
    fn opening_prompt_is_primed_with_acknowledgement() {
        let messages = vec![
            ChatMessage::new(ROLE_USER, "=== CHARACTER IDENTITY ===\nName: Aria"),
            ChatMessage::new(ROLE_ASSISTANT, "Hello, I am Aria."),
            ChatMessage::new(ROLE_USER, "How are you?"),
        ];

        let conversation = build_conversation(&messages).unwrap();
        assert_eq!(conversation.len(), 4);
        assert_eq!(
            user_text(&conversation[0]),
            "=== CHARACTER IDENTITY ===\nName: Aria"
        );
        assert_eq!(assistant_text(&conversation[1]), PERSONA_ACK);
        assert_eq!(assistant_text(&conversation[2]), "Hello, I am Aria.");
        assert_eq!(user_text(&conversation[3]), "How are you?");
    }

    #[test]
    fn unknown_roles_are_skipped() {
        let messages = vec![
            ChatMessage::new(ROLE_USER, "opening"),
            ChatMessage::new("tool", "ignored"),
            ChatMessage::new(ROLE_USER, "kept"),
        ];

        let conversation = build_conversation(&messages).unwrap();
        assert_eq!(conversation.len(), 3);
        assert_eq!(user_text(&conversation[2]), "kept");
    }

    #[test]
    fn empty_history_is_an_error() {
        let err = build_conversation(&[]).unwrap_err();
        assert!(matches!(err, GenerateError::EmptySession));
    }
}
