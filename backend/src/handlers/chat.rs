use crate::dbs::DbError;
use crate::{AppState, llm};
use axum::{Json, extract::State, http::StatusCode};
use shared::models::{
    CharacterField, ChatMessage, ChatSession, ROLE_USER, SendMessageRequest, SendMessageResponse,
};

/// The chat operation. A request without a session id opens a new
/// session whose first user message is the character's composed opening
/// prompt; any user text on that turn is ignored. Subsequent requests
/// append the user's message verbatim. Either way an assistant reply is
/// generated and persisted before responding.
pub async fn send_message(
    State(state): State<AppState>,
    Json(payload): Json<SendMessageRequest>,
) -> Result<Json<SendMessageResponse>, (StatusCode, String)> {
    let character = state
        .db
        .get_character(payload.character_id)
        .await
        .map_err(|e| {
            if matches!(e, DbError::NotFound(_)) {
                (StatusCode::NOT_FOUND, "Character not found".to_string())
            } else {
                tracing::error!("Failed to get character: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
        })?;

    let (session, user_message) = match payload.chat_session_id {
        Some(session_id) => {
            let session = state.db.get_session(session_id).await.map_err(|e| {
                if matches!(e, DbError::NotFound(_)) {
                    (StatusCode::NOT_FOUND, "Chat session not found".to_string())
                } else {
                    tracing::error!("Failed to get session: {:?}", e);
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "Database error".to_string(),
                    )
                }
            })?;
            if session.character_id != character.id {
                return Err((StatusCode::NOT_FOUND, "Chat session not found".to_string()));
            }

            // Trimming applies only to the emptiness check; the stored
            // content is the user's text verbatim.
            let content = payload
                .message
                .as_deref()
                .filter(|m| !m.trim().is_empty())
                .ok_or((StatusCode::BAD_REQUEST, "Message is required".to_string()))?;

            let mut message = ChatMessage::new(ROLE_USER, content);
            message.file_uri = payload.file_uri;
            (session, message)
        }
        None => {
            let mut session =
                ChatSession::new(character.id, format!("Chat with {}", character.name));
            session.settings.merge(&payload.settings);

            state.db.create_session(session.clone()).await.map_err(|e| {
                tracing::error!("Failed to create session: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            })?;

            // Opening turn: the composed prompt replaces whatever the
            // user typed, and the character's reference file rides along
            // unless its flag excludes it.
            let mut message = ChatMessage::new(ROLE_USER, character.opening_prompt());
            if !character.disabled.is_disabled(CharacterField::File) {
                message.file_uri = character.file_url.clone();
            }
            (session, message)
        }
    };

    state
        .db
        .append_message(session.id, user_message.clone())
        .await
        .map_err(|e| {
            tracing::error!("Failed to save user message: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    // The user message stays saved even if generation fails.
    let ai_message = llm::generate_reply(state.db.as_ref(), session.id, &state.llm)
        .await
        .map_err(|e| {
            tracing::error!("Failed to generate AI response: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to generate AI response: {}", e),
            )
        })?;

    Ok(Json(SendMessageResponse {
        user_message,
        ai_message,
        chat_session_id: session.id,
    }))
}
