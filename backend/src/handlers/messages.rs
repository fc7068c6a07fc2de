use crate::AppState;
use crate::dbs::DbError;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::models::{ChatMessage, ROLE_ASSISTANT, ROLE_SYSTEM, ROLE_USER};
use uuid::Uuid;

const VALID_ROLES: [&str; 3] = [ROLE_USER, ROLE_ASSISTANT, ROLE_SYSTEM];

#[derive(Deserialize)]
pub struct AppendMessageRequest {
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub file_uri: Option<String>,
}

pub async fn list_messages(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<ChatMessage>>, StatusCode> {
    let messages = state.db.get_messages(session_id).await.map_err(|e| {
        if matches!(e, DbError::NotFound(_)) {
            StatusCode::NOT_FOUND
        } else {
            tracing::error!("Failed to list messages: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    })?;
    Ok(Json(messages))
}

pub async fn append_message(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<AppendMessageRequest>,
) -> Result<Json<ChatMessage>, StatusCode> {
    if !VALID_ROLES.contains(&payload.role.as_str()) {
        return Err(StatusCode::BAD_REQUEST);
    }

    let mut message = ChatMessage::new(payload.role, payload.content);
    message.file_uri = payload.file_uri;

    state
        .db
        .append_message(session_id, message.clone())
        .await
        .map_err(|e| {
            if matches!(e, DbError::NotFound(_)) {
                StatusCode::NOT_FOUND
            } else {
                tracing::error!("Failed to append message: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    Ok(Json(message))
}
