use crate::AppState;
use crate::dbs::DbError;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use shared::models::{ChatSession, CreateSessionRequest, UpdateSessionRequest};
use std::collections::HashMap;
use uuid::Uuid;

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<ChatSession>>, StatusCode> {
    let character_id = params
        .get("character_id")
        .and_then(|s| Uuid::parse_str(s).ok());

    let sessions = state.db.get_sessions(character_id).await.map_err(|e| {
        tracing::error!("Failed to list sessions: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(sessions))
}

pub async fn create_session(
    State(state): State<AppState>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<ChatSession>, StatusCode> {
    let character = state
        .db
        .get_character(payload.character_id)
        .await
        .map_err(|e| {
            if matches!(e, DbError::NotFound(_)) {
                StatusCode::NOT_FOUND
            } else {
                tracing::error!("Failed to get character: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    let title = payload
        .title
        .unwrap_or_else(|| format!("Chat with {}", character.name));
    let mut session = ChatSession::new(character.id, title);
    session.settings.merge(&payload.settings);

    state.db.create_session(session.clone()).await.map_err(|e| {
        tracing::error!("Failed to create session: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(session))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<ChatSession>, StatusCode> {
    let session = state.db.get_session(session_id).await.map_err(|e| {
        if matches!(e, DbError::NotFound(_)) {
            StatusCode::NOT_FOUND
        } else {
            tracing::error!("Failed to get session: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    })?;
    Ok(Json(session))
}

pub async fn update_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<UpdateSessionRequest>,
) -> Result<Json<ChatSession>, StatusCode> {
    let mut session = state.db.get_session(session_id).await.map_err(|e| {
        if matches!(e, DbError::NotFound(_)) {
            StatusCode::NOT_FOUND
        } else {
            tracing::error!("Failed to get session: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    })?;

    if let Some(title) = payload.title {
        session.title = title;
    }
    session.settings.merge(&payload.settings);
    session.updated_at = Utc::now();

    state.db.update_session(session.clone()).await.map_err(|e| {
        tracing::error!("Failed to update session: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(session))
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<()>, StatusCode> {
    let session = state.db.get_session(session_id).await;
    if matches!(session, Err(DbError::NotFound(_))) {
        return Err(StatusCode::NOT_FOUND);
    }
    if let Err(e) = session {
        tracing::error!("Failed to get session: {:?}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    state.db.delete_session(session_id).await.map_err(|e| {
        tracing::error!("Failed to delete session: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(()))
}
