use crate::AppState;
use crate::dbs::DbError;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use shared::models::{Character, CreateCharacterRequest};
use uuid::Uuid;

pub async fn list_characters(
    State(state): State<AppState>,
) -> Result<Json<Vec<Character>>, StatusCode> {
    let characters = state.db.get_characters().await.map_err(|e| {
        tracing::error!("Failed to list characters: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(characters))
}

fn character_from_payload(id: Uuid, payload: CreateCharacterRequest) -> Character {
    let now = Utc::now();
    Character {
        id,
        name: payload.name,
        description: payload.description,
        personality: payload.personality,
        appearance: payload.appearance,
        response_guidelines: payload.response_guidelines,
        avatar_url: payload.avatar_url,
        file_url: payload.file_url,
        disabled: payload.disabled,
        created_at: now,
        updated_at: now,
    }
}

pub async fn create_character(
    State(state): State<AppState>,
    Json(payload): Json<CreateCharacterRequest>,
) -> Result<Json<Character>, (StatusCode, String)> {
    let character = character_from_payload(Uuid::new_v4(), payload);
    character
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    state
        .db
        .create_character(character.clone())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create character: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(character))
}

pub async fn get_character(
    State(state): State<AppState>,
    Path(character_id): Path<Uuid>,
) -> Result<Json<Character>, StatusCode> {
    let character = state.db.get_character(character_id).await.map_err(|e| {
        if matches!(e, DbError::NotFound(_)) {
            StatusCode::NOT_FOUND
        } else {
            tracing::error!("Failed to get character: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    })?;
    Ok(Json(character))
}

pub async fn update_character(
    State(state): State<AppState>,
    Path(character_id): Path<Uuid>,
    Json(payload): Json<CreateCharacterRequest>,
) -> Result<Json<Character>, (StatusCode, String)> {
    let existing = state.db.get_character(character_id).await.map_err(|e| {
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

    let mut character = character_from_payload(character_id, payload);
    character.created_at = existing.created_at;
    character
        .validate()
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    state
        .db
        .update_character(character.clone())
        .await
        .map_err(|e| {
            tracing::error!("Failed to update character: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
            )
        })?;

    Ok(Json(character))
}

pub async fn delete_character(
    State(state): State<AppState>,
    Path(character_id): Path<Uuid>,
) -> Result<Json<()>, StatusCode> {
    let character = state.db.get_character(character_id).await;
    if matches!(character, Err(DbError::NotFound(_))) {
        return Err(StatusCode::NOT_FOUND);
    }
    if let Err(e) = character {
        tracing::error!("Failed to get character: {:?}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }

    state.db.delete_character(character_id).await.map_err(|e| {
        tracing::error!("Failed to delete character: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(Json(()))
}
