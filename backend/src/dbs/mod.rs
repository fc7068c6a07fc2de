use async_trait::async_trait;
use shared::models::{Character, ChatMessage, ChatSession};
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

pub mod local;
pub mod postgres;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Clone, Debug)]
pub enum DatabaseConfig {
    Local { path: PathBuf },
    Postgres { url: String },
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

#[async_trait]
pub trait Database: Send + Sync {
    async fn get_characters(&self) -> DbResult<Vec<Character>>;
    async fn get_character(&self, character_id: Uuid) -> DbResult<Character>;
    async fn create_character(&self, character: Character) -> DbResult<()>;
    async fn update_character(&self, character: Character) -> DbResult<()>;
    async fn delete_character(&self, character_id: Uuid) -> DbResult<()>;
    async fn get_sessions(&self, character_id: Option<Uuid>) -> DbResult<Vec<ChatSession>>;
    async fn get_session(&self, session_id: Uuid) -> DbResult<ChatSession>;
    async fn create_session(&self, session: ChatSession) -> DbResult<()>;
    async fn update_session(&self, session: ChatSession) -> DbResult<()>;
    async fn delete_session(&self, session_id: Uuid) -> DbResult<()>;
    async fn get_messages(&self, session_id: Uuid) -> DbResult<Vec<ChatMessage>>;
    async fn append_message(&self, session_id: Uuid, message: ChatMessage) -> DbResult<()>;
}
