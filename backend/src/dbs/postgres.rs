use crate::dbs::{Database, DbError, DbResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use shared::models::{Character, ChatMessage, ChatSession, SessionSettings};
use sqlx::{Pool, Postgres, Row, postgres::PgPoolOptions};
use uuid::Uuid;

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: Pool<Postgres>,
}

impl PostgresDatabase {
    pub async fn new(database_url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new().connect(database_url).await?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    async fn init(&self) -> DbResult<()> {
        // Tables compatible with PostgreSQL/CockroachDB
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS characters (
                id UUID PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                personality TEXT NOT NULL,
                appearance TEXT NOT NULL,
                response_guidelines TEXT NOT NULL,
                avatar_url TEXT,
                file_url TEXT,
                disabled_states JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sessions (
                id UUID PRIMARY KEY,
                character_id UUID NOT NULL,
                title TEXT NOT NULL,
                user_persona TEXT,
                world_time TEXT,
                output_language TEXT,
                additional_context TEXT,
                enable_web_search BOOLEAN,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                FOREIGN KEY(character_id) REFERENCES characters(id)
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS messages (
                id UUID PRIMARY KEY,
                session_id UUID NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                file_uri TEXT,
                timestamp TIMESTAMPTZ NOT NULL,
                FOREIGN KEY(session_id) REFERENCES sessions(id)
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_messages_for_session(&self, session_id: Uuid) -> DbResult<Vec<ChatMessage>> {
        let rows = sqlx::query(
            "SELECT id, role, content, file_uri, timestamp FROM messages
             WHERE session_id = $1 ORDER BY timestamp, id",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|row| message_from_row(&row)).collect())
    }

    async fn session_exists(&self, session_id: Uuid) -> DbResult<bool> {
        let row = sqlx::query("SELECT id FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

fn character_from_row(row: &sqlx::postgres::PgRow) -> DbResult<Character> {
    let disabled_val: Value = row.get("disabled_states");
    Ok(Character {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        personality: row.get("personality"),
        appearance: row.get("appearance"),
        response_guidelines: row.get("response_guidelines"),
        avatar_url: row.get("avatar_url"),
        file_url: row.get("file_url"),
        disabled: serde_json::from_value(disabled_val)?,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    })
}

fn session_from_row(row: &sqlx::postgres::PgRow, messages: Vec<ChatMessage>) -> ChatSession {
    ChatSession {
        id: row.get("id"),
        character_id: row.get("character_id"),
        title: row.get("title"),
        settings: SessionSettings {
            user_persona: row.get("user_persona"),
            world_time: row.get("world_time"),
            output_language: row.get("output_language"),
            additional_context: row.get("additional_context"),
            enable_web_search: row.get("enable_web_search"),
        },
        messages,
        created_at: row.get::<DateTime<Utc>, _>("created_at"),
        updated_at: row.get::<DateTime<Utc>, _>("updated_at"),
    }
}

fn message_from_row(row: &sqlx::postgres::PgRow) -> ChatMessage {
    ChatMessage {
        id: row.get("id"),
        role: row.get("role"),
        content: row.get("content"),
        file_uri: row.get("file_uri"),
        timestamp: row.get::<DateTime<Utc>, _>("timestamp"),
    }
}

const CHARACTER_COLUMNS: &str = "id, name, description, personality, appearance, \
     response_guidelines, avatar_url, file_url, disabled_states, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, character_id, title, user_persona, world_time, \
     output_language, additional_context, enable_web_search, created_at, updated_at";

#[async_trait]
impl Database for PostgresDatabase {
    async fn get_characters(&self) -> DbResult<Vec<Character>> {
        let rows = sqlx::query(&format!("SELECT {} FROM characters", CHARACTER_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(character_from_row).collect()
    }

    async fn get_character(&self, character_id: Uuid) -> DbResult<Character> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM characters WHERE id = $1",
            CHARACTER_COLUMNS
        ))
        .bind(character_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => character_from_row(&row),
            None => Err(DbError::NotFound(format!(
                "Character {} not found",
                character_id
            ))),
        }
    }

    async fn create_character(&self, character: Character) -> DbResult<()> {
        let disabled_json = serde_json::to_value(&character.disabled)?;
        sqlx::query(
            "INSERT INTO characters (id, name, description, personality, appearance, \
             response_guidelines, avatar_url, file_url, disabled_states, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(character.id)
        .bind(character.name)
        .bind(character.description)
        .bind(character.personality)
        .bind(character.appearance)
        .bind(character.response_guidelines)
        .bind(character.avatar_url)
        .bind(character.file_url)
        .bind(disabled_json)
        .bind(character.created_at)
        .bind(character.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_character(&self, character: Character) -> DbResult<()> {
        let disabled_json = serde_json::to_value(&character.disabled)?;
        let result = sqlx::query(
            "UPDATE characters SET name = $1, description = $2, personality = $3, \
             appearance = $4, response_guidelines = $5, avatar_url = $6, file_url = $7, \
             disabled_states = $8, updated_at = $9 WHERE id = $10",
        )
        .bind(character.name)
        .bind(character.description)
        .bind(character.personality)
        .bind(character.appearance)
        .bind(character.response_guidelines)
        .bind(character.avatar_url)
        .bind(character.file_url)
        .bind(disabled_json)
        .bind(character.updated_at)
        .bind(character.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!(
                "Character {} not found",
                character.id
            )));
        }
        Ok(())
    }

    async fn delete_character(&self, character_id: Uuid) -> DbResult<()> {
        // Sessions and their messages go first to satisfy the foreign keys
        let sessions = self.get_sessions(Some(character_id)).await?;
        for session in sessions {
            self.delete_session(session.id).await?;
        }

        sqlx::query("DELETE FROM characters WHERE id = $1")
            .bind(character_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_sessions(&self, character_id: Option<Uuid>) -> DbResult<Vec<ChatSession>> {
        let rows = if let Some(cid) = character_id {
            sqlx::query(&format!(
                "SELECT {} FROM sessions WHERE character_id = $1",
                SESSION_COLUMNS
            ))
            .bind(cid)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!("SELECT {} FROM sessions", SESSION_COLUMNS))
                .fetch_all(&self.pool)
                .await?
        };

        // Fetch all messages for these sessions in one query
        let session_ids: Vec<Uuid> = rows.iter().map(|r| r.get("id")).collect();
        let mut messages_map: std::collections::HashMap<Uuid, Vec<ChatMessage>> =
            std::collections::HashMap::new();

        if !session_ids.is_empty() {
            let placeholders: Vec<String> = session_ids
                .iter()
                .enumerate()
                .map(|(i, _)| format!("${}", i + 1))
                .collect();
            let query = format!(
                "SELECT id, session_id, role, content, file_uri, timestamp FROM messages \
                 WHERE session_id IN ({}) ORDER BY timestamp, id",
                placeholders.join(",")
            );

            let mut query_builder = sqlx::query(&query);
            for id in &session_ids {
                query_builder = query_builder.bind(id);
            }

            for row in query_builder.fetch_all(&self.pool).await? {
                let session_id: Uuid = row.get("session_id");
                messages_map
                    .entry(session_id)
                    .or_default()
                    .push(message_from_row(&row));
            }
        }

        Ok(rows
            .iter()
            .map(|row| {
                let session_id: Uuid = row.get("id");
                let messages = messages_map.remove(&session_id).unwrap_or_default();
                session_from_row(row, messages)
            })
            .collect())
    }

    async fn get_session(&self, session_id: Uuid) -> DbResult<ChatSession> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM sessions WHERE id = $1",
            SESSION_COLUMNS
        ))
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let messages = self.get_messages_for_session(session_id).await?;
                Ok(session_from_row(&row, messages))
            }
            None => Err(DbError::NotFound(format!(
                "Chat session {} not found",
                session_id
            ))),
        }
    }

    async fn create_session(&self, session: ChatSession) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO sessions (id, character_id, title, user_persona, world_time, \
             output_language, additional_context, enable_web_search, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(session.id)
        .bind(session.character_id)
        .bind(session.title)
        .bind(session.settings.user_persona)
        .bind(session.settings.world_time)
        .bind(session.settings.output_language)
        .bind(session.settings.additional_context)
        .bind(session.settings.enable_web_search)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;

        // Also insert initial messages if any
        for message in session.messages {
            self.append_message(session.id, message).await?;
        }
        Ok(())
    }

    async fn update_session(&self, session: ChatSession) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE sessions SET title = $1, user_persona = $2, world_time = $3, \
             output_language = $4, additional_context = $5, enable_web_search = $6, \
             updated_at = $7 WHERE id = $8",
        )
        .bind(session.title)
        .bind(session.settings.user_persona)
        .bind(session.settings.world_time)
        .bind(session.settings.output_language)
        .bind(session.settings.additional_context)
        .bind(session.settings.enable_web_search)
        .bind(session.updated_at)
        .bind(session.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(format!(
                "Chat session {} not found",
                session.id
            )));
        }
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> DbResult<()> {
        sqlx::query("DELETE FROM messages WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_messages(&self, session_id: Uuid) -> DbResult<Vec<ChatMessage>> {
        if !self.session_exists(session_id).await? {
            return Err(DbError::NotFound(format!(
                "Chat session {} not found",
                session_id
            )));
        }
        self.get_messages_for_session(session_id).await
    }

    async fn append_message(&self, session_id: Uuid, message: ChatMessage) -> DbResult<()> {
        if !self.session_exists(session_id).await? {
            return Err(DbError::NotFound(format!(
                "Chat session {} not found",
                session_id
            )));
        }

        sqlx::query(
            "INSERT INTO messages (id, session_id, role, content, file_uri, timestamp) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(message.id)
        .bind(session_id)
        .bind(message.role)
        .bind(message.content)
        .bind(message.file_uri)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await?;

        sqlx::query("UPDATE sessions SET updated_at = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ROLE_USER;

    // Needs a running PostgreSQL instance; set DATABASE_URL and run
    // with `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn append_to_unknown_session_is_not_found() {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let db = PostgresDatabase::new(&url).await.unwrap();

        let result = db
            .append_message(Uuid::new_v4(), ChatMessage::new(ROLE_USER, "hi"))
            .await;
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }
}
