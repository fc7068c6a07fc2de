use crate::dbs::{Database, DbError, DbResult};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared::models::{Character, ChatMessage, ChatSession};
use std::path::PathBuf;
use std::sync::RwLock;
use uuid::Uuid;

/// JSON-file database. Sessions embed their messages; the whole store
/// is rewritten on every mutation.
#[derive(Serialize, Deserialize, Default)]
pub struct LocalDatabase {
    #[serde(skip)]
    path: PathBuf,
    pub characters: Vec<Character>,
    pub sessions: Vec<ChatSession>,
}

impl LocalDatabase {
    pub fn load(path: impl Into<PathBuf>) -> DbResult<Self> {
        let path = path.into();
        let mut db = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            Self::default()
        };
        db.path = path;
        Ok(db)
    }

    fn save(&self) -> DbResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

fn character_not_found(character_id: Uuid) -> DbError {
    DbError::NotFound(format!("Character {} not found", character_id))
}

fn session_not_found(session_id: Uuid) -> DbError {
    DbError::NotFound(format!("Chat session {} not found", session_id))
}

#[async_trait]
impl Database for RwLock<LocalDatabase> {
    async fn get_characters(&self) -> DbResult<Vec<Character>> {
        let db = self.read().unwrap();
        Ok(db.characters.clone())
    }

    async fn get_character(&self, character_id: Uuid) -> DbResult<Character> {
        let db = self.read().unwrap();
        db.characters
            .iter()
            .find(|c| c.id == character_id)
            .cloned()
            .ok_or_else(|| character_not_found(character_id))
    }

    async fn create_character(&self, character: Character) -> DbResult<()> {
        let mut db = self.write().unwrap();
        db.characters.push(character);
        db.save()
    }

    async fn update_character(&self, character: Character) -> DbResult<()> {
        let mut db = self.write().unwrap();
        let slot = db
            .characters
            .iter_mut()
            .find(|c| c.id == character.id)
            .ok_or_else(|| character_not_found(character.id))?;
        *slot = character;
        db.save()
    }

    async fn delete_character(&self, character_id: Uuid) -> DbResult<()> {
        let mut db = self.write().unwrap();
        if !db.characters.iter().any(|c| c.id == character_id) {
            return Err(character_not_found(character_id));
        }
        db.characters.retain(|c| c.id != character_id);
        db.sessions.retain(|s| s.character_id != character_id);
        db.save()
    }

    async fn get_sessions(&self, character_id: Option<Uuid>) -> DbResult<Vec<ChatSession>> {
        let db = self.read().unwrap();
        if let Some(cid) = character_id {
            Ok(db
                .sessions
                .iter()
                .filter(|s| s.character_id == cid)
                .cloned()
                .collect())
        } else {
            Ok(db.sessions.clone())
        }
    }

    async fn get_session(&self, session_id: Uuid) -> DbResult<ChatSession> {
        let db = self.read().unwrap();
        db.sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned()
            .ok_or_else(|| session_not_found(session_id))
    }

    async fn create_session(&self, session: ChatSession) -> DbResult<()> {
        let mut db = self.write().unwrap();
        db.sessions.push(session);
        db.save()
    }

    async fn update_session(&self, session: ChatSession) -> DbResult<()> {
        let mut db = self.write().unwrap();
        let slot = db
            .sessions
            .iter_mut()
            .find(|s| s.id == session.id)
            .ok_or_else(|| session_not_found(session.id))?;
        *slot = session;
        db.save()
    }

    async fn delete_session(&self, session_id: Uuid) -> DbResult<()> {
        let mut db = self.write().unwrap();
        if !db.sessions.iter().any(|s| s.id == session_id) {
            return Err(session_not_found(session_id));
        }
        db.sessions.retain(|s| s.id != session_id);
        db.save()
    }

    async fn get_messages(&self, session_id: Uuid) -> DbResult<Vec<ChatMessage>> {
        let db = self.read().unwrap();
        db.sessions
            .iter()
            .find(|s| s.id == session_id)
            .map(|s| s.messages.clone())
            .ok_or_else(|| session_not_found(session_id))
    }

    async fn append_message(&self, session_id: Uuid, message: ChatMessage) -> DbResult<()> {
        let mut db = self.write().unwrap();
        let session = db
            .sessions
            .iter_mut()
            .find(|s| s.id == session_id)
            .ok_or_else(|| session_not_found(session_id))?;
        session.messages.push(message);
        session.updated_at = Utc::now();
        db.save()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared::models::{DisabledFields, ROLE_USER};

    fn test_db(dir: &tempfile::TempDir) -> RwLock<LocalDatabase> {
        RwLock::new(LocalDatabase::load(dir.path().join("db.json")).unwrap())
    }

    fn make_character(name: &str) -> Character {
        let now = Utc::now();
        Character {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: "desc".to_string(),
            personality: "calm".to_string(),
            appearance: "plain".to_string(),
            response_guidelines: "be kind".to_string(),
            avatar_url: None,
            file_url: None,
            disabled: DisabledFields::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn character_roundtrips_disabled_states() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);

        let mut character = make_character("Aria");
        character.disabled.description = true;
        db.create_character(character.clone()).await.unwrap();

        let fetched = db.get_character(character.id).await.unwrap();
        assert!(fetched.disabled.description);
        assert!(!fetched.disabled.name);
    }

    #[tokio::test]
    async fn store_persists_across_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.json");
        let character = make_character("Aria");

        {
            let db = RwLock::new(LocalDatabase::load(&path).unwrap());
            db.create_character(character.clone()).await.unwrap();
        }

        let db = RwLock::new(LocalDatabase::load(&path).unwrap());
        assert_eq!(db.get_character(character.id).await.unwrap(), character);
    }

    #[tokio::test]
    async fn update_character_replaces_record() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);

        let mut character = make_character("Aria");
        db.create_character(character.clone()).await.unwrap();
        character.personality = "sarcastic".to_string();
        db.update_character(character.clone()).await.unwrap();

        let fetched = db.get_character(character.id).await.unwrap();
        assert_eq!(fetched.personality, "sarcastic");
    }

    #[tokio::test]
    async fn update_unknown_character_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);
        let result = db.update_character(make_character("Ghost")).await;
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_character_cascades_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);

        let character = make_character("Aria");
        db.create_character(character.clone()).await.unwrap();
        let session = ChatSession::new(character.id, "Chat with Aria");
        db.create_session(session.clone()).await.unwrap();

        db.delete_character(character.id).await.unwrap();
        let result = db.get_session(session.id).await;
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn sessions_filter_by_character() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);

        let aria = make_character("Aria");
        let bram = make_character("Bram");
        db.create_session(ChatSession::new(aria.id, "a")).await.unwrap();
        db.create_session(ChatSession::new(bram.id, "b")).await.unwrap();

        let sessions = db.get_sessions(Some(aria.id)).await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].character_id, aria.id);

        assert_eq!(db.get_sessions(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn append_message_requires_session() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);
        let result = db
            .append_message(Uuid::new_v4(), ChatMessage::new(ROLE_USER, "hi"))
            .await;
        assert!(matches!(result, Err(DbError::NotFound(_))));
    }

    #[tokio::test]
    async fn append_and_list_messages() {
        let dir = tempfile::tempdir().unwrap();
        let db = test_db(&dir);

        let session = ChatSession::new(Uuid::new_v4(), "chat");
        db.create_session(session.clone()).await.unwrap();
        db.append_message(session.id, ChatMessage::new(ROLE_USER, "first"))
            .await
            .unwrap();
        db.append_message(session.id, ChatMessage::new(ROLE_USER, "second"))
            .await
            .unwrap();

        let messages = db.get_messages(session.id).await.unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].content, "first");
        assert_eq!(messages[1].content, "second");
    }
}
