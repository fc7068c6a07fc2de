pub mod dbs;
mod handlers;
mod llm;

use crate::dbs::local::LocalDatabase;
use crate::dbs::postgres::PostgresDatabase;
use crate::dbs::{Database, DatabaseConfig, DbResult};
use crate::handlers::{
    append_message, create_character, create_session, delete_character, delete_session,
    get_character, get_session, list_characters, list_messages, list_sessions, send_message,
    update_character, update_session,
};
use axum::{
    Router,
    routing::{get, post},
};
use shared::models::LlmSettings;
use std::sync::{Arc, RwLock};
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Database>,
    pub llm: LlmSettings,
}

pub async fn init(
    router: Router<AppState>,
    database: DatabaseConfig,
    llm: LlmSettings,
) -> DbResult<Router<()>> {
    let db: Arc<dyn Database> = match database {
        DatabaseConfig::Local { path } => Arc::new(RwLock::new(LocalDatabase::load(path)?)),
        DatabaseConfig::Postgres { url } => Arc::new(PostgresDatabase::new(&url).await?),
    };
    let state = AppState { db, llm };

    Ok(router
        .route("/api/health", get(|| async { "OK" }))
        .route(
            "/api/characters",
            get(list_characters).post(create_character),
        )
        .route(
            "/api/characters/{character_id}",
            get(get_character)
                .put(update_character)
                .delete(delete_character),
        )
        .route("/api/sessions", get(list_sessions).post(create_session))
        .route(
            "/api/sessions/{session_id}",
            get(get_session).patch(update_session).delete(delete_session),
        )
        .route(
            "/api/sessions/{session_id}/messages",
            get(list_messages).post(append_message),
        )
        .route("/api/chat/send_message", post(send_message))
        .layer(CorsLayer::permissive())
        .with_state(state))
}
