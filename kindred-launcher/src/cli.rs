use backend::dbs::DatabaseConfig;
use clap::Parser;
use shared::models::LlmSettings;
use std::path::PathBuf;

#[derive(Parser)]
pub struct Cli {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    /// Directory with the built frontend bundle, served as static files
    #[arg(long, default_value = "dist")]
    pub dist_dir: PathBuf,
    /// JSON file backing the local database
    #[arg(long, default_value = "db.json")]
    pub local_db_path: PathBuf,
    /// When set, use PostgreSQL instead of the local JSON file
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,
    #[arg(long, env = "LLM_API_KEY", default_value = "")]
    pub api_key: String,
    #[arg(long, env = "LLM_API_BASE")]
    pub api_base: Option<String>,
    #[arg(long, env = "LLM_MODEL")]
    pub model: Option<String>,
}

impl Cli {
    pub fn database_config(&self) -> DatabaseConfig {
        match &self.database_url {
            Some(url) => DatabaseConfig::Postgres { url: url.clone() },
            None => DatabaseConfig::Local {
                path: self.local_db_path.clone(),
            },
        }
    }

    pub fn llm_settings(&self) -> LlmSettings {
        let mut settings = LlmSettings {
            api_key: self.api_key.clone(),
            ..LlmSettings::default()
        };
        if let Some(api_base) = &self.api_base {
            settings.api_base = api_base.clone();
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        settings
    }
}
