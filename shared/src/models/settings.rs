use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LlmSettings {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: "https://openrouter.ai/api/v1".to_string(),
            model: "google/gemini-2.5-pro".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}
