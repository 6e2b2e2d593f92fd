//! Pipeline configuration loaded from `.env`.
//!
//! Everything is read once at startup; there is no mutable global state.
//! The model key is optional so the crate stays usable offline (every model
//! consumer falls back deterministically when the bridge is absent or fails).

use serde::{Deserialize, Serialize};

const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
const DEFAULT_STORAGE_PATH: &str = "./data/emodiary";
const DEFAULT_REQUEST_TIMEOUT_S: u64 = 30;

/// Pipeline configuration loaded from environment.
///
/// | Env | Default | Description |
/// |-----|---------|--------------|
/// | GROQ_API_KEY | — | Bearer key for the chat-completions endpoint. |
/// | EMODIARY_MODEL | llama-3.3-70b-versatile | Model id sent with every request. |
/// | EMODIARY_API_BASE | Groq OpenAI-compatible root | Endpoint base URL. |
/// | EMODIARY_REQUEST_TIMEOUT_S | 30 | Bound on any single model call. |
/// | EMODIARY_STORAGE_PATH | ./data/emodiary | Sled database location. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiaryConfig {
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub api_base: String,
    pub request_timeout_s: u64,
    pub storage_path: String,
}

impl Default for DiaryConfig {
    fn default() -> Self {
        Self {
            groq_api_key: None,
            groq_model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            request_timeout_s: DEFAULT_REQUEST_TIMEOUT_S,
            storage_path: DEFAULT_STORAGE_PATH.to_string(),
        }
    }
}

impl DiaryConfig {
    /// Load settings from `.env` / environment. Unset or invalid => defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self {
            groq_api_key: env_opt_string("GROQ_API_KEY"),
            groq_model: env_string("EMODIARY_MODEL", DEFAULT_MODEL),
            api_base: env_string("EMODIARY_API_BASE", DEFAULT_API_BASE),
            request_timeout_s: env_u64("EMODIARY_REQUEST_TIMEOUT_S", DEFAULT_REQUEST_TIMEOUT_S),
            storage_path: env_string("EMODIARY_STORAGE_PATH", DEFAULT_STORAGE_PATH),
        }
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn env_string(name: &str, default: &str) -> String {
    env_opt_string(name).unwrap_or_else(|| default.to_string())
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable_offline() {
        let config = DiaryConfig::default();
        assert!(config.groq_api_key.is_none());
        assert_eq!(config.groq_model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout_s, 30);
    }
}
