//! Process configuration, read once at startup from the environment.

use crate::i18n::Language;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("missing required environment variable {0}")]
pub struct MissingVar(&'static str);

#[derive(Debug, Clone)]
pub struct Config {
    /// Chat platform bot token
    pub bot_token: String,
    /// Analysis service base URL
    pub analysis_url: String,
    /// Analysis service API key
    pub analysis_api_key: String,
    /// Session database location
    pub session_db_path: String,
    /// Interface language for users who have not picked one
    pub default_language: Language,
}

impl Config {
    pub fn from_env() -> Result<Self, MissingVar> {
        Ok(Self {
            bot_token: required("BOT_TOKEN")?,
            analysis_url: required("ANALYSIS_API_URL")?,
            analysis_api_key: required("ANALYSIS_API_KEY")?,
            session_db_path: std::env::var("SESSION_DB_PATH").unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                format!("{home}/.recital-bot/sessions.db")
            }),
            default_language: std::env::var("DEFAULT_LANGUAGE")
                .ok()
                .and_then(|tag| Language::from_tag(&tag))
                .unwrap_or_default(),
        })
    }
}

fn required(name: &'static str) -> Result<String, MissingVar> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(MissingVar(name)),
    }
}
