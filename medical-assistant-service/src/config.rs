use assistant_flow::{GenerationSettings, STOP_MARKER, locator::DEFAULT_CITY};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_OPENROUTER_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_VISION_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_CHAT_MODEL: &str = "google/gemma-2-9b-it";
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
pub const DEFAULT_USER_AGENT: &str = "SmartMedicalAssistant/1.0";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Runtime settings, read from the environment.
#[derive(Debug, Clone)]
pub struct AssistantConfig {
    pub port: u16,
    /// Missing keys are not fatal here; the OCR and chat calls report them.
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub vision_model: String,
    pub chat_model: String,
    pub generation: GenerationSettings,
    pub nominatim_url: String,
    pub search_user_agent: String,
    pub default_city: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            openrouter_api_key: None,
            openrouter_base_url: DEFAULT_OPENROUTER_URL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            generation: GenerationSettings::default(),
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            search_user_agent: DEFAULT_USER_AGENT.to_string(),
            default_city: DEFAULT_CITY.to_string(),
        }
    }
}

impl AssistantConfig {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(&std::env::vars().collect())
    }

    /// Builds the config from an explicit variable map (useful for testing).
    pub fn from_vars(env: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(env, key).map(str::to_string).unwrap_or(default)
        };

        Ok(Self {
            port: parse_or(env, "PORT", defaults.port)?,
            openrouter_api_key: lookup(env, "OPENROUTER_API_KEY").map(str::to_string),
            openrouter_base_url: text("OPENROUTER_BASE_URL", defaults.openrouter_base_url),
            vision_model: text("VISION_MODEL", defaults.vision_model),
            chat_model: text("CHAT_MODEL", defaults.chat_model),
            generation: GenerationSettings {
                temperature: parse_or(env, "CHAT_TEMPERATURE", defaults.generation.temperature)?,
                max_tokens: parse_or(env, "CHAT_MAX_TOKENS", defaults.generation.max_tokens)?,
                stop_marker: text("CHAT_STOP_MARKER", STOP_MARKER.to_string()),
            },
            nominatim_url: text("NOMINATIM_URL", defaults.nominatim_url),
            search_user_agent: text("SEARCH_USER_AGENT", defaults.search_user_agent),
            default_city: text("DEFAULT_CITY", defaults.default_city),
        })
    }
}

fn lookup<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn parse_or<T>(env: &HashMap<String, String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(env, key) {
        Some(raw) => raw.parse::<T>().map_err(|e| ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
