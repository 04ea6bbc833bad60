use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;
use url::Url;

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/";

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub gemini_model: String,
    pub gemini_api_base: Url,
    pub model_timeout_secs: u64,
    pub model_max_attempts: u32,
    pub model_backoff_ms: u64,
    pub question_temperature: f32,
    pub grading_temperature: f32,
    pub max_duplicate_retries: u32,
    pub cache_capacity: usize,
    pub session_ttl_minutes: i64,
    pub session_rps: u32,
    pub static_dir: String,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let api_base = get_env_or("GEMINI_API_BASE", DEFAULT_GEMINI_API_BASE);
        let gemini_api_base = Url::parse(&api_base)
            .map_err(|e| Error::Config(format!("Invalid value for GEMINI_API_BASE: {}", e)))?;

        let config = Self {
            server_address: get_env("SERVER_ADDRESS")?,
            gemini_model: get_env_or("GEMINI_MODEL", "gemini-1.5-flash-latest"),
            gemini_api_base,
            model_timeout_secs: get_env_parse_or("MODEL_TIMEOUT_SECS", 60)?,
            model_max_attempts: get_env_parse_or("MODEL_MAX_ATTEMPTS", 3)?,
            model_backoff_ms: get_env_parse_or("MODEL_BACKOFF_MS", 500)?,
            question_temperature: get_env_parse_or("QUESTION_TEMPERATURE", 0.7)?,
            grading_temperature: get_env_parse_or("GRADING_TEMPERATURE", 0.7)?,
            max_duplicate_retries: get_env_parse_or("MAX_DUPLICATE_RETRIES", 3)?,
            cache_capacity: get_env_parse_or("CACHE_CAPACITY", 512)?,
            session_ttl_minutes: get_env_parse_or("SESSION_TTL_MINUTES", 120)?,
            session_rps: get_env_parse_or("SESSION_RPS", 5)?,
            static_dir: get_env_or("STATIC_DIR", "static"),
        };

        if config.model_max_attempts == 0 {
            return Err(Error::Config(
                "MODEL_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Defaults for everything except the listen address. Used by tests and
    /// embedders that do not read the environment.
    pub fn with_address(server_address: impl Into<String>) -> Self {
        Self {
            server_address: server_address.into(),
            gemini_model: "gemini-1.5-flash-latest".to_string(),
            gemini_api_base: Url::parse(DEFAULT_GEMINI_API_BASE)
                .expect("default api base is a valid url"),
            model_timeout_secs: 60,
            model_max_attempts: 3,
            model_backoff_ms: 500,
            question_temperature: 0.7,
            grading_temperature: 0.7,
            max_duplicate_retries: 3,
            cache_capacity: 512,
            session_ttl_minutes: 120,
            session_rps: 5,
            static_dir: "static".to_string(),
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
