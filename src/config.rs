// src/config.rs

use std::env;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;

use crate::error::AppError;

/// Sorted-set key holding per-question view counts.
pub const POPULAR_QUESTIONS_KEY: &str = "exam:popular_questions";

/// Number of calls made to the AI endpoint before giving up.
pub const AI_MAX_ATTEMPTS: u32 = 3;

/// Hot-question list size when the caller does not ask for one.
pub const DEFAULT_POPULAR_SIZE: usize = 6;

/// Upper bound for a page of questions.
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub rust_log: String,
    pub log_dir: String,
    pub ai: AiConfig,
}

/// Connection settings for the text-completion endpoint.
#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Hard limit for a single attempt.
    pub timeout: Duration,
    /// Pause between two failed attempts.
    pub retry_delay: Duration,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.moonshot.cn/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "moonshot-v1-32k".to_string(),
            temperature: 0.3,
            max_tokens: 4096,
            timeout: Duration::from_secs(100),
            retry_delay: Duration::from_millis(1000),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL must be set".to_string()))?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let defaults = AiConfig::default();
        let ai = AiConfig {
            api_url: env::var("AI_API_URL").unwrap_or(defaults.api_url),
            api_key: env::var("AI_API_KEY").unwrap_or(defaults.api_key),
            model: env::var("AI_MODEL").unwrap_or(defaults.model),
            temperature: parse_var("AI_TEMPERATURE", defaults.temperature)?,
            max_tokens: parse_var("AI_MAX_TOKENS", defaults.max_tokens)?,
            timeout: Duration::from_secs(parse_var("AI_TIMEOUT_SECS", defaults.timeout.as_secs())?),
            retry_delay: Duration::from_millis(parse_var(
                "AI_RETRY_DELAY_MS",
                defaults.retry_delay.as_millis() as u64,
            )?),
        };

        Ok(Self {
            database_url,
            rust_log,
            log_dir,
            ai,
        })
    }
}

/// Reads an optional variable, falling back to `default` when unset.
fn parse_var<T: FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", key, raw))),
        Err(_) => Ok(default),
    }
}
