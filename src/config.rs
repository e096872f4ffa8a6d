use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;

use crate::llm::DEFAULT_BASE_URL;
use crate::relay::reply::FallbackMode;

/// Errors that can occur when loading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// A required variable is unset or empty.
    Missing { var: &'static str },
    /// A variable is set but cannot be parsed.
    Invalid { var: &'static str, value: String, reason: String },
    /// Validation error.
    Validation(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { var } => write!(f, "environment variable {var} must be set"),
            Self::Invalid { var, value, reason } => {
                write!(f, "invalid value '{value}' for {var}: {reason}")
            }
            Self::Validation(msg) => write!(f, "config validation error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Process-wide settings, read once at startup.
#[derive(Clone)]
pub struct Config {
    pub telegram_bot_token: String,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub model_name: String,
    /// Declared target language for generated code.
    pub lang_hint: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Deadline for one completion call.
    pub generation_timeout: Duration,
    pub port: u16,
    /// When set, the webhook is registered with Telegram at startup.
    pub public_url: Option<Url>,
    pub reply_fallback: FallbackMode,
    pub queue_capacity: usize,
    /// How long the webhook waits for a free queue slot.
    pub enqueue_timeout: Duration,
    /// Directory for log files.
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build the config from any variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| {
            lookup(var)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let telegram_bot_token = get("TELEGRAM_BOT_TOKEN")
            .ok_or(ConfigError::Missing { var: "TELEGRAM_BOT_TOKEN" })?;
        let openai_api_key =
            get("OPENAI_API_KEY").ok_or(ConfigError::Missing { var: "OPENAI_API_KEY" })?;

        // Telegram tokens are formatted as {bot_id}:{secret} where bot_id is numeric
        let token_parts: Vec<&str> = telegram_bot_token.split(':').collect();
        if token_parts.len() != 2 || token_parts[0].parse::<u64>().is_err() || token_parts[1].is_empty() {
            return Err(ConfigError::Validation(
                "TELEGRAM_BOT_TOKEN appears invalid (expected format: 123456789:ABCdefGHI...)".into(),
            ));
        }

        let openai_base_url = get("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if let Err(e) = Url::parse(&openai_base_url) {
            return Err(ConfigError::Invalid {
                var: "OPENAI_BASE_URL",
                value: openai_base_url,
                reason: e.to_string(),
            });
        }

        let public_url = match get("PUBLIC_URL") {
            Some(raw) => Some(Url::parse(&raw).map_err(|e| ConfigError::Invalid {
                var: "PUBLIC_URL",
                value: raw.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        let temperature: f32 = parse_or(&get, "TEMPERATURE", 0.1)?;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::Validation("TEMPERATURE must be between 0.0 and 2.0".into()));
        }
        let max_tokens: u32 = parse_or(&get, "MAX_TOKENS", 4096)?;
        if max_tokens == 0 {
            return Err(ConfigError::Validation("MAX_TOKENS must be positive".into()));
        }
        let timeout_secs: u64 = parse_or(&get, "GENERATION_TIMEOUT_SECS", 120)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Validation("GENERATION_TIMEOUT_SECS must be positive".into()));
        }
        let queue_capacity: usize = parse_or(&get, "QUEUE_CAPACITY", 64)?;
        if queue_capacity == 0 {
            return Err(ConfigError::Validation("QUEUE_CAPACITY must be positive".into()));
        }

        Ok(Self {
            telegram_bot_token,
            openai_api_key,
            openai_base_url,
            model_name: get("MODEL_NAME").unwrap_or_else(|| "gpt-4o".to_string()),
            lang_hint: get("LANG_HINT").unwrap_or_else(|| "python".to_string()),
            temperature,
            max_tokens,
            generation_timeout: Duration::from_secs(timeout_secs),
            port: parse_or(&get, "PORT", 5000)?,
            public_url,
            reply_fallback: parse_or(&get, "REPLY_FALLBACK", FallbackMode::Document)?,
            queue_capacity,
            enqueue_timeout: Duration::from_millis(parse_or(&get, "ENQUEUE_TIMEOUT_MS", 2000)?),
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    /// Full URL Telegram should deliver updates to, if a public URL is configured.
    pub fn webhook_url(&self) -> Option<Url> {
        let base = self.public_url.as_ref()?;
        let joined = format!("{}/webhook", base.as_str().trim_end_matches('/'));
        Url::parse(&joined).ok()
    }
}

fn parse_or<T, G>(get: &G, var: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(var) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
            value,
        }),
        None => Ok(default),
    }
}
