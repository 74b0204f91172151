use crate::completion::{DEFAULT_API_URL, DEFAULT_MODEL_KEY};
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Messages sent to the completion API as conversation context
pub const DEFAULT_HISTORY_WINDOW: usize = 10;
/// Messages rendered into the fallback engine's context string
pub const DEFAULT_CONTEXT_WINDOW: usize = 6;

/// Runtime configuration, normally loaded from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub history_window: usize,
    pub context_window: usize,
    /// None keeps every session for the process lifetime
    pub max_sessions: Option<usize>,
    pub fallback_delay: Duration,
    pub fallback_jitter: Duration,
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL_KEY.to_string(),
            history_window: DEFAULT_HISTORY_WINDOW,
            context_window: DEFAULT_CONTEXT_WINDOW,
            max_sessions: None,
            fallback_delay: Duration::ZERO,
            fallback_jitter: Duration::ZERO,
            log_dir: None,
        }
    }
}

impl Config {
    /// Load configuration from `MUSE_*` / `SKILLBRIDGE_*` variables.
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        Ok(Self {
            api_key: get("MUSE_API_KEY"),
            api_url: get("MUSE_API_URL").unwrap_or(defaults.api_url),
            model: get("MUSE_MODEL").unwrap_or(defaults.model),
            history_window: parse_or(
                "SKILLBRIDGE_HISTORY_WINDOW",
                get("SKILLBRIDGE_HISTORY_WINDOW"),
                defaults.history_window,
            )?,
            context_window: parse_or(
                "SKILLBRIDGE_CONTEXT_WINDOW",
                get("SKILLBRIDGE_CONTEXT_WINDOW"),
                defaults.context_window,
            )?,
            max_sessions: get("SKILLBRIDGE_MAX_SESSIONS")
                .map(|v| parse_value("SKILLBRIDGE_MAX_SESSIONS", &v))
                .transpose()?,
            fallback_delay: Duration::from_millis(parse_or(
                "SKILLBRIDGE_FALLBACK_DELAY_MS",
                get("SKILLBRIDGE_FALLBACK_DELAY_MS"),
                0u64,
            )?),
            fallback_jitter: Duration::from_millis(parse_or(
                "SKILLBRIDGE_FALLBACK_JITTER_MS",
                get("SKILLBRIDGE_FALLBACK_JITTER_MS"),
                0u64,
            )?),
            log_dir: get("SKILLBRIDGE_LOG_DIR").map(PathBuf::from),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T> {
    value.parse().map_err(|_| Error::Config {
        key,
        value: value.to_string(),
    })
}

fn parse_or<T: FromStr>(key: &'static str, value: Option<String>, default: T) -> Result<T> {
    match value {
        Some(v) => parse_value(key, &v),
        None => Ok(default),
    }
}
