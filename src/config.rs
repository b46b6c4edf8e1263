use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::engine::retry::{LinearBackoff, RetryPolicy, DEFAULT_MAX_ATTEMPTS};
use crate::model::match_report::ReportKeys;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY is not set. Export it before starting match_commentary.")]
    MissingApiKey,
}

/// Process-wide credential, read once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(Self(value.trim().to_string()))
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let value = std::env::var(API_KEY_ENV).map_err(|_| ConfigError::MissingApiKey)?;
        Self::new(value)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: String,
    pub endpoint: String,

    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    /// Random extra wait, as a fraction of the base (0.0 - <1.0)
    pub backoff_jitter: f64,

    pub request_timeout_secs: Option<u64>,

    pub report_keys: ReportKeys,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash".into(),
            endpoint: "https://generativelanguage.googleapis.com/v1beta".into(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base_ms: 2000,
            backoff_jitter: 0.0,
            request_timeout_secs: None,
            report_keys: ReportKeys::default(),
        }
    }
}

impl AppConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        let backoff = LinearBackoff::new(Duration::from_millis(self.backoff_base_ms))
            .with_jitter(self.backoff_jitter);
        RetryPolicy::new(self.max_attempts, backoff)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

pub fn config_path() -> PathBuf {
    let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("match_commentary");
    path.push("config.json");
    path
}

/// Load settings from the user config dir, falling back to defaults.
pub fn load_config() -> AppConfig {
    load_config_from(&config_path())
}

pub fn load_config_from(path: &Path) -> AppConfig {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(_) => {
            info!(path = %path.display(), "no config file, using defaults");
            return AppConfig::default();
        }
    };

    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "ignoring malformed config file");
        AppConfig::default()
    })
}
