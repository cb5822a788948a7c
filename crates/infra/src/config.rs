//! Environment-driven configuration.

use std::time::Duration;

use thiserror::Error;

use herdbook_observability::LogFormat;

pub const DEFAULT_CLASSIFIER_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_CLASSIFIER_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CLASSIFIER_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set when USE_PERSISTENT_STORES=true")]
    Missing(&'static str),

    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HerdbookConfig {
    pub store: StoreConfig,
    pub classifier: ClassifierConfig,
    pub log_format: LogFormat,
}

impl HerdbookConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let use_persistent = match get("USE_PERSISTENT_STORES") {
            None => false,
            Some(raw) => raw.trim().parse::<bool>().map_err(|_| ConfigError::Invalid {
                var: "USE_PERSISTENT_STORES",
                value: raw.clone(),
                reason: "expected 'true' or 'false'".to_string(),
            })?,
        };

        let store = if use_persistent {
            let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
            StoreConfig::Postgres { database_url }
        } else {
            StoreConfig::InMemory
        };

        let timeout_secs = match get("CLASSIFIER_TIMEOUT_SECS") {
            None => DEFAULT_CLASSIFIER_TIMEOUT_SECS,
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "CLASSIFIER_TIMEOUT_SECS",
                        value: raw,
                        reason: "expected a positive number of seconds".to_string(),
                    });
                }
            },
        };

        let log_format = match get("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(raw) => raw.parse().map_err(|e: herdbook_observability::ParseLogFormatError| {
                ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?,
        };

        Ok(Self {
            store,
            classifier: ClassifierConfig {
                endpoint: get("CLASSIFIER_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_CLASSIFIER_ENDPOINT.to_string()),
                api_key: get("CLASSIFIER_API_KEY"),
                model: get("CLASSIFIER_MODEL")
                    .unwrap_or_else(|| DEFAULT_CLASSIFIER_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
            log_format,
        })
    }
}
