use std::time::Duration;

use serde::Deserialize;

use watchlist_api::MovieRules;

use crate::error::EngineError;
use crate::retry::RetryConfig;

/// Root configuration, parsed from TOML. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    /// Field rules applied before every write.
    #[serde(default)]
    pub validation: MovieRules,

    /// Client-side conflict retry.
    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub store: StoreConfig,
}

fn default_read_timeout_ms() -> u64 {
    5_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct CoordinatorConfig {
    /// Upper bound on a single store read. Writes are never timed out:
    /// once issued, their outcome is always awaited.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl CoordinatorConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

fn default_store_kind() -> String {
    "memory".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Which store backend to build.
    #[serde(default = "default_store_kind")]
    pub kind: String,
    /// Backend-specific settings, forwarded to the backend factory as JSON.
    #[serde(default)]
    pub config: Option<toml::Value>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: default_store_kind(),
            config: None,
        }
    }
}

impl StoreConfig {
    /// Backend settings as a JSON string (or `"{}"`).
    pub fn config_json(&self) -> Result<String, EngineError> {
        match &self.config {
            Some(v) => Ok(serde_json::to_string(v)?),
            None => Ok("{}".to_string()),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), EngineError> {
        if self.coordinator.read_timeout_ms == 0 {
            return Err(EngineError::Config(
                "coordinator.read_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(EngineError::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.retry.max_backoff_ms < self.retry.base_backoff_ms {
            return Err(EngineError::Config(
                "retry.max_backoff_ms must not be below retry.base_backoff_ms".into(),
            ));
        }
        if self.validation.max_years_ahead < 0 {
            return Err(EngineError::Config(
                "validation.max_years_ahead must not be negative".into(),
            ));
        }
        if self.validation.title_max_len == 0 {
            return Err(EngineError::Config("validation.title_max_len must be greater than zero".into()));
        }
        Ok(())
    }
}
