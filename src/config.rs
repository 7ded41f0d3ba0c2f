//! Configuration module
//!
//! Settings are read from a TOML file. Every section and key is optional and
//! falls back to its default.
//!
//! ```toml
//! [database]
//! url = "sqlite://./tixer.db?mode=rwc"
//! max_connections = 5
//!
//! [store]
//! counter_key = "--counter--"
//! operation_timeout_ms = 5000
//!
//! [retry]
//! max_attempts = 3
//! initial_delay_ms = 50
//! max_delay_ms = 1000
//! backoff_multiplier = 2.0
//!
//! [logging]
//! level = "info"
//! format = "text"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::ticket::{CounterKey, DEFAULT_COUNTER_KEY};
use crate::infrastructure::database::{DatabaseConfig, DEFAULT_DATABASE_URL};
use crate::shared::{ConfigError, OperationContext, RetryConfig};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "TIXER_CONFIG";

/// `<config_dir>/tixer/config.toml`, e.g. `~/.config/tixer/config.toml` on Linux.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tixer")
        .join("config.toml")
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseSection,
    pub store: StoreSection,
    pub retry: RetrySection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreSection {
    /// Identity of the counter row. Must not look like a ticket id.
    pub counter_key: String,
    /// Deadline applied to each operation; 0 disables it.
    pub operation_timeout_ms: u64,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            counter_key: DEFAULT_COUNTER_KEY.to_string(),
            operation_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 50,
            max_delay_ms: 1_000,
            backoff_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter directive, e.g. "info" or "tixer=debug". `RUST_LOG` wins.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Read and validate the config file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// Like [`AppConfig::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => Self::from_toml(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Invalid("database.url must not be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        self.counter_key()?;
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid("retry.max_attempts must be at least 1".into()));
        }
        if !(self.retry.backoff_multiplier >= 1.0) {
            return Err(ConfigError::Invalid(
                "retry.backoff_multiplier must be >= 1.0".into(),
            ));
        }
        Ok(())
    }

    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
        }
    }

    pub fn counter_key(&self) -> Result<CounterKey, ConfigError> {
        CounterKey::new(self.store.counter_key.clone())
            .map_err(|e| ConfigError::Invalid(format!("store.counter_key: {}", e)))
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry.max_attempts,
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            backoff_multiplier: self.retry.backoff_multiplier,
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    /// Fresh context carrying the configured per-operation deadline.
    pub fn operation_context(&self) -> OperationContext {
        match self.store.operation_timeout_ms {
            0 => OperationContext::background(),
            ms => OperationContext::with_timeout(Duration::from_millis(ms)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("tixer-{}-{}.toml", name, uuid::Uuid::new_v4()))
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.store.counter_key, "--counter--");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert_eq!(config.retry_config(), RetryConfig::default());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [database]
            url = "sqlite::memory:"

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn counter_key_shaped_like_ticket_id_is_invalid() {
        let raw = format!(
            "[store]\ncounter_key = \"{}\"\n",
            crate::domain::ticket::TicketId::new()
        );
        assert!(matches!(
            AppConfig::from_toml(&raw),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn zero_retry_attempts_are_invalid() {
        let result = AppConfig::from_toml("[retry]\nmax_attempts = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_log_format_fails_to_parse() {
        let result = AppConfig::from_toml("[logging]\nformat = \"xml\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[tokio::test]
    async fn operation_timeout_becomes_context_deadline() {
        let mut config = AppConfig::default();
        config.store.operation_timeout_ms = 1;
        let result = config
            .operation_context()
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(crate::shared::DomainError::DeadlineExceeded)));

        config.store.operation_timeout_ms = 0;
        let result = config
            .operation_context()
            .run(async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok(7)
            })
            .await;
        assert_eq!(result.unwrap(), 7);
    }

    #[test]
    fn load_reads_file_from_disk() {
        let path = temp_path("load");
        std::fs::write(&path, "[store]\noperation_timeout_ms = 250\n").unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.store.operation_timeout_ms, 250);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_an_error_for_load_but_not_for_load_or_default() {
        let path = temp_path("missing");
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Io(_))));
        assert_eq!(AppConfig::load_or_default(&path).unwrap(), AppConfig::default());
    }

    #[test]
    fn default_path_ends_with_app_dir() {
        let path = default_config_path();
        assert!(path.ends_with("tixer/config.toml"));
    }
}
