//! # Billing Configuration
//!
//! Settings for the database pool, the commit retry policy, and logging.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SMARTBILL_DB_PATH=/data/smartbill.db                               │
//! │     SMARTBILL_COMMIT_MAX_ATTEMPTS=8                                    │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/smartbill/smartbill.toml (Linux)                         │
//! │     ~/Library/Application Support/app.smartbill.smartbill/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "smartbill.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [commit]
//! max_attempts = 5
//! initial_backoff_ms = 20
//! max_backoff_ms = 500
//!
//! [log]
//! filter = "info,smartbill_db=debug"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::allocator::RetryPolicy;
use crate::pool::DbConfig;

// =============================================================================
// Errors
// =============================================================================

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Database Settings
// =============================================================================

/// Where the database lives and how the pool behaves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a commit waits for another writer before reporting a
    /// conflict.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("smartbill.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

impl DatabaseSettings {
    pub fn to_db_config(&self) -> DbConfig {
        DbConfig::new(&self.path)
            .max_connections(self.max_connections)
            .busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }
}

// =============================================================================
// Commit Settings
// =============================================================================

/// Retry bound and backoff for conflicting commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

fn default_initial_backoff() -> u64 {
    20
}

fn default_max_backoff() -> u64 {
    500
}

impl Default for CommitSettings {
    fn default() -> Self {
        CommitSettings {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl From<&CommitSettings> for RetryPolicy {
    fn from(settings: &CommitSettings) -> Self {
        RetryPolicy {
            max_attempts: settings.max_attempts,
            initial_backoff: Duration::from_millis(settings.initial_backoff_ms),
            max_backoff: Duration::from_millis(settings.max_backoff_ms),
        }
    }
}

// =============================================================================
// Log Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins if set.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            filter: default_log_filter(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete SmartBilling configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub commit: CommitSettings,

    #[serde(default)]
    pub log: LogSettings,
}

impl BillingConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`config_path`, or `smartbill.toml` in the platform
    ///    config directory)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                config = Self::from_file(&path)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Parses a TOML file.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, toml::to_string_pretty(self)?)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.commit.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "commit.max_attempts must be greater than 0".into(),
            ));
        }

        if self.commit.max_backoff_ms < self.commit.initial_backoff_ms {
            return Err(ConfigError::Invalid(
                "commit.max_backoff_ms must be at least commit.initial_backoff_ms".into(),
            ));
        }

        Ok(())
    }

    /// Applies `SMARTBILL_*` overrides read through `var`.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("SMARTBILL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("SMARTBILL_DB_MAX_CONNECTIONS") {
            match max.parse() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid SMARTBILL_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(attempts) = var("SMARTBILL_COMMIT_MAX_ATTEMPTS") {
            match attempts.parse() {
                Ok(n) => self.commit.max_attempts = n,
                Err(_) => warn!(value = %attempts, "Ignoring invalid SMARTBILL_COMMIT_MAX_ATTEMPTS"),
            }
        }

        if let Some(backoff) = var("SMARTBILL_COMMIT_BACKOFF_MS") {
            match backoff.parse() {
                Ok(ms) => self.commit.initial_backoff_ms = ms,
                Err(_) => warn!(value = %backoff, "Ignoring invalid SMARTBILL_COMMIT_BACKOFF_MS"),
            }
        }

        if let Some(filter) = var("SMARTBILL_LOG") {
            self.log.filter = filter;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("app", "smartbill", "smartbill")
            .map(|dirs| dirs.config_dir().join("smartbill.toml"))
    }

    /// Retry policy for the allocator.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from(&self.commit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = BillingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.commit.max_attempts, 5);
        assert_eq!(config.retry_policy(), RetryPolicy::default());
        assert_eq!(config.database.to_db_config().busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: BillingConfig = toml::from_str(
            r#"
            [commit]
            max_attempts = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.commit.max_attempts, 8);
        assert_eq!(config.commit.initial_backoff_ms, 20);
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("SMARTBILL_DB_PATH", "/data/shop.db"),
            ("SMARTBILL_DB_MAX_CONNECTIONS", "not-a-number"),
            ("SMARTBILL_COMMIT_MAX_ATTEMPTS", "9"),
            ("SMARTBILL_LOG", "debug"),
        ]);

        let mut config = BillingConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/data/shop.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.commit.max_attempts, 9);
        assert_eq!(config.log.filter, "debug");
    }

    #[test]
    fn test_validation() {
        let mut config = BillingConfig::default();
        config.commit.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = BillingConfig::default();
        config.commit.max_backoff_ms = 1;
        assert!(config.validate().is_err());

        let mut config = BillingConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("smartbill.toml");

        let mut config = BillingConfig::default();
        config.commit.max_attempts = 7;
        config.save(&path).unwrap();

        let loaded = BillingConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_reads_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("smartbill.toml");
        std::fs::write(&path, "[commit]\nmax_attempts = 0\n").unwrap();

        assert!(matches!(
            BillingConfig::load(Some(path)),
            Err(ConfigError::Invalid(_))
        ));
    }
}
