//! # Application Configuration
//!
//! ## Load Order (later overrides earlier)
//! 1. Defaults (this file)
//! 2. Config file (`salon.toml`)
//! 3. Environment variables (`SALON_*`)
//!
//! ## Example
//! ```toml
//! [store]
//! backend = "sqlite"
//! path = "/var/lib/salon/salon.db"
//! max_connections = 5
//!
//! [settlement]
//! payment_sum_rule = "strict"
//!
//! [logging]
//! level = "info"
//! json = false
//! ```
//!
//! Configuration is read-only once loaded; services take copies of the
//! sections they need.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use salon_core::{PaymentSumRule, DEFAULT_TENANT_ID};
use salon_db::{StoreBackend, StoreConfig};

pub const CONFIG_FILE_NAME: &str = "salon.toml";
pub const DATABASE_FILE_NAME: &str = "salon.db";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

fn default_tenant_id() -> String {
    DEFAULT_TENANT_ID.to_string()
}

/// `[settlement]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementConfig {
    /// How `pay` compares payment lines with the sale total.
    #[serde(default)]
    pub payment_sum_rule: PaymentSumRule,

    /// Stamped on every sale, movement and account created.
    #[serde(default = "default_tenant_id")]
    pub tenant_id: String,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        SettlementConfig {
            payment_sum_rule: PaymentSumRule::default(),
            tenant_id: default_tenant_id(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

/// `[logging]` section. `RUST_LOG`, when set, wins over `level`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    /// One JSON object per line instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_level(),
            json: false,
        }
    }
}

// =============================================================================
// App Config
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub settlement: SettlementConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// A missing file is not an error; an unreadable or malformed one is.
    /// A SQLite store with no `path` is pointed at the platform data
    /// directory.
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_path.or_else(default_config_path) {
            Some(path) if path.exists() => {
                info!(?path, "Loading config from file");
                Self::from_file(&path)?
            }
            Some(path) => {
                debug!(?path, "Config file not found, using defaults");
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;

        if config.store.backend == StoreBackend::Sqlite && config.store.path.is_none() {
            config.store.path = default_database_path();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `SALON_*` overrides read through `lookup`.
    ///
    /// ## Variables
    /// - `SALON_STORE_BACKEND`: `sqlite` | `memory`
    /// - `SALON_DB_PATH`: SQLite file
    /// - `SALON_MAX_CONNECTIONS`: pool size
    /// - `SALON_PAYMENT_SUM_RULE`: `strict` | `allow_partial` | `trust_caller`
    /// - `SALON_TENANT_ID`
    /// - `SALON_LOG_LEVEL`
    /// - `SALON_LOG_JSON`: `true` | `false` | `1` | `0`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("SALON_STORE_BACKEND") {
            self.store.backend = backend.parse().map_err(ConfigError::Invalid)?;
            debug!(backend = %backend, "Overriding store backend from environment");
        }

        if let Some(path) = lookup("SALON_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.store.path = Some(PathBuf::from(path));
        }

        if let Some(max) = lookup("SALON_MAX_CONNECTIONS") {
            self.store.max_connections = max.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("SALON_MAX_CONNECTIONS is not a number: '{}'", max))
            })?;
        }

        if let Some(rule) = lookup("SALON_PAYMENT_SUM_RULE") {
            self.settlement.payment_sum_rule = rule
                .parse()
                .map_err(|e: salon_core::ValidationError| ConfigError::Invalid(e.to_string()))?;
        }

        if let Some(tenant_id) = lookup("SALON_TENANT_ID") {
            self.settlement.tenant_id = tenant_id;
        }

        if let Some(level) = lookup("SALON_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Some(json) = lookup("SALON_LOG_JSON") {
            self.logging.json = match json.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "SALON_LOG_JSON must be true or false, got '{}'",
                        other
                    )))
                }
            };
        }

        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.settlement.tenant_id.trim().is_empty() {
            return Err(ConfigError::Invalid("settlement.tenant_id must not be blank".into()));
        }

        if self.store.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "store.max_connections must be greater than 0".into(),
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Invalid("logging.level must not be blank".into()));
        }

        Ok(())
    }
}

/// `salon.toml` in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "salon", "ledger")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// `salon.db` in the platform data directory.
///
/// ## Platform-Specific Paths
/// - **Linux**: `~/.local/share/ledger/salon.db`
/// - **macOS**: `~/Library/Application Support/com.salon.ledger/salon.db`
/// - **Windows**: `%APPDATA%\salon\ledger\data\salon.db`
pub fn default_database_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "salon", "ledger")
        .map(|dirs| dirs.data_dir().join(DATABASE_FILE_NAME))
}
