//! # Store Factory
//!
//! Picks a backend from configuration and hands back every port.
//!
//! ```text
//! StoreConfig { backend = "sqlite", path = Some(..) }  → file database (WAL)
//! StoreConfig { backend = "sqlite", path = None }      → in-memory SQLite
//! StoreConfig { backend = "memory" }                   → MemoryStore
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use salon_core::ports::Repositories;

use crate::error::DbResult;
use crate::memory::MemoryStore;
use crate::pool::{Database, DbConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{}'", other)),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

fn default_run_migrations() -> bool {
    true
}

/// `[store]` section of the configuration file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// SQLite file. `None` opens a private in-memory database.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_run_migrations")]
    pub run_migrations: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            backend: StoreBackend::default(),
            path: None,
            max_connections: default_max_connections(),
            run_migrations: default_run_migrations(),
        }
    }
}

impl StoreConfig {
    pub fn memory() -> Self {
        StoreConfig {
            backend: StoreBackend::Memory,
            ..Default::default()
        }
    }

    pub fn sqlite(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            path: Some(path.into()),
            ..Default::default()
        }
    }
}

/// Opens the configured backend.
pub async fn open_store(config: &StoreConfig) -> DbResult<Repositories> {
    match config.backend {
        StoreBackend::Memory => {
            info!("Using in-memory store");
            Ok(MemoryStore::new().repositories())
        }
        StoreBackend::Sqlite => {
            let db_config = match &config.path {
                Some(path) => DbConfig::new(path).max_connections(config.max_connections),
                None => DbConfig::in_memory(),
            }
            .run_migrations(config.run_migrations);

            let db = Database::new(db_config).await?;
            Ok(db.repositories())
        }
    }
}
