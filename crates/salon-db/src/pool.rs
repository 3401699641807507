//! # SQLite Pool
//!
//! `Database` owns the pool every SQLite adapter shares.
//!
//! ```text
//! StoreConfig ──► DbConfig ──► Database::new
//!                               ├── connect (WAL, foreign keys, busy timeout)
//!                               ├── migrate (embedded, idempotent)
//!                               └── repositories() ──► Repositories { Arc<dyn Port> … }
//! ```
//!
//! An atomic procedure (pay, receipt, payable payment, …) holds one pooled
//! connection for its whole transaction and never asks for a second one, so
//! a pool of one connection cannot deadlock.
//!
//! ## In-memory databases
//! Each connection to `:memory:` is its own database. The in-memory
//! configuration therefore pins the pool to a single connection that is
//! never recycled.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use salon_core::ports::Repositories;

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::{
    SqliteCashMovementRepository, SqliteCashRegisterRepository, SqliteClientRepository,
    SqliteCreditRepository, SqliteInstallmentRepository, SqlitePayableRepository,
    SqliteProductRepository, SqlitePurchaseRepository, SqliteSaleRepository,
};

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Pool settings.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/salon/salon.db").max_connections(8);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    pub max_connections: u32,

    /// How long a writer waits on SQLite's lock before failing with
    /// "database is locked".
    pub busy_timeout: Duration,

    /// How long a caller waits for a free pooled connection.
    pub acquire_timeout: Duration,

    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
            acquire_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// A private database that lives as long as the pool.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path.as_os_str() == MEMORY_PATH
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
        } else {
            SqliteConnectOptions::from_str(&format!(
                "sqlite://{}",
                self.database_path.display()
            ))
        }
        .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        Ok(options
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .busy_timeout(self.busy_timeout)
            .create_if_missing(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Pool handle. Cheap to clone.
///
/// Concrete adapters are exposed for adapter tests; use cases go through
/// [`Database::repositories`].
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            max_connections = config.max_connections,
            "Opening SQLite store"
        );

        let mut pool_options = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout);
        if config.is_in_memory() {
            // Dropping the only connection would drop the database with it.
            pool_options = pool_options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        } else {
            debug!("Migrations disabled by configuration");
        }
        Ok(db)
    }

    /// Applies pending embedded migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await?;
        let (total, applied) = migrations::migration_status(&self.pool).await?;
        info!(total, applied, "Schema up to date");
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    pub fn sales(&self) -> SqliteSaleRepository {
        SqliteSaleRepository::new(self.pool.clone())
    }

    pub fn cash_movements(&self) -> SqliteCashMovementRepository {
        SqliteCashMovementRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> SqliteProductRepository {
        SqliteProductRepository::new(self.pool.clone())
    }

    pub fn clients(&self) -> SqliteClientRepository {
        SqliteClientRepository::new(self.pool.clone())
    }

    pub fn credits(&self) -> SqliteCreditRepository {
        SqliteCreditRepository::new(self.pool.clone())
    }

    pub fn installments(&self) -> SqliteInstallmentRepository {
        SqliteInstallmentRepository::new(self.pool.clone())
    }

    pub fn payables(&self) -> SqlitePayableRepository {
        SqlitePayableRepository::new(self.pool.clone())
    }

    pub fn cash_registers(&self) -> SqliteCashRegisterRepository {
        SqliteCashRegisterRepository::new(self.pool.clone())
    }

    pub fn purchases(&self) -> SqlitePurchaseRepository {
        SqlitePurchaseRepository::new(self.pool.clone())
    }

    /// Every port, backed by this pool.
    pub fn repositories(&self) -> Repositories {
        Repositories {
            sales: Arc::new(self.sales()),
            cash: Arc::new(self.cash_movements()),
            products: Arc::new(self.products()),
            clients: Arc::new(self.clients()),
            credits: Arc::new(self.credits()),
            installments: Arc::new(self.installments()),
            payables: Arc::new(self.payables()),
            registers: Arc::new(self.cash_registers()),
            purchases: Arc::new(self.purchases()),
        }
    }
}
