//! # Schema Migrations
//!
//! SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied in file-name order on startup. sqlx records each one in
//! `_sqlx_migrations`, so reruns are no-ops.
//!
//! ```text
//! migrations/sqlite/
//! ├── 001_sales_and_stock.sql            products, clients, sales, items, stock
//! ├── 002_cash_and_wallet.sql            cash ledger, wallet, purchases
//! ├── 003_receivables_and_payables.sql   installments, payables, payments
//! └── 004_cash_registers.sql             sessions + one-OPEN unique index
//! ```
//!
//! Applied files are never edited; schema changes get a new numbered file.
//! Invariants the use cases depend on (one OPEN register, unique installment
//! numbers per sale) live in the schema as well as in code.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    debug!(embedded = MIGRATOR.migrations.len(), "Applying migrations");
    MIGRATOR.run(pool).await?;
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let embedded = MIGRATOR.migrations.len();

    // Before the first run the bookkeeping table does not exist.
    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((embedded, applied as usize))
}
