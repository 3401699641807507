//! # Cash Movement Repository
//!
//! The cash ledger. Append-only: there is no update or delete here.

use async_trait::async_trait;
use sqlx::SqlitePool;

use salon_core::ledger::CashFilter;
use salon_core::ports::CashMovementRepository;
use salon_core::{CashMovement, CoreResult};

use super::insert_cash_movement;
use crate::error::DbResult;

const MOVEMENT_COLUMNS: &str = r#"
    id, tenant_id, movement_type, amount_cents, method, source_type, source_id,
    bank_account_id, cash_register_id, description, created_by, occurred_at
"#;

#[derive(Debug, Clone)]
pub struct SqliteCashMovementRepository {
    pool: SqlitePool,
}

impl SqliteCashMovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteCashMovementRepository { pool }
    }

    pub async fn append(&self, movement: &CashMovement) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_cash_movement(&mut conn, movement).await
    }

    pub async fn find_movement(&self, id: &str) -> DbResult<Option<CashMovement>> {
        let movement = sqlx::query_as(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM cash_movements WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(movement)
    }

    /// Most recent first. Date bounds compare the UTC calendar day.
    pub async fn filtered(&self, filter: &CashFilter) -> DbResult<Vec<CashMovement>> {
        let movements = sqlx::query_as(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM cash_movements
            WHERE (?1 IS NULL OR date(occurred_at) >= ?1)
              AND (?2 IS NULL OR date(occurred_at) <= ?2)
              AND (?3 IS NULL OR movement_type = ?3)
              AND (?4 IS NULL OR method = ?4)
              AND (?5 IS NULL OR source_type = ?5)
              AND (?6 IS NULL OR cash_register_id = ?6)
            ORDER BY occurred_at DESC, rowid DESC
            "#
        ))
        .bind(filter.from)
        .bind(filter.to)
        .bind(filter.movement_type)
        .bind(filter.method)
        .bind(filter.source_type)
        .bind(&filter.cash_register_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Every movement a sale, purchase or payable produced, oldest first.
    pub async fn by_source(&self, source_id: &str) -> DbResult<Vec<CashMovement>> {
        let movements = sqlx::query_as(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM cash_movements
            WHERE source_id = ?1
            ORDER BY occurred_at, rowid
            "#
        ))
        .bind(source_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

#[async_trait]
impl CashMovementRepository for SqliteCashMovementRepository {
    async fn create(&self, movement: &CashMovement) -> CoreResult<()> {
        Ok(self.append(movement).await?)
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<CashMovement>> {
        Ok(self.find_movement(id).await?)
    }

    async fn list(&self, filter: &CashFilter) -> CoreResult<Vec<CashMovement>> {
        Ok(self.filtered(filter).await?)
    }

    async fn list_by_source(&self, source_id: &str) -> CoreResult<Vec<CashMovement>> {
        Ok(self.by_source(source_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
