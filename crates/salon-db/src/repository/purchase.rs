//! # Purchase Repository
//!
//! A purchase is recorded as one transaction: the cash OUT, the purchase
//! row pointing at it, and one stock IN per item.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::info;

use salon_core::ports::PurchaseRepository;
use salon_core::stock::PurchaseSettlement;
use salon_core::CoreResult;

use super::{apply_stock_movement, insert_cash_movement};
use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct SqlitePurchaseRepository {
    pool: SqlitePool,
}

impl SqlitePurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqlitePurchaseRepository { pool }
    }

    pub async fn record_purchase(&self, purchase: &PurchaseSettlement) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        insert_cash_movement(&mut tx, &purchase.cash_movement).await?;

        sqlx::query(
            r#"
            INSERT INTO purchases (
                id, tenant_id, supplier_id, description, total_cents, cash_movement_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&purchase.purchase_id)
        .bind(&purchase.tenant_id)
        .bind(&purchase.supplier_id)
        .bind(&purchase.description)
        .bind(purchase.total_cents)
        .bind(&purchase.cash_movement.id)
        .bind(purchase.created_at)
        .execute(&mut *tx)
        .await?;

        for movement in &purchase.stock_movements {
            apply_stock_movement(&mut tx, movement).await?;
        }

        tx.commit().await?;

        info!(
            purchase_id = %purchase.purchase_id,
            total_cents = purchase.total_cents,
            items = purchase.stock_movements.len(),
            "Purchase recorded"
        );
        Ok(())
    }
}

#[async_trait]
impl PurchaseRepository for SqlitePurchaseRepository {
    async fn record(&self, purchase: &PurchaseSettlement) -> CoreResult<()> {
        Ok(self.record_purchase(purchase).await?)
    }
}
