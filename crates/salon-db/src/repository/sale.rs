//! # Sale Repository
//!
//! Sales, their items, and the two settlement procedures.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── insert_sale() → sales row + sale_items rows (one transaction)  │
//! │                                                                         │
//! │  2. EDIT (open only)                                                   │
//! │     └── replace_items() → totals + items rewritten                     │
//! │                                                                         │
//! │  3. PAY                                                                │
//! │     └── settle_payment()                                               │
//! │         ├── UPDATE status open → paid   (guard)                        │
//! │         ├── cash IN per cash line                                      │
//! │         ├── stock OUT per product line                                 │
//! │         └── wallet DEBIT for credit/fiado lines                        │
//! │                                                                         │
//! │  4. REFUND                                                             │
//! │     └── settle_refund()                                                │
//! │         ├── UPDATE status paid → refunded   (guard)                    │
//! │         └── stock IN per product line                                  │
//! │                                                                         │
//! │  (open) ── cancel ──► canceled          via set_status()               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use salon_core::ports::{SaleFilter, SaleRepository};
use salon_core::settlement::{PaymentSettlement, RefundSettlement};
use salon_core::{CoreResult, Sale, SaleItem, SaleStatus};

use super::{apply_stock_movement, insert_cash_movement, insert_credit_movement};
use crate::error::{DbError, DbResult};

const SALE_COLUMNS: &str = r#"
    id, tenant_id, customer_id, subtotal_cents, discount_cents, total_cents,
    status, created_by, created_at, updated_at, paid_at
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SqliteSaleRepository {
    pool: SqlitePool,
}

impl SqliteSaleRepository {
    /// Creates a new SqliteSaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SqliteSaleRepository { pool }
    }

    /// Gets a sale with its items, in the order they were entered.
    pub async fn find_sale(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        fetch_sale(&mut conn, id).await
    }

    /// Inserts a sale and all of its items.
    pub async fn insert_sale(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, items = sale.items.len(), total_cents = sale.total_cents, "Inserting sale");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, customer_id,
                subtotal_cents, discount_cents, total_cents,
                status, created_by, created_at, updated_at, paid_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.customer_id)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.status)
        .bind(&sale.created_by)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .bind(sale.paid_at)
        .execute(&mut *tx)
        .await?;

        insert_items(&mut tx, &sale.items).await?;

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_sales(&self, filter: &SaleFilter) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;

        let mut sales: Vec<Sale> = sqlx::query_as(&format!(
            r#"
            SELECT {SALE_COLUMNS}
            FROM sales
            WHERE (?1 IS NULL OR customer_id = ?1)
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR date(created_at) >= ?3)
              AND (?4 IS NULL OR date(created_at) <= ?4)
            ORDER BY created_at DESC, rowid DESC
            "#
        ))
        .bind(&filter.customer_id)
        .bind(filter.status)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&mut *conn)
        .await?;

        for sale in &mut sales {
            sale.items = fetch_items(&mut conn, &sale.id).await?;
        }

        Ok(sales)
    }

    /// Rewrites items and totals of an open sale.
    pub async fn replace_items(&self, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, items = sale.items.len(), "Replacing sale items");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE sales
            SET subtotal_cents = ?2, discount_cents = ?3, total_cents = ?4, updated_at = ?5
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(&sale.id)
        .bind(sale.subtotal_cents)
        .bind(sale.discount_cents)
        .bind(sale.total_cents)
        .bind(sale.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(guard_failure(&mut tx, &sale.id, SaleStatus::Open).await);
        }

        sqlx::query("DELETE FROM sale_items WHERE sale_id = ?1")
            .bind(&sale.id)
            .execute(&mut *tx)
            .await?;
        insert_items(&mut tx, &sale.items).await?;

        tx.commit().await?;
        Ok(())
    }

    /// Compare-and-set on the status column.
    pub async fn set_status(&self, id: &str, from: SaleStatus, to: SaleStatus) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        guarded_transition(&mut conn, id, from, to, Utc::now(), None).await
    }

    /// Commits a payment plan: every write or none.
    pub async fn settle_payment(&self, settlement: &PaymentSettlement) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        guarded_transition(
            &mut tx,
            &settlement.sale_id,
            SaleStatus::Open,
            SaleStatus::Paid,
            settlement.paid_at,
            Some(settlement.paid_at),
        )
        .await?;

        for movement in &settlement.cash_movements {
            insert_cash_movement(&mut tx, movement).await?;
        }
        for movement in &settlement.stock_movements {
            apply_stock_movement(&mut tx, movement).await?;
        }
        if let Some(debit) = &settlement.wallet_debit {
            insert_credit_movement(&mut tx, debit).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %settlement.sale_id,
            cash_movements = settlement.cash_movements.len(),
            stock_movements = settlement.stock_movements.len(),
            wallet_debit = settlement.wallet_debit.is_some(),
            "Sale paid"
        );
        Ok(())
    }

    /// Commits a refund plan: status and stock return together.
    pub async fn settle_refund(&self, settlement: &RefundSettlement) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        guarded_transition(
            &mut tx,
            &settlement.sale_id,
            SaleStatus::Paid,
            SaleStatus::Refunded,
            settlement.refunded_at,
            None,
        )
        .await?;

        for movement in &settlement.stock_movements {
            apply_stock_movement(&mut tx, movement).await?;
        }

        tx.commit().await?;

        info!(
            sale_id = %settlement.sale_id,
            stock_movements = settlement.stock_movements.len(),
            "Sale refunded"
        );
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

async fn fetch_sale(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
    let sale: Option<Sale> = sqlx::query_as(&format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    match sale {
        Some(mut sale) => {
            sale.items = fetch_items(conn, id).await?;
            Ok(Some(sale))
        }
        None => Ok(None),
    }
}

async fn fetch_items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
    let items = sqlx::query_as(
        r#"
        SELECT id, sale_id, item_type, product_id, service_id, description,
               quantity, unit_price_cents, total_price_cents
        FROM sale_items
        WHERE sale_id = ?1
        ORDER BY position
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

async fn insert_items(conn: &mut SqliteConnection, items: &[SaleItem]) -> DbResult<()> {
    for (position, item) in items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, position, item_type, product_id, service_id,
                description, quantity, unit_price_cents, total_price_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(position as i64)
        .bind(item.item_type)
        .bind(&item.product_id)
        .bind(&item.service_id)
        .bind(&item.description)
        .bind(item.quantity)
        .bind(item.unit_price_cents)
        .bind(item.total_price_cents)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

/// `UPDATE ... WHERE status = from`. A stale caller loses here, inside the
/// same transaction as the rest of its writes.
async fn guarded_transition(
    conn: &mut SqliteConnection,
    id: &str,
    from: SaleStatus,
    to: SaleStatus,
    at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE sales
        SET status = ?3, updated_at = ?4, paid_at = COALESCE(?5, paid_at)
        WHERE id = ?1 AND status = ?2
        "#,
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(at)
    .bind(paid_at)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(guard_failure(conn, id, from).await);
    }

    debug!(id = %id, from = %from, to = %to, "Sale status changed");
    Ok(())
}

/// Tells a missing sale apart from one in the wrong state.
async fn guard_failure(conn: &mut SqliteConnection, id: &str, expected: SaleStatus) -> DbError {
    let current: Result<Option<SaleStatus>, sqlx::Error> =
        sqlx::query_scalar("SELECT status FROM sales WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await;

    match current {
        Ok(Some(status)) => DbError::conflict(format!(
            "Sale {} is {}, expected {}",
            id, status, expected
        )),
        Ok(None) => DbError::not_found("Sale", id),
        Err(e) => e.into(),
    }
}

// =============================================================================
// Port
// =============================================================================

#[async_trait]
impl SaleRepository for SqliteSaleRepository {
    async fn create(&self, sale: &Sale) -> CoreResult<()> {
        Ok(self.insert_sale(sale).await?)
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Sale>> {
        Ok(self.find_sale(id).await?)
    }

    async fn list(&self, filter: &SaleFilter) -> CoreResult<Vec<Sale>> {
        Ok(self.list_sales(filter).await?)
    }

    async fn update_items(&self, sale: &Sale) -> CoreResult<()> {
        Ok(self.replace_items(sale).await?)
    }

    async fn transition(&self, id: &str, from: SaleStatus, to: SaleStatus) -> CoreResult<()> {
        Ok(self.set_status(id, from, to).await?)
    }

    async fn pay(&self, settlement: &PaymentSettlement) -> CoreResult<()> {
        Ok(self.settle_payment(settlement).await?)
    }

    async fn refund(&self, settlement: &RefundSettlement) -> CoreResult<()> {
        Ok(self.settle_refund(settlement).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
