//! # Repository Module
//!
//! SQLite implementations of the salon-core ports.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Use case                                                              │
//! │       │  repos.sales.pay(&settlement)                                  │
//! │       ▼                                                                 │
//! │  impl ports::SaleRepository for SqliteSaleRepository                   │
//! │       │  delegates to an inherent `DbResult` method                    │
//! │       ▼                                                                 │
//! │  SqliteSaleRepository::settle_payment                                  │
//! │  ├── pool.begin()                                                      │
//! │  ├── UPDATE sales ... WHERE status = 'open'   (guard)                  │
//! │  ├── insert_cash_movement() × N               (shared helper)          │
//! │  ├── apply_stock_movement() × M               (shared helper)          │
//! │  ├── insert_credit_movement()                 (shared helper)          │
//! │  └── tx.commit()                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The helpers below take a bare `SqliteConnection` so they run equally on a
//! pooled connection or inside a transaction.
//!
//! ## Available Repositories
//!
//! - [`SqliteSaleRepository`] - Sales, items, pay/refund settlement
//! - [`SqliteCashMovementRepository`] - Cash ledger
//! - [`SqliteProductRepository`] - Products and stock movements
//! - [`SqliteClientRepository`] / [`SqliteCreditRepository`] - Clients and wallet
//! - [`SqliteInstallmentRepository`] - Installment receivables
//! - [`SqlitePayableRepository`] - Accounts payable
//! - [`SqliteCashRegisterRepository`] - Register sessions
//! - [`SqlitePurchaseRepository`] - Purchases

use salon_core::{CashMovement, CreditMovement, StockMovement};
use sqlx::SqliteConnection;
use tracing::debug;

use crate::error::{DbError, DbResult};

pub mod cash;
pub mod client;
pub mod installment;
pub mod payable;
pub mod product;
pub mod purchase;
pub mod register;
pub mod sale;

pub use cash::SqliteCashMovementRepository;
pub use client::{SqliteClientRepository, SqliteCreditRepository};
pub use installment::SqliteInstallmentRepository;
pub use payable::SqlitePayableRepository;
pub use product::SqliteProductRepository;
pub use purchase::SqlitePurchaseRepository;
pub use register::SqliteCashRegisterRepository;
pub use sale::SqliteSaleRepository;

// =============================================================================
// Shared Writes
// =============================================================================

pub(crate) async fn insert_cash_movement(
    conn: &mut SqliteConnection,
    movement: &CashMovement,
) -> DbResult<()> {
    debug!(
        id = %movement.id,
        movement_type = ?movement.movement_type,
        amount_cents = movement.amount_cents,
        source_id = ?movement.source_id,
        "Appending cash movement"
    );

    sqlx::query(
        r#"
        INSERT INTO cash_movements (
            id, tenant_id, movement_type, amount_cents, method,
            source_type, source_id, bank_account_id, cash_register_id,
            description, created_by, occurred_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.tenant_id)
    .bind(movement.movement_type)
    .bind(movement.amount_cents)
    .bind(movement.method)
    .bind(movement.source_type)
    .bind(&movement.source_id)
    .bind(&movement.bank_account_id)
    .bind(&movement.cash_register_id)
    .bind(&movement.description)
    .bind(&movement.created_by)
    .bind(movement.occurred_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Appends a stock movement and applies its delta to the product.
///
/// ## Delta Update
/// `current_stock = current_stock + delta`, never an absolute write, so two
/// settlements touching the same product compose.
pub(crate) async fn apply_stock_movement(
    conn: &mut SqliteConnection,
    movement: &StockMovement,
) -> DbResult<()> {
    debug!(
        product_id = %movement.product_id,
        delta = movement.delta(),
        reason = ?movement.reason,
        "Applying stock movement"
    );

    let result = sqlx::query("UPDATE products SET current_stock = current_stock + ?2 WHERE id = ?1")
        .bind(&movement.product_id)
        .bind(movement.delta())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", &movement.product_id));
    }

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, tenant_id, product_id, movement_type, quantity,
            reason, reference_type, reference_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.tenant_id)
    .bind(&movement.product_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(movement.reason)
    .bind(movement.reference_type)
    .bind(&movement.reference_id)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_credit_movement(
    conn: &mut SqliteConnection,
    movement: &CreditMovement,
) -> DbResult<()> {
    debug!(
        client_id = %movement.client_id,
        movement_type = ?movement.movement_type,
        amount_cents = movement.amount_cents,
        "Appending wallet movement"
    );

    sqlx::query(
        r#"
        INSERT INTO credit_movements (
            id, client_id, movement_type, amount_cents, origin, note, sale_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.client_id)
    .bind(movement.movement_type)
    .bind(movement.amount_cents)
    .bind(&movement.origin)
    .bind(&movement.note)
    .bind(&movement.sale_id)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Wallet balance as seen by `conn`.
pub(crate) async fn wallet_balance(conn: &mut SqliteConnection, client_id: &str) -> DbResult<i64> {
    let balance: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(CASE movement_type WHEN 'CREDIT' THEN amount_cents
                                              ELSE -amount_cents END), 0)
        FROM credit_movements
        WHERE client_id = ?1
        "#,
    )
    .bind(client_id)
    .fetch_one(&mut *conn)
    .await?;

    Ok(balance)
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::Utc;
    use salon_core::Product;

    use crate::pool::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub async fn seed_product(db: &Database, name: &str, stock: i64) -> Product {
        let product = Product {
            id: uuid::Uuid::new_v4().to_string(),
            tenant_id: salon_core::DEFAULT_TENANT_ID.to_string(),
            name: name.to_string(),
            sku: None,
            current_stock: stock,
            created_at: Utc::now(),
        };
        db.products().insert_product(&product).await.unwrap();
        product
    }
}
