//! # Product Repository
//!
//! Products and their stock movements.
//!
//! ## Stock Model
//! ```text
//! products.current_stock  ==  Σ stock_movements.delta   (per product)
//!
//! IN  → +quantity      (purchase, refund, adjustment)
//! OUT → -quantity      (sale, adjustment)
//! ```
//! The cache and the movement row are always written by the same statement
//! pair, see [`apply_stock_movement`](super::apply_stock_movement).

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use salon_core::ports::ProductRepository;
use salon_core::{CoreResult, Product, StockMovement};

use super::apply_stock_movement;
use crate::error::DbResult;

const STOCK_COLUMNS: &str = r#"
    id, tenant_id, product_id, movement_type, quantity,
    reason, reference_type, reference_id, created_at
"#;

/// Repository for product and stock operations.
#[derive(Debug, Clone)]
pub struct SqliteProductRepository {
    pool: SqlitePool,
}

impl SqliteProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteProductRepository { pool }
    }

    pub async fn insert_product(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (id, tenant_id, name, sku, current_stock, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.name)
        .bind(&product.sku)
        .bind(product.current_stock)
        .bind(product.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_product(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as(
            r#"
            SELECT id, tenant_id, name, sku, current_stock, created_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Applies one movement in its own transaction.
    pub async fn record_movement(&self, movement: &StockMovement) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        apply_stock_movement(&mut tx, movement).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Oldest first.
    pub async fn by_product(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_movements WHERE product_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Everything a sale or purchase moved, oldest first.
    pub async fn by_reference(&self, reference_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as(&format!(
            "SELECT {STOCK_COLUMNS} FROM stock_movements WHERE reference_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }
}

#[async_trait]
impl ProductRepository for SqliteProductRepository {
    async fn create(&self, product: &Product) -> CoreResult<()> {
        Ok(self.insert_product(product).await?)
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Product>> {
        Ok(self.find_product(id).await?)
    }

    async fn add_movement(&self, movement: &StockMovement) -> CoreResult<()> {
        Ok(self.record_movement(movement).await?)
    }

    async fn movements_by_product(&self, product_id: &str) -> CoreResult<Vec<StockMovement>> {
        Ok(self.by_product(product_id).await?)
    }

    async fn movements_by_reference(&self, reference_id: &str) -> CoreResult<Vec<StockMovement>> {
        Ok(self.by_reference(reference_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
