//! # Client and Credit Wallet Repositories
//!
//! Clients are only stored as far as the wallet needs them. The wallet
//! itself is an append-only list of CREDIT/DEBIT rows whose signed sum is
//! the balance; no balance column exists.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::debug;

use salon_core::ports::{ClientRepository, CreditRepository};
use salon_core::{wallet, Client, CoreResult, CreditMovement, CreditType, Money};

use super::{insert_credit_movement, wallet_balance};
use crate::error::{DbError, DbResult};

// =============================================================================
// Clients
// =============================================================================

#[derive(Debug, Clone)]
pub struct SqliteClientRepository {
    pool: SqlitePool,
}

impl SqliteClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteClientRepository { pool }
    }

    pub async fn insert_client(&self, client: &Client) -> DbResult<()> {
        debug!(id = %client.id, "Inserting client");

        sqlx::query(
            r#"
            INSERT INTO clients (id, tenant_id, name, phone, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&client.id)
        .bind(&client.tenant_id)
        .bind(&client.name)
        .bind(&client.phone)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_client(&self, id: &str) -> DbResult<Option<Client>> {
        let client = sqlx::query_as(
            "SELECT id, tenant_id, name, phone, created_at FROM clients WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }
}

#[async_trait]
impl ClientRepository for SqliteClientRepository {
    async fn create(&self, client: &Client) -> CoreResult<()> {
        Ok(self.insert_client(client).await?)
    }

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Client>> {
        Ok(self.find_client(id).await?)
    }
}

// =============================================================================
// Credit Wallet
// =============================================================================

#[derive(Debug, Clone)]
pub struct SqliteCreditRepository {
    pool: SqlitePool,
}

impl SqliteCreditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteCreditRepository { pool }
    }

    pub async fn append(&self, movement: &CreditMovement) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        insert_credit_movement(&mut conn, movement).await
    }

    /// Reads the balance and appends the DEBIT in one transaction, so two
    /// debits cannot both spend the same credit.
    ///
    /// The transaction opens with a write on the client row. A WAL reader
    /// that later upgrades to writer fails with SQLITE_BUSY without waiting,
    /// whereas a transaction that writes first queues on the busy timeout.
    pub async fn checked_debit(&self, movement: &CreditMovement) -> DbResult<()> {
        if movement.movement_type != CreditType::Debit {
            return Err(DbError::Internal(format!(
                "checked_debit called with a {:?} entry",
                movement.movement_type
            )));
        }

        let mut tx = self.pool.begin().await?;

        let locked = sqlx::query("UPDATE clients SET name = name WHERE id = ?1")
            .bind(&movement.client_id)
            .execute(&mut *tx)
            .await?;
        if locked.rows_affected() == 0 {
            return Err(DbError::not_found("Client", &movement.client_id));
        }

        let available = wallet_balance(&mut tx, &movement.client_id).await?;
        wallet::ensure_sufficient(
            Money::from_cents(available),
            Money::from_cents(movement.amount_cents),
        )
        .map_err(|e| DbError::Rule(e.to_string()))?;

        insert_credit_movement(&mut tx, movement).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Oldest first.
    pub async fn by_client(&self, client_id: &str) -> DbResult<Vec<CreditMovement>> {
        let movements = sqlx::query_as(
            r#"
            SELECT id, client_id, movement_type, amount_cents, origin, note, sale_id, created_at
            FROM credit_movements
            WHERE client_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(client_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    pub async fn current_balance(&self, client_id: &str) -> DbResult<Money> {
        let mut conn = self.pool.acquire().await?;
        Ok(Money::from_cents(wallet_balance(&mut conn, client_id).await?))
    }
}

#[async_trait]
impl CreditRepository for SqliteCreditRepository {
    async fn create(&self, movement: &CreditMovement) -> CoreResult<()> {
        Ok(self.append(movement).await?)
    }

    async fn debit(&self, movement: &CreditMovement) -> CoreResult<()> {
        Ok(self.checked_debit(movement).await?)
    }

    async fn list_by_client(&self, client_id: &str) -> CoreResult<Vec<CreditMovement>> {
        Ok(self.by_client(client_id).await?)
    }

    async fn balance(&self, client_id: &str) -> CoreResult<Money> {
        Ok(self.current_balance(client_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
