//! # Account Payable Repository
//!
//! ## Payment Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                 │
//! │  UPDATE accounts_payable                                               │
//! │     SET paid_amount_cents = new, status = new                          │
//! │   WHERE id = ? AND paid_amount_cents = expected                        │
//! │     AND status NOT IN ('PAID', 'CANCELLED')        ◄── guard           │
//! │  INSERT cash_movements (OUT)                                           │
//! │  INSERT account_payable_payments (→ cash movement id)                  │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Two concurrent payments planned against the same paid amount: the first
//! moves `paid_amount_cents`, the second matches no row and fails.

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use salon_core::payables::{PayableFilter, PayablePayment};
use salon_core::ports::AccountPayableRepository;
use salon_core::{AccountPayable, AccountPayablePayment, CoreResult, PayableStatus};

use super::insert_cash_movement;
use crate::error::{DbError, DbResult};

const ACCOUNT_COLUMNS: &str = r#"
    id, tenant_id, description, supplier_id, category, amount_cents,
    paid_amount_cents, due_date, status, notes, created_at, updated_at
"#;

#[derive(Debug, Clone)]
pub struct SqlitePayableRepository {
    pool: SqlitePool,
}

impl SqlitePayableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqlitePayableRepository { pool }
    }

    pub async fn insert_account(&self, account: &AccountPayable) -> DbResult<()> {
        debug!(id = %account.id, amount_cents = account.amount_cents, "Inserting account payable");

        sqlx::query(
            r#"
            INSERT INTO accounts_payable (
                id, tenant_id, description, supplier_id, category, amount_cents,
                paid_amount_cents, due_date, status, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&account.id)
        .bind(&account.tenant_id)
        .bind(&account.description)
        .bind(&account.supplier_id)
        .bind(&account.category)
        .bind(account.amount_cents)
        .bind(account.paid_amount_cents)
        .bind(account.due_date)
        .bind(account.status)
        .bind(&account.notes)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Stored status, never OVERDUE.
    pub async fn find_account(&self, id: &str) -> DbResult<Option<AccountPayable>> {
        let mut conn = self.pool.acquire().await?;
        fetch_account(&mut conn, id).await
    }

    /// Earliest due first. `filter.status` is left to the caller, which
    /// compares it against the derived status.
    pub async fn filtered(&self, filter: &PayableFilter) -> DbResult<Vec<AccountPayable>> {
        let accounts = sqlx::query_as(&format!(
            r#"
            SELECT {ACCOUNT_COLUMNS}
            FROM accounts_payable
            WHERE (?1 IS NULL OR supplier_id = ?1)
              AND (?2 IS NULL OR category = ?2)
              AND (?3 IS NULL OR due_date >= ?3)
              AND (?4 IS NULL OR due_date <= ?4)
            ORDER BY due_date, created_at
            "#
        ))
        .bind(&filter.supplier_id)
        .bind(&filter.category)
        .bind(filter.due_from)
        .bind(filter.due_to)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }

    pub async fn apply_payment(&self, plan: &PayablePayment) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE accounts_payable
            SET paid_amount_cents = ?3, status = ?4, updated_at = ?5
            WHERE id = ?1
              AND paid_amount_cents = ?2
              AND status NOT IN ('PAID', 'CANCELLED')
            "#,
        )
        .bind(&plan.account_payable_id)
        .bind(plan.expected_paid_amount_cents)
        .bind(plan.new_paid_amount_cents)
        .bind(plan.new_status)
        .bind(plan.updated_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let current = fetch_account(&mut tx, &plan.account_payable_id).await?;
            return Err(match current {
                None => DbError::not_found("Account payable", &plan.account_payable_id),
                Some(account) => DbError::conflict(format!(
                    "Account payable {} changed since the payment was planned ({}, paid {})",
                    account.id, status_label(account.status), account.paid_amount_cents
                )),
            });
        }

        insert_cash_movement(&mut tx, &plan.cash_movement).await?;

        let payment = &plan.payment;
        sqlx::query(
            r#"
            INSERT INTO account_payable_payments (
                id, account_payable_id, amount_cents, paid_at, method,
                bank_account_id, cash_movement_id, notes
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&payment.id)
        .bind(&payment.account_payable_id)
        .bind(payment.amount_cents)
        .bind(payment.paid_at)
        .bind(payment.method)
        .bind(&payment.bank_account_id)
        .bind(&payment.cash_movement_id)
        .bind(&payment.notes)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            account_payable_id = %plan.account_payable_id,
            amount_cents = payment.amount_cents,
            new_status = status_label(plan.new_status),
            "Account payable payment registered"
        );
        Ok(())
    }

    /// PENDING or PARTIAL → CANCELLED.
    pub async fn cancel_account(&self, id: &str) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;

        let result = sqlx::query(
            r#"
            UPDATE accounts_payable
            SET status = 'CANCELLED', updated_at = ?2
            WHERE id = ?1 AND status IN ('PENDING', 'PARTIAL')
            "#,
        )
        .bind(id)
        .bind(chrono::Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(match fetch_account(&mut conn, id).await? {
                None => DbError::not_found("Account payable", id),
                Some(account) if account.status == PayableStatus::Paid => DbError::conflict(
                    format!("Account payable {} is paid and cannot be cancelled", id),
                ),
                Some(_) => DbError::conflict(format!("Account payable {} is already cancelled", id)),
            });
        }

        info!(id = %id, "Account payable cancelled");
        Ok(())
    }

    /// Oldest first.
    pub async fn payments_for(&self, account_payable_id: &str) -> DbResult<Vec<AccountPayablePayment>> {
        let payments = sqlx::query_as(
            r#"
            SELECT id, account_payable_id, amount_cents, paid_at, method,
                   bank_account_id, cash_movement_id, notes
            FROM account_payable_payments
            WHERE account_payable_id = ?1
            ORDER BY paid_at, rowid
            "#,
        )
        .bind(account_payable_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }
}

async fn fetch_account(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<AccountPayable>> {
    let account = sqlx::query_as(&format!(
        "SELECT {ACCOUNT_COLUMNS} FROM accounts_payable WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(account)
}

fn status_label(status: PayableStatus) -> &'static str {
    match status {
        PayableStatus::Pending => "PENDING",
        PayableStatus::Partial => "PARTIAL",
        PayableStatus::Paid => "PAID",
        PayableStatus::Overdue => "OVERDUE",
        PayableStatus::Cancelled => "CANCELLED",
    }
}

#[async_trait]
impl AccountPayableRepository for SqlitePayableRepository {
    async fn create(&self, account: &AccountPayable) -> CoreResult<()> {
        Ok(self.insert_account(account).await?)
    }

    async fn get_by_id(&self, id: &str) -> CoreResult<Option<AccountPayable>> {
        Ok(self.find_account(id).await?)
    }

    async fn list(&self, filter: &PayableFilter) -> CoreResult<Vec<AccountPayable>> {
        Ok(self.filtered(filter).await?)
    }

    async fn register_payment(&self, payment: &PayablePayment) -> CoreResult<()> {
        Ok(self.apply_payment(payment).await?)
    }

    async fn cancel(&self, id: &str) -> CoreResult<()> {
        Ok(self.cancel_account(id).await?)
    }

    async fn payments(&self, account_payable_id: &str) -> CoreResult<Vec<AccountPayablePayment>> {
        Ok(self.payments_for(account_payable_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
