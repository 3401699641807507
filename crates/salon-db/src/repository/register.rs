//! # Cash Register Repository
//!
//! Register sessions. The single-open rule is enforced by the partial
//! unique index `idx_cash_registers_single_open`; a second OPEN insert
//! fails on the index no matter how the callers interleave.

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use salon_core::ports::CashRegisterRepository;
use salon_core::register::{RegisterClosing, ALREADY_OPEN_MESSAGE};
use salon_core::{CashRegister, CoreResult};

use crate::error::{DbError, DbResult};

const REGISTER_COLUMNS: &str = r#"
    id, tenant_id, opened_by, initial_balance_cents, status, opened_at,
    closed_at, closed_by, closing_balance_cents, difference_cents
"#;

#[derive(Debug, Clone)]
pub struct SqliteCashRegisterRepository {
    pool: SqlitePool,
}

impl SqliteCashRegisterRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteCashRegisterRepository { pool }
    }

    pub async fn open(&self, register: &CashRegister) -> DbResult<()> {
        debug!(id = %register.id, opened_by = %register.opened_by, "Opening cash register");

        let inserted = sqlx::query(
            r#"
            INSERT INTO cash_registers (
                id, tenant_id, opened_by, initial_balance_cents, status, opened_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&register.id)
        .bind(&register.tenant_id)
        .bind(&register.opened_by)
        .bind(register.initial_balance_cents)
        .bind(register.status)
        .bind(register.opened_at)
        .execute(&self.pool)
        .await
        .map_err(DbError::from);

        match inserted {
            Ok(_) => Ok(()),
            Err(e) if e.is_unique_violation() => {
                warn!(id = %register.id, "Rejected open: another register is already open");
                Err(DbError::conflict(ALREADY_OPEN_MESSAGE))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn current_open(&self) -> DbResult<Option<CashRegister>> {
        let register = sqlx::query_as(&format!(
            "SELECT {REGISTER_COLUMNS} FROM cash_registers WHERE status = 'OPEN'"
        ))
        .fetch_optional(&self.pool)
        .await?;

        Ok(register)
    }

    pub async fn find_register(&self, id: &str) -> DbResult<Option<CashRegister>> {
        let register = sqlx::query_as(&format!(
            "SELECT {REGISTER_COLUMNS} FROM cash_registers WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(register)
    }

    /// OPEN → CLOSED, once. The difference is derived in the same
    /// statement from the movements attributed to the register.
    pub async fn close_register(&self, closing: &RegisterClosing) -> DbResult<CashRegister> {
        let closed: Option<CashRegister> = sqlx::query_as(&format!(
            r#"
            UPDATE cash_registers
            SET status = 'CLOSED', closed_at = ?2, closed_by = ?3,
                closing_balance_cents = ?4,
                difference_cents = ?4 - initial_balance_cents - COALESCE((
                    SELECT SUM(CASE movement_type WHEN 'IN' THEN amount_cents ELSE -amount_cents END)
                    FROM cash_movements
                    WHERE cash_register_id = ?1
                ), 0)
            WHERE id = ?1 AND status = 'OPEN'
            RETURNING {REGISTER_COLUMNS}
            "#
        ))
        .bind(&closing.register_id)
        .bind(closing.closed_at)
        .bind(&closing.closed_by)
        .bind(closing.closing_balance_cents)
        .fetch_optional(&self.pool)
        .await?;

        let Some(closed) = closed else {
            return Err(match self.find_register(&closing.register_id).await? {
                Some(_) => DbError::conflict(format!(
                    "Cash register {} is already closed",
                    closing.register_id
                )),
                None => DbError::not_found("Cash register", &closing.register_id),
            });
        };

        info!(
            id = %closed.id,
            counted_cents = closing.closing_balance_cents,
            difference_cents = closed.difference_cents,
            "Cash register closed"
        );
        Ok(closed)
    }
}

#[async_trait]
impl CashRegisterRepository for SqliteCashRegisterRepository {
    async fn create(&self, register: &CashRegister) -> CoreResult<()> {
        Ok(self.open(register).await?)
    }

    async fn get_current_open(&self) -> CoreResult<Option<CashRegister>> {
        Ok(self.current_open().await?)
    }

    async fn get_by_id(&self, id: &str) -> CoreResult<Option<CashRegister>> {
        Ok(self.find_register(id).await?)
    }

    async fn close(&self, closing: &RegisterClosing) -> CoreResult<CashRegister> {
        Ok(self.close_register(closing).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use chrono::Utc;
    use salon_core::register::{build_register, OpenRegisterInput};
    use salon_core::{CoreError, ErrorKind, RegisterStatus, DEFAULT_TENANT_ID};

    fn new_register(initial: i64) -> CashRegister {
        build_register(
            DEFAULT_TENANT_ID,
            &OpenRegisterInput {
                opened_by: "ana".into(),
                initial_balance_cents: initial,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn closing_for(register: &CashRegister, counted: i64) -> RegisterClosing {
        RegisterClosing {
            register_id: register.id.clone(),
            closed_by: "ana".into(),
            closed_at: Utc::now(),
            closing_balance_cents: counted,
        }
    }

    #[tokio::test]
    async fn test_only_one_open_register() {
        let db = test_db().await;
        let repo = db.cash_registers();

        let first = new_register(10000);
        repo.open(&first).await.unwrap();

        let err: CoreError = repo.open(&new_register(0)).await.unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(err.to_string(), ALREADY_OPEN_MESSAGE);

        let current = repo.current_open().await.unwrap().unwrap();
        assert_eq!(current.id, first.id);
    }

    #[tokio::test]
    async fn test_close_then_reopen() {
        let db = test_db().await;
        let repo = db.cash_registers();

        let first = new_register(10000);
        repo.open(&first).await.unwrap();
        let returned = repo.close_register(&closing_for(&first, 9500)).await.unwrap();

        let closed = repo.find_register(&first.id).await.unwrap().unwrap();
        assert_eq!(returned, closed);
        assert_eq!(closed.status, RegisterStatus::Closed);
        assert_eq!(closed.closing_balance_cents, Some(9500));
        assert_eq!(closed.difference_cents, Some(-500));
        assert!(repo.current_open().await.unwrap().is_none());

        let err = repo.close_register(&closing_for(&first, 9500)).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));

        repo.open(&new_register(0)).await.unwrap();
    }

    #[tokio::test]
    async fn test_difference_counts_movements_present_at_close() {
        use salon_core::ledger::{build_movement, NewCashMovement};
        use salon_core::{MovementType, PaymentMethod};

        let db = test_db().await;
        let repo = db.cash_registers();
        let register = new_register(10000);
        repo.open(&register).await.unwrap();

        // Planned before these movements were written.
        let closing = closing_for(&register, 12000);

        for (movement_type, amount_cents) in [(MovementType::In, 3000), (MovementType::Out, 500)] {
            let movement = build_movement(
                DEFAULT_TENANT_ID,
                &NewCashMovement {
                    movement_type,
                    amount_cents,
                    method: PaymentMethod::Cash,
                    source_type: None,
                    source_id: None,
                    bank_account_id: None,
                    description: Some("Troco".into()),
                    created_by: None,
                    occurred_at: None,
                },
                Some(&register.id),
                Utc::now(),
            )
            .unwrap();
            db.cash_movements().append(&movement).await.unwrap();
        }

        let closed = repo.close_register(&closing).await.unwrap();
        assert_eq!(closed.closing_balance_cents, Some(12000));
        assert_eq!(closed.difference_cents, Some(12000 - (10000 + 3000 - 500)));
    }
}
