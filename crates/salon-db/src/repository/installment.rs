//! # Installment Repository
//!
//! Receivables: the scheduled payments a client owes for a sale.
//!
//! ```text
//! PENDING ──register_receipt──► RECEIVED   (+ cash IN, same transaction)
//! ```
//! OVERDUE is never stored; see [`SaleInstallment::is_overdue`].

use async_trait::async_trait;
use sqlx::SqlitePool;
use tracing::{debug, info};

use salon_core::ports::SaleInstallmentRepository;
use salon_core::receivables::{InstallmentReceipt, ReceivableFilter};
use salon_core::{CoreResult, SaleInstallment};

use super::insert_cash_movement;
use crate::error::{DbError, DbResult};

const INSTALLMENT_COLUMNS: &str = r#"
    id, sale_id, client_id, installment_number, amount_cents, due_date, status,
    received_amount_cents, received_at, bank_account_id, payment_method, notes, created_at
"#;

#[derive(Debug, Clone)]
pub struct SqliteInstallmentRepository {
    pool: SqlitePool,
}

impl SqliteInstallmentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SqliteInstallmentRepository { pool }
    }

    /// Inserts a whole schedule or nothing.
    pub async fn insert_batch(&self, installments: &[SaleInstallment]) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        for inst in installments {
            let inserted = sqlx::query(
                r#"
                INSERT INTO sale_installments (
                    id, sale_id, client_id, installment_number, amount_cents,
                    due_date, status, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
            )
            .bind(&inst.id)
            .bind(&inst.sale_id)
            .bind(&inst.client_id)
            .bind(inst.installment_number)
            .bind(inst.amount_cents)
            .bind(inst.due_date)
            .bind(inst.status)
            .bind(inst.created_at)
            .execute(&mut *tx)
            .await;

            match inserted.map_err(DbError::from) {
                Ok(_) => {}
                Err(e) if e.is_unique_violation() => {
                    return Err(DbError::conflict(format!(
                        "Sale {} already has installment {}",
                        inst.sale_id, inst.installment_number
                    )));
                }
                Err(e) => return Err(e),
            }
        }

        tx.commit().await?;

        debug!(count = installments.len(), "Installments created");
        Ok(())
    }

    pub async fn find_installment(&self, id: &str) -> DbResult<Option<SaleInstallment>> {
        let installment = sqlx::query_as(&format!(
            "SELECT {INSTALLMENT_COLUMNS} FROM sale_installments WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(installment)
    }

    pub async fn by_sale(&self, sale_id: &str) -> DbResult<Vec<SaleInstallment>> {
        let installments = sqlx::query_as(&format!(
            r#"
            SELECT {INSTALLMENT_COLUMNS}
            FROM sale_installments
            WHERE sale_id = ?1
            ORDER BY installment_number
            "#
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    /// Date bounds apply to `due_date`.
    pub async fn pending(&self, filter: &ReceivableFilter) -> DbResult<Vec<SaleInstallment>> {
        let installments = sqlx::query_as(&format!(
            r#"
            SELECT {INSTALLMENT_COLUMNS}
            FROM sale_installments
            WHERE status = 'PENDING'
              AND (?1 IS NULL OR client_id = ?1)
              AND (?2 IS NULL OR due_date >= ?2)
              AND (?3 IS NULL OR due_date <= ?3)
            ORDER BY due_date, installment_number
            "#
        ))
        .bind(&filter.client_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    /// Date bounds apply to the receipt day.
    pub async fn received(&self, filter: &ReceivableFilter) -> DbResult<Vec<SaleInstallment>> {
        let installments = sqlx::query_as(&format!(
            r#"
            SELECT {INSTALLMENT_COLUMNS}
            FROM sale_installments
            WHERE status = 'RECEIVED'
              AND (?1 IS NULL OR client_id = ?1)
              AND (?2 IS NULL OR date(received_at) >= ?2)
              AND (?3 IS NULL OR date(received_at) <= ?3)
            ORDER BY received_at DESC, rowid DESC
            "#
        ))
        .bind(&filter.client_id)
        .bind(filter.from)
        .bind(filter.to)
        .fetch_all(&self.pool)
        .await?;

        Ok(installments)
    }

    /// Marks the installment RECEIVED and books the cash IN together.
    pub async fn receive(&self, receipt: &InstallmentReceipt) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE sale_installments
            SET status = 'RECEIVED',
                received_amount_cents = ?2,
                received_at = ?3,
                bank_account_id = ?4,
                payment_method = ?5,
                notes = ?6
            WHERE id = ?1 AND status = 'PENDING'
            "#,
        )
        .bind(&receipt.installment_id)
        .bind(receipt.received_amount_cents)
        .bind(receipt.received_at)
        .bind(&receipt.bank_account_id)
        .bind(receipt.payment_method)
        .bind(&receipt.notes)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let exists: Option<String> =
                sqlx::query_scalar("SELECT id FROM sale_installments WHERE id = ?1")
                    .bind(&receipt.installment_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match exists {
                Some(_) => DbError::conflict(format!(
                    "Installment {} has already been received",
                    receipt.installment_id
                )),
                None => DbError::not_found("Installment", &receipt.installment_id),
            });
        }

        insert_cash_movement(&mut tx, &receipt.cash_movement).await?;
        tx.commit().await?;

        info!(
            installment_id = %receipt.installment_id,
            amount_cents = receipt.received_amount_cents,
            cash_movement_id = %receipt.cash_movement.id,
            "Installment received"
        );
        Ok(())
    }
}

#[async_trait]
impl SaleInstallmentRepository for SqliteInstallmentRepository {
    async fn create_batch(&self, installments: &[SaleInstallment]) -> CoreResult<()> {
        Ok(self.insert_batch(installments).await?)
    }

    async fn get_by_id(&self, id: &str) -> CoreResult<Option<SaleInstallment>> {
        Ok(self.find_installment(id).await?)
    }

    async fn get_by_sale_id(&self, sale_id: &str) -> CoreResult<Vec<SaleInstallment>> {
        Ok(self.by_sale(sale_id).await?)
    }

    async fn get_pending(&self, filter: &ReceivableFilter) -> CoreResult<Vec<SaleInstallment>> {
        Ok(self.pending(filter).await?)
    }

    async fn get_received(&self, filter: &ReceivableFilter) -> CoreResult<Vec<SaleInstallment>> {
        Ok(self.received(filter).await?)
    }

    async fn register_receipt(&self, receipt: &InstallmentReceipt) -> CoreResult<()> {
        Ok(self.receive(receipt).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use chrono::{Duration, NaiveDate, Utc};
    use salon_core::receivables::{
        plan_installments, plan_receipt, CreateInstallmentsInput, InstallmentInput, ReceiptInput,
    };
    use salon_core::{InstallmentStatus, PaymentMethod, DEFAULT_TENANT_ID};

    fn schedule(sale_id: &str, first_due: NaiveDate, count: i64) -> Vec<SaleInstallment> {
        plan_installments(
            &CreateInstallmentsInput {
                sale_id: sale_id.to_string(),
                client_id: Some("c-1".into()),
                installments: (1..=count)
                    .map(|n| InstallmentInput {
                        installment_number: n,
                        amount_cents: 5000,
                        due_date: first_due + Duration::days(30 * (n - 1)),
                    })
                    .collect(),
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn receipt_for(inst: &SaleInstallment) -> InstallmentReceipt {
        plan_receipt(
            inst,
            &ReceiptInput {
                installment_id: inst.id.clone(),
                received_amount_cents: inst.amount_cents,
                received_at: None,
                bank_account_id: Some("nubank".into()),
                payment_method: PaymentMethod::Pix,
                notes: None,
                created_by: None,
            },
            DEFAULT_TENANT_ID,
            None,
            Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_batch_and_duplicate_numbers() {
        let db = test_db().await;
        let repo = db.installments();
        let today = Utc::now().date_naive();

        repo.insert_batch(&schedule("s-1", today, 3)).await.unwrap();
        let stored = repo.by_sale("s-1").await.unwrap();
        assert_eq!(
            stored.iter().map(|i| i.installment_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );

        // Same numbers again: rejected as a whole.
        let err = repo.insert_batch(&schedule("s-1", today, 2)).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        assert_eq!(repo.by_sale("s-1").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_receipt_moves_installment_and_cash() {
        let db = test_db().await;
        let repo = db.installments();
        let today = Utc::now().date_naive();

        repo.insert_batch(&schedule("s-1", today, 2)).await.unwrap();
        let first = repo.by_sale("s-1").await.unwrap().remove(0);
        let receipt = receipt_for(&first);
        repo.receive(&receipt).await.unwrap();

        let stored = repo.find_installment(&first.id).await.unwrap().unwrap();
        assert_eq!(stored.status, InstallmentStatus::Received);
        assert_eq!(stored.received_amount_cents, Some(5000));
        assert_eq!(stored.payment_method, Some(PaymentMethod::Pix));

        let cash = db.cash_movements().find_movement(&receipt.cash_movement.id).await.unwrap();
        assert!(cash.is_some());

        assert_eq!(repo.pending(&ReceivableFilter::default()).await.unwrap().len(), 1);
        assert_eq!(repo.received(&ReceivableFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_second_receipt_conflicts() {
        let db = test_db().await;
        let repo = db.installments();

        repo.insert_batch(&schedule("s-1", Utc::now().date_naive(), 1)).await.unwrap();
        let inst = repo.by_sale("s-1").await.unwrap().remove(0);

        let first = receipt_for(&inst);
        let second = receipt_for(&inst);
        repo.receive(&first).await.unwrap();

        let err = repo.receive(&second).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)));
        assert!(db
            .cash_movements()
            .find_movement(&second.cash_movement.id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_overdue_is_derived_from_pending() {
        let db = test_db().await;
        let repo = db.installments();
        let today = Utc::now().date_naive();

        repo.insert_batch(&schedule("s-1", today - Duration::days(45), 3)).await.unwrap();

        // Due dates: today-45, today-15, today+15.
        let overdue = repo.get_overdue(&ReceivableFilter::default(), today).await.unwrap();
        assert_eq!(overdue.len(), 2);

        let summary = repo.summary(today).await.unwrap();
        assert_eq!(summary.pending_count, 3);
        assert_eq!(summary.overdue_count, 2);
        assert_eq!(summary.due_in_7_days_count, 0);
        assert_eq!(summary.due_in_30_days_count, 1);
    }
}
