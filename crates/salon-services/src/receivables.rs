//! # Receivables
//!
//! Installment plans for sales paid over time. An installment is received
//! whole or not at all; receiving it marks it RECEIVED and appends the cash
//! IN in the same unit of work.
//!
//! ```text
//!   PENDING ──(due_date < today)──► shown as overdue
//!      │
//!      └── register_receipt ──► RECEIVED (+ cash IN, source SALE)
//! ```

use chrono::{NaiveDate, Utc};
use tracing::info;

use salon_core::ports::Repositories;
use salon_core::receivables::{
    self, CreateInstallmentsInput, ReceiptInput, ReceivableFilter, ReceivableView,
    ReceivablesSummary,
};
use salon_core::{CoreError, CoreResult, SaleInstallment};

use crate::{open_register_id, rejected};

#[derive(Clone)]
pub struct ReceivablesService {
    repos: Repositories,
    tenant_id: String,
}

impl ReceivablesService {
    pub fn new(repos: Repositories, tenant_id: impl Into<String>) -> Self {
        ReceivablesService {
            repos,
            tenant_id: tenant_id.into(),
        }
    }

    /// Creates the whole installment plan of a sale, or nothing.
    ///
    /// Installments may arrive in any order but their numbers must be
    /// exactly `1..=N`. When no client is given the sale's customer is used.
    /// Returns the new ids, ordered by installment number.
    pub async fn create_installment_sale(
        &self,
        input: CreateInstallmentsInput,
    ) -> CoreResult<Vec<String>> {
        let mut installments = receivables::plan_installments(&input, Utc::now())
            .map_err(|e| rejected("create_installment_sale", e))?;

        let sale = self
            .repos
            .sales
            .find_by_id(&input.sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", &input.sale_id))?;

        if input.client_id.is_none() {
            for installment in &mut installments {
                installment.client_id = sale.customer_id.clone();
            }
        }

        self.repos
            .installments
            .create_batch(&installments)
            .await
            .map_err(|e| rejected("create_installment_sale", e))?;

        let total_cents: i64 = installments.iter().map(|i| i.amount_cents).sum();
        info!(
            sale_id = %sale.id,
            installments = installments.len(),
            total_cents,
            "Installment plan created"
        );
        Ok(installments.into_iter().map(|i| i.id).collect())
    }

    /// Receives a pending installment in full. Returns the id of the cash
    /// movement recorded for it.
    pub async fn register_receipt(&self, input: ReceiptInput) -> CoreResult<String> {
        receivables::validate_receipt(&input).map_err(|e| rejected("register_receipt", e))?;

        let installment = self.get(&input.installment_id).await?;
        let register_id = open_register_id(&self.repos).await?;

        let receipt = receivables::plan_receipt(
            &installment,
            &input,
            &self.tenant_id,
            register_id.as_deref(),
            Utc::now(),
        )
        .map_err(|e| rejected("register_receipt", e))?;

        self.repos
            .installments
            .register_receipt(&receipt)
            .await
            .map_err(|e| rejected("register_receipt", e))?;

        info!(
            installment_id = %receipt.installment_id,
            sale_id = %installment.sale_id,
            amount_cents = receipt.received_amount_cents,
            method = %receipt.payment_method,
            "Installment received"
        );
        Ok(receipt.cash_movement.id)
    }

    pub async fn get(&self, installment_id: &str) -> CoreResult<SaleInstallment> {
        self.repos
            .installments
            .get_by_id(installment_id)
            .await?
            .ok_or_else(|| CoreError::not_found("SaleInstallment", installment_id))
    }

    /// A sale's installments by number.
    pub async fn by_sale(&self, sale_id: &str) -> CoreResult<Vec<SaleInstallment>> {
        self.repos.installments.get_by_sale_id(sale_id).await
    }

    /// Pending installments, earliest due first.
    pub async fn pending(&self, filter: &ReceivableFilter) -> CoreResult<Vec<SaleInstallment>> {
        filter.validate()?;
        self.repos.installments.get_pending(filter).await
    }

    /// Pending installments due before today.
    pub async fn overdue(&self, filter: &ReceivableFilter) -> CoreResult<Vec<SaleInstallment>> {
        filter.validate()?;
        self.repos.installments.get_overdue(filter, today()).await
    }

    /// Received installments, latest receipt first.
    pub async fn received(&self, filter: &ReceivableFilter) -> CoreResult<Vec<SaleInstallment>> {
        filter.validate()?;
        self.repos.installments.get_received(filter).await
    }

    pub async fn list(
        &self,
        view: ReceivableView,
        filter: &ReceivableFilter,
    ) -> CoreResult<Vec<SaleInstallment>> {
        match view {
            ReceivableView::Pending => self.pending(filter).await,
            ReceivableView::Overdue => self.overdue(filter).await,
            ReceivableView::Received => self.received(filter).await,
        }
    }

    pub async fn summary(&self) -> CoreResult<ReceivablesSummary> {
        self.repos.installments.summary(today()).await
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{seed_client, service_item, Fixture};
    use chrono::Duration;
    use salon_core::receivables::{InstallmentInput, SEQUENCE_MESSAGE};
    use salon_core::settlement::CreateSaleInput;
    use salon_core::{CashSource, ErrorKind, InstallmentStatus, PaymentMethod, Sale};

    async fn sale_for(fx: &Fixture, customer_id: Option<String>) -> Sale {
        fx.services
            .sales
            .create(CreateSaleInput {
                customer_id,
                items: vec![service_item("Mechas", 1, 30000)],
                discount_cents: 0,
                created_by: None,
            })
            .await
            .unwrap()
    }

    fn plan(sale_id: &str, parts: &[(i64, i64, i64)]) -> CreateInstallmentsInput {
        let today = today();
        CreateInstallmentsInput {
            sale_id: sale_id.to_string(),
            client_id: None,
            installments: parts
                .iter()
                .map(|&(number, amount, due_in_days)| InstallmentInput {
                    installment_number: number,
                    amount_cents: amount,
                    due_date: today + Duration::days(due_in_days),
                })
                .collect(),
        }
    }

    fn receipt(installment_id: &str, amount: i64) -> ReceiptInput {
        ReceiptInput {
            installment_id: installment_id.to_string(),
            received_amount_cents: amount,
            received_at: None,
            bank_account_id: Some("itau".into()),
            payment_method: PaymentMethod::Pix,
            notes: None,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn test_plan_inherits_sale_customer() {
        let fx = Fixture::new();
        let client = seed_client(&fx.services, "Elisa").await;
        let sale = sale_for(&fx, Some(client.id.clone())).await;

        let ids = fx
            .services
            .receivables
            .create_installment_sale(plan(&sale.id, &[(2, 15000, 60), (1, 15000, 30)]))
            .await
            .unwrap();
        assert_eq!(ids.len(), 2);

        let installments = fx.services.receivables.by_sale(&sale.id).await.unwrap();
        assert_eq!(installments[0].id, ids[0]);
        assert_eq!(installments[0].installment_number, 1);
        assert!(installments
            .iter()
            .all(|i| i.client_id.as_deref() == Some(client.id.as_str())));
    }

    #[tokio::test]
    async fn test_gap_in_numbers_is_rejected() {
        let fx = Fixture::new();
        let sale = sale_for(&fx, None).await;

        let err = fx
            .services
            .receivables
            .create_installment_sale(plan(&sale.id, &[(1, 5000, 30), (3, 5000, 60)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
        assert_eq!(err.to_string(), SEQUENCE_MESSAGE);
        assert!(fx.services.receivables.by_sale(&sale.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_sale() {
        let fx = Fixture::new();
        let err = fx
            .services
            .receivables
            .create_installment_sale(plan("ghost", &[(1, 5000, 30)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_receipt_records_cash_once() {
        let fx = Fixture::new();
        let sale = sale_for(&fx, None).await;
        let ids = fx
            .services
            .receivables
            .create_installment_sale(plan(&sale.id, &[(1, 10000, 0)]))
            .await
            .unwrap();

        let movement_id = fx
            .services
            .receivables
            .register_receipt(receipt(&ids[0], 10000))
            .await
            .unwrap();

        let movement = fx.services.cash.get(&movement_id).await.unwrap();
        assert_eq!(movement.amount_cents, 10000);
        assert_eq!(movement.source_type, CashSource::Sale);
        assert_eq!(movement.source_id.as_deref(), Some(sale.id.as_str()));

        let installment = fx.services.receivables.get(&ids[0]).await.unwrap();
        assert_eq!(installment.status, InstallmentStatus::Received);

        let err = fx
            .services
            .receivables
            .register_receipt(receipt(&ids[0], 10000))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(fx.repos.cash.list_by_source(&sale.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_receipt_validation_precedes_lookup() {
        let fx = Fixture::new();
        let err = fx
            .services
            .receivables
            .register_receipt(receipt("ghost", 0))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationError);

        let err = fx
            .services
            .receivables
            .register_receipt(receipt("ghost", 100))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_views_and_summary() {
        let fx = Fixture::new();
        let sale = sale_for(&fx, None).await;
        let ids = fx
            .services
            .receivables
            .create_installment_sale(plan(
                &sale.id,
                &[(1, 10000, -10), (2, 10000, 5), (3, 10000, 20)],
            ))
            .await
            .unwrap();
        fx.services
            .receivables
            .register_receipt(receipt(&ids[2], 10000))
            .await
            .unwrap();

        let r = &fx.services.receivables;
        let filter = ReceivableFilter::default();
        assert_eq!(r.list(ReceivableView::Pending, &filter).await.unwrap().len(), 2);

        let overdue = r.list(ReceivableView::Overdue, &filter).await.unwrap();
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, ids[0]);

        let received = r.list(ReceivableView::Received, &filter).await.unwrap();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].id, ids[2]);

        let summary = r.summary().await.unwrap();
        assert_eq!(summary.pending_count, 2);
        assert_eq!(summary.total_pending_cents, 20000);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.total_overdue_cents, 10000);
    }
}
