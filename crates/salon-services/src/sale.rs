//! # Sale Settlement
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   create ──► ┌──────┐  pay   ┌──────┐  refund  ┌──────────┐            │
//! │              │ open │ ─────► │ paid │ ───────► │ refunded │            │
//! │              └──────┘        └──────┘          └──────────┘            │
//! │               │   ▲                                                     │
//! │   update_items└───┘                                                     │
//! │                  │ cancel                                               │
//! │                  ▼                                                      │
//! │              ┌──────────┐                                               │
//! │              │ canceled │                                               │
//! │              └──────────┘                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `pay` and `refund` are planned here from the loaded sale and committed by
//! the store as one unit; the store re-checks the status so a concurrent
//! second `pay` fails instead of settling twice.

use chrono::Utc;
use tracing::info;

use salon_core::ports::{Repositories, SaleFilter};
use salon_core::settlement::{
    self, CreateSaleInput, NewSaleItem, PaySaleInput, PaymentSettlement, RefundSettlement,
};
use salon_core::validation::validate_date_range;
use salon_core::{CoreError, CoreResult, PaymentSumRule, Sale, SaleStatus, StockMovement};

use crate::{open_register_id, rejected};

#[derive(Clone)]
pub struct SaleService {
    repos: Repositories,
    tenant_id: String,
    payment_sum_rule: PaymentSumRule,
}

impl SaleService {
    pub fn new(repos: Repositories, tenant_id: impl Into<String>, rule: PaymentSumRule) -> Self {
        SaleService {
            repos,
            tenant_id: tenant_id.into(),
            payment_sum_rule: rule,
        }
    }

    /// Opens a sale with its items and totals.
    pub async fn create(&self, input: CreateSaleInput) -> CoreResult<Sale> {
        let sale = settlement::new_sale(&self.tenant_id, &input, Utc::now())
            .map_err(|e| rejected("create_sale", e))?;

        if let Some(customer_id) = &sale.customer_id {
            self.ensure_client(customer_id).await?;
        }
        self.ensure_products(&input.items).await?;

        self.repos.sales.create(&sale).await?;

        info!(
            sale_id = %sale.id,
            items = sale.items.len(),
            total_cents = sale.total_cents,
            "Sale created"
        );
        Ok(sale)
    }

    pub async fn get(&self, sale_id: &str) -> CoreResult<Sale> {
        self.repos
            .sales
            .find_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))
    }

    pub async fn list(&self, filter: &SaleFilter) -> CoreResult<Vec<Sale>> {
        validate_date_range(filter.from, filter.to)?;
        self.repos.sales.list(filter).await
    }

    /// Replaces every item of an open sale and recomputes its totals.
    pub async fn update_items(&self, sale_id: &str, items: Vec<NewSaleItem>) -> CoreResult<Sale> {
        let mut sale = self.get(sale_id).await?;

        settlement::replace_items(&mut sale, &items, Utc::now())
            .map_err(|e| rejected("update_sale_items", e))?;
        self.ensure_products(&items).await?;

        self.repos.sales.update_items(&sale).await?;

        info!(
            sale_id = %sale.id,
            items = sale.items.len(),
            total_cents = sale.total_cents,
            "Sale items replaced"
        );
        Ok(sale)
    }

    /// Settles an open sale.
    ///
    /// Commits together: status `paid`, one cash IN per non-wallet line,
    /// one stock OUT per product line, and one wallet DEBIT for the
    /// `credit`/`fiado` lines. Cash lines are attributed to the open
    /// register, if any.
    pub async fn pay(&self, input: PaySaleInput) -> CoreResult<PaymentSettlement> {
        let sale = self.get(&input.sale_id).await?;
        let register_id = open_register_id(&self.repos).await?;

        let plan = settlement::plan_payment(
            &sale,
            &input,
            self.payment_sum_rule,
            register_id.as_deref(),
            Utc::now(),
        )
        .map_err(|e| rejected("pay_sale", e))?;

        self.repos
            .sales
            .pay(&plan)
            .await
            .map_err(|e| rejected("pay_sale", e))?;

        info!(
            sale_id = %plan.sale_id,
            total_cents = sale.total_cents,
            cash_movements = plan.cash_movements.len(),
            stock_movements = plan.stock_movements.len(),
            wallet_debit_cents = plan.wallet_debit.as_ref().map_or(0, |d| d.amount_cents),
            change_cents = plan.change_cents,
            "Sale paid"
        );
        Ok(plan)
    }

    /// Refunds a paid sale, returning every product line to stock.
    pub async fn refund(&self, sale_id: &str) -> CoreResult<RefundSettlement> {
        let sale = self.get(sale_id).await?;

        let plan =
            settlement::plan_refund(&sale, Utc::now()).map_err(|e| rejected("refund_sale", e))?;

        self.repos
            .sales
            .refund(&plan)
            .await
            .map_err(|e| rejected("refund_sale", e))?;

        info!(
            sale_id = %plan.sale_id,
            stock_movements = plan.stock_movements.len(),
            "Sale refunded"
        );
        Ok(plan)
    }

    /// Cancels an open sale. Paid and refunded sales must be refunded instead.
    pub async fn cancel(&self, sale_id: &str) -> CoreResult<()> {
        let sale = self.get(sale_id).await?;
        settlement::ensure_cancelable(&sale).map_err(|e| rejected("cancel_sale", e))?;

        self.repos
            .sales
            .transition(&sale.id, SaleStatus::Open, SaleStatus::Canceled)
            .await
            .map_err(|e| rejected("cancel_sale", e))?;

        info!(sale_id = %sale.id, "Sale canceled");
        Ok(())
    }

    /// Stock moved by a sale's settlement and refund, oldest first.
    pub async fn stock_movements(&self, sale_id: &str) -> CoreResult<Vec<StockMovement>> {
        self.get(sale_id).await?;
        self.repos.products.movements_by_reference(sale_id).await
    }

    async fn ensure_client(&self, client_id: &str) -> CoreResult<()> {
        match self.repos.clients.find_by_id(client_id).await? {
            Some(_) => Ok(()),
            None => Err(rejected("create_sale", CoreError::not_found("Client", client_id))),
        }
    }

    async fn ensure_products(&self, items: &[NewSaleItem]) -> CoreResult<()> {
        for product_id in items.iter().filter_map(|i| i.product_id.as_deref()) {
            if self.repos.products.find_by_id(product_id).await?.is_none() {
                return Err(CoreError::not_found("Product", product_id));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{product_item, seed_client, seed_product, service_item, Fixture};
    use salon_core::settlement::PaymentLine;
    use salon_core::{ErrorKind, PaymentMethod};

    fn cash(amount: i64) -> PaymentLine {
        PaymentLine {
            method: PaymentMethod::Cash,
            amount_cents: amount,
            change_cents: None,
            bank_account_id: None,
        }
    }

    fn pay_input(sale_id: &str, payments: Vec<PaymentLine>) -> PaySaleInput {
        PaySaleInput {
            sale_id: sale_id.to_string(),
            payments,
            created_by: Some("front-desk".into()),
        }
    }

    #[tokio::test]
    async fn test_create_checks_products() {
        let fx = Fixture::new();
        let err = fx
            .services
            .sales
            .create(CreateSaleInput {
                customer_id: None,
                items: vec![product_item("ghost", 1, 1000)],
                discount_cents: 0,
                created_by: None,
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_pay_with_change_records_money_kept() {
        let fx = Fixture::new();
        let sale = fx
            .services
            .sales
            .create(CreateSaleInput {
                customer_id: None,
                items: vec![service_item("Corte", 1, 4500)],
                discount_cents: 0,
                created_by: None,
            })
            .await
            .unwrap();

        let mut line = cash(5000);
        line.change_cents = Some(500);
        let plan = fx.services.sales.pay(pay_input(&sale.id, vec![line])).await.unwrap();

        assert_eq!(plan.change_cents, 500);
        let movements = fx.repos.cash.list_by_source(&sale.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].amount_cents, 4500);
        assert_eq!(fx.services.sales.get(&sale.id).await.unwrap().status, SaleStatus::Paid);
    }

    #[tokio::test]
    async fn test_pay_attaches_open_register() {
        let fx = Fixture::new();
        let register = fx.open_register(0).await;
        let sale = fx.service_sale(3000).await;

        fx.services.sales.pay(pay_input(&sale.id, vec![cash(3000)])).await.unwrap();

        let movements = fx.repos.cash.list_by_source(&sale.id).await.unwrap();
        assert_eq!(movements[0].cash_register_id.as_deref(), Some(register.id.as_str()));
    }

    #[tokio::test]
    async fn test_strict_rule_rejects_short_payment() {
        let fx = Fixture::new();
        let sale = fx.service_sale(3000).await;

        let err = fx
            .services
            .sales
            .pay(pay_input(&sale.id, vec![cash(2000)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BusinessRuleViolation);
        assert_eq!(fx.services.sales.get(&sale.id).await.unwrap().status, SaleStatus::Open);
    }

    #[tokio::test]
    async fn test_allow_partial_rule_accepts_short_payment() {
        let fx = Fixture::with_rule(PaymentSumRule::AllowPartial);
        let sale = fx.service_sale(3000).await;

        fx.services.sales.pay(pay_input(&sale.id, vec![cash(2000)])).await.unwrap();
        assert_eq!(fx.services.sales.get(&sale.id).await.unwrap().status, SaleStatus::Paid);
    }

    #[tokio::test]
    async fn test_pay_twice_conflicts() {
        let fx = Fixture::new();
        let sale = fx.service_sale(3000).await;
        fx.services.sales.pay(pay_input(&sale.id, vec![cash(3000)])).await.unwrap();

        let err = fx
            .services
            .sales
            .pay(pay_input(&sale.id, vec![cash(3000)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
        assert_eq!(fx.repos.cash.list_by_source(&sale.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refunded_sale_is_not_payable() {
        let fx = Fixture::new();
        let product = seed_product(&fx.repos, "Shampoo", 5).await;
        let sale = fx
            .services
            .sales
            .create(CreateSaleInput {
                customer_id: None,
                items: vec![product_item(&product.id, 1, 2000)],
                discount_cents: 0,
                created_by: None,
            })
            .await
            .unwrap();
        fx.services.sales.pay(pay_input(&sale.id, vec![cash(2000)])).await.unwrap();
        fx.services.sales.refund(&sale.id).await.unwrap();

        let err = fx
            .services
            .sales
            .pay(pay_input(&sale.id, vec![cash(2000)]))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);

        let err = fx.services.sales.refund(&sale.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[tokio::test]
    async fn test_update_items_only_while_open() {
        let fx = Fixture::new();
        let sale = fx.service_sale(3000).await;

        let updated = fx
            .services
            .sales
            .update_items(
                &sale.id,
                vec![service_item("Corte", 1, 3000), service_item("Escova", 2, 1500)],
            )
            .await
            .unwrap();
        assert_eq!(updated.subtotal_cents, 6000);
        assert_eq!(updated.total_cents, 6000);

        fx.services.sales.pay(pay_input(&sale.id, vec![cash(6000)])).await.unwrap();
        let err = fx
            .services
            .sales
            .update_items(&sale.id, vec![service_item("Corte", 1, 1)])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);
    }

    #[tokio::test]
    async fn test_cancel_rules() {
        let fx = Fixture::new();
        let open = fx.service_sale(1000).await;
        fx.services.sales.cancel(&open.id).await.unwrap();
        assert_eq!(fx.services.sales.get(&open.id).await.unwrap().status, SaleStatus::Canceled);

        let err = fx.services.sales.cancel(&open.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StateConflict);

        let paid = fx.service_sale(1000).await;
        fx.services.sales.pay(pay_input(&paid.id, vec![cash(1000)])).await.unwrap();
        let err = fx.services.sales.cancel(&paid.id).await.unwrap_err();
        assert!(err.to_string().contains("refund"));
    }

    #[tokio::test]
    async fn test_list_by_customer() {
        let fx = Fixture::new();
        let client = seed_client(&fx.services, "Ana").await;
        fx.service_sale(1000).await;
        let mine = fx
            .services
            .sales
            .create(CreateSaleInput {
                customer_id: Some(client.id.clone()),
                items: vec![service_item("Manicure", 1, 2500)],
                discount_cents: 0,
                created_by: None,
            })
            .await
            .unwrap();

        let sales = fx
            .services
            .sales
            .list(&SaleFilter {
                customer_id: Some(client.id.clone()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].id, mine.id);
    }
}
