//! # Repository Ports
//!
//! Async traits implemented by the persistence adapters in `salon-db`.
//!
//! ## Atomic Procedures
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Method                              Commits together                   │
//! │  ──────────────────────────────────  ──────────────────────────────     │
//! │  SaleRepository::pay                 status open→paid, cash IN(s),      │
//! │                                      stock OUT(s), wallet DEBIT         │
//! │  SaleRepository::refund              status paid→refunded, stock IN(s)  │
//! │  SaleInstallmentRepository::         status PENDING→RECEIVED, cash IN   │
//! │      register_receipt                                                   │
//! │  AccountPayableRepository::          paid amount + status, payment row, │
//! │      register_payment                cash OUT                           │
//! │  PurchaseRepository::record          purchase row, stock IN(s), cash OUT│
//! │  CreditRepository::debit             balance check + DEBIT              │
//! │  CashRegisterRepository::close       OPEN→CLOSED, counted vs expected   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each of these must either apply every write or none. The state guard of
//! each plan (expected status, expected paid amount) is re-checked inside the
//! unit of work; a stale plan fails with `StateConflict`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;
use crate::ledger::{summarize, CashFilter, CashSummary};
use crate::payables::{self, PayableFilter, PayablePayment, PayablesSummary};
use crate::receivables::{self, InstallmentReceipt, ReceivableFilter, ReceivablesSummary};
use crate::register::RegisterClosing;
use crate::settlement::{PaymentSettlement, RefundSettlement};
use crate::stock::PurchaseSettlement;
use crate::types::{
    AccountPayable, AccountPayablePayment, CashMovement, CashRegister, Client, CreditMovement,
    Product, Sale, SaleInstallment, SaleStatus, StockMovement,
};
use crate::wallet;
use crate::Money;

/// Narrows sale listings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleFilter {
    pub customer_id: Option<String>,
    pub status: Option<SaleStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl SaleFilter {
    pub fn matches(&self, sale: &Sale) -> bool {
        let day = sale.created_at.date_naive();
        self.customer_id
            .as_deref()
            .map_or(true, |id| sale.customer_id.as_deref() == Some(id))
            && self.status.map_or(true, |s| sale.status == s)
            && self.from.map_or(true, |from| day >= from)
            && self.to.map_or(true, |to| day <= to)
    }
}

// =============================================================================
// Sales
// =============================================================================

#[async_trait]
pub trait SaleRepository: Send + Sync {
    async fn create(&self, sale: &Sale) -> CoreResult<()>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Sale>>;

    /// Newest first.
    async fn list(&self, filter: &SaleFilter) -> CoreResult<Vec<Sale>>;

    /// Overwrites items and totals; only while the sale is still open.
    async fn update_items(&self, sale: &Sale) -> CoreResult<()>;

    /// Compare-and-set status transition.
    async fn transition(&self, id: &str, from: SaleStatus, to: SaleStatus) -> CoreResult<()>;

    async fn pay(&self, settlement: &PaymentSettlement) -> CoreResult<()>;

    async fn refund(&self, settlement: &RefundSettlement) -> CoreResult<()>;
}

// =============================================================================
// Cash Ledger
// =============================================================================

#[async_trait]
pub trait CashMovementRepository: Send + Sync {
    async fn create(&self, movement: &CashMovement) -> CoreResult<()>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<CashMovement>>;

    /// Most recent first.
    async fn list(&self, filter: &CashFilter) -> CoreResult<Vec<CashMovement>>;

    async fn list_by_source(&self, source_id: &str) -> CoreResult<Vec<CashMovement>>;

    /// Totals over exactly what [`list`](Self::list) returns for `filter`.
    async fn summary(&self, filter: &CashFilter) -> CoreResult<CashSummary> {
        let movements = self.list(filter).await?;
        Ok(summarize(&movements))
    }
}

// =============================================================================
// Products and Stock
// =============================================================================

#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn create(&self, product: &Product) -> CoreResult<()>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Product>>;

    /// Appends a movement and applies its delta to `current_stock`.
    async fn add_movement(&self, movement: &StockMovement) -> CoreResult<()>;

    async fn movements_by_product(&self, product_id: &str) -> CoreResult<Vec<StockMovement>>;

    async fn movements_by_reference(&self, reference_id: &str) -> CoreResult<Vec<StockMovement>>;
}

// =============================================================================
// Clients and Wallet
// =============================================================================

#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn create(&self, client: &Client) -> CoreResult<()>;

    async fn find_by_id(&self, id: &str) -> CoreResult<Option<Client>>;
}

#[async_trait]
pub trait CreditRepository: Send + Sync {
    /// Appends an entry with no balance check.
    async fn create(&self, movement: &CreditMovement) -> CoreResult<()>;

    /// Appends a DEBIT only if the balance, read in the same unit of work,
    /// covers it.
    async fn debit(&self, movement: &CreditMovement) -> CoreResult<()>;

    async fn list_by_client(&self, client_id: &str) -> CoreResult<Vec<CreditMovement>>;

    async fn balance(&self, client_id: &str) -> CoreResult<Money> {
        let movements = self.list_by_client(client_id).await?;
        Ok(wallet::balance(&movements))
    }
}

// =============================================================================
// Receivables
// =============================================================================

#[async_trait]
pub trait SaleInstallmentRepository: Send + Sync {
    /// Inserts the whole batch or nothing.
    async fn create_batch(&self, installments: &[SaleInstallment]) -> CoreResult<()>;

    async fn get_by_id(&self, id: &str) -> CoreResult<Option<SaleInstallment>>;

    /// Ordered by installment number.
    async fn get_by_sale_id(&self, sale_id: &str) -> CoreResult<Vec<SaleInstallment>>;

    /// Pending installments, earliest due first.
    async fn get_pending(&self, filter: &ReceivableFilter) -> CoreResult<Vec<SaleInstallment>>;

    /// Received installments, latest receipt first.
    async fn get_received(&self, filter: &ReceivableFilter) -> CoreResult<Vec<SaleInstallment>>;

    async fn register_receipt(&self, receipt: &InstallmentReceipt) -> CoreResult<()>;

    /// Pending installments due before `today`.
    async fn get_overdue(
        &self,
        filter: &ReceivableFilter,
        today: NaiveDate,
    ) -> CoreResult<Vec<SaleInstallment>> {
        let pending = self.get_pending(filter).await?;
        Ok(pending.into_iter().filter(|i| i.is_overdue(today)).collect())
    }

    async fn summary(&self, today: NaiveDate) -> CoreResult<ReceivablesSummary> {
        let pending = self.get_pending(&ReceivableFilter::default()).await?;
        Ok(receivables::summarize(&pending, today))
    }
}

// =============================================================================
// Payables
// =============================================================================

#[async_trait]
pub trait AccountPayableRepository: Send + Sync {
    async fn create(&self, account: &AccountPayable) -> CoreResult<()>;

    /// Returns the stored status; callers derive OVERDUE.
    async fn get_by_id(&self, id: &str) -> CoreResult<Option<AccountPayable>>;

    /// Applies every filter field except `status`, earliest due first.
    async fn list(&self, filter: &PayableFilter) -> CoreResult<Vec<AccountPayable>>;

    async fn register_payment(&self, payment: &PayablePayment) -> CoreResult<()>;

    async fn cancel(&self, id: &str) -> CoreResult<()>;

    async fn payments(&self, account_payable_id: &str) -> CoreResult<Vec<AccountPayablePayment>>;

    async fn summary(&self, today: NaiveDate) -> CoreResult<PayablesSummary> {
        let accounts = self.list(&PayableFilter::default()).await?;
        Ok(payables::summarize(&accounts, today))
    }
}

// =============================================================================
// Cash Register
// =============================================================================

#[async_trait]
pub trait CashRegisterRepository: Send + Sync {
    /// Fails with `StateConflict` if another register is already open.
    async fn create(&self, register: &CashRegister) -> CoreResult<()>;

    async fn get_current_open(&self) -> CoreResult<Option<CashRegister>>;

    async fn get_by_id(&self, id: &str) -> CoreResult<Option<CashRegister>>;

    /// OPEN → CLOSED. `difference_cents` is `counted - expected`, with the
    /// expected balance taken from the movements visible at commit.
    /// Returns the closed register.
    async fn close(&self, closing: &RegisterClosing) -> CoreResult<CashRegister>;
}

// =============================================================================
// Purchases
// =============================================================================

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    async fn record(&self, purchase: &PurchaseSettlement) -> CoreResult<()>;
}

// =============================================================================
// Bundle
// =============================================================================

/// Every port, as handed to the use cases by a store factory.
#[derive(Clone)]
pub struct Repositories {
    pub sales: Arc<dyn SaleRepository>,
    pub cash: Arc<dyn CashMovementRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub clients: Arc<dyn ClientRepository>,
    pub credits: Arc<dyn CreditRepository>,
    pub installments: Arc<dyn SaleInstallmentRepository>,
    pub payables: Arc<dyn AccountPayableRepository>,
    pub registers: Arc<dyn CashRegisterRepository>,
    pub purchases: Arc<dyn PurchaseRepository>,
}
