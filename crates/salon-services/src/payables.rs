//! # Accounts Payable
//!
//! ## Status Flow
//! ```text
//!   PENDING ──pay part──► PARTIAL ──pay rest──► PAID
//!      │                     │
//!      └──────cancel─────────┴──────────────► CANCELLED
//!
//!   OVERDUE is reported, never stored: due before today and not settled.
//! ```
//!
//! Every read goes through [`payables::with_derived_status`], so callers never
//! see a stale PENDING for an account that is past due.

use chrono::{NaiveDate, Utc};
use tracing::info;

use salon_core::payables::{
    self, CreatePayableInput, PayableFilter, PayablePaymentInput, PayablesSummary,
};
use salon_core::ports::Repositories;
use salon_core::{AccountPayable, AccountPayablePayment, CoreError, CoreResult};

use crate::{open_register_id, rejected};

#[derive(Clone)]
pub struct PayablesService {
    repos: Repositories,
    tenant_id: String,
}

impl PayablesService {
    pub fn new(repos: Repositories, tenant_id: impl Into<String>) -> Self {
        PayablesService {
            repos,
            tenant_id: tenant_id.into(),
        }
    }

    pub async fn create(&self, input: CreatePayableInput) -> CoreResult<AccountPayable> {
        let account = payables::build_account(&self.tenant_id, &input, Utc::now())
            .map_err(|e| rejected("create_payable", e))?;

        self.repos.payables.create(&account).await?;

        info!(
            account_id = %account.id,
            amount_cents = account.amount_cents,
            due_date = %account.due_date,
            "Account payable created"
        );
        Ok(with_today(account))
    }

    /// Pays part or all of what is left. The cash OUT, the payment row and
    /// the new paid amount commit together; the store rejects the plan if
    /// another payment landed since the account was read.
    pub async fn register_payment(
        &self,
        input: PayablePaymentInput,
    ) -> CoreResult<AccountPayablePayment> {
        payables::validate_payment(&input).map_err(|e| rejected("register_payable_payment", e))?;

        let account = self.stored(&input.account_payable_id).await?;
        let register_id = open_register_id(&self.repos).await?;

        let plan = payables::plan_payment(&account, &input, register_id.as_deref(), Utc::now())
            .map_err(|e| rejected("register_payable_payment", e))?;

        self.repos
            .payables
            .register_payment(&plan)
            .await
            .map_err(|e| rejected("register_payable_payment", e))?;

        info!(
            account_id = %plan.account_payable_id,
            amount_cents = plan.payment.amount_cents,
            paid_cents = plan.new_paid_amount_cents,
            status = ?plan.new_status,
            "Account payable payment registered"
        );
        Ok(plan.payment)
    }

    /// Cancels a PENDING or PARTIAL account. Payments already made stay in
    /// the ledger.
    pub async fn cancel(&self, account_id: &str) -> CoreResult<()> {
        let account = self.stored(account_id).await?;
        payables::ensure_cancelable(&account).map_err(|e| rejected("cancel_payable", e))?;

        self.repos
            .payables
            .cancel(account_id)
            .await
            .map_err(|e| rejected("cancel_payable", e))?;

        info!(account_id = %account_id, "Account payable cancelled");
        Ok(())
    }

    pub async fn get(&self, account_id: &str) -> CoreResult<AccountPayable> {
        Ok(with_today(self.stored(account_id).await?))
    }

    /// Earliest due first; `filter.status` is matched against the derived
    /// status.
    pub async fn list(&self, filter: &PayableFilter) -> CoreResult<Vec<AccountPayable>> {
        filter.validate()?;
        let today = today();
        Ok(self
            .repos
            .payables
            .list(filter)
            .await?
            .into_iter()
            .map(|account| payables::with_derived_status(account, today))
            .filter(|account| filter.matches_status(account.status))
            .collect())
    }

    pub async fn payments(&self, account_id: &str) -> CoreResult<Vec<AccountPayablePayment>> {
        self.stored(account_id).await?;
        self.repos.payables.payments(account_id).await
    }

    pub async fn summary(&self) -> CoreResult<PayablesSummary> {
        self.repos.payables.summary(today()).await
    }

    async fn stored(&self, account_id: &str) -> CoreResult<AccountPayable> {
        self.repos
            .payables
            .get_by_id(account_id)
            .await?
            .ok_or_else(|| CoreError::not_found("AccountPayable", account_id))
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn with_today(account: AccountPayable) -> AccountPayable {
    payables::with_derived_status(account, today())
}
