//! # Cash Register Sessions
//!
//! At most one register is open at a time. `open` checks first so the
//! common case fails fast with a clear message, and the store's unique
//! index on the OPEN status settles the race between two concurrent opens.
//!
//! While a register is open, every settlement, receipt, payment, purchase
//! and manual movement is attributed to it; its summary folds exactly those
//! movements.

use chrono::Utc;
use tracing::info;

use salon_core::ledger::CashFilter;
use salon_core::ports::Repositories;
use salon_core::register::{self, CashRegisterSummary, CloseRegisterInput, OpenRegisterInput};
use salon_core::{CashRegister, CoreError, CoreResult};

use crate::rejected;

#[derive(Clone)]
pub struct CashRegisterService {
    repos: Repositories,
    tenant_id: String,
}

impl CashRegisterService {
    pub fn new(repos: Repositories, tenant_id: impl Into<String>) -> Self {
        CashRegisterService {
            repos,
            tenant_id: tenant_id.into(),
        }
    }

    pub async fn open(&self, input: OpenRegisterInput) -> CoreResult<CashRegister> {
        let cash_register = register::build_register(&self.tenant_id, &input, Utc::now())
            .map_err(|e| rejected("open_register", e))?;

        if self.repos.registers.get_current_open().await?.is_some() {
            return Err(rejected("open_register", register::already_open()));
        }

        self.repos
            .registers
            .create(&cash_register)
            .await
            .map_err(|e| rejected("open_register", e))?;

        info!(
            register_id = %cash_register.id,
            opened_by = %cash_register.opened_by,
            initial_balance_cents = cash_register.initial_balance_cents,
            "Cash register opened"
        );
        Ok(cash_register)
    }

    /// Summary of the open register, or `None` when none is open.
    pub async fn current(&self) -> CoreResult<Option<CashRegisterSummary>> {
        match self.repos.registers.get_current_open().await? {
            Some(open) => Ok(Some(self.summarize(open).await?)),
            None => Ok(None),
        }
    }

    pub async fn summary(&self, register_id: &str) -> CoreResult<CashRegisterSummary> {
        let cash_register = self.get(register_id).await?;
        self.summarize(cash_register).await
    }

    /// Closes the open register with the counted balance. The store works
    /// out the difference against the expected balance at commit, so a
    /// movement recorded while the close is in flight is still counted.
    pub async fn close(&self, input: CloseRegisterInput) -> CoreResult<CashRegister> {
        register::validate_close(&input).map_err(|e| rejected("close_register", e))?;

        let cash_register = self.get(&input.register_id).await?;
        let closing = register::plan_close(&cash_register, &input, Utc::now())
            .map_err(|e| rejected("close_register", e))?;

        let closed = self
            .repos
            .registers
            .close(&closing)
            .await
            .map_err(|e| rejected("close_register", e))?;

        info!(
            register_id = %closed.id,
            closed_by = %closing.closed_by,
            counted_cents = closing.closing_balance_cents,
            difference_cents = closed.difference_cents,
            "Cash register closed"
        );
        Ok(closed)
    }

    pub async fn get(&self, register_id: &str) -> CoreResult<CashRegister> {
        self.repos
            .registers
            .get_by_id(register_id)
            .await?
            .ok_or_else(|| CoreError::not_found("CashRegister", register_id))
    }

    async fn summarize(&self, cash_register: CashRegister) -> CoreResult<CashRegisterSummary> {
        let movements = self
            .repos
            .cash
            .list(&CashFilter::for_register(cash_register.id.clone()))
            .await?;
        Ok(register::summarize_register(cash_register, &movements))
    }
}
