//! # Cash Movement Ledger
//!
//! Append-only. Movements are never updated or deleted; every report here is
//! folded from `list` at read time, so a summary can never disagree with the
//! listing it describes.

use chrono::Utc;
use tracing::info;

use salon_core::ledger::{
    self, CashFilter, CashSummary, DayGroup, GroupTotals, NewCashMovement,
};
use salon_core::ports::Repositories;
use salon_core::{CashMovement, CoreError, CoreResult};

use crate::{open_register_id, rejected};

#[derive(Clone)]
pub struct CashLedgerService {
    repos: Repositories,
    tenant_id: String,
}

impl CashLedgerService {
    pub fn new(repos: Repositories, tenant_id: impl Into<String>) -> Self {
        CashLedgerService {
            repos,
            tenant_id: tenant_id.into(),
        }
    }

    /// Records a user-entered movement (`MANUAL` unless a source is given),
    /// attributed to the open register when there is one.
    pub async fn record(&self, input: NewCashMovement) -> CoreResult<CashMovement> {
        let register_id = open_register_id(&self.repos).await?;
        let movement =
            ledger::build_movement(&self.tenant_id, &input, register_id.as_deref(), Utc::now())
                .map_err(|e| rejected("record_cash_movement", e))?;

        self.repos.cash.create(&movement).await?;

        info!(
            movement_id = %movement.id,
            movement_type = ?movement.movement_type,
            amount_cents = movement.amount_cents,
            method = %movement.method,
            source = ?movement.source_type,
            "Cash movement recorded"
        );
        Ok(movement)
    }

    pub async fn get(&self, movement_id: &str) -> CoreResult<CashMovement> {
        self.repos
            .cash
            .find_by_id(movement_id)
            .await?
            .ok_or_else(|| CoreError::not_found("CashMovement", movement_id))
    }

    /// Newest first.
    pub async fn list(&self, filter: &CashFilter) -> CoreResult<Vec<CashMovement>> {
        filter.validate()?;
        self.repos.cash.list(filter).await
    }

    pub async fn summary(&self, filter: &CashFilter) -> CoreResult<CashSummary> {
        filter.validate()?;
        self.repos.cash.summary(filter).await
    }

    /// Per-method totals, largest volume first.
    pub async fn by_method(&self, filter: &CashFilter) -> CoreResult<Vec<GroupTotals>> {
        let movements = self.list(filter).await?;
        Ok(ledger::aggregate_by_method(&movements))
    }

    /// Per-bank-account totals, largest balance first.
    pub async fn by_account(&self, filter: &CashFilter) -> CoreResult<Vec<GroupTotals>> {
        let movements = self.list(filter).await?;
        Ok(ledger::aggregate_by_account(&movements))
    }

    /// One group per calendar day, newest day first.
    pub async fn by_date(&self, filter: &CashFilter) -> CoreResult<Vec<DayGroup>> {
        let movements = self.list(filter).await?;
        Ok(ledger::group_by_date(&movements))
    }
}
