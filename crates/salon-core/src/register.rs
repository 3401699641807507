//! # Cash Register Sessions
//!
//! At most one register is OPEN at any time. The check done here is only a
//! fast path for a friendly error: the store holds the real guarantee (a
//! unique index over open registers), since two concurrent opens can both
//! pass a read-then-write check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::ledger::{aggregate_by_method, summarize, CashSummary, GroupTotals};
use crate::money::Money;
use crate::types::{CashMovement, CashRegister, CashSource, MovementType, RegisterStatus};
use crate::validation::{new_id, validate_non_negative_amount, validate_required};

pub const ALREADY_OPEN_MESSAGE: &str =
    "Cannot open a new cash register while another one is already open";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct OpenRegisterInput {
    pub opened_by: String,
    #[serde(default)]
    pub initial_balance_cents: i64,
}

pub fn already_open() -> CoreError {
    CoreError::conflict(ALREADY_OPEN_MESSAGE)
}

pub fn build_register(
    tenant_id: &str,
    input: &OpenRegisterInput,
    now: DateTime<Utc>,
) -> CoreResult<CashRegister> {
    let opened_by = validate_required("openedBy", &input.opened_by)?;
    validate_non_negative_amount("initialBalance", input.initial_balance_cents)?;

    Ok(CashRegister {
        id: new_id(),
        tenant_id: tenant_id.to_string(),
        opened_by: opened_by.to_string(),
        initial_balance_cents: input.initial_balance_cents,
        status: RegisterStatus::Open,
        opened_at: now,
        closed_at: None,
        closed_by: None,
        closing_balance_cents: None,
        difference_cents: None,
    })
}

// =============================================================================
// Summary
// =============================================================================

/// Rollup of the movements attributed to one register.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CashRegisterSummary {
    pub register: CashRegister,
    pub totals: CashSummary,
    pub by_method: Vec<GroupTotals>,
    /// Distinct sales with money received in this session.
    pub sales_count: i64,
    pub sales_total_cents: i64,
    /// `initial + in - out`
    pub expected_balance_cents: i64,
}

pub fn summarize_register(register: CashRegister, movements: &[CashMovement]) -> CashRegisterSummary {
    let own: Vec<CashMovement> = movements
        .iter()
        .filter(|m| m.cash_register_id.as_deref() == Some(register.id.as_str()))
        .cloned()
        .collect();

    let totals = summarize(&own);
    let by_method = aggregate_by_method(&own);

    let sales: Vec<&CashMovement> = own
        .iter()
        .filter(|m| m.source_type == CashSource::Sale && m.movement_type == MovementType::In)
        .collect();
    let mut sale_ids: Vec<&str> = sales.iter().filter_map(|m| m.source_id.as_deref()).collect();
    sale_ids.sort_unstable();
    sale_ids.dedup();

    let expected = expected_balance(&register, &own);

    CashRegisterSummary {
        sales_count: sale_ids.len() as i64,
        sales_total_cents: sales.iter().map(|m| m.amount_cents).sum(),
        expected_balance_cents: expected.cents(),
        totals,
        by_method,
        register,
    }
}

// =============================================================================
// Close
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CloseRegisterInput {
    pub register_id: String,
    pub closed_by: String,
    pub counted_balance_cents: i64,
}

/// What `close` commits. The difference against the expected balance is
/// not part of the plan: the store derives it from the register's movements
/// in the same write that closes it, so a movement landing between the
/// summary and the close is still counted.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterClosing {
    pub register_id: String,
    pub closed_by: String,
    pub closed_at: DateTime<Utc>,
    pub closing_balance_cents: i64,
}

/// `initial + in - out` over the movements attributed to `register`.
pub fn expected_balance(register: &CashRegister, movements: &[CashMovement]) -> Money {
    movements
        .iter()
        .filter(|m| m.cash_register_id.as_deref() == Some(register.id.as_str()))
        .map(CashMovement::signed_amount)
        .sum::<Money>()
        + Money::from_cents(register.initial_balance_cents)
}

pub fn validate_close(input: &CloseRegisterInput) -> CoreResult<()> {
    validate_required("registerId", &input.register_id)?;
    validate_required("closedBy", &input.closed_by)?;
    validate_non_negative_amount("countedBalance", input.counted_balance_cents)?;
    Ok(())
}

pub fn plan_close(
    register: &CashRegister,
    input: &CloseRegisterInput,
    now: DateTime<Utc>,
) -> CoreResult<RegisterClosing> {
    validate_close(input)?;

    if register.status == RegisterStatus::Closed {
        return Err(CoreError::conflict(format!(
            "Cash register {} is already closed",
            register.id
        )));
    }

    Ok(RegisterClosing {
        register_id: register.id.clone(),
        closed_by: input.closed_by.trim().to_string(),
        closed_at: now,
        closing_balance_cents: input.counted_balance_cents,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
