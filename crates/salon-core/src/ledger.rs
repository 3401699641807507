//! # Cash Movement Ledger
//!
//! Building, filtering and aggregating the append-only cash ledger.
//!
//! ## Derived Views
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  movements (append-only)                                                │
//! │      │                                                                  │
//! │      ├── summarize()           → { total_in, total_out, balance }       │
//! │      ├── aggregate_by_method() → per method, largest volume first       │
//! │      ├── aggregate_by_account()→ per bank account, largest net first    │
//! │      └── group_by_date()       → per day, most recent day first         │
//! │                                                                         │
//! │  Every grouping is a partition: Σ(group totals) == ungrouped totals.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here is cached. Aggregates are recomputed over whatever set a
//! listing with the same filter would return.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::{CashMovement, CashSource, MovementType, PaymentMethod};
use crate::validation::{new_id, validate_date_range, validate_positive_amount};

/// Key used for movements that carry no bank account.
pub const UNASSIGNED_ACCOUNT: &str = "unassigned";

// =============================================================================
// Building Movements
// =============================================================================

/// A cash movement entered by hand (or by a use case that is not a sale).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewCashMovement {
    pub movement_type: MovementType,
    pub amount_cents: i64,
    pub method: PaymentMethod,
    /// Defaults to `MANUAL`.
    pub source_type: Option<CashSource>,
    pub source_id: Option<String>,
    pub bank_account_id: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "Option<String>")]
    pub occurred_at: Option<DateTime<Utc>>,
}

/// Validates and stamps a new movement.
pub fn build_movement(
    tenant_id: &str,
    input: &NewCashMovement,
    cash_register_id: Option<&str>,
    now: DateTime<Utc>,
) -> CoreResult<CashMovement> {
    validate_positive_amount("amount", input.amount_cents)?;

    Ok(CashMovement {
        id: new_id(),
        tenant_id: tenant_id.to_string(),
        movement_type: input.movement_type,
        amount_cents: input.amount_cents,
        method: input.method,
        source_type: input.source_type.unwrap_or(CashSource::Manual),
        source_id: input.source_id.clone(),
        bank_account_id: input.bank_account_id.clone(),
        cash_register_id: cash_register_id.map(str::to_string),
        description: input.description.clone(),
        created_by: input.created_by.clone(),
        occurred_at: input.occurred_at.unwrap_or(now),
    })
}

// =============================================================================
// Filters
// =============================================================================

/// Listing filter. Every field narrows; `None` means "any".
///
/// Date bounds are inclusive calendar days in UTC.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CashFilter {
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
    pub movement_type: Option<MovementType>,
    pub method: Option<PaymentMethod>,
    pub source_type: Option<CashSource>,
    pub cash_register_id: Option<String>,
}

impl CashFilter {
    pub fn validate(&self) -> CoreResult<()> {
        validate_date_range(self.from, self.to)?;
        Ok(())
    }

    pub fn for_register(register_id: impl Into<String>) -> Self {
        CashFilter {
            cash_register_id: Some(register_id.into()),
            ..Default::default()
        }
    }

    pub fn matches(&self, movement: &CashMovement) -> bool {
        let day = movement.occurred_at.date_naive();
        self.from.map_or(true, |from| day >= from)
            && self.to.map_or(true, |to| day <= to)
            && self.movement_type.map_or(true, |t| movement.movement_type == t)
            && self.method.map_or(true, |m| movement.method == m)
            && self.source_type.map_or(true, |s| movement.source_type == s)
            && self
                .cash_register_id
                .as_deref()
                .map_or(true, |id| movement.cash_register_id.as_deref() == Some(id))
    }
}

// =============================================================================
// Aggregates
// =============================================================================

/// `{totalIn, totalOut, balance}` over a set of movements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CashSummary {
    pub total_in_cents: i64,
    pub total_out_cents: i64,
    /// `total_in - total_out`
    pub balance_cents: i64,
    pub count: i64,
}

impl CashSummary {
    fn push(&mut self, movement: &CashMovement) {
        match movement.movement_type {
            MovementType::In => self.total_in_cents += movement.amount_cents,
            MovementType::Out => self.total_out_cents += movement.amount_cents,
        }
        self.balance_cents = self.total_in_cents - self.total_out_cents;
        self.count += 1;
    }

    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }

    /// Total money that moved, regardless of direction.
    pub fn volume_cents(&self) -> i64 {
        self.total_in_cents + self.total_out_cents
    }
}

pub fn summarize<'a, I>(movements: I) -> CashSummary
where
    I: IntoIterator<Item = &'a CashMovement>,
{
    movements
        .into_iter()
        .fold(CashSummary::default(), |mut acc, movement| {
            acc.push(movement);
            acc
        })
}

/// Totals of one group (a method, an account).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct GroupTotals {
    pub key: String,
    pub totals: CashSummary,
}

fn group_by_key<'a, F>(movements: &'a [CashMovement], key: F) -> Vec<GroupTotals>
where
    F: Fn(&'a CashMovement) -> String,
{
    let mut groups: BTreeMap<String, CashSummary> = BTreeMap::new();
    for movement in movements {
        groups.entry(key(movement)).or_default().push(movement);
    }
    groups
        .into_iter()
        .map(|(key, totals)| GroupTotals { key, totals })
        .collect()
}

/// Per payment method, sorted by volume (in + out) descending.
pub fn aggregate_by_method(movements: &[CashMovement]) -> Vec<GroupTotals> {
    let mut groups = group_by_key(movements, |m| m.method.as_str().to_string());
    // BTreeMap order is the tie-breaker (stable sort).
    groups.sort_by(|a, b| b.totals.volume_cents().cmp(&a.totals.volume_cents()));
    groups
}

/// Per bank account, sorted by balance descending.
pub fn aggregate_by_account(movements: &[CashMovement]) -> Vec<GroupTotals> {
    let mut groups = group_by_key(movements, |m| {
        m.bank_account_id
            .clone()
            .unwrap_or_else(|| UNASSIGNED_ACCOUNT.to_string())
    });
    groups.sort_by(|a, b| b.totals.balance_cents.cmp(&a.totals.balance_cents));
    groups
}

/// Movements of one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct DayGroup {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub totals: CashSummary,
    /// Most recent first.
    pub movements: Vec<CashMovement>,
}

/// Groups by UTC calendar day, most recent day first.
pub fn group_by_date(movements: &[CashMovement]) -> Vec<DayGroup> {
    let mut days: BTreeMap<NaiveDate, Vec<CashMovement>> = BTreeMap::new();
    for movement in movements {
        days.entry(movement.occurred_at.date_naive())
            .or_default()
            .push(movement.clone());
    }

    days.into_iter()
        .rev()
        .map(|(date, mut movements)| {
            movements.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
            DayGroup {
                date,
                totals: summarize(&movements),
                movements,
            }
        })
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
