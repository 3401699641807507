//! # Installment Receivables
//!
//! A sale sold on installments becomes `N` scheduled installments numbered
//! `1..N`. Each one is received exactly once, all-or-nothing.
//!
//! ```text
//! create_batch([1, 2, 3])          register_receipt(#2)
//!   ┌────────┐                       ┌─────────────────────────────────┐
//!   │PENDING │ ──────────────────────► RECEIVED  +  cash IN (SALE, id) │
//!   └────────┘                       └─────────────────────────────────┘
//!      │ due_date < today
//!      ▼
//!   overdue (derived, never stored)
//! ```

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{
    CashMovement, CashSource, InstallmentStatus, MovementType, PaymentMethod, SaleInstallment,
};
use crate::validation::{new_id, validate_date_range, validate_positive_amount, validate_required};

pub const SEQUENCE_MESSAGE: &str = "Installment numbers must be sequential starting from 1";

// =============================================================================
// Creating Installments
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct InstallmentInput {
    pub installment_number: i64,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateInstallmentsInput {
    pub sale_id: String,
    pub client_id: Option<String>,
    pub installments: Vec<InstallmentInput>,
}

/// Validates a batch and returns the installments to insert, ordered by number.
///
/// ## Rules (checked in this order)
/// 1. at least one installment
/// 2. numbers, once sorted, are exactly `1, 2, ..., N`
/// 3. every amount > 0
pub fn plan_installments(
    input: &CreateInstallmentsInput,
    now: DateTime<Utc>,
) -> CoreResult<Vec<SaleInstallment>> {
    let sale_id = validate_required("saleId", &input.sale_id)?;

    if input.installments.is_empty() {
        return Err(ValidationError::Empty {
            field: "installments".to_string(),
        }
        .into());
    }

    let mut sorted: Vec<&InstallmentInput> = input.installments.iter().collect();
    sorted.sort_by_key(|i| i.installment_number);

    let sequential = sorted
        .iter()
        .enumerate()
        .all(|(idx, inst)| inst.installment_number == idx as i64 + 1);
    if !sequential {
        return Err(CoreError::rule(SEQUENCE_MESSAGE));
    }

    for inst in &sorted {
        validate_positive_amount("installment amount", inst.amount_cents)?;
    }

    Ok(sorted
        .into_iter()
        .map(|inst| SaleInstallment {
            id: new_id(),
            sale_id: sale_id.to_string(),
            client_id: input.client_id.clone(),
            installment_number: inst.installment_number,
            amount_cents: inst.amount_cents,
            due_date: inst.due_date,
            status: InstallmentStatus::Pending,
            received_amount_cents: None,
            received_at: None,
            bank_account_id: None,
            payment_method: None,
            notes: None,
            created_at: now,
        })
        .collect())
}

// =============================================================================
// Receiving
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptInput {
    pub installment_id: String,
    pub received_amount_cents: i64,
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
    pub bank_account_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

/// What `register_receipt` commits in one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallmentReceipt {
    pub installment_id: String,
    pub received_amount_cents: i64,
    pub received_at: DateTime<Utc>,
    pub bank_account_id: Option<String>,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    pub cash_movement: CashMovement,
}

/// Field checks done before the installment is looked up.
pub fn validate_receipt(input: &ReceiptInput) -> CoreResult<()> {
    validate_required("installmentId", &input.installment_id)?;
    validate_positive_amount("receivedAmount", input.received_amount_cents)?;
    if input.payment_method.is_wallet() {
        return Err(ValidationError::InvalidFormat {
            field: "paymentMethod".to_string(),
            reason: format!("'{}' does not move cash", input.payment_method),
        }
        .into());
    }
    Ok(())
}

/// Plans the receipt of a pending installment.
pub fn plan_receipt(
    installment: &SaleInstallment,
    input: &ReceiptInput,
    tenant_id: &str,
    cash_register_id: Option<&str>,
    now: DateTime<Utc>,
) -> CoreResult<InstallmentReceipt> {
    validate_receipt(input)?;

    if installment.status == InstallmentStatus::Received {
        return Err(CoreError::conflict(format!(
            "Installment {} of sale {} has already been received",
            installment.installment_number, installment.sale_id
        )));
    }

    let received_at = input.received_at.unwrap_or(now);

    let cash_movement = CashMovement {
        id: new_id(),
        tenant_id: tenant_id.to_string(),
        movement_type: MovementType::In,
        amount_cents: input.received_amount_cents,
        method: input.payment_method,
        source_type: CashSource::Sale,
        source_id: Some(installment.sale_id.clone()),
        bank_account_id: input.bank_account_id.clone(),
        cash_register_id: cash_register_id.map(str::to_string),
        description: Some(format!(
            "Installment {} of sale {}",
            installment.installment_number, installment.sale_id
        )),
        created_by: input.created_by.clone(),
        occurred_at: received_at,
    };

    Ok(InstallmentReceipt {
        installment_id: installment.id.clone(),
        received_amount_cents: input.received_amount_cents,
        received_at,
        bank_account_id: input.bank_account_id.clone(),
        payment_method: input.payment_method,
        notes: input.notes.clone(),
        cash_movement,
    })
}

// =============================================================================
// Queries
// =============================================================================

/// Narrows installment listings. Dates apply to `due_date` for pending
/// installments and to the receipt day for received ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceivableFilter {
    pub client_id: Option<String>,
    #[ts(as = "Option<String>")]
    pub from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub to: Option<NaiveDate>,
}

impl ReceivableFilter {
    pub fn validate(&self) -> CoreResult<()> {
        validate_date_range(self.from, self.to)?;
        Ok(())
    }

    fn in_range(&self, day: NaiveDate) -> bool {
        self.from.map_or(true, |from| day >= from) && self.to.map_or(true, |to| day <= to)
    }

    fn client_matches(&self, installment: &SaleInstallment) -> bool {
        self.client_id
            .as_deref()
            .map_or(true, |id| installment.client_id.as_deref() == Some(id))
    }

    pub fn matches_pending(&self, installment: &SaleInstallment) -> bool {
        installment.status == InstallmentStatus::Pending
            && self.client_matches(installment)
            && self.in_range(installment.due_date)
    }

    pub fn matches_received(&self, installment: &SaleInstallment) -> bool {
        installment.status == InstallmentStatus::Received
            && self.client_matches(installment)
            && installment
                .received_at
                .map_or(false, |at| self.in_range(at.date_naive()))
    }
}

/// Which slice of receivables a listing returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReceivableView {
    #[default]
    Pending,
    Overdue,
    Received,
}

/// Pending totals bucketed by due date relative to `today`.
///
/// The 7-day and 30-day buckets are cumulative windows `[today, today + n]`;
/// overdue installments fall in neither.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReceivablesSummary {
    pub total_pending_cents: i64,
    pub pending_count: i64,
    pub total_overdue_cents: i64,
    pub overdue_count: i64,
    pub total_due_in_7_days_cents: i64,
    pub due_in_7_days_count: i64,
    pub total_due_in_30_days_cents: i64,
    pub due_in_30_days_count: i64,
}

pub fn summarize(installments: &[SaleInstallment], today: NaiveDate) -> ReceivablesSummary {
    let week = today + Duration::days(7);
    let month = today + Duration::days(30);

    installments
        .iter()
        .filter(|i| i.status == InstallmentStatus::Pending)
        .fold(ReceivablesSummary::default(), |mut acc, inst| {
            acc.total_pending_cents += inst.amount_cents;
            acc.pending_count += 1;

            if inst.due_date < today {
                acc.total_overdue_cents += inst.amount_cents;
                acc.overdue_count += 1;
            } else {
                if inst.due_date <= week {
                    acc.total_due_in_7_days_cents += inst.amount_cents;
                    acc.due_in_7_days_count += 1;
                }
                if inst.due_date <= month {
                    acc.total_due_in_30_days_cents += inst.amount_cents;
                    acc.due_in_30_days_count += 1;
                }
            }
            acc
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
