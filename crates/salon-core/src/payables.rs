//! # Accounts Payable
//!
//! Obligations owed by the salon, paid down in one or more payments.
//!
//! ## Status
//! ```text
//!                  pay (partial)           pay (rest)
//!   ┌─────────┐  ───────────────► ┌─────────┐ ──────────► ┌──────┐
//!   │ PENDING │                   │ PARTIAL │             │ PAID │
//!   └─────────┘  ─────────────────┴─────────┴───────────► └──────┘
//!        │              pay (full)
//!        │ cancel (also from PARTIAL)
//!        ▼
//!   ┌───────────┐
//!   │ CANCELLED │ terminal
//!   └───────────┘
//!
//!   OVERDUE = not settled AND due_date < today   (derived on read only)
//! ```
//!
//! The stored status is only ever PENDING, PARTIAL, PAID or CANCELLED.
//! [`derive_status`] computes what callers see.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    AccountPayable, AccountPayablePayment, CashMovement, CashSource, MovementType,
    PayableStatus, PaymentMethod,
};
use crate::validation::{
    new_id, validate_date_present, validate_date_range, validate_description,
    validate_positive_amount, validate_required,
};

// =============================================================================
// Status Derivation
// =============================================================================

/// The status an account payable reports on `today`.
///
/// ## Precedence
/// 1. CANCELLED stays CANCELLED
/// 2. fully paid → PAID
/// 3. due before today → OVERDUE
/// 4. something paid → PARTIAL
/// 5. otherwise PENDING
pub fn derive_status(account: &AccountPayable, today: NaiveDate) -> PayableStatus {
    if account.status == PayableStatus::Cancelled {
        return PayableStatus::Cancelled;
    }
    if account.paid_amount_cents >= account.amount_cents {
        return PayableStatus::Paid;
    }
    if account.due_date < today {
        return PayableStatus::Overdue;
    }
    if account.paid_amount_cents > 0 {
        return PayableStatus::Partial;
    }
    PayableStatus::Pending
}

/// Replaces the stored status with the derived one.
pub fn with_derived_status(mut account: AccountPayable, today: NaiveDate) -> AccountPayable {
    account.status = derive_status(&account, today);
    account
}

/// Stored status after `paid` has been paid in total.
fn stored_status_for(amount_cents: i64, paid_cents: i64) -> PayableStatus {
    if paid_cents >= amount_cents {
        PayableStatus::Paid
    } else if paid_cents > 0 {
        PayableStatus::Partial
    } else {
        PayableStatus::Pending
    }
}

// =============================================================================
// Create
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreatePayableInput {
    pub description: String,
    pub amount_cents: i64,
    #[ts(as = "Option<String>")]
    pub due_date: Option<NaiveDate>,
    pub supplier_id: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

pub fn build_account(
    tenant_id: &str,
    input: &CreatePayableInput,
    now: DateTime<Utc>,
) -> CoreResult<AccountPayable> {
    let description = validate_description(&input.description)?;
    validate_positive_amount("amount", input.amount_cents)?;
    let due_date = validate_date_present("dueDate", input.due_date)?;

    Ok(AccountPayable {
        id: new_id(),
        tenant_id: tenant_id.to_string(),
        description: description.to_string(),
        supplier_id: input.supplier_id.clone(),
        category: input.category.clone(),
        amount_cents: input.amount_cents,
        paid_amount_cents: 0,
        due_date,
        status: PayableStatus::Pending,
        notes: input.notes.clone(),
        created_at: now,
        updated_at: now,
    })
}

// =============================================================================
// Payments
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PayablePaymentInput {
    pub account_payable_id: String,
    pub amount_cents: i64,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
    pub method: PaymentMethod,
    pub bank_account_id: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<String>,
}

/// What `register_payment` commits in one unit.
///
/// `expected_paid_amount_cents` is the paid amount the plan was computed
/// against; the store only applies the plan if it still holds.
#[derive(Debug, Clone, PartialEq)]
pub struct PayablePayment {
    pub account_payable_id: String,
    pub expected_paid_amount_cents: i64,
    pub new_paid_amount_cents: i64,
    pub new_status: PayableStatus,
    pub payment: AccountPayablePayment,
    pub cash_movement: CashMovement,
    pub updated_at: DateTime<Utc>,
}

/// Field checks done before the account is looked up.
pub fn validate_payment(input: &PayablePaymentInput) -> CoreResult<DateTime<Utc>> {
    validate_required("accountPayableId", &input.account_payable_id)?;
    validate_positive_amount("amount", input.amount_cents)?;
    let paid_at = validate_date_present("paidAt", input.paid_at)?;
    if input.method.is_wallet() {
        return Err(ValidationError::InvalidFormat {
            field: "method".to_string(),
            reason: format!("'{}' does not move cash", input.method),
        }
        .into());
    }
    Ok(paid_at)
}

pub fn exceeds_remaining_message(amount: Money, remaining: Money) -> String {
    format!(
        "Payment amount ({}) exceeds remaining balance ({})",
        amount, remaining
    )
}

pub fn plan_payment(
    account: &AccountPayable,
    input: &PayablePaymentInput,
    cash_register_id: Option<&str>,
    now: DateTime<Utc>,
) -> CoreResult<PayablePayment> {
    let paid_at = validate_payment(input)?;

    match account.status {
        PayableStatus::Cancelled => {
            return Err(CoreError::conflict(format!(
                "Account payable {} is cancelled and cannot be paid",
                account.id
            )))
        }
        PayableStatus::Paid => {
            return Err(CoreError::conflict(format!(
                "Account payable {} is already paid",
                account.id
            )))
        }
        _ => {}
    }

    let amount = Money::from_cents(input.amount_cents);
    let remaining = account.remaining();
    if amount > remaining {
        return Err(CoreError::rule(exceeds_remaining_message(amount, remaining)));
    }

    let new_paid = account.paid_amount() + amount;

    let cash_movement = CashMovement {
        id: new_id(),
        tenant_id: account.tenant_id.clone(),
        movement_type: MovementType::Out,
        amount_cents: amount.cents(),
        method: input.method,
        source_type: CashSource::Purchase,
        source_id: Some(account.id.clone()),
        bank_account_id: input.bank_account_id.clone(),
        cash_register_id: cash_register_id.map(str::to_string),
        description: Some(format!("Payment: {}", account.description)),
        created_by: input.created_by.clone(),
        occurred_at: paid_at,
    };

    let payment = AccountPayablePayment {
        id: new_id(),
        account_payable_id: account.id.clone(),
        amount_cents: amount.cents(),
        paid_at,
        method: input.method,
        bank_account_id: input.bank_account_id.clone(),
        cash_movement_id: cash_movement.id.clone(),
        notes: input.notes.clone(),
    };

    Ok(PayablePayment {
        account_payable_id: account.id.clone(),
        expected_paid_amount_cents: account.paid_amount_cents,
        new_paid_amount_cents: new_paid.cents(),
        new_status: stored_status_for(account.amount_cents, new_paid.cents()),
        payment,
        cash_movement,
        updated_at: now,
    })
}

// =============================================================================
// Cancel
// =============================================================================

pub fn ensure_cancelable(account: &AccountPayable) -> CoreResult<()> {
    match account.status {
        PayableStatus::Paid => Err(CoreError::conflict(format!(
            "Account payable {} is paid and cannot be cancelled",
            account.id
        ))),
        PayableStatus::Cancelled => Err(CoreError::conflict(format!(
            "Account payable {} is already cancelled",
            account.id
        ))),
        _ => Ok(()),
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Listing filter; `status` is compared against the derived status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PayableFilter {
    pub status: Option<PayableStatus>,
    pub supplier_id: Option<String>,
    pub category: Option<String>,
    #[ts(as = "Option<String>")]
    pub due_from: Option<NaiveDate>,
    #[ts(as = "Option<String>")]
    pub due_to: Option<NaiveDate>,
}

impl PayableFilter {
    pub fn validate(&self) -> CoreResult<()> {
        validate_date_range(self.due_from, self.due_to)?;
        Ok(())
    }

    /// Store-side part of the filter (everything but status).
    pub fn matches_stored(&self, account: &AccountPayable) -> bool {
        self.supplier_id
            .as_deref()
            .map_or(true, |s| account.supplier_id.as_deref() == Some(s))
            && self
                .category
                .as_deref()
                .map_or(true, |c| account.category.as_deref() == Some(c))
            && self.due_from.map_or(true, |from| account.due_date >= from)
            && self.due_to.map_or(true, |to| account.due_date <= to)
    }

    /// Status part, applied after derivation.
    pub fn matches_status(&self, derived: PayableStatus) -> bool {
        self.status.map_or(true, |s| s == derived)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PayablesSummary {
    /// Remaining balance of every PENDING account.
    pub total_pending_cents: i64,
    pub pending_count: i64,
    /// Remaining balance of every PARTIAL account.
    pub total_partial_cents: i64,
    pub partial_count: i64,
    /// Remaining balance of every OVERDUE account.
    pub total_overdue_cents: i64,
    pub overdue_count: i64,
    /// Amount of every PAID account.
    pub total_paid_cents: i64,
    pub paid_count: i64,
    /// Remaining balance of open accounts due in `[today, today + 7]`.
    pub total_due_in_7_days_cents: i64,
    pub due_in_7_days_count: i64,
}

/// Summary by derived status. Cancelled accounts are left out.
pub fn summarize(accounts: &[AccountPayable], today: NaiveDate) -> PayablesSummary {
    let week = today + Duration::days(7);

    accounts
        .iter()
        .fold(PayablesSummary::default(), |mut acc, account| {
            let remaining = account.remaining().cents();
            let status = derive_status(account, today);
            match status {
                PayableStatus::Pending => {
                    acc.total_pending_cents += remaining;
                    acc.pending_count += 1;
                }
                PayableStatus::Partial => {
                    acc.total_partial_cents += remaining;
                    acc.partial_count += 1;
                }
                PayableStatus::Overdue => {
                    acc.total_overdue_cents += remaining;
                    acc.overdue_count += 1;
                }
                PayableStatus::Paid => {
                    acc.total_paid_cents += account.amount_cents;
                    acc.paid_count += 1;
                }
                PayableStatus::Cancelled => {}
            }

            if !status.is_settled() && account.due_date >= today && account.due_date <= week {
                acc.total_due_in_7_days_cents += remaining;
                acc.due_in_7_days_count += 1;
            }
            acc
        })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    fn account(amount: i64, due: NaiveDate) -> AccountPayable {
        build_account(
            "t",
            &CreatePayableInput {
                description: "Aluguel".into(),
                amount_cents: amount,
                due_date: Some(due),
                supplier_id: None,
                category: Some("rent".into()),
                notes: None,
            },
            Utc::now(),
        )
        .unwrap()
    }

    fn pay(id: &str, amount: i64) -> PayablePaymentInput {
        PayablePaymentInput {
            account_payable_id: id.into(),
            amount_cents: amount,
            paid_at: Some(Utc::now()),
            method: PaymentMethod::Pix,
            bank_account_id: None,
            notes: None,
            created_by: None,
        }
    }

    #[test]
    fn test_create_validation() {
        let mut input = CreatePayableInput {
            description: "Luz".into(),
            amount_cents: 100,
            due_date: None,
            supplier_id: None,
            category: None,
            notes: None,
        };
        assert!(build_account("t", &input, Utc::now()).is_err());

        input.due_date = Some(date(3, 1));
        input.amount_cents = 0;
        assert!(build_account("t", &input, Utc::now()).is_err());

        input.amount_cents = 100;
        input.description = " ".into();
        assert!(build_account("t", &input, Utc::now()).is_err());
    }

    #[test]
    fn test_partial_then_full() {
        let mut acc = account(10000, date(3, 31));
        let plan = plan_payment(&acc, &pay(&acc.id, 3000), None, Utc::now()).unwrap();
        assert_eq!(plan.new_paid_amount_cents, 3000);
        assert_eq!(plan.new_status, PayableStatus::Partial);
        assert_eq!(plan.cash_movement.movement_type, MovementType::Out);
        assert_eq!(plan.cash_movement.source_type, CashSource::Purchase);
        assert_eq!(plan.payment.cash_movement_id, plan.cash_movement.id);

        acc.paid_amount_cents = plan.new_paid_amount_cents;
        acc.status = plan.new_status;
        let plan = plan_payment(&acc, &pay(&acc.id, 7000), None, Utc::now()).unwrap();
        assert_eq!(plan.new_status, PayableStatus::Paid);
        assert_eq!(plan.expected_paid_amount_cents, 3000);
    }

    #[test]
    fn test_overpayment_message() {
        let mut acc = account(5000, date(3, 31));
        acc.paid_amount_cents = 3000;
        acc.status = PayableStatus::Partial;

        let err = plan_payment(&acc, &pay(&acc.id, 3000), None, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::BusinessRule(_)));
        assert_eq!(
            err.to_string(),
            "Payment amount (30) exceeds remaining balance (20)"
        );
    }

    #[test]
    fn test_payment_requires_date_and_amount() {
        let acc = account(5000, date(3, 31));
        let mut input = pay(&acc.id, 1000);
        input.paid_at = None;
        assert!(matches!(
            plan_payment(&acc, &input, None, Utc::now()).unwrap_err(),
            CoreError::Validation(_)
        ));

        let input = pay(&acc.id, 0);
        assert!(plan_payment(&acc, &input, None, Utc::now()).is_err());
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let mut acc = account(5000, date(3, 31));
        assert!(ensure_cancelable(&acc).is_ok());

        acc.status = PayableStatus::Cancelled;
        assert!(ensure_cancelable(&acc).is_err());
        assert!(plan_payment(&acc, &pay(&acc.id, 100), None, Utc::now()).is_err());

        acc.status = PayableStatus::Paid;
        assert!(ensure_cancelable(&acc).is_err());
    }

    #[test]
    fn test_derive_status() {
        let today = date(3, 10);
        let mut acc = account(5000, date(3, 5));
        assert_eq!(derive_status(&acc, today), PayableStatus::Overdue);

        acc.paid_amount_cents = 2000;
        acc.status = PayableStatus::Partial;
        assert_eq!(derive_status(&acc, today), PayableStatus::Overdue);

        acc.due_date = date(3, 20);
        assert_eq!(derive_status(&acc, today), PayableStatus::Partial);

        acc.paid_amount_cents = 5000;
        acc.due_date = date(3, 1);
        assert_eq!(derive_status(&acc, today), PayableStatus::Paid);

        acc.status = PayableStatus::Cancelled;
        assert_eq!(derive_status(&acc, today), PayableStatus::Cancelled);
    }

    #[test]
    fn test_summary() {
        let today = date(3, 10);
        let overdue = account(1000, date(3, 1));
        let soon = account(2000, date(3, 12));
        let mut partial = account(3000, date(4, 30));
        partial.paid_amount_cents = 1000;
        partial.status = PayableStatus::Partial;
        let mut paid = account(4000, date(3, 1));
        paid.paid_amount_cents = 4000;
        paid.status = PayableStatus::Paid;
        let mut cancelled = account(9999, date(3, 11));
        cancelled.status = PayableStatus::Cancelled;

        let summary = summarize(&[overdue, soon, partial, paid, cancelled], today);
        assert_eq!(summary.overdue_count, 1);
        assert_eq!(summary.total_overdue_cents, 1000);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.partial_count, 1);
        assert_eq!(summary.total_partial_cents, 2000);
        assert_eq!(summary.paid_count, 1);
        assert_eq!(summary.total_paid_cents, 4000);
        assert_eq!(summary.due_in_7_days_count, 1);
        assert_eq!(summary.total_due_in_7_days_cents, 2000);
    }
}
