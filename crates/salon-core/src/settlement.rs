//! # Sale Settlement Rules
//!
//! Pure planning for the sale lifecycle. Nothing here writes: every function
//! either rejects the request with a [`CoreError`] or returns the exact set of
//! facts that the store must commit **together**.
//!
//! ## Settlement Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  pay(sale, payments)                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  plan_payment() ← THIS MODULE                                          │
//! │       │                                                                 │
//! │       ├── status != open?         → StateConflict                       │
//! │       ├── payment-sum rule fails? → BusinessRule                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PaymentSettlement                                                      │
//! │  ├── sale: open → paid                                                  │
//! │  ├── one cash IN per non-wallet payment line                            │
//! │  ├── one stock OUT per product line                                     │
//! │  └── one wallet DEBIT for Σ(credit + fiado) lines                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SaleRepository::pay() ← single transaction in the adapter              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{
    CashMovement, CashSource, CreditMovement, CreditType, ItemType, MovementType, PaymentMethod,
    ReferenceType, Sale, SaleItem, SaleStatus, StockMovement, StockReason,
};
use crate::validation::{
    new_id, validate_non_negative_amount, validate_positive_amount, validate_quantity,
    validate_required,
};
use crate::MAX_AMOUNT_CENTS;

// =============================================================================
// Payment-Sum Rule
// =============================================================================

/// How strictly `pay` compares the payment lines with the sale total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentSumRule {
    /// Σ(payments) − change must equal the sale total.
    #[default]
    Strict,
    /// Σ(payments) − change may be lower than the total, never higher.
    AllowPartial,
    /// No comparison; the caller is trusted.
    TrustCaller,
}

impl std::fmt::Display for PaymentSumRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentSumRule::Strict => write!(f, "strict"),
            PaymentSumRule::AllowPartial => write!(f, "allow_partial"),
            PaymentSumRule::TrustCaller => write!(f, "trust_caller"),
        }
    }
}

impl std::str::FromStr for PaymentSumRule {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(PaymentSumRule::Strict),
            "allow_partial" | "partial" => Ok(PaymentSumRule::AllowPartial),
            "trust_caller" | "none" => Ok(PaymentSumRule::TrustCaller),
            other => Err(ValidationError::InvalidFormat {
                field: "payment_sum_rule".to_string(),
                reason: format!(
                    "unknown rule '{}'; valid options: strict, allow_partial, trust_caller",
                    other
                ),
            }),
        }
    }
}

// =============================================================================
// Inputs
// =============================================================================

/// A line to put on a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct NewSaleItem {
    pub item_type: ItemType,
    pub product_id: Option<String>,
    pub service_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreateSaleInput {
    pub customer_id: Option<String>,
    pub items: Vec<NewSaleItem>,
    #[serde(default)]
    pub discount_cents: i64,
    pub created_by: Option<String>,
}

/// One tender line of a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLine {
    pub method: PaymentMethod,
    pub amount_cents: i64,
    /// Change handed back on this line (cash only, in practice).
    pub change_cents: Option<i64>,
    pub bank_account_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct PaySaleInput {
    pub sale_id: String,
    pub payments: Vec<PaymentLine>,
    pub created_by: Option<String>,
}

// =============================================================================
// Settlement Plans
// =============================================================================

/// Everything `pay` commits in one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentSettlement {
    pub sale_id: String,
    pub paid_at: DateTime<Utc>,
    pub cash_movements: Vec<CashMovement>,
    pub stock_movements: Vec<StockMovement>,
    pub wallet_debit: Option<CreditMovement>,
    pub change_cents: i64,
}

/// Everything `refund` commits in one unit.
#[derive(Debug, Clone, PartialEq)]
pub struct RefundSettlement {
    pub sale_id: String,
    pub refunded_at: DateTime<Utc>,
    pub stock_movements: Vec<StockMovement>,
}

// =============================================================================
// Sale Construction
// =============================================================================

/// Validates and materialises sale lines.
///
/// ## Rules
/// - quantity in `1..=MAX_ITEM_QUANTITY`
/// - unit price >= 0 (courtesy services are free)
/// - product lines must name their product
/// - `total_price = quantity * unit_price`
pub fn build_items(sale_id: &str, items: &[NewSaleItem]) -> CoreResult<Vec<SaleItem>> {
    if items.is_empty() {
        return Err(ValidationError::Empty {
            field: "items".to_string(),
        }
        .into());
    }

    items
        .iter()
        .map(|item| -> CoreResult<SaleItem> {
            validate_quantity(item.quantity)?;
            validate_non_negative_amount("unitPrice", item.unit_price_cents)?;
            validate_required("description", &item.description)?;

            let product_id = match item.item_type {
                ItemType::Product => Some(
                    item.product_id
                        .as_deref()
                        .map(|id| validate_required("productId", id).map(str::to_string))
                        .transpose()?
                        .ok_or_else(|| ValidationError::Required {
                            field: "productId".to_string(),
                        })?,
                ),
                ItemType::Service => item.product_id.clone(),
            };

            Ok(SaleItem {
                id: new_id(),
                sale_id: sale_id.to_string(),
                item_type: item.item_type,
                product_id,
                service_id: item.service_id.clone(),
                description: item.description.trim().to_string(),
                quantity: item.quantity,
                unit_price_cents: item.unit_price_cents,
                total_price_cents: Money::from_cents(item.unit_price_cents)
                    .times(item.quantity)
                    .cents(),
            })
        })
        .collect()
}

/// `subtotal = Σ(qty * unit_price)`, `total = subtotal - discount`.
pub fn compute_totals(items: &[SaleItem], discount_cents: i64) -> CoreResult<(i64, i64)> {
    validate_non_negative_amount("discount", discount_cents)?;

    let subtotal: Money = items.iter().map(SaleItem::total_price).sum();
    if subtotal.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: "subtotal".to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        }
        .into());
    }
    let discount = Money::from_cents(discount_cents);

    if discount > subtotal {
        return Err(CoreError::rule(format!(
            "Discount ({}) exceeds subtotal ({})",
            discount, subtotal
        )));
    }

    Ok((subtotal.cents(), (subtotal - discount).cents()))
}

/// Builds a new open sale.
pub fn new_sale(tenant_id: &str, input: &CreateSaleInput, now: DateTime<Utc>) -> CoreResult<Sale> {
    let id = new_id();
    let items = build_items(&id, &input.items)?;
    let (subtotal_cents, total_cents) = compute_totals(&items, input.discount_cents)?;

    Ok(Sale {
        id,
        tenant_id: tenant_id.to_string(),
        customer_id: input.customer_id.clone(),
        items,
        subtotal_cents,
        discount_cents: input.discount_cents,
        total_cents,
        status: SaleStatus::Open,
        created_by: input.created_by.clone(),
        created_at: now,
        updated_at: now,
        paid_at: None,
    })
}

/// Replaces every item of an open sale and recomputes its totals.
///
/// This is a full overwrite, not a merge. The discount is kept.
pub fn replace_items(sale: &mut Sale, items: &[NewSaleItem], now: DateTime<Utc>) -> CoreResult<()> {
    ensure_editable(sale)?;

    let items = build_items(&sale.id, items)?;
    let (subtotal_cents, total_cents) = compute_totals(&items, sale.discount_cents)?;

    sale.items = items;
    sale.subtotal_cents = subtotal_cents;
    sale.total_cents = total_cents;
    sale.updated_at = now;
    Ok(())
}

/// Items are frozen once a sale is paid, refunded or canceled.
pub fn ensure_editable(sale: &Sale) -> CoreResult<()> {
    if !sale.status.is_editable() {
        return Err(CoreError::conflict(format!(
            "Sale {} is {} and its items can no longer be changed",
            sale.id, sale.status
        )));
    }
    Ok(())
}

// =============================================================================
// Pay
// =============================================================================

/// Plans the settlement of an open sale.
///
/// ## Arguments
/// * `cash_register_id` - open register the cash lines are attributed to
///
/// ## Change
/// The largest `change` among the lines is the change handed back; it is
/// taken off the line that carries it so the ledger records money kept.
pub fn plan_payment(
    sale: &Sale,
    input: &PaySaleInput,
    rule: PaymentSumRule,
    cash_register_id: Option<&str>,
    now: DateTime<Utc>,
) -> CoreResult<PaymentSettlement> {
    match sale.status {
        SaleStatus::Open => {}
        SaleStatus::Paid => {
            return Err(CoreError::conflict(format!(
                "Sale {} has already been paid",
                sale.id
            )))
        }
        SaleStatus::Refunded => {
            return Err(CoreError::conflict(format!(
                "Sale {} has been refunded and cannot be paid",
                sale.id
            )))
        }
        SaleStatus::Canceled => {
            return Err(CoreError::conflict(format!(
                "Sale {} is canceled and cannot be paid",
                sale.id
            )))
        }
    }

    if input.payments.is_empty() {
        return Err(ValidationError::Empty {
            field: "payments".to_string(),
        }
        .into());
    }

    for line in &input.payments {
        validate_positive_amount("payment amount", line.amount_cents)?;
        if let Some(change) = line.change_cents {
            validate_non_negative_amount("change", change)?;
            // Change leaves the drawer, so only a cash-ledger line can carry it.
            if change > 0 && line.method.is_wallet() {
                return Err(CoreError::rule(format!(
                    "Change ({}) cannot be given on a '{}' payment",
                    Money::from_cents(change),
                    line.method
                )));
            }
        }
    }

    // Index of the line carrying the (max) change.
    let change_line = input
        .payments
        .iter()
        .enumerate()
        .filter_map(|(idx, line)| line.change_cents.map(|c| (idx, c)))
        .max_by_key(|(_, change)| *change);
    let change = Money::from_cents(change_line.map(|(_, c)| c).unwrap_or(0));

    if let Some((idx, c)) = change_line {
        if c >= input.payments[idx].amount_cents {
            return Err(CoreError::rule(format!(
                "Change ({}) must be lower than the payment it is given on ({})",
                Money::from_cents(c),
                Money::from_cents(input.payments[idx].amount_cents)
            )));
        }
    }

    let gross: Money = input
        .payments
        .iter()
        .map(|line| Money::from_cents(line.amount_cents))
        .sum();
    check_payment_sum(rule, gross - change, sale.total())?;

    let wallet_total: Money = input
        .payments
        .iter()
        .filter(|line| line.method.is_wallet())
        .map(|line| Money::from_cents(line.amount_cents))
        .sum();

    let wallet_debit = if wallet_total.is_positive() {
        let client_id = sale.customer_id.clone().ok_or_else(|| {
            CoreError::rule("Wallet payments (credit/fiado) require a sale with a customer")
        })?;
        Some(CreditMovement {
            id: new_id(),
            client_id,
            movement_type: CreditType::Debit,
            amount_cents: wallet_total.cents(),
            origin: "sale".to_string(),
            note: None,
            sale_id: Some(sale.id.clone()),
            created_at: now,
        })
    } else {
        None
    };

    let cash_movements = input
        .payments
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.method.is_wallet())
        .map(|(idx, line)| {
            let kept = match change_line {
                Some((change_idx, c)) if change_idx == idx => line.amount_cents - c,
                _ => line.amount_cents,
            };
            CashMovement {
                id: new_id(),
                tenant_id: sale.tenant_id.clone(),
                movement_type: MovementType::In,
                amount_cents: kept,
                method: line.method,
                source_type: CashSource::Sale,
                source_id: Some(sale.id.clone()),
                bank_account_id: line.bank_account_id.clone(),
                cash_register_id: cash_register_id.map(str::to_string),
                description: Some(format!("Sale {}", sale.id)),
                created_by: input.created_by.clone(),
                occurred_at: now,
            }
        })
        .collect();

    let stock_movements = stock_for_products(sale, MovementType::Out, StockReason::Sale, now);

    Ok(PaymentSettlement {
        sale_id: sale.id.clone(),
        paid_at: now,
        cash_movements,
        stock_movements,
        wallet_debit,
        change_cents: change.cents(),
    })
}

fn check_payment_sum(rule: PaymentSumRule, net: Money, total: Money) -> CoreResult<()> {
    match rule {
        PaymentSumRule::Strict if net != total => Err(CoreError::rule(format!(
            "Payments ({}) do not match sale total ({})",
            net, total
        ))),
        PaymentSumRule::AllowPartial if net > total => Err(CoreError::rule(format!(
            "Payments ({}) exceed sale total ({})",
            net, total
        ))),
        _ => Ok(()),
    }
}

fn stock_for_products(
    sale: &Sale,
    movement_type: MovementType,
    reason: StockReason,
    now: DateTime<Utc>,
) -> Vec<StockMovement> {
    sale.product_items()
        .filter_map(|item| {
            item.product_id.as_ref().map(|product_id| StockMovement {
                id: new_id(),
                tenant_id: sale.tenant_id.clone(),
                product_id: product_id.clone(),
                movement_type,
                quantity: item.quantity,
                reason,
                reference_type: Some(ReferenceType::Sale),
                reference_id: Some(sale.id.clone()),
                created_at: now,
            })
        })
        .collect()
}

// =============================================================================
// Refund / Cancel
// =============================================================================

/// Plans the refund of a paid sale: every product line goes back to stock.
///
/// Not idempotent: once refunded, the sale is no longer `paid`.
pub fn plan_refund(sale: &Sale, now: DateTime<Utc>) -> CoreResult<RefundSettlement> {
    match sale.status {
        SaleStatus::Paid => {}
        SaleStatus::Refunded => {
            return Err(CoreError::conflict(format!(
                "Sale {} has already been refunded",
                sale.id
            )))
        }
        other => {
            return Err(CoreError::conflict(format!(
                "Only paid sales can be refunded; sale {} is {}",
                sale.id, other
            )))
        }
    }

    Ok(RefundSettlement {
        sale_id: sale.id.clone(),
        refunded_at: now,
        stock_movements: stock_for_products(sale, MovementType::In, StockReason::Refund, now),
    })
}

/// Checks that a sale may be canceled. Nothing was committed for an open
/// sale, so cancel has no stock or cash side effects.
pub fn ensure_cancelable(sale: &Sale) -> CoreResult<()> {
    match sale.status {
        SaleStatus::Open => Ok(()),
        SaleStatus::Paid | SaleStatus::Refunded => Err(CoreError::conflict(format!(
            "Sale {} is {}; use refund instead of cancel",
            sale.id, sale.status
        ))),
        SaleStatus::Canceled => Err(CoreError::conflict(format!(
            "Sale {} is already canceled",
            sale.id
        ))),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
