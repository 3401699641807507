//! # Domain Types
//!
//! Core domain types used throughout Salon Ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  OWNED                         APPEND-ONLY FACTS (weak references)      │
//! │  ─────                         ──────────────────────────────────       │
//! │  Sale ──owns──► SaleItem       CashMovement   ──► sale / payable id     │
//! │                                StockMovement  ──► product, sale id      │
//! │  SaleInstallment (PENDING →    CreditMovement ──► client id             │
//! │                   RECEIVED)    AccountPayablePayment ──► payable id     │
//! │  AccountPayable                                                         │
//! │  CashRegister (OPEN → CLOSED)                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Monetary fields are integer cents (`*_cents: i64`); accessor methods
//! wrap them in [`Money`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Sale
// =============================================================================

/// The status of a sale.
///
/// ```text
/// open ──pay──► paid ──refund──► refunded
///   │
///   └──cancel──► canceled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    Open,
    Paid,
    Canceled,
    Refunded,
}

impl SaleStatus {
    /// Items can only change while the sale is open.
    pub const fn is_editable(&self) -> bool {
        matches!(self, SaleStatus::Open)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Open => "open",
            SaleStatus::Paid => "paid",
            SaleStatus::Canceled => "canceled",
            SaleStatus::Refunded => "refunded",
        }
    }
}

impl Default for SaleStatus {
    fn default() -> Self {
        SaleStatus::Open
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a sale line sells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// Physical product; deducted from stock on payment.
    Product,
    /// Salon service (haircut, manicure); no stock effect.
    Service,
}

/// A sale and the items it exclusively owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub customer_id: Option<String>,
    #[cfg_attr(feature = "sqlx", sqlx(skip))]
    pub items: Vec<SaleItem>,
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    /// Always `subtotal_cents - discount_cents`.
    pub total_cents: i64,
    pub status: SaleStatus,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Product lines, the only ones that move stock.
    pub fn product_items(&self) -> impl Iterator<Item = &SaleItem> {
        self.items
            .iter()
            .filter(|item| item.item_type == ItemType::Product)
    }
}

/// A line item in a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub item_type: ItemType,
    pub product_id: Option<String>,
    pub service_id: Option<String>,
    pub description: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    /// Always `quantity * unit_price_cents`.
    pub total_price_cents: i64,
}

impl SaleItem {
    #[inline]
    pub fn total_price(&self) -> Money {
        Money::from_cents(self.total_price_cents)
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How money changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Pix,
    DebitCard,
    CreditCard,
    BankTransfer,
    /// Paid from the client's pre-paid credit wallet.
    #[serde(rename = "credit")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "credit"))]
    StoreCredit,
    /// Put on the client's tab, settled later.
    Fiado,
}

impl PaymentMethod {
    /// Wallet methods never touch the cash ledger; they debit the client
    /// wallet instead.
    pub const fn is_wallet(&self) -> bool {
        matches!(self, PaymentMethod::StoreCredit | PaymentMethod::Fiado)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Pix => "pix",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::StoreCredit => "credit",
            PaymentMethod::Fiado => "fiado",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" | "dinheiro" => Ok(PaymentMethod::Cash),
            "pix" => Ok(PaymentMethod::Pix),
            "debit_card" | "debit" => Ok(PaymentMethod::DebitCard),
            "credit_card" => Ok(PaymentMethod::CreditCard),
            "bank_transfer" | "transfer" => Ok(PaymentMethod::BankTransfer),
            "credit" | "store_credit" => Ok(PaymentMethod::StoreCredit),
            "fiado" => Ok(PaymentMethod::Fiado),
            other => Err(crate::error::ValidationError::InvalidFormat {
                field: "method".to_string(),
                reason: format!("unknown payment method '{}'", other),
            }),
        }
    }
}

// =============================================================================
// Cash Movement
// =============================================================================

/// Direction of a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    In,
    Out,
}

/// What produced a cash movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum CashSource {
    Sale,
    Refund,
    Purchase,
    Manual,
}

/// An append-only money movement. Never updated, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CashMovement {
    pub id: String,
    pub tenant_id: String,
    pub movement_type: MovementType,
    /// Always > 0; direction lives in `movement_type`.
    pub amount_cents: i64,
    pub method: PaymentMethod,
    pub source_type: CashSource,
    pub source_id: Option<String>,
    pub bank_account_id: Option<String>,
    pub cash_register_id: Option<String>,
    pub description: Option<String>,
    pub created_by: Option<String>,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
}

impl CashMovement {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Amount with sign applied: IN positive, OUT negative.
    pub fn signed_amount(&self) -> Money {
        match self.movement_type {
            MovementType::In => self.amount(),
            MovementType::Out => -self.amount(),
        }
    }
}

// =============================================================================
// Stock Movement
// =============================================================================

/// Why stock moved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum StockReason {
    Purchase,
    Sale,
    Refund,
    Adjustment,
}

/// Entity a stock movement points back to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Purchase,
    Sale,
}

/// An append-only inventory delta.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct StockMovement {
    pub id: String,
    pub tenant_id: String,
    pub product_id: String,
    pub movement_type: MovementType,
    /// Always > 0; direction lives in `movement_type`.
    pub quantity: i64,
    pub reason: StockReason,
    pub reference_type: Option<ReferenceType>,
    pub reference_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Quantity with sign applied: IN positive, OUT negative.
    pub fn delta(&self) -> i64 {
        match self.movement_type {
            MovementType::In => self.quantity,
            MovementType::Out => -self.quantity,
        }
    }
}

/// A stocked product, reduced to what stock accounting needs.
///
/// `current_stock` is a cache of Σ(movement deltas), maintained by the
/// store in the same unit as every movement insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub sku: Option<String>,
    pub current_stock: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Credit Wallet
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum CreditType {
    Credit,
    Debit,
}

/// One entry of a client's credit wallet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CreditMovement {
    pub id: String,
    pub client_id: String,
    pub movement_type: CreditType,
    pub amount_cents: i64,
    /// Free-form origin: "top_up", "sale", "refund_credit", ...
    pub origin: String,
    pub note: Option<String>,
    pub sale_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl CreditMovement {
    pub fn signed_amount(&self) -> Money {
        match self.movement_type {
            CreditType::Credit => Money::from_cents(self.amount_cents),
            CreditType::Debit => Money::from_cents(-self.amount_cents),
        }
    }
}

/// A salon client, as far as the ledger needs to know.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sale Installments (Receivables)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum InstallmentStatus {
    Pending,
    Received,
}

/// One scheduled payment owed to the business for a sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleInstallment {
    pub id: String,
    pub sale_id: String,
    pub client_id: Option<String>,
    /// 1..N, contiguous per sale.
    pub installment_number: i64,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub status: InstallmentStatus,
    pub received_amount_cents: Option<i64>,
    #[ts(as = "Option<String>")]
    pub received_at: Option<DateTime<Utc>>,
    pub bank_account_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleInstallment {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Overdue is derived: still pending and due before `today`.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status == InstallmentStatus::Pending && self.due_date < today
    }
}

// =============================================================================
// Accounts Payable
// =============================================================================

/// Status of an account payable.
///
/// `Overdue` is never a stored fact: it is re-derived on every read from
/// `due_date` and the amounts. See [`crate::payables::derive_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum PayableStatus {
    Pending,
    Partial,
    Paid,
    Overdue,
    Cancelled,
}

impl PayableStatus {
    /// Settled obligations are never overdue.
    pub const fn is_settled(&self) -> bool {
        matches!(self, PayableStatus::Paid | PayableStatus::Cancelled)
    }
}

/// An obligation owed by the business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AccountPayable {
    pub id: String,
    pub tenant_id: String,
    pub description: String,
    pub supplier_id: Option<String>,
    pub category: Option<String>,
    pub amount_cents: i64,
    /// `0 <= paid_amount_cents <= amount_cents`.
    pub paid_amount_cents: i64,
    #[ts(as = "String")]
    pub due_date: NaiveDate,
    pub status: PayableStatus,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl AccountPayable {
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    #[inline]
    pub fn paid_amount(&self) -> Money {
        Money::from_cents(self.paid_amount_cents)
    }

    /// What is still owed.
    #[inline]
    pub fn remaining(&self) -> Money {
        self.amount() - self.paid_amount()
    }
}

/// One recorded payment against an account payable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct AccountPayablePayment {
    pub id: String,
    pub account_payable_id: String,
    pub amount_cents: i64,
    #[ts(as = "String")]
    pub paid_at: DateTime<Utc>,
    pub method: PaymentMethod,
    pub bank_account_id: Option<String>,
    pub cash_movement_id: String,
    pub notes: Option<String>,
}

// =============================================================================
// Cash Register
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegisterStatus {
    Open,
    Closed,
}

/// A cash-register session. At most one is OPEN system-wide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CashRegister {
    pub id: String,
    pub tenant_id: String,
    pub opened_by: String,
    pub initial_balance_cents: i64,
    pub status: RegisterStatus,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub closed_by: Option<String>,
    /// Counted by the operator at close.
    pub closing_balance_cents: Option<i64>,
    /// `counted - expected`, fixed at close.
    pub difference_cents: Option<i64>,
}

// =============================================================================
// Unit Tests
// =============================================================================
