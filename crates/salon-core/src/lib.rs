//! # salon-core: Settlement and Ledger Rules for Salon Ledger
//!
//! This crate holds every financial rule of the salon back office as pure
//! functions, plus the storage ports that adapters implement.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Salon Ledger Architecture                        │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 salon-services (use cases)                      │   │
//! │  │   pay sale ─ register receipt ─ pay account ─ close register   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ plans + ports                          │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ salon-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   settlement   ledger   wallet   receivables   payables         │   │
//! │  │   register     stock    money    validation    ports            │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • PLANS ARE COMMITTED BY ADAPTERS        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ impl ports                             │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                salon-db (SQLite / in-memory)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Sale, CashMovement, AccountPayable, ...)
//! - [`money`] - Integer-cent money
//! - [`error`] - `CoreError` with one discriminant per failure kind
//! - [`validation`] - Field rules shared by every use case
//! - [`settlement`] - Sale pay / refund / cancel planning
//! - [`ledger`] - Cash movement filters and aggregates
//! - [`wallet`] - Client credit wallet
//! - [`receivables`] - Installment plans and receipts
//! - [`payables`] - Accounts payable, partial payments, derived status
//! - [`register`] - Cash-register sessions
//! - [`stock`] - Stock movements and purchases
//! - [`ports`] - Async repository traits
//!
//! ## Example Usage
//!
//! ```rust
//! use salon_core::money::Money;
//!
//! let remaining = Money::from_cents(10000) - Money::from_cents(3000);
//! assert_eq!(remaining.to_string(), "70");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod payables;
pub mod ports;
pub mod receivables;
pub mod register;
pub mod settlement;
pub mod stock;
pub mod types;
pub mod validation;
pub mod wallet;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ErrorKind, ValidationError};
pub use money::Money;
pub use settlement::PaymentSumRule;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used when the configuration does not name one.
///
/// The schema carries `tenant_id` on every financial fact; runtime is
/// single-tenant.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Maximum quantity of a single sale line or purchase line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Ceiling for any single amount a caller supplies (1 billion units).
/// Sums of bounded amounts stay far inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;
