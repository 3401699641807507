//! # Error Types
//!
//! Domain-specific error types for salon-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  salon-core errors (this file)                                         │
//! │  ├── CoreError        - One discriminant per failure kind              │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  salon-db errors (separate crate)                                      │
//! │  └── DbError          - Database failures, converted into CoreError    │
//! │                                                                         │
//! │  salon-services                                                        │
//! │  └── Envelope         - { success, data | error{code, message} }       │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ← DbError;  CoreError → Envelope    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every use case fails with exactly one `CoreError`. The boundary reads
//! [`CoreError::kind`] for the discriminant and `to_string()` for the reason;
//! it never has to inspect variant internals.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;

// =============================================================================
// Core Error
// =============================================================================

/// Settlement and ledger errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Malformed or out-of-range input (blank name, non-positive amount,
    /// missing date).
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The operation is not allowed in the entity's current status.
    ///
    /// ## When This Occurs
    /// - Paying a sale that is already paid
    /// - Receiving an installment twice
    /// - Opening a register while another one is open
    #[error("{0}")]
    StateConflict(String),

    /// A domain constraint rejected the operation.
    ///
    /// ## When This Occurs
    /// - Payment exceeds the remaining balance of an account payable
    /// - Installment numbers are not `1..N`
    /// - Wallet balance is insufficient for a debit
    #[error("{0}")]
    BusinessRule(String),

    /// The persistence adapter failed for reasons unrelated to the domain.
    #[error("Storage failure: {0}")]
    Storage(String),
}

impl CoreError {
        pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        CoreError::StateConflict(reason.into())
    }

    pub fn rule(reason: impl Into<String>) -> Self {
        CoreError::BusinessRule(reason.into())
    }

    pub fn storage(reason: impl Into<String>) -> Self {
        CoreError::Storage(reason.into())
    }

    /// Returns the machine-readable discriminant for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Validation(_) => ErrorKind::ValidationError,
            CoreError::NotFound { .. } => ErrorKind::NotFound,
            CoreError::StateConflict(_) => ErrorKind::StateConflict,
            CoreError::BusinessRule(_) => ErrorKind::BusinessRuleViolation,
            CoreError::Storage(_) => ErrorKind::StorageError,
        }
    }
}

/// Error discriminant exposed to callers.
///
/// ```json
/// { "code": "STATE_CONFLICT", "message": "Sale is already paid" }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    StateConflict,
    BusinessRuleViolation,
    StorageError,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when input doesn't meet requirements and are raised
/// before any store is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or blank.
    #[error("{field} is required")]
    Required { field: String },

    /// Names and descriptions are capped before they reach the store.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Quantities above the per-line ceiling.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must be zero or greater.
    #[error("{field} cannot be negative")]
    MustNotBeNegative { field: String },

    /// Well-typed but unusable: installment numbering gaps, an inverted
    /// date range, a payment method the operation does not accept.
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Collection must contain at least one element.
    #[error("{field} must not be empty")]
    Empty { field: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
