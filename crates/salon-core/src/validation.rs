//! # Validation Module
//!
//! Input validation utilities for the settlement core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Caller (form / server action)                                │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Use case                                                     │
//! │  └── THIS MODULE: field rules, raised before any store access          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Store                                                        │
//! │  ├── CHECK (amount > 0), NOT NULL                                      │
//! │  └── UNIQUE (one OPEN register, installment numbers per sale)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use salon_core::validation::{validate_positive_amount, validate_required};
//!
//! validate_required("description", "Rent").unwrap();
//! assert!(validate_positive_amount("amount", 0).is_err());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates that a text field is present after trimming.
///
/// ## Returns
/// The trimmed value.
pub fn validate_required<'a>(field: &str, value: &'a str) -> ValidationResult<&'a str> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Ok(value)
}

/// Validates a free-text description (required, at most 200 characters).
pub fn validate_description(value: &str) -> ValidationResult<&str> {
    let value = validate_required("description", value)?;

    if value.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: 200,
        });
    }

    Ok(value)
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an amount in cents that must be strictly positive and at most
/// [`MAX_AMOUNT_CENTS`].
///
/// ```rust
/// use salon_core::validation::validate_positive_amount;
///
/// assert!(validate_positive_amount("amount", 1).is_ok());
/// assert!(validate_positive_amount("amount", 0).is_err());
/// assert!(validate_positive_amount("amount", -100).is_err());
/// assert!(validate_positive_amount("amount", i64::MAX).is_err());
/// ```
pub fn validate_positive_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    validate_amount_ceiling(field, cents)
}

/// Validates an amount in cents that may be zero (opening balance, unit price
/// of a courtesy service, change).
pub fn validate_non_negative_amount(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    validate_amount_ceiling(field, cents)
}

fn validate_amount_ceiling(field: &str, cents: i64) -> ValidationResult<()> {
    if cents > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Date Validators
// =============================================================================

/// Validates that an optional date was supplied.
pub fn validate_date_present<T: Copy>(field: &str, value: Option<T>) -> ValidationResult<T> {
    value.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })
}

/// Validates an inclusive date range; either bound may be open.
pub fn validate_date_range(from: Option<NaiveDate>, to: Option<NaiveDate>) -> ValidationResult<()> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(ValidationError::InvalidFormat {
                field: "dateRange".to_string(),
                reason: format!("start {} is after end {}", from, to),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Identifiers
// =============================================================================

/// Generates a new entity ID.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_required() {
        assert_eq!(validate_required("openedBy", "  ana ").unwrap(), "ana");
        assert!(validate_required("openedBy", "").is_err());
        assert!(validate_required("openedBy", "   ").is_err());
    }

    #[test]
    fn test_validate_description() {
        assert!(validate_description("Aluguel março").is_ok());
        assert!(validate_description(" ").is_err());
        assert!(validate_description(&"A".repeat(201)).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_positive_amount("amount", 1).is_ok());
        assert!(validate_positive_amount("amount", 0).is_err());
        assert!(validate_non_negative_amount("initialBalance", 0).is_ok());
        assert!(validate_non_negative_amount("initialBalance", -1).is_err());
    }

    #[test]
    fn test_amount_ceiling() {
        assert!(validate_positive_amount("amount", MAX_AMOUNT_CENTS).is_ok());
        assert!(validate_non_negative_amount("change", MAX_AMOUNT_CENTS).is_ok());

        let err = validate_positive_amount("amount", MAX_AMOUNT_CENTS + 1).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }), "{err:?}");
        assert!(validate_positive_amount("amount", i64::MAX).is_err());
        assert!(validate_non_negative_amount("unitPrice", i64::MAX).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_ITEM_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_ITEM_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_date_range() {
        let a = NaiveDate::from_ymd_opt(2026, 1, 1);
        let b = NaiveDate::from_ymd_opt(2026, 1, 31);
        assert!(validate_date_range(a, b).is_ok());
        assert!(validate_date_range(b, a).is_err());
        assert!(validate_date_range(None, a).is_ok());
    }

    #[test]
    fn test_validate_date_present() {
        assert!(validate_date_present::<NaiveDate>("dueDate", None).is_err());
        let d = NaiveDate::from_ymd_opt(2026, 1, 1);
        assert_eq!(validate_date_present("dueDate", d).unwrap(), d.unwrap());
    }

    #[test]
    fn test_new_id_is_uuid() {
        let id = new_id();
        assert!(uuid::Uuid::parse_str(&id).is_ok());
        assert_ne!(id, new_id());
    }
}
