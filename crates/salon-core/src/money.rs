//! # Money
//!
//! Every amount in the ledger is an `i64` count of centavos. Entities store
//! the raw `*_cents` column; rules that add, compare or print amounts wrap
//! them in [`Money`].
//!
//! ```text
//! payable 100.00 paid as 33.33 + 33.33 + 33.34
//!   f64:   99.99999999999999  → never equals 100.00, stuck in PARTIAL
//!   cents: 3333 + 3333 + 3334 = 10000 → PAID
//! ```
//!
//! ```rust
//! use salon_core::money::Money;
//!
//! let unit = Money::from_cents(4590);
//! assert_eq!(unit.times(2).cents(), 9180);
//! assert_eq!(unit.to_string(), "45.90");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

/// Signed centavos. Negative values show up in balances and register
/// differences, never in stored movement amounts.
///
/// Arithmetic saturates at the `i64` bounds: an overflowing total can never
/// wrap back into a plausible amount.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    #[inline]
    pub const fn zero() -> Self {
        Money::ZERO
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Line total: unit price × quantity.
    #[inline]
    pub const fn times(&self, quantity: i64) -> Self {
        Money(self.0.saturating_mul(quantity))
    }
}

/// Plain decimal used in error reasons: `30`, `20.50`, `-5.50`. Whole amounts
/// drop the fraction; currency symbols and separators belong to the UI.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let (units, centavos) = (self.0.unsigned_abs() / 100, self.0.unsigned_abs() % 100);
        match centavos {
            0 => write!(f, "{sign}{units}"),
            _ => write!(f, "{sign}{units}.{centavos:02}"),
        }
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0.saturating_sub(rhs.0))
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        *self = *self - rhs;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(self.0.saturating_neg())
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, quantity: i64) -> Money {
        self.times(quantity)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}
