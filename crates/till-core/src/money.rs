//! # Money Module
//!
//! Provides the `Money` type pairing an exact decimal amount with an
//! ISO-4217 currency code.
//!
//! ## Why Exact Decimals?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In floating point:                                                     │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  OUR SOLUTION: arbitrary-precision decimals                             │
//! │    3.50 × 2 = 7.00 exactly, at any scale the store needs                │
//! │                                                                         │
//! │  The kernel performs NO rounding and assumes NO decimal-place count.    │
//! │  A store trading in JPY (0 places) and one trading in BHD (3 places)    │
//! │  flow through the same arithmetic unchanged.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Cross-Currency Safety
//! Adding or subtracting two `Money` values with different currency codes is
//! a domain failure, never a silent coercion:
//! ```rust
//! use till_core::money::Money;
//! use rust_decimal::Decimal;
//!
//! let usd = Money::new(Decimal::new(350, 2), "USD");
//! let eur = Money::new(Decimal::new(100, 2), "EUR");
//! assert!(usd.try_add(&eur).is_err());
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{KernelError, KernelResult};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value: exact decimal amount plus ISO-4217 currency code.
///
/// ## Design Decisions
/// - **Decimal amount**: arbitrary precision, no float drift, no rounding
/// - **Currency carried with the amount**: mixed-currency arithmetic fails
///   at the operation, not at some later display step
/// - **No formatting**: user-facing text is the store formatter's job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount. Sign conventions are owned by the transaction engine
    /// (tender lines are negative, change lines positive).
    pub amount: Decimal,

    /// ISO-4217 currency code, stored verbatim (no normalization).
    pub currency: String,
}

impl Money {
    /// Creates a money value.
    pub fn new(amount: Decimal, currency: impl Into<String>) -> Self {
        Money {
            amount,
            currency: currency.into(),
        }
    }

    /// Zero in the given currency.
    pub fn zero(currency: impl Into<String>) -> Self {
        Money::new(Decimal::ZERO, currency)
    }

    /// Checks if the amount is zero.
    #[inline]
    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Checks if the amount is strictly positive.
    #[inline]
    pub fn is_positive(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Checks if the amount is strictly negative.
    #[inline]
    pub fn is_negative(&self) -> bool {
        self.amount < Decimal::ZERO
    }

    /// Adds another value, failing when the currencies differ.
    pub fn try_add(&self, other: &Money) -> KernelResult<Money> {
        self.require_same_currency(other)?;
        Ok(Money::new(self.amount + other.amount, self.currency.clone()))
    }

    /// Subtracts another value, failing when the currencies differ.
    pub fn try_sub(&self, other: &Money) -> KernelResult<Money> {
        self.require_same_currency(other)?;
        Ok(Money::new(self.amount - other.amount, self.currency.clone()))
    }

    /// Multiplies the amount by a quantity. Currency is preserved, so this
    /// never fails.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::money::Money;
    /// use rust_decimal::Decimal;
    ///
    /// let unit = Money::new(Decimal::new(350, 2), "USD"); // 3.50
    /// assert_eq!(unit.multiply_quantity(2).amount, Decimal::new(700, 2));
    /// ```
    pub fn multiply_quantity(&self, quantity: i64) -> Money {
        Money::new(self.amount * Decimal::from(quantity), self.currency.clone())
    }

    /// Returns the negation of this value.
    pub fn negate(&self) -> Money {
        Money::new(-self.amount, self.currency.clone())
    }

    /// Fails with [`KernelError::CurrencyMismatch`] unless both values share
    /// a currency code. Comparison is exact: the kernel never guesses that
    /// two spellings mean the same currency.
    pub fn require_same_currency(&self, other: &Money) -> KernelResult<()> {
        if self.currency != other.currency {
            return Err(KernelError::CurrencyMismatch {
                left: self.currency.clone(),
                right: other.currency.clone(),
            });
        }
        Ok(())
    }
}

/// Debug-oriented display: `<amount> <code>`. Receipt formatting flows
/// through the store's currency formatter instead.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.currency)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
