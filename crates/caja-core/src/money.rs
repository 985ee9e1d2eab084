//! # Money Module
//!
//! Provides the `Money` type for Chilean peso (CLP) amounts.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CLP HAS NO MINOR UNIT                                                  │
//! │                                                                         │
//! │  Prices, totals, cash counts and payments are whole pesos.             │
//! │  Anything fractional (weight based lines) is rounded ONCE, at the      │
//! │  line level, and from then on only integers are added up.             │
//! │                                                                         │
//! │    line_total = round(unit_price × quantity)                           │
//! │    order.total = Σ line_total              (exact integer sum)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caja_core::money::Money;
//! use caja_core::quantity::Quantity;
//!
//! let price = Money::from_pesos(4990);
//! let half_kilo: Quantity = "0.5".parse().unwrap();
//! assert_eq!(price.times(half_kilo).unwrap().pesos(), 2495);
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::quantity::Quantity;

// =============================================================================
// Money Type
// =============================================================================

/// An amount in whole Chilean pesos.
///
/// Signed so that cash differences (shortfall/overage) fit the same type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from whole pesos.
    #[inline]
    pub const fn from_pesos(pesos: i64) -> Self {
        Money(pesos)
    }

    /// Returns the value in whole pesos.
    #[inline]
    pub const fn pesos(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts, failing instead of wrapping.
    ///
    /// Sale totals and till figures go through this; the `+` operator is
    /// for values already known to be small.
    ///
    /// ## Errors
    /// `OutOfRange` naming `field` if the sum does not fit in an `i64`.
    pub fn checked_add(self, other: Money, field: &str) -> Result<Money, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(Money)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: field.to_string(),
                min: i64::MIN,
                max: i64::MAX,
            })
    }

    /// Subtracts `other`, failing instead of wrapping.
    pub fn checked_sub(self, other: Money, field: &str) -> Result<Money, ValidationError> {
        self.0
            .checked_sub(other.0)
            .map(Money)
            .ok_or_else(|| ValidationError::OutOfRange {
                field: field.to_string(),
                min: i64::MIN,
                max: i64::MAX,
            })
    }

    /// Multiplies a unit price by a (possibly fractional) quantity.
    ///
    /// The product is rounded to whole pesos half-to-even, so
    /// `999 × 0.5 = 499.5 → 500` and `997 × 0.5 = 498.5 → 498`.
    ///
    /// ## Errors
    /// `OutOfRange` if the result does not fit in an `i64`.
    pub fn times(&self, quantity: Quantity) -> Result<Money, ValidationError> {
        let overflow = || ValidationError::OutOfRange {
            field: "line total".to_string(),
            min: i64::MIN,
            max: i64::MAX,
        };

        let raw = Decimal::from(self.0)
            .checked_mul(quantity.as_decimal())
            .ok_or_else(overflow)?;

        raw.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_i64()
            .map(Money)
            .ok_or_else(overflow)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Chilean formatting: `$1.500`, `-$500`.
///
/// ## Note
/// For logs and receipts. Localised UI formatting belongs to the frontend.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.0.unsigned_abs().to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push('.');
            }
            grouped.push(ch);
        }

        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}${}", sign, grouped)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
