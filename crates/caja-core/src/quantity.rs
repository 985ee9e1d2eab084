//! # Quantity Module
//!
//! Fractional quantities for stock and order lines.
//!
//! Bulk goods are sold by weight ("0.500" kg of kibble), so a quantity is not
//! an integer. It is stored as an integer number of thousandths, which is the
//! precision the stock column has always had (three decimal places), and is
//! parsed from the decimal strings the cart carries.
//!
//! ```text
//! "2"      → Quantity(2000)
//! "0.5"    → Quantity(500)
//! "1.250"  → Quantity(1250)
//! "0.0001" → error (more than three decimals)
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;

use crate::error::ValidationError;

/// Number of decimal places a quantity keeps.
pub const QUANTITY_SCALE: u32 = 3;

const MILLI: i64 = 1000;

/// A decimal quantity with exactly three decimals of precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Quantity(i64);

impl Quantity {
    /// Creates a quantity from thousandths (the storage representation).
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity of whole units.
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Quantity(units * MILLI)
    }

    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    /// Returns the quantity in thousandths.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Exact decimal value, e.g. `0.500`.
    pub fn as_decimal(&self) -> Decimal {
        Decimal::new(self.0, QUANTITY_SCALE)
    }
}

impl FromStr for Quantity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::Required {
                field: "quantity".to_string(),
            });
        }

        let value = Decimal::from_str(s)
            .map_err(|_| ValidationError::invalid_format("quantity", "must be a decimal number"))?
            .normalize();

        if value.scale() > QUANTITY_SCALE {
            return Err(ValidationError::invalid_format(
                "quantity",
                format!("at most {} decimal places", QUANTITY_SCALE),
            ));
        }

        value
            .checked_mul(Decimal::from(MILLI))
            .and_then(|milli| milli.to_i64())
            .map(Quantity)
            .ok_or(ValidationError::OutOfRange {
                field: "quantity".to_string(),
                min: i64::MIN / MILLI,
                max: i64::MAX / MILLI,
            })
    }
}

impl TryFrom<String> for Quantity {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Quantity> for String {
    fn from(value: Quantity) -> Self {
        value.to_string()
    }
}

/// Shortest exact decimal: `2`, `0.5`, `1.25`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_decimal().normalize())
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl SubAssign for Quantity {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!("2".parse::<Quantity>().unwrap().milli(), 2000);
        assert_eq!("0.5".parse::<Quantity>().unwrap().milli(), 500);
        assert_eq!(" 1.250 ".parse::<Quantity>().unwrap().milli(), 1250);
        assert_eq!("2.000".parse::<Quantity>().unwrap(), Quantity::from_units(2));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("".parse::<Quantity>().is_err());
        assert!("abc".parse::<Quantity>().is_err());
        assert!("0.0001".parse::<Quantity>().is_err());
    }

    #[test]
    fn test_display_is_shortest_form() {
        assert_eq!(Quantity::from_milli(2000).to_string(), "2");
        assert_eq!(Quantity::from_milli(500).to_string(), "0.5");
        assert_eq!(Quantity::from_milli(1250).to_string(), "1.25");
        assert_eq!(Quantity::from_milli(-3000).to_string(), "-3");
    }

    #[test]
    fn test_serde_uses_strings() {
        let q: Quantity = serde_json::from_str("\"0.75\"").unwrap();
        assert_eq!(q.milli(), 750);
        assert_eq!(serde_json::to_string(&q).unwrap(), "\"0.75\"");
    }

    #[test]
    fn test_arithmetic() {
        let mut stock = Quantity::from_units(10);
        stock -= Quantity::from_units(2);
        assert_eq!(stock, Quantity::from_units(8));
        stock += Quantity::from_milli(500);
        assert_eq!(stock.milli(), 8500);
        assert!((-stock).is_negative());
    }
}
