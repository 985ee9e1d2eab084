//! # Fiscal Breakdown
//!
//! Splits a tax-inclusive gross amount into net and tax.
//!
//! ## Extraction, Not Addition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Shelf prices already include IVA. The fiscal fields are DERIVED:      │
//! │                                                                         │
//! │     net = floor(gross / 1.19)          (truncate towards the treasury) │
//! │     tax = gross − net                  (remainder, never rounded)      │
//! │                                                                         │
//! │  gross 2000 → net 1680, tax 320                                        │
//! │                                                                         │
//! │  Because tax is the remainder, net + tax == gross for every gross.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The division is done in integers as `gross × 10000 / (10000 + bps)`, which
//! for 1900 bps is exactly `gross / 1.19` with no float drift at the boundary.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::TaxRate;

/// Net/tax split of a tax-inclusive amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FiscalBreakdown {
    pub gross: Money,
    pub net: Money,
    pub tax: Money,
}

impl FiscalBreakdown {
    /// Extracts net and tax from a tax-inclusive gross amount.
    pub fn from_gross(gross: Money, rate: TaxRate) -> Self {
        let divisor = 10_000i128 + rate.bps() as i128;
        let net = (gross.pesos() as i128 * 10_000).div_euclid(divisor) as i64;
        let net = Money::from_pesos(net);

        FiscalBreakdown {
            gross,
            net,
            tax: gross - net,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(gross: i64) -> FiscalBreakdown {
        FiscalBreakdown::from_gross(Money::from_pesos(gross), TaxRate::IVA_CHILE)
    }

    #[test]
    fn test_known_values() {
        let f = split(2000);
        assert_eq!(f.net.pesos(), 1680);
        assert_eq!(f.tax.pesos(), 320);

        let f = split(1190);
        assert_eq!(f.net.pesos(), 1000);
        assert_eq!(f.tax.pesos(), 190);

        let f = split(0);
        assert!(f.net.is_zero());
        assert!(f.tax.is_zero());
    }

    #[test]
    fn test_net_is_floor_of_gross_over_1_19() {
        for gross in [1, 100, 119, 5000, 15_990, 123_457, 9_999_999] {
            let f = split(gross);
            // floor(g / 1.19) == floor(g * 100 / 119)
            assert_eq!(f.net.pesos(), gross * 100 / 119, "gross {}", gross);
        }
    }

    #[test]
    fn test_net_plus_tax_reconstructs_gross() {
        for gross in 0..5_000 {
            let f = split(gross);
            assert_eq!(f.net + f.tax, f.gross);
            assert!(!f.tax.is_negative());
        }
    }

    #[test]
    fn test_zero_rate() {
        let f = FiscalBreakdown::from_gross(Money::from_pesos(1500), TaxRate::zero());
        assert_eq!(f.net.pesos(), 1500);
        assert!(f.tax.is_zero());
    }
}
