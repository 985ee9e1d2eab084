//! # Validation Module
//!
//! Input validation for values that reach the engines and repositories.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Presentation (forms, JSON bodies)                             │
//! │  └── Basic format checks, immediate feedback                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                   │
//! │  └── RUT check digit, subdomain slug, quantities, cash, card digits     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                        │
//! │  └── NOT NULL, UNIQUE, CHECK, foreign keys                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use caja_core::validation::{validate_rut, validate_subdomain};
//!
//! assert_eq!(validate_rut("12.345.678-5").unwrap(), "12345678-5");
//! assert!(validate_subdomain("tienda-1").is_ok());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identity Validators
// =============================================================================

/// Validates a Chilean RUT and returns it in canonical `BODY-DV` form.
///
/// Dots, hyphens and spaces are ignored; the check digit is computed with
/// modulo 11 over the reversed body digits with factors `2..=7` cycling.
///
/// ```text
/// 12.345.678-5
///   body 12345678, reversed 8 7 6 5 4 3 2 1
///   factors        2 3 4 5 6 7 2 3
///   sum 138, 138 mod 11 = 6, 11 − 6 = 5   → DV '5'
///   (11 → '0', 10 → 'K')
/// ```
pub fn validate_rut(rut: &str) -> ValidationResult<String> {
    let cleaned: String = rut
        .chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .collect::<String>()
        .to_uppercase();

    if cleaned.is_empty() {
        return Err(ValidationError::Required {
            field: "rut".to_string(),
        });
    }

    let mut chars = cleaned.chars();
    let check = chars.next_back();
    let body = chars.as_str();
    if body.is_empty() {
        return Err(ValidationError::invalid_format("rut", "too short"));
    }
    if !body.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format("rut", "body must be numeric"));
    }

    let expected = rut_check_digit(body);
    if check != Some(expected) {
        return Err(ValidationError::invalid_format("rut", "check digit does not match"));
    }

    Ok(format!("{}-{}", body, expected))
}

fn rut_check_digit(body: &str) -> char {
    let sum: u32 = body
        .bytes()
        .rev()
        .map(|b| (b - b'0') as u32)
        .zip([2u32, 3, 4, 5, 6, 7].iter().cycle())
        .map(|(digit, factor)| digit * factor)
        .sum();

    match 11 - (sum % 11) {
        11 => '0',
        10 => 'K',
        n => char::from(b'0' + n as u8),
    }
}

/// Validates a tenant subdomain slug.
///
/// ## Rules
/// - 1 to 63 characters
/// - lowercase ASCII letters, digits and hyphens
/// - no leading or trailing hyphen
pub fn validate_subdomain(subdomain: &str) -> ValidationResult<()> {
    if subdomain.is_empty() {
        return Err(ValidationError::Required {
            field: "subdomain".to_string(),
        });
    }
    if subdomain.len() > 63 {
        return Err(ValidationError::TooLong {
            field: "subdomain".to_string(),
            max: 63,
        });
    }
    if !subdomain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(ValidationError::invalid_format(
            "subdomain",
            "must contain only lowercase letters, numbers and hyphens",
        ));
    }
    if subdomain.starts_with('-') || subdomain.ends_with('-') {
        return Err(ValidationError::invalid_format(
            "subdomain",
            "must not start or end with a hyphen",
        ));
    }

    Ok(())
}

/// Validates a SKU.
///
/// ## Rules
/// - 1 to 50 characters
/// - letters, numbers, hyphens and underscores
pub fn validate_sku(sku: &str) -> ValidationResult<()> {
    let sku = sku.trim();

    if sku.is_empty() {
        return Err(ValidationError::Required {
            field: "sku".to_string(),
        });
    }
    if sku.len() > 50 {
        return Err(ValidationError::TooLong {
            field: "sku".to_string(),
            max: 50,
        });
    }
    if !sku.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
        return Err(ValidationError::invalid_format(
            "sku",
            "must contain only letters, numbers, hyphens, and underscores",
        ));
    }

    Ok(())
}

/// Validates a display name (tenant, branch, register, product).
pub fn validate_name(field: &str, name: &str, max: usize) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }
    if name.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale or stock-movement quantity: strictly positive.
///
/// The three-decimal limit is already enforced by [`Quantity`] parsing.
pub fn validate_quantity(qty: Quantity) -> ValidationResult<()> {
    if !qty.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a counted cash amount (opening or closing cash).
///
/// Zero is allowed: a till may start empty.
pub fn validate_cash_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a price or cost. Zero is allowed.
pub fn validate_price(field: &str, price: Money) -> ValidationResult<()> {
    validate_cash_amount(field, price)
}

/// Validates a tax rate in basis points (0% to 100%).
pub fn validate_tax_rate_bps(bps: u32) -> ValidationResult<()> {
    if bps > 10000 {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: 10000,
        });
    }

    Ok(())
}

// =============================================================================
// Payment Validators
// =============================================================================

/// Validates the last four digits of a card.
pub fn validate_card_last_4(digits: &str) -> ValidationResult<()> {
    if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::invalid_format(
            "card_last_4",
            "must be exactly 4 digits",
        ));
    }

    Ok(())
}

/// Validates a terminal/bank operation number.
pub fn validate_transaction_id(id: &str) -> ValidationResult<()> {
    if id.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "transaction_id".to_string(),
            max: 100,
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id)
        .map_err(|_| ValidationError::invalid_format("id", "must be a valid UUID"))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
