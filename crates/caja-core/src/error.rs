//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations (typed, actionable)   │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  caja-db errors (separate crate)                                       │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → presentation layer      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every engine operation is all-or-nothing: whichever of these errors is
//! raised mid-operation, the enclosing transaction is rolled back and the
//! operator is expected to re-prompt (pick another quantity, open a shift).

use thiserror::Error;

use crate::quantity::Quantity;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Operation attempted against a shift that is already closed.
    #[error("Shift {shift_id} is closed, open a new shift")]
    ShiftClosed { shift_id: String },

    /// The register already has an open shift.
    ///
    /// `holder` is the display name of the cashier operating it.
    #[error("Register {register} already has an open shift held by {holder}")]
    ShiftAlreadyOpen { register: String, holder: String },

    /// Requested quantity exceeds available stock.
    ///
    /// ## User Workflow
    /// ```text
    /// Checkout (cart: {dog-food: 5})
    ///      │
    ///      ▼
    /// Check stock: available=2
    ///      │
    ///      ▼
    /// InsufficientStock { product: "Dog Food 15kg", available: 2, requested: 5 }
    ///      │
    ///      ▼
    /// Whole sale rolled back, operator picks a different quantity
    /// ```
    #[error("Insufficient stock for {product}: available {available}, requested {requested}")]
    InsufficientStock {
        product: String,
        available: Quantity,
        requested: Quantity,
    },

    /// Void attempted on an order that is already voided.
    #[error("Order {order_id} was already voided")]
    AlreadyVoided { order_id: String },

    /// No tenant could be determined for an operation that needs one.
    #[error("No tenant could be resolved for this operation")]
    TenantUnresolved,

    /// An entity of another tenant was handed to a scoped operation.
    #[error("{entity} does not belong to the active tenant")]
    TenantMismatch { entity: String },

    /// Product cannot be found in the active tenant.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Shift cannot be found in the active tenant.
    #[error("Shift not found: {0}")]
    ShiftNotFound(String),

    /// Order cannot be found in the active tenant.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Cash register cannot be found in the active tenant.
    #[error("Cash register not found: {0}")]
    RegisterNotFound(String),

    /// Checkout was invoked with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// The authorization guard denied the action.
    #[error("Role {role} is not allowed to {action}")]
    Forbidden { role: String, action: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid RUT).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub(crate) fn invalid_format(field: &str, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: "Dog Food 15kg".to_string(),
            available: Quantity::from_units(2),
            requested: Quantity::from_units(5),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for Dog Food 15kg: available 2, requested 5"
        );

        let err = CoreError::ShiftAlreadyOpen {
            register: "Caja 1".to_string(),
            holder: "Ana Pérez".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Register Caja 1 already has an open shift held by Ana Pérez"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "rut".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
