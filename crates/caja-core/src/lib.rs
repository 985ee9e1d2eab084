//! # caja-core: Pure Domain Logic for Caja POS
//!
//! This crate holds the business rules of the multi-tenant point of sale
//! as pure functions and plain data. It has zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │          Presentation layer (web / desktop, not in here)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ in-process calls                       │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caja-db (Database Layer)                     │   │
//! │  │   tenant scope • repositories • checkout/shift/void engines    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │  types • money • quantity • fiscal • cart • tenant • authz     │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain entities (Tenant, Shift, Order, Payment, ...)
//! - [`money`] - Integer CLP amounts
//! - [`quantity`] - Fractional quantities with three decimals
//! - [`fiscal`] - Tax-inclusive net/tax extraction
//! - [`cart`] - Cart lines consumed by checkout
//! - [`tenant`] - Request origin parsing for tenant resolution
//! - [`authz`] - Role based authorization guard
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::fiscal::FiscalBreakdown;
//! use caja_core::money::Money;
//! use caja_core::types::TaxRate;
//!
//! // $2.000 CLP, IVA included
//! let fiscal = FiscalBreakdown::from_gross(Money::from_pesos(2000), TaxRate::IVA_CHILE);
//! assert_eq!(fiscal.net.pesos(), 1680);
//! assert_eq!(fiscal.tax.pesos(), 320);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod authz;
pub mod cart;
pub mod error;
pub mod fiscal;
pub mod money;
pub mod quantity;
pub mod tenant;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use authz::{authorize, ensure, Action, Decision, Role};
pub use cart::{Cart, CartLine};
pub use error::{CoreError, CoreResult, ValidationError};
pub use fiscal::FiscalBreakdown;
pub use money::Money;
pub use quantity::Quantity;
pub use tenant::RequestOrigin;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Header carrying an explicit tenant id (API clients, development).
pub const TENANT_HEADER: &str = "X-Tenant-ID";

/// Maximum distinct products allowed in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Quantity added per click for bulk (weight based) products, in kg.
pub const BULK_INCREMENT: &str = "0.500";
