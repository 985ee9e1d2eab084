//! # Domain Types
//!
//! Core domain types used throughout Caja POS.
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Tenant (root)                                  │
//! │        ┌────────────┬───────────┼────────────┬─────────────┐            │
//! │        ▼            ▼           ▼            ▼             ▼            │
//! │     Branch       Staff      Product       Order ──────► Payment         │
//! │        │                        │         │  │                          │
//! │        │                        └─► Batch │  │                          │
//! │        ▼                                  │  └──► OrderItem (owned)     │
//! │   CashRegister ──► Shift ◄────────────────┘                             │
//! │                                                                         │
//! │  Every entity below Tenant carries a tenant_id that never changes.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `OrderItem` copies unit price and unit cost at the time of sale, so
//! margin reports stay stable when product prices change later.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::authz::Role;
use crate::error::ValidationError;
use crate::money::Money;
use crate::quantity::Quantity;

// =============================================================================
// Tenant Id
// =============================================================================

/// Identifier of the tenant that owns a row.
///
/// Tenant-owned entities take this by value at construction and never
/// expose a setter for it. As a newtype it serializes as the bare string,
/// and ts-rs exports it as `string`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        TenantId(id.into())
    }

    /// Generates a fresh random id (UUID v4).
    pub fn generate() -> Self {
        TenantId(uuid::Uuid::new_v4().to_string())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TenantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// =============================================================================
// Tax Rate
// =============================================================================

/// Tax rate represented in basis points (bps).
///
/// 1 basis point = 0.01%, so Chilean IVA (19%) is 1900 bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Chilean IVA, 19%.
    pub const IVA_CHILE: TaxRate = TaxRate(1900);

    /// Creates a tax rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        TaxRate(bps)
    }

    /// Creates a tax rate from a percentage (for convenience).
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero tax rate.
    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }
}

// =============================================================================
// Tenant, Branch, Register
// =============================================================================

/// A store account on the platform. Root of data isolation.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Tenant {
    pub id: TenantId,
    /// Commercial name.
    pub name: String,
    /// Legal company name (razón social).
    pub legal_name: Option<String>,
    /// Business registration number (RUT), unique across tenants.
    pub rut: String,
    /// Unique subdomain, e.g. `tienda1` in `tienda1.caja.cl`.
    pub subdomain: String,
    pub tax_rate_bps: u32,
    /// ISO 4217 code. Informational only: all amounts are CLP.
    pub currency: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        TaxRate::from_bps(self.tax_rate_bps)
    }
}

/// A physical location of a tenant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Branch {
    pub id: String,
    pub tenant_id: TenantId,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub is_main: bool,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A physical till in a branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashRegister {
    pub id: String,
    pub tenant_id: TenantId,
    pub branch_id: String,
    pub name: String,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Staff & Customers
// =============================================================================

/// An employee profile inside one tenant.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Staff {
    pub id: String,
    pub tenant_id: TenantId,
    pub username: String,
    pub full_name: Option<String>,
    pub role: Role,
    /// Branch the employee is assigned to, if any.
    pub branch_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Staff {
    /// Full name when set, username otherwise.
    pub fn display_name(&self) -> &str {
        match self.full_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub tenant_id: TenantId,
    pub name: String,
    pub rut: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
///
/// Mostly owned by the back office; the sale core only reads prices and
/// moves `stock`, which must never go negative.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub tenant_id: TenantId,
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    /// Sale price, IVA included.
    pub price: Money,
    /// Net unit cost.
    pub cost: Money,
    #[ts(as = "String")]
    pub stock: Quantity,
    /// Stock level at or below which the product is flagged.
    #[ts(as = "String")]
    pub min_stock_alert: Quantity,
    /// Sold by weight.
    pub is_bulk: bool,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Checks if the requested quantity can be taken from stock.
    #[inline]
    pub fn has_stock_for(&self, quantity: Quantity) -> bool {
        self.stock >= quantity
    }

    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock_alert
    }
}

// =============================================================================
// Batch
// =============================================================================

/// One received lot of a product, tracked for expiration.
///
/// Date checks take `today` so callers decide which calendar day applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Batch {
    pub id: String,
    pub tenant_id: TenantId,
    pub product_id: String,
    pub batch_number: String,
    #[ts(as = "String")]
    pub expiration_date: NaiveDate,
    /// Quantity received.
    #[ts(as = "String")]
    pub quantity: Quantity,
    /// Quantity still on hand.
    #[ts(as = "String")]
    pub current_quantity: Quantity,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Batch {
    /// Window, in days, inside which a batch counts as near expiration.
    pub const NEAR_EXPIRATION_DAYS: i64 = 30;

    /// Days left until `expiration_date`; negative once expired.
    pub fn days_to_expiration(&self, today: NaiveDate) -> i64 {
        (self.expiration_date - today).num_days()
    }

    #[inline]
    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date < today
    }

    /// Expires within the next [`NEAR_EXPIRATION_DAYS`](Self::NEAR_EXPIRATION_DAYS),
    /// not counting today.
    pub fn is_near_expiration(&self, today: NaiveDate) -> bool {
        let days = self.days_to_expiration(today);
        0 < days && days <= Self::NEAR_EXPIRATION_DAYS
    }
}

// =============================================================================
// Shift
// =============================================================================

/// A bounded period during which one register is operated by one cashier.
///
/// Lifecycle: created open, closed exactly once, never reopened.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Shift {
    pub id: String,
    pub tenant_id: TenantId,
    pub register_id: String,
    pub cashier_id: String,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub opening_cash: Money,
    pub closing_cash: Option<Money>,
    pub notes: String,
}

impl Shift {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

/// Cash reconciliation computed when a shift is closed.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftSummary {
    pub shift: Shift,
    /// Σ total of paid, non-voided orders of the shift.
    pub total_sales: Money,
    pub order_count: i64,
    /// Σ CASH payments of paid, non-voided orders of the shift.
    pub total_cash: Money,
    /// opening cash + total cash.
    pub expected_cash: Money,
    pub closing_cash: Money,
    /// closing − expected. Negative is a shortfall, positive an overage.
    pub difference: Money,
}

// =============================================================================
// Payment Method
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    /// Efectivo.
    Cash,
    /// Debit/credit card on the bank terminal.
    Card,
    /// Bank transfer.
    Transfer,
    /// Split tender.
    Mixed,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::Card => "CARD",
            PaymentMethod::Transfer => "TRANSFER",
            PaymentMethod::Mixed => "MIXED",
        }
    }
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "CASH" => Ok(PaymentMethod::Cash),
            "CARD" => Ok(PaymentMethod::Card),
            "TRANSFER" => Ok(PaymentMethod::Transfer),
            "MIXED" => Ok(PaymentMethod::Mixed),
            _ => Err(ValidationError::InvalidFormat {
                field: "payment_method".to_string(),
                reason: "must be one of CASH, CARD, TRANSFER, MIXED".to_string(),
            }),
        }
    }
}

/// Optional method-specific data captured at the terminal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentDetails {
    /// Terminal/bank operation number.
    pub transaction_id: Option<String>,
    pub card_last_4: Option<String>,
}

impl PaymentDetails {
    /// Keeps only the fields that apply to `method` and drops blanks.
    ///
    /// ```text
    /// CASH      → nothing
    /// CARD      → transaction_id, card_last_4
    /// TRANSFER  → transaction_id
    /// MIXED     → transaction_id
    /// ```
    pub fn for_method(self, method: PaymentMethod) -> PaymentDetails {
        let non_blank = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        match method {
            PaymentMethod::Cash => PaymentDetails::default(),
            PaymentMethod::Card => PaymentDetails {
                transaction_id: non_blank(self.transaction_id),
                card_last_4: non_blank(self.card_last_4),
            },
            PaymentMethod::Transfer | PaymentMethod::Mixed => PaymentDetails {
                transaction_id: non_blank(self.transaction_id),
                card_last_4: None,
            },
        }
    }
}

// =============================================================================
// Order
// =============================================================================

/// A sale. Amounts are whole pesos, IVA included in `total`.
///
/// Invariants: `total = Σ item.line_total`, `net + tax = total`, and once
/// `is_voided` is set it never goes back. Voided orders keep their amounts
/// for audit and are excluded from revenue by the paid/non-voided filter.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub tenant_id: TenantId,
    /// Per-tenant daily receipt number, `YYYYMMDD-NNNN`.
    pub order_number: String,
    pub shift_id: Option<String>,
    pub branch_id: Option<String>,
    pub cashier_id: Option<String>,
    pub customer_id: Option<String>,
    pub total: Money,
    pub net: Money,
    pub tax: Money,
    pub is_paid: bool,
    pub is_voided: bool,
    pub voided_by: Option<String>,
    pub void_reason: String,
    #[ts(as = "Option<String>")]
    pub voided_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Whether the order counts towards revenue and cash aggregations.
    #[inline]
    pub fn counts_as_revenue(&self) -> bool {
        self.is_paid && !self.is_voided
    }
}

/// A line of an order with price and cost frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    #[ts(as = "String")]
    pub quantity: Quantity,
    pub unit_price: Money,
    pub unit_cost: Money,
    /// round(unit_price × quantity).
    pub line_total: Money,
}

/// A payment towards an order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Payment {
    pub id: String,
    pub tenant_id: TenantId,
    pub order_id: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub transaction_id: Option<String>,
    pub card_last_4: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tax_rate_from_percentage() {
        assert_eq!(TaxRate::from_percentage(19.0), TaxRate::IVA_CHILE);
        assert!((TaxRate::IVA_CHILE.percentage() - 19.0).abs() < 0.001);
    }

    #[test]
    fn test_tenant_id_is_a_bare_string() {
        let id = TenantId::new("3b1f9c2e-0000-4000-8000-000000000001");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"3b1f9c2e-0000-4000-8000-000000000001\"");
        assert_eq!(serde_json::from_str::<TenantId>(&json).unwrap(), id);
        assert_eq!(TenantId::inline(), "string");
    }

    #[test]
    fn test_batch_expiration() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let mut batch = Batch {
            id: "b1".to_string(),
            tenant_id: TenantId::new("t1"),
            product_id: "p1".to_string(),
            batch_number: "L-001".to_string(),
            expiration_date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            quantity: Quantity::from_units(10),
            current_quantity: Quantity::from_units(4),
            created_at: Utc::now(),
        };
        assert_eq!(batch.days_to_expiration(today), 30);
        assert!(batch.is_near_expiration(today));
        assert!(!batch.is_expired(today));

        batch.expiration_date = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        assert!(!batch.is_near_expiration(today));

        batch.expiration_date = today;
        assert_eq!(batch.days_to_expiration(today), 0);
        assert!(!batch.is_near_expiration(today));
        assert!(!batch.is_expired(today));

        batch.expiration_date = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        assert_eq!(batch.days_to_expiration(today), -1);
        assert!(batch.is_expired(today));
    }

    #[test]
    fn test_payment_method_parsing() {
        assert_eq!("cash".parse::<PaymentMethod>().unwrap(), PaymentMethod::Cash);
        assert_eq!(" CARD ".parse::<PaymentMethod>().unwrap(), PaymentMethod::Card);
        assert!("cheque".parse::<PaymentMethod>().is_err());
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
        assert_eq!(
            serde_json::to_string(&PaymentMethod::Transfer).unwrap(),
            "\"TRANSFER\""
        );
    }

    #[test]
    fn test_payment_details_for_method() {
        let details = PaymentDetails {
            transaction_id: Some("OP-991".to_string()),
            card_last_4: Some("4242".to_string()),
        };

        let card = details.clone().for_method(PaymentMethod::Card);
        assert_eq!(card, details);

        let transfer = details.clone().for_method(PaymentMethod::Transfer);
        assert_eq!(transfer.transaction_id.as_deref(), Some("OP-991"));
        assert!(transfer.card_last_4.is_none());

        assert_eq!(details.for_method(PaymentMethod::Cash), PaymentDetails::default());

        let blank = PaymentDetails {
            transaction_id: Some("  ".to_string()),
            card_last_4: Some(String::new()),
        };
        assert_eq!(blank.for_method(PaymentMethod::Card), PaymentDetails::default());
    }

    #[test]
    fn test_staff_display_name_falls_back_to_username() {
        let mut staff = Staff {
            id: "s1".to_string(),
            tenant_id: TenantId::new("t1"),
            username: "ana".to_string(),
            full_name: Some("Ana Pérez".to_string()),
            role: Role::Cashier,
            branch_id: None,
            is_active: true,
            created_at: Utc::now(),
        };
        assert_eq!(staff.display_name(), "Ana Pérez");

        staff.full_name = Some("  ".to_string());
        assert_eq!(staff.display_name(), "ana");
    }
}
