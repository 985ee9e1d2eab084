//! # Repository Module
//!
//! Database repositories for Caja POS.
//!
//! ## Scoped vs Unscoped
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SCOPED (obtained from TenantDb)                                        │
//! │  ├── every SELECT carries  WHERE tenant_id = <scope>                   │
//! │  ├── every INSERT stamps   tenant_id = <scope>                         │
//! │  └── New* inputs have no tenant field at all                           │
//! │                                                                         │
//! │      ProductRepository   StoreRepository   ShiftRepository             │
//! │      OrderRepository     ReportRepository  BatchRepository             │
//! │                                                                         │
//! │  UNSCOPED (obtained from Database::unscoped)                            │
//! │  └── TenantDirectory: provisioning and lookup across tenants           │
//! │                                                                         │
//! │  The two are different types, so a cross-tenant call site is visible  │
//! │  in the code that makes it.                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Besides the pool-backed methods, repositories expose `pub(crate)`
//! functions that run on a caller-supplied connection so engines can use
//! them inside their own transaction.

pub mod batch;
pub mod order;
pub mod product;
pub mod report;
pub mod shift;
pub mod store;
pub mod tenant;

pub use batch::{BatchAlert, BatchRepository, NewBatch};
pub use order::OrderRepository;
pub use product::{NewProduct, ProductRepository};
pub use report::{DailySales, PaymentBreakdown, ProductMargin, ReportRepository, SalesSummary, TopProduct};
pub use shift::ShiftRepository;
pub use store::{NewBranch, NewCustomer, NewRegister, NewStaff, StoreRepository};
pub use tenant::{NewTenant, TenantDirectory};

/// Generates a new entity id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
