//! # caja-db: Database Layer for Caja POS
//!
//! SQLite storage for every tenant of the point of sale, the tenant scope
//! that keeps them apart, and the transactional engines that move money
//! and stock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Data Flow                               │
//! │                                                                         │
//! │  Inbound operation (host / X-Tenant-ID)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     caja-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │  TenantResolver ──► TenantScope ──► TenantDb                    │   │
//! │  │  (resolver.rs)      (scope.rs)      │                           │   │
//! │  │                                     ├── repositories (reads,    │   │
//! │  │                                     │   catalogue, batches,     │   │
//! │  │                                     │   reports)                │   │
//! │  │                                     └── engines (checkout,      │   │
//! │  │                                         shift, void, inventory) │   │
//! │  │                                                                 │   │
//! │  │  Database (pool.rs) • migrations • PosConfig (config.rs)        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │           SQLite (WAL, foreign keys, busy timeout)              │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`config`] - Layered configuration (defaults, TOML, environment)
//! - [`scope`] - Tenant scope, ambient binding and the scoped handle
//! - [`resolver`] - Tenant resolution from the request origin
//! - [`repository`] - Scoped and unscoped repositories
//! - [`engine`] - Checkout, shift, void and inventory units of work
//! - [`error`] - Database error types
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_db::{Database, DbConfig, SaleRequest};
//! use caja_core::{Cart, RequestOrigin};
//!
//! let db = Database::new(DbConfig::new("caja.db")).await?;
//! let resolver = db.resolver(Default::default());
//!
//! let order = resolver
//!     .run(&RequestOrigin::from_host("sur.caja.cl"), |tdb| async move {
//!         let cart = Cart::from_lines([(product_id, "2")])?;
//!         tdb.checkout().checkout(SaleRequest::new(&cashier, &cart)).await
//!     })
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod engine;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod resolver;
pub mod scope;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{DefaultTenant, PosConfig};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use resolver::TenantResolver;
pub use scope::{current_tenant, with_tenant, TenantDb, TenantScope};

// Repository re-exports for convenience
pub use repository::{
    BatchAlert, BatchRepository, DailySales, NewBatch, NewBranch, NewCustomer, NewProduct,
    NewRegister, NewStaff, NewTenant, OrderRepository, PaymentBreakdown, ProductMargin,
    ProductRepository, ReportRepository, SalesSummary, ShiftRepository, StoreRepository,
    TenantDirectory, TopProduct,
};

// Engine re-exports
pub use engine::{CheckoutEngine, InventoryLedger, SaleRequest, ShiftManager, VoidEngine};
