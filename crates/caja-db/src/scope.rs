//! # Tenant Scope
//!
//! Per-operation tenant binding and the scoped database handle built on it.
//!
//! ## Two Ways To Carry The Tenant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  EXPLICIT (preferred)                                                   │
//! │     let tdb = db.scoped(scope);                                         │
//! │     tdb.checkout().process_sale(...)                                    │
//! │                                                                         │
//! │  AMBIENT (for deep call chains)                                         │
//! │     with_tenant(scope, async {                                          │
//! │         let tdb = db.for_current_tenant()?;   ◄── reads task-local     │
//! │         ...                                                             │
//! │     }).await                                                            │
//! │                                                                         │
//! │  The ambient binding is a tokio task-local: it belongs to ONE task,    │
//! │  nests (inner binding wins, outer restored afterwards) and is gone as  │
//! │  soon as the future completes, errors, or panics. A worker that serves │
//! │  tenant A and then tenant B never sees A's binding during B.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;

use caja_core::{CoreError, CoreResult, Tenant, TaxRate, TenantId};
use sqlx::SqlitePool;
use tracing::warn;

use crate::engine::{CheckoutEngine, InventoryLedger, ShiftManager, VoidEngine};
use crate::repository::{
    BatchRepository, OrderRepository, ProductRepository, ReportRepository, ShiftRepository,
    StoreRepository,
};

tokio::task_local! {
    static CURRENT_TENANT: TenantScope;
}

// =============================================================================
// Tenant Scope
// =============================================================================

/// The tenant an operation runs for.
///
/// Created once per inbound operation, usually by
/// [`TenantResolver`](crate::resolver::TenantResolver), and discarded with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantScope {
    tenant_id: TenantId,
    name: String,
    tax_rate: TaxRate,
}

impl TenantScope {
    pub fn new(tenant_id: TenantId, name: impl Into<String>, tax_rate: TaxRate) -> Self {
        TenantScope {
            tenant_id,
            name: name.into(),
            tax_rate,
        }
    }

    #[inline]
    pub fn tenant_id(&self) -> &TenantId {
        &self.tenant_id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn tax_rate(&self) -> TaxRate {
        self.tax_rate
    }

    /// Rejects entities stamped with another tenant.
    pub fn ensure_owns(&self, entity: &str, tenant_id: &TenantId) -> CoreResult<()> {
        if &self.tenant_id == tenant_id {
            Ok(())
        } else {
            warn!(
                tenant_id = %self.tenant_id,
                foreign_tenant_id = %tenant_id,
                entity,
                "Cross-tenant entity rejected"
            );
            Err(CoreError::TenantMismatch {
                entity: entity.to_string(),
            })
        }
    }
}

impl From<&Tenant> for TenantScope {
    fn from(tenant: &Tenant) -> Self {
        TenantScope::new(tenant.id.clone(), tenant.name.clone(), tenant.tax_rate())
    }
}

// =============================================================================
// Ambient Binding
// =============================================================================

/// Runs `fut` with `scope` as the ambient tenant of the current task.
pub async fn with_tenant<F>(scope: TenantScope, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_TENANT.scope(scope, fut).await
}

/// The ambient tenant of the current task, if any.
pub fn current_tenant() -> Option<TenantScope> {
    CURRENT_TENANT.try_with(|scope| scope.clone()).ok()
}

// =============================================================================
// Scoped Database Handle
// =============================================================================

/// Database handle bound to one tenant.
///
/// Only tenant-scoped repositories and engines are reachable from here;
/// cross-tenant work goes through [`Database::unscoped`](crate::Database::unscoped).
#[derive(Debug, Clone)]
pub struct TenantDb {
    pool: SqlitePool,
    scope: TenantScope,
}

impl TenantDb {
    pub(crate) fn new(pool: SqlitePool, scope: TenantScope) -> Self {
        TenantDb { pool, scope }
    }

    #[inline]
    pub fn scope(&self) -> &TenantScope {
        &self.scope
    }

    #[inline]
    pub fn tenant_id(&self) -> &TenantId {
        self.scope.tenant_id()
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone(), self.scope.clone())
    }

    /// Branches, registers, staff and customers.
    pub fn store(&self) -> StoreRepository {
        StoreRepository::new(self.pool.clone(), self.scope.clone())
    }

    /// Product lots and expiration alerts.
    pub fn batches(&self) -> BatchRepository {
        BatchRepository::new(self.pool.clone(), self.scope.clone())
    }

    pub fn shifts(&self) -> ShiftRepository {
        ShiftRepository::new(self.pool.clone(), self.scope.clone())
    }

    pub fn orders(&self) -> OrderRepository {
        OrderRepository::new(self.pool.clone(), self.scope.clone())
    }

    pub fn reports(&self) -> ReportRepository {
        ReportRepository::new(self.pool.clone(), self.scope.clone())
    }

    pub fn inventory(&self) -> InventoryLedger {
        InventoryLedger::new(self.pool.clone(), self.scope.clone())
    }

    pub fn checkout(&self) -> CheckoutEngine {
        CheckoutEngine::new(self.pool.clone(), self.scope.clone())
    }

    pub fn shift_manager(&self) -> ShiftManager {
        ShiftManager::new(self.pool.clone(), self.scope.clone())
    }

    pub fn voids(&self) -> VoidEngine {
        VoidEngine::new(self.pool.clone(), self.scope.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(id: &str) -> TenantScope {
        TenantScope::new(TenantId::new(id), id, TaxRate::IVA_CHILE)
    }

    #[tokio::test]
    async fn test_no_binding_outside_scope() {
        assert!(current_tenant().is_none());
    }

    #[tokio::test]
    async fn test_binding_visible_inside_and_cleared_after() {
        let seen = with_tenant(scope("a"), async {
            current_tenant().map(|s| s.tenant_id().to_string())
        })
        .await;

        assert_eq!(seen.as_deref(), Some("a"));
        assert!(current_tenant().is_none());
    }

    #[tokio::test]
    async fn test_nested_binding_restores_outer() {
        with_tenant(scope("outer"), async {
            let inner = with_tenant(scope("inner"), async {
                current_tenant().map(|s| s.tenant_id().to_string())
            })
            .await;
            assert_eq!(inner.as_deref(), Some("inner"));

            let outer = current_tenant().map(|s| s.tenant_id().to_string());
            assert_eq!(outer.as_deref(), Some("outer"));
        })
        .await;
    }

    #[tokio::test]
    async fn test_binding_cleared_on_error() {
        let result: Result<(), &str> = with_tenant(scope("a"), async { Err("boom") }).await;
        assert!(result.is_err());
        assert!(current_tenant().is_none());
    }

    #[tokio::test]
    async fn test_binding_does_not_leak_to_other_tasks() {
        let handle = with_tenant(scope("a"), async {
            // A task spawned from inside the scope does not inherit it.
            tokio::spawn(async { current_tenant().is_none() })
        })
        .await;

        assert!(handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_sequential_operations_on_same_worker() {
        for id in ["a", "b", "a"] {
            let seen = with_tenant(scope(id), async {
                current_tenant().map(|s| s.tenant_id().to_string())
            })
            .await;
            assert_eq!(seen.as_deref(), Some(id));
            assert!(current_tenant().is_none());
        }
    }

    #[test]
    fn test_ensure_owns() {
        let s = scope("a");
        assert!(s.ensure_owns("Product", &TenantId::new("a")).is_ok());
        assert!(matches!(
            s.ensure_owns("Product", &TenantId::new("b")),
            Err(CoreError::TenantMismatch { .. })
        ));
    }
}
