//! # Tenant Resolver
//!
//! Derives the active tenant of an inbound operation from its origin.
//!
//! ## Resolution Order
//! ```text
//! RequestOrigin { host, tenant_header }
//!      │
//!      ├─► 1. subdomain of host (tienda1.caja.cl → "tienda1")
//!      │       active tenant with that subdomain?  ──yes──► Tenant
//!      │
//!      ├─► 2. tenant header (X-Tenant-ID), if it is a UUID
//!      │       active tenant with that id?         ──yes──► Tenant
//!      │
//!      └─► 3. default policy
//!              first_active → first active tenant by name
//!              <id>         → that tenant, if active
//!              none         → unresolved
//! ```
//! Inactive tenants never resolve.

use std::future::Future;

use caja_core::validation::validate_uuid;
use caja_core::{CoreError, RequestOrigin, Tenant};
use tracing::{debug, warn};

use crate::config::DefaultTenant;
use crate::error::DbResult;
use crate::pool::Database;
use crate::repository::TenantDirectory;
use crate::scope::{with_tenant, TenantDb, TenantScope};

/// Resolves tenants and runs operations under them.
#[derive(Debug, Clone)]
pub struct TenantResolver {
    db: Database,
    directory: TenantDirectory,
    default_tenant: DefaultTenant,
}

impl TenantResolver {
    pub fn new(db: Database, default_tenant: DefaultTenant) -> Self {
        let directory = db.unscoped();
        TenantResolver {
            db,
            directory,
            default_tenant,
        }
    }

    /// Resolves the tenant of `origin`, or `None`.
    pub async fn resolve(&self, origin: &RequestOrigin) -> DbResult<Option<Tenant>> {
        if let Some(subdomain) = origin.subdomain() {
            if let Some(tenant) = self.directory.find_active_by_subdomain(&subdomain).await? {
                debug!(tenant_id = %tenant.id, subdomain = %subdomain, "Tenant resolved by subdomain");
                return Ok(Some(tenant));
            }
        }

        if let Some(id) = origin.header_tenant_id() {
            if validate_uuid(id).is_err() {
                debug!(header = %id, "Ignoring malformed tenant header");
            } else if let Some(tenant) = self.directory.find_active_by_id(id).await? {
                debug!(tenant_id = %tenant.id, "Tenant resolved by header");
                return Ok(Some(tenant));
            }
        }

        let fallback = match &self.default_tenant {
            DefaultTenant::FirstActive => self.directory.first_active().await?,
            DefaultTenant::Fixed(id) => self.directory.find_active_by_id(id).await?,
            DefaultTenant::Disabled => None,
        };

        if let Some(tenant) = &fallback {
            debug!(tenant_id = %tenant.id, policy = %self.default_tenant, "Tenant resolved by default policy");
        }
        Ok(fallback)
    }

    /// Like [`resolve`](Self::resolve) but fails with `TenantUnresolved`.
    pub async fn require(&self, origin: &RequestOrigin) -> DbResult<Tenant> {
        match self.resolve(origin).await? {
            Some(tenant) => Ok(tenant),
            None => {
                warn!(host = ?origin.host, "No tenant could be resolved");
                Err(CoreError::TenantUnresolved.into())
            }
        }
    }

    /// Resolves the tenant of `origin` and runs `op` under it.
    ///
    /// `op` receives a [`TenantDb`] for the tenant, and the same tenant is
    /// the ambient binding for everything `op` awaits. The binding ends
    /// with `op`, whatever its outcome.
    pub async fn run<F, Fut, T>(&self, origin: &RequestOrigin, op: F) -> DbResult<T>
    where
        F: FnOnce(TenantDb) -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let tenant = self.require(origin).await?;
        let scope = TenantScope::from(&tenant);
        let tdb = self.db.scoped(scope.clone());

        with_tenant(scope, op(tdb)).await
    }
}
