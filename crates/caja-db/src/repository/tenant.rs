//! # Tenant Directory
//!
//! Unscoped, administrative access to tenants: provisioning, activation and
//! the lookups the resolver needs. Nothing here filters by tenant.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use caja_core::validation::{validate_name, validate_rut, validate_subdomain, validate_tax_rate_bps};
use caja_core::{TaxRate, Tenant, TenantId};

use crate::error::{DbError, DbResult};

/// Input for [`TenantDirectory::create`].
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub legal_name: Option<String>,
    pub rut: String,
    pub subdomain: String,
    pub tax_rate: TaxRate,
}

impl NewTenant {
    pub fn new(name: impl Into<String>, rut: impl Into<String>, subdomain: impl Into<String>) -> Self {
        NewTenant {
            name: name.into(),
            legal_name: None,
            rut: rut.into(),
            subdomain: subdomain.into(),
            tax_rate: TaxRate::IVA_CHILE,
        }
    }

    pub fn legal_name(mut self, legal_name: impl Into<String>) -> Self {
        self.legal_name = Some(legal_name.into());
        self
    }

    pub fn tax_rate(mut self, tax_rate: TaxRate) -> Self {
        self.tax_rate = tax_rate;
        self
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TenantRow {
    id: String,
    name: String,
    legal_name: Option<String>,
    rut: String,
    subdomain: String,
    tax_rate_bps: i64,
    currency: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: TenantId::new(row.id),
            name: row.name,
            legal_name: row.legal_name,
            rut: row.rut,
            subdomain: row.subdomain,
            tax_rate_bps: row.tax_rate_bps as u32,
            currency: row.currency,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Cross-tenant administrative repository.
#[derive(Debug, Clone)]
pub struct TenantDirectory {
    pool: SqlitePool,
}

impl TenantDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        TenantDirectory { pool }
    }

    /// Provisions a tenant.
    ///
    /// The RUT is validated (check digit) and stored in canonical
    /// `BODY-DV` form; the subdomain is stored lowercased.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for a bad name, RUT, subdomain or tax rate
    /// - `UniqueViolation` if the RUT or subdomain is taken
    pub async fn create(&self, new: NewTenant) -> DbResult<Tenant> {
        validate_name("name", &new.name, 200)?;
        let rut = validate_rut(&new.rut)?;
        let subdomain = new.subdomain.trim().to_lowercase();
        validate_subdomain(&subdomain)?;
        validate_tax_rate_bps(new.tax_rate.bps())?;

        let now = Utc::now();
        let tenant = Tenant {
            id: TenantId::generate(),
            name: new.name.trim().to_string(),
            legal_name: new.legal_name,
            rut,
            subdomain,
            tax_rate_bps: new.tax_rate.bps(),
            currency: "CLP".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(tenant_id = %tenant.id, subdomain = %tenant.subdomain, "Creating tenant");

        sqlx::query(
            r#"
            INSERT INTO tenants (
                id, name, legal_name, rut, subdomain,
                tax_rate_bps, currency, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(tenant.id.as_str())
        .bind(&tenant.name)
        .bind(&tenant.legal_name)
        .bind(&tenant.rut)
        .bind(&tenant.subdomain)
        .bind(tenant.tax_rate_bps as i64)
        .bind(&tenant.currency)
        .bind(tenant.is_active)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_violation_on("tenants.rut") => {
                DbError::duplicate("rut", tenant.rut.clone())
            }
            err if err.is_unique_violation_on("tenants.subdomain") => {
                DbError::duplicate("subdomain", tenant.subdomain.clone())
            }
            err => err,
        })?;

        info!(tenant_id = %tenant.id, name = %tenant.name, "Tenant provisioned");
        Ok(tenant)
    }

    /// Gets a tenant by id, active or not.
    pub async fn get(&self, id: &TenantId) -> DbResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, name, legal_name, rut, subdomain, tax_rate_bps,
                   currency, is_active, created_at, updated_at
            FROM tenants
            WHERE id = ?1
            "#,
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Tenant::from))
    }

    pub async fn find_active_by_id(&self, id: &str) -> DbResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, name, legal_name, rut, subdomain, tax_rate_bps,
                   currency, is_active, created_at, updated_at
            FROM tenants
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Tenant::from))
    }

    pub async fn find_active_by_subdomain(&self, subdomain: &str) -> DbResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, name, legal_name, rut, subdomain, tax_rate_bps,
                   currency, is_active, created_at, updated_at
            FROM tenants
            WHERE subdomain = ?1 AND is_active = 1
            "#,
        )
        .bind(subdomain.to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Tenant::from))
    }

    /// First active tenant ordered by name.
    pub async fn first_active(&self) -> DbResult<Option<Tenant>> {
        let row = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, name, legal_name, rut, subdomain, tax_rate_bps,
                   currency, is_active, created_at, updated_at
            FROM tenants
            WHERE is_active = 1
            ORDER BY name, id
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Tenant::from))
    }

    /// All tenants ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Tenant>> {
        let rows = sqlx::query_as::<_, TenantRow>(
            r#"
            SELECT id, name, legal_name, rut, subdomain, tax_rate_bps,
                   currency, is_active, created_at, updated_at
            FROM tenants
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Tenant::from).collect())
    }

    /// Activates or suspends a tenant. Suspended tenants stop resolving.
    pub async fn set_active(&self, id: &TenantId, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE tenants SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id.as_str())
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Tenant", id.as_str()));
        }

        info!(tenant_id = %id, active, "Tenant activation changed");
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenants")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn directory() -> TenantDirectory {
        Database::new(DbConfig::in_memory()).await.unwrap().unscoped()
    }

    #[tokio::test]
    async fn test_create_normalizes_rut_and_subdomain() {
        let dir = directory().await;
        let tenant = dir
            .create(NewTenant::new("Mascotas Sur", "12.345.678-5", "  MascotasSur "))
            .await
            .unwrap();

        assert_eq!(tenant.rut, "12345678-5");
        assert_eq!(tenant.subdomain, "mascotassur");
        assert_eq!(tenant.tax_rate(), TaxRate::IVA_CHILE);
        assert_eq!(tenant.currency, "CLP");

        let loaded = dir.get(&tenant.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Mascotas Sur");
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_rut() {
        let dir = directory().await;
        let err = dir
            .create(NewTenant::new("X", "12.345.678-9", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
    }

    #[tokio::test]
    async fn test_duplicate_rut_and_subdomain() {
        let dir = directory().await;
        dir.create(NewTenant::new("A", "12.345.678-5", "a")).await.unwrap();

        let err = dir
            .create(NewTenant::new("B", "12345678-5", "b"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "rut"));

        let err = dir
            .create(NewTenant::new("C", "11.111.111-1", "a"))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "subdomain"));
    }

    #[tokio::test]
    async fn test_set_active_unknown_tenant() {
        let dir = directory().await;
        let err = dir.set_active(&TenantId::new("missing"), false).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let dir = directory().await;
        dir.create(NewTenant::new("Beta", "11.111.111-1", "beta")).await.unwrap();
        dir.create(NewTenant::new("Alfa", "12.345.678-5", "alfa")).await.unwrap();

        let names: Vec<String> = dir.list().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["Alfa", "Beta"]);
        assert_eq!(dir.count().await.unwrap(), 2);
    }
}
