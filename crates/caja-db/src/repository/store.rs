//! # Store Repository
//!
//! Branches, cash registers, staff and customers of one tenant.
//!
//! ## Store Structure
//! ```text
//! Tenant
//!   └── Branch (sucursal)
//!         ├── CashRegister (caja)  ── at most one open Shift at a time
//!         └── Staff                ── may be pinned to a branch
//!   └── Customer                   ── optional on an order
//! ```
//! Every lookup filters by the scope's tenant; an id belonging to another
//! tenant is indistinguishable from an id that does not exist.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use caja_core::validation::{validate_name, validate_rut};
use caja_core::{Branch, CashRegister, Customer, Role, Staff, TenantId};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::scope::TenantScope;

// =============================================================================
// Inputs
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewBranch {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub is_main: bool,
}

impl NewBranch {
    pub fn new(name: impl Into<String>) -> Self {
        NewBranch {
            name: name.into(),
            address: None,
            phone: None,
            is_main: false,
        }
    }

    pub fn main(mut self) -> Self {
        self.is_main = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewRegister {
    pub branch_id: String,
    pub name: String,
}

impl NewRegister {
    pub fn new(branch_id: impl Into<String>, name: impl Into<String>) -> Self {
        NewRegister {
            branch_id: branch_id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewStaff {
    pub username: String,
    pub full_name: Option<String>,
    pub role: Role,
    pub branch_id: Option<String>,
}

impl NewStaff {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        NewStaff {
            username: username.into(),
            full_name: None,
            role,
            branch_id: None,
        }
    }

    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    pub fn branch(mut self, branch_id: impl Into<String>) -> Self {
        self.branch_id = Some(branch_id.into());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewCustomer {
    pub name: String,
    pub rut: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct BranchRow {
    id: String,
    tenant_id: String,
    name: String,
    address: Option<String>,
    phone: Option<String>,
    is_main: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<BranchRow> for Branch {
    fn from(row: BranchRow) -> Self {
        Branch {
            id: row.id,
            tenant_id: TenantId::new(row.tenant_id),
            name: row.name,
            address: row.address,
            phone: row.phone,
            is_main: row.is_main,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RegisterRow {
    id: String,
    tenant_id: String,
    branch_id: String,
    name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<RegisterRow> for CashRegister {
    fn from(row: RegisterRow) -> Self {
        CashRegister {
            id: row.id,
            tenant_id: TenantId::new(row.tenant_id),
            branch_id: row.branch_id,
            name: row.name,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StaffRow {
    id: String,
    tenant_id: String,
    username: String,
    full_name: Option<String>,
    role: Role,
    branch_id: Option<String>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<StaffRow> for Staff {
    fn from(row: StaffRow) -> Self {
        Staff {
            id: row.id,
            tenant_id: TenantId::new(row.tenant_id),
            username: row.username,
            full_name: row.full_name,
            role: row.role,
            branch_id: row.branch_id,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    tenant_id: String,
    name: String,
    rut: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            tenant_id: TenantId::new(row.tenant_id),
            name: row.name,
            rut: row.rut,
            email: row.email,
            phone: row.phone,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// Executor-level lookups (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch_register<'e, E>(
    executor: E,
    tenant_id: &TenantId,
    register_id: &str,
) -> DbResult<Option<CashRegister>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, RegisterRow>(
        r#"
        SELECT id, tenant_id, branch_id, name, is_active, created_at
        FROM cash_registers
        WHERE id = ?1 AND tenant_id = ?2
        "#,
    )
    .bind(register_id)
    .bind(tenant_id.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(row.map(CashRegister::from))
}

/// First active register of the tenant, ordered by name.
pub(crate) async fn first_active_register<'e, E>(
    executor: E,
    tenant_id: &TenantId,
) -> DbResult<Option<CashRegister>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, RegisterRow>(
        r#"
        SELECT id, tenant_id, branch_id, name, is_active, created_at
        FROM cash_registers
        WHERE tenant_id = ?1 AND is_active = 1
        ORDER BY name, id
        LIMIT 1
        "#,
    )
    .bind(tenant_id.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(row.map(CashRegister::from))
}

pub(crate) async fn fetch_staff<'e, E>(
    executor: E,
    tenant_id: &TenantId,
    staff_id: &str,
) -> DbResult<Option<Staff>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let row = sqlx::query_as::<_, StaffRow>(
        r#"
        SELECT id, tenant_id, username, full_name, role, branch_id, is_active, created_at
        FROM staff
        WHERE id = ?1 AND tenant_id = ?2
        "#,
    )
    .bind(staff_id)
    .bind(tenant_id.as_str())
    .fetch_optional(executor)
    .await?;

    Ok(row.map(Staff::from))
}

pub(crate) async fn customer_exists<'e, E>(
    executor: E,
    tenant_id: &TenantId,
    customer_id: &str,
) -> DbResult<bool>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let found: Option<i64> =
        sqlx::query_scalar("SELECT 1 FROM customers WHERE id = ?1 AND tenant_id = ?2")
            .bind(customer_id)
            .bind(tenant_id.as_str())
            .fetch_optional(executor)
            .await?;

    Ok(found.is_some())
}

// =============================================================================
// StoreRepository
// =============================================================================

/// Tenant-scoped access to the store structure and its people.
#[derive(Debug, Clone)]
pub struct StoreRepository {
    pool: SqlitePool,
    scope: TenantScope,
}

impl StoreRepository {
    pub fn new(pool: SqlitePool, scope: TenantScope) -> Self {
        StoreRepository { pool, scope }
    }

    fn tenant_id(&self) -> &TenantId {
        self.scope.tenant_id()
    }

    // -------------------------------------------------------------------------
    // Branches
    // -------------------------------------------------------------------------

    pub async fn create_branch(&self, new: NewBranch) -> DbResult<Branch> {
        validate_name("name", &new.name, 100)?;

        let branch = Branch {
            id: new_id(),
            tenant_id: self.tenant_id().clone(),
            name: new.name.trim().to_string(),
            address: new.address,
            phone: new.phone,
            is_main: new.is_main,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO branches (id, tenant_id, name, address, phone, is_main, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&branch.id)
        .bind(branch.tenant_id.as_str())
        .bind(&branch.name)
        .bind(&branch.address)
        .bind(&branch.phone)
        .bind(branch.is_main)
        .bind(branch.is_active)
        .bind(branch.created_at)
        .execute(&self.pool)
        .await?;

        info!(tenant_id = %branch.tenant_id, branch_id = %branch.id, name = %branch.name, "Branch created");
        Ok(branch)
    }

    pub async fn list_branches(&self) -> DbResult<Vec<Branch>> {
        let rows = sqlx::query_as::<_, BranchRow>(
            r#"
            SELECT id, tenant_id, name, address, phone, is_main, is_active, created_at
            FROM branches
            WHERE tenant_id = ?1
            ORDER BY is_main DESC, name, id
            "#,
        )
        .bind(self.tenant_id().as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Branch::from).collect())
    }

    // -------------------------------------------------------------------------
    // Cash registers
    // -------------------------------------------------------------------------

    /// Creates a register in one of this tenant's branches.
    ///
    /// The branch is checked by the INSERT itself; a branch of another
    /// tenant yields `NotFound`.
    pub async fn create_register(&self, new: NewRegister) -> DbResult<CashRegister> {
        validate_name("name", &new.name, 100)?;

        let register = CashRegister {
            id: new_id(),
            tenant_id: self.tenant_id().clone(),
            branch_id: new.branch_id,
            name: new.name.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO cash_registers (id, tenant_id, branch_id, name, is_active, created_at)
            SELECT ?1, b.tenant_id, b.id, ?4, ?5, ?6
            FROM branches b
            WHERE b.id = ?3 AND b.tenant_id = ?2
            "#,
        )
        .bind(&register.id)
        .bind(register.tenant_id.as_str())
        .bind(&register.branch_id)
        .bind(&register.name)
        .bind(register.is_active)
        .bind(register.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Branch", register.branch_id));
        }

        info!(
            tenant_id = %register.tenant_id,
            register_id = %register.id,
            name = %register.name,
            "Cash register created"
        );
        Ok(register)
    }

    pub async fn get_register(&self, register_id: &str) -> DbResult<Option<CashRegister>> {
        fetch_register(&self.pool, self.tenant_id(), register_id).await
    }

    /// Active registers, optionally limited to one branch, ordered by name.
    pub async fn active_registers(&self, branch_id: Option<&str>) -> DbResult<Vec<CashRegister>> {
        let rows = sqlx::query_as::<_, RegisterRow>(
            r#"
            SELECT id, tenant_id, branch_id, name, is_active, created_at
            FROM cash_registers
            WHERE tenant_id = ?1
              AND is_active = 1
              AND (?2 IS NULL OR branch_id = ?2)
            ORDER BY name, id
            "#,
        )
        .bind(self.tenant_id().as_str())
        .bind(branch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CashRegister::from).collect())
    }

    pub async fn set_register_active(&self, register_id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE cash_registers SET is_active = ?3 WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(register_id)
        .bind(self.tenant_id().as_str())
        .bind(active)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("CashRegister", register_id));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Staff
    // -------------------------------------------------------------------------

    /// Creates a staff member.
    ///
    /// ## Errors
    /// - `UniqueViolation` if the username is taken within this tenant
    /// - `NotFound` if `branch_id` is not one of this tenant's branches
    pub async fn create_staff(&self, new: NewStaff) -> DbResult<Staff> {
        let username = new.username.trim().to_lowercase();
        validate_name("username", &username, 50)?;

        if let Some(branch_id) = &new.branch_id {
            let exists: Option<i64> =
                sqlx::query_scalar("SELECT 1 FROM branches WHERE id = ?1 AND tenant_id = ?2")
                    .bind(branch_id)
                    .bind(self.tenant_id().as_str())
                    .fetch_optional(&self.pool)
                    .await?;
            if exists.is_none() {
                return Err(DbError::not_found("Branch", branch_id.clone()));
            }
        }

        let staff = Staff {
            id: new_id(),
            tenant_id: self.tenant_id().clone(),
            username,
            full_name: new.full_name.filter(|n| !n.trim().is_empty()),
            role: new.role,
            branch_id: new.branch_id,
            is_active: true,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO staff (id, tenant_id, username, full_name, role, branch_id, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&staff.id)
        .bind(staff.tenant_id.as_str())
        .bind(&staff.username)
        .bind(&staff.full_name)
        .bind(staff.role)
        .bind(&staff.branch_id)
        .bind(staff.is_active)
        .bind(staff.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_violation_on("staff.") => {
                DbError::duplicate("username", staff.username.clone())
            }
            err => err,
        })?;

        info!(
            tenant_id = %staff.tenant_id,
            staff_id = %staff.id,
            username = %staff.username,
            role = %staff.role,
            "Staff member created"
        );
        Ok(staff)
    }

    pub async fn get_staff(&self, staff_id: &str) -> DbResult<Option<Staff>> {
        fetch_staff(&self.pool, self.tenant_id(), staff_id).await
    }

    pub async fn get_staff_by_username(&self, username: &str) -> DbResult<Option<Staff>> {
        let row = sqlx::query_as::<_, StaffRow>(
            r#"
            SELECT id, tenant_id, username, full_name, role, branch_id, is_active, created_at
            FROM staff
            WHERE tenant_id = ?1 AND username = ?2
            "#,
        )
        .bind(self.tenant_id().as_str())
        .bind(username.trim().to_lowercase())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Staff::from))
    }

    pub async fn set_staff_active(&self, staff_id: &str, active: bool) -> DbResult<()> {
        let result =
            sqlx::query("UPDATE staff SET is_active = ?3 WHERE id = ?1 AND tenant_id = ?2")
                .bind(staff_id)
                .bind(self.tenant_id().as_str())
                .bind(active)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Staff", staff_id));
        }

        debug!(staff_id, active, "Staff activation changed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    /// Creates a customer. A RUT, when given, is validated and canonicalised.
    pub async fn create_customer(&self, new: NewCustomer) -> DbResult<Customer> {
        validate_name("name", &new.name, 200)?;
        let rut = match new.rut.as_deref().map(str::trim) {
            Some(rut) if !rut.is_empty() => Some(validate_rut(rut)?),
            _ => None,
        };

        let customer = Customer {
            id: new_id(),
            tenant_id: self.tenant_id().clone(),
            name: new.name.trim().to_string(),
            rut,
            email: new.email,
            phone: new.phone,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO customers (id, tenant_id, name, rut, email, phone, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(customer.tenant_id.as_str())
        .bind(&customer.name)
        .bind(&customer.rut)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        debug!(customer_id = %customer.id, "Customer created");
        Ok(customer)
    }

    pub async fn get_customer(&self, customer_id: &str) -> DbResult<Option<Customer>> {
        let row = sqlx::query_as::<_, CustomerRow>(
            r#"
            SELECT id, tenant_id, name, rut, email, phone, created_at
            FROM customers
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(customer_id)
        .bind(self.tenant_id().as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Customer::from))
    }
}
