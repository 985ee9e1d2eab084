//! # Shift Repository
//!
//! Read access to cashier shifts. Opening and closing go through
//! [`ShiftManager`](crate::engine::ShiftManager).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use caja_core::{Money, Shift, TenantId};

use crate::error::DbResult;
use crate::scope::TenantScope;

#[derive(Debug, sqlx::FromRow)]
struct ShiftRow {
    id: String,
    tenant_id: String,
    register_id: String,
    cashier_id: String,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    opening_cash: i64,
    closing_cash: Option<i64>,
    notes: String,
}

impl From<ShiftRow> for Shift {
    fn from(row: ShiftRow) -> Self {
        Shift {
            id: row.id,
            tenant_id: TenantId::new(row.tenant_id),
            register_id: row.register_id,
            cashier_id: row.cashier_id,
            opened_at: row.opened_at,
            closed_at: row.closed_at,
            opening_cash: Money::from_pesos(row.opening_cash),
            closing_cash: row.closing_cash.map(Money::from_pesos),
            notes: row.notes,
        }
    }
}

const SHIFT_COLUMNS: &str =
    "id, tenant_id, register_id, cashier_id, opened_at, closed_at, opening_cash, closing_cash, notes";

pub(crate) async fn fetch_shift<'e, E>(
    executor: E,
    tenant_id: &TenantId,
    shift_id: &str,
) -> DbResult<Option<Shift>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM shifts WHERE id = ?1 AND tenant_id = ?2",
        SHIFT_COLUMNS
    );
    let row = sqlx::query_as::<_, ShiftRow>(&sql)
        .bind(shift_id)
        .bind(tenant_id.as_str())
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Shift::from))
}

/// The open shift held by `cashier_id`, most recent first.
pub(crate) async fn fetch_open_for_cashier<'e, E>(
    executor: E,
    tenant_id: &TenantId,
    cashier_id: &str,
) -> DbResult<Option<Shift>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let sql = format!(
        r#"
        SELECT {}
        FROM shifts
        WHERE tenant_id = ?1 AND cashier_id = ?2 AND closed_at IS NULL
        ORDER BY opened_at DESC
        LIMIT 1
        "#,
        SHIFT_COLUMNS
    );
    let row = sqlx::query_as::<_, ShiftRow>(&sql)
        .bind(tenant_id.as_str())
        .bind(cashier_id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Shift::from))
}

pub(crate) async fn fetch_open_for_register<'e, E>(
    executor: E,
    tenant_id: &TenantId,
    register_id: &str,
) -> DbResult<Option<Shift>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM shifts WHERE tenant_id = ?1 AND register_id = ?2 AND closed_at IS NULL",
        SHIFT_COLUMNS
    );
    let row = sqlx::query_as::<_, ShiftRow>(&sql)
        .bind(tenant_id.as_str())
        .bind(register_id)
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Shift::from))
}

/// Tenant-scoped shift queries.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
    scope: TenantScope,
}

impl ShiftRepository {
    pub fn new(pool: SqlitePool, scope: TenantScope) -> Self {
        ShiftRepository { pool, scope }
    }

    pub async fn get(&self, shift_id: &str) -> DbResult<Option<Shift>> {
        fetch_shift(&self.pool, self.scope.tenant_id(), shift_id).await
    }

    /// The shift currently open on a register, if any.
    pub async fn open_for_register(&self, register_id: &str) -> DbResult<Option<Shift>> {
        fetch_open_for_register(&self.pool, self.scope.tenant_id(), register_id).await
    }

    /// The shift currently held by a cashier, if any.
    pub async fn open_for_cashier(&self, cashier_id: &str) -> DbResult<Option<Shift>> {
        fetch_open_for_cashier(&self.pool, self.scope.tenant_id(), cashier_id).await
    }

    /// All open shifts of the tenant.
    pub async fn list_open(&self) -> DbResult<Vec<Shift>> {
        let sql = format!(
            "SELECT {} FROM shifts WHERE tenant_id = ?1 AND closed_at IS NULL ORDER BY opened_at",
            SHIFT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ShiftRow>(&sql)
            .bind(self.scope.tenant_id().as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Shift::from).collect())
    }

    /// Shift history of a register, newest first.
    pub async fn list_for_register(&self, register_id: &str, limit: u32) -> DbResult<Vec<Shift>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM shifts
            WHERE tenant_id = ?1 AND register_id = ?2
            ORDER BY opened_at DESC
            LIMIT ?3
            "#,
            SHIFT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ShiftRow>(&sql)
            .bind(self.scope.tenant_id().as_str())
            .bind(register_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Shift::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::fixtures::Store;
    use caja_core::Money;

    #[tokio::test]
    async fn test_open_shift_lookups_are_tenant_scoped() {
        let store = Store::new().await;
        let other = Store::provision(store.db.clone(), "Otra", "11.111.111-1", "otra").await;
        let shift = store
            .tdb
            .shift_manager()
            .open_shift(&store.register.id, &store.cashier, Money::from_pesos(5000))
            .await
            .unwrap();

        let shifts = store.tdb.shifts();
        let held = shifts.open_for_cashier(&store.cashier.id).await.unwrap().unwrap();
        assert_eq!(held.id, shift.id);
        assert_eq!(held.opening_cash, Money::from_pesos(5000));
        assert_eq!(shifts.list_open().await.unwrap().len(), 1);
        assert!(shifts.open_for_cashier(&store.supervisor.id).await.unwrap().is_none());

        let foreign = other.tdb.shifts();
        assert!(foreign.get(&shift.id).await.unwrap().is_none());
        assert!(foreign.open_for_register(&store.register.id).await.unwrap().is_none());
        assert!(foreign.list_open().await.unwrap().is_empty());
    }
}
