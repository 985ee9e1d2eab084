//! # Shift Manager
//!
//! Opens and closes cash-register shifts and reconciles the till.
//!
//! ## State Machine (per register)
//! ```text
//!            open_shift                      close_shift
//!  Closed ───────────────►  Open  ─────────────────────────►  Closed
//!  (no open row)          closed_at NULL                    closed_at set
//!                                                           (terminal; the
//!                                                           next open is a
//!                                                           new row)
//! ```
//! "At most one open shift per register" is the partial unique index
//! `idx_shifts_one_open_per_register`; two simultaneous opens cannot both
//! insert, whatever the interleaving.
//!
//! ## Reconciliation
//! ```text
//! total_sales   = Σ order.total   (paid, not voided, this shift)
//! total_cash    = Σ payment.amount where method = CASH (same orders)
//! expected_cash = opening_cash + total_cash
//! difference    = closing_cash − expected_cash    (< 0 short, > 0 over)
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};

use caja_core::validation::validate_cash_amount;
use caja_core::{authz, Action, CoreError, Money, Shift, ShiftSummary, Staff, TenantId};

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::shift::fetch_shift;
use crate::scope::TenantScope;

/// Shift lifecycle for one tenant.
#[derive(Debug, Clone)]
pub struct ShiftManager {
    pool: SqlitePool,
    scope: TenantScope,
}

impl ShiftManager {
    pub fn new(pool: SqlitePool, scope: TenantScope) -> Self {
        ShiftManager { pool, scope }
    }

    /// Opens a shift on `register_id` for `cashier`.
    ///
    /// ## Errors
    /// - `ShiftAlreadyOpen` naming the register and whoever holds it
    /// - `RegisterNotFound` for an unknown, foreign or inactive register
    /// - `Validation` for negative opening cash
    pub async fn open_shift(&self, register_id: &str, cashier: &Staff, opening_cash: Money) -> DbResult<Shift> {
        authz::ensure(cashier, Action::OpenShift)?;
        self.scope.ensure_owns("Staff", &cashier.tenant_id)?;
        validate_cash_amount("opening_cash", opening_cash)?;

        let tenant_id = self.scope.tenant_id();
        let shift = Shift {
            id: new_id(),
            tenant_id: tenant_id.clone(),
            register_id: register_id.to_string(),
            cashier_id: cashier.id.clone(),
            opened_at: Utc::now(),
            closed_at: None,
            opening_cash,
            closing_cash: None,
            notes: String::new(),
        };

        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO shifts (
                id, tenant_id, register_id, cashier_id, opened_at,
                closed_at, opening_cash, closing_cash, notes
            )
            SELECT ?1, r.tenant_id, r.id, ?4, ?5, NULL, ?6, NULL, ''
            FROM cash_registers r
            WHERE r.id = ?3 AND r.tenant_id = ?2 AND r.is_active = 1
            "#,
        )
        .bind(&shift.id)
        .bind(tenant_id.as_str())
        .bind(register_id)
        .bind(&shift.cashier_id)
        .bind(shift.opened_at)
        .bind(shift.opening_cash.pesos())
        .execute(&mut *tx)
        .await;

        let result = match inserted {
            Ok(result) => result,
            Err(e) => {
                let err = DbError::from(e);
                if err.is_unique_violation_on("shifts.register_id") {
                    return Err(Self::already_open(&mut *tx, tenant_id, register_id).await);
                }
                return Err(err);
            }
        };

        if result.rows_affected() == 0 {
            return Err(CoreError::RegisterNotFound(register_id.to_string()).into());
        }

        tx.commit().await?;

        info!(
            tenant_id = %tenant_id,
            shift_id = %shift.id,
            register_id,
            cashier = %cashier.username,
            opening_cash = %opening_cash,
            "Shift opened"
        );
        Ok(shift)
    }

    /// Closes a shift and returns the reconciliation.
    ///
    /// Cashiers may only close their own shift; supervisors and above may
    /// close any.
    ///
    /// ## Errors
    /// - `ShiftClosed` if it was already closed
    /// - `ShiftNotFound` if it is not this tenant's
    /// - `Forbidden` for a cashier closing someone else's shift
    pub async fn close_shift(
        &self,
        shift_id: &str,
        actor: &Staff,
        closing_cash: Money,
        notes: &str,
    ) -> DbResult<ShiftSummary> {
        authz::ensure(actor, Action::CloseShift)?;
        self.scope.ensure_owns("Staff", &actor.tenant_id)?;
        validate_cash_amount("closing_cash", closing_cash)?;

        let tenant_id = self.scope.tenant_id();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE shifts
            SET closed_at = ?3, closing_cash = ?4, notes = ?5
            WHERE id = ?1
              AND tenant_id = ?2
              AND closed_at IS NULL
              AND (cashier_id = ?6 OR ?7 = 1)
            "#,
        )
        .bind(shift_id)
        .bind(tenant_id.as_str())
        .bind(Utc::now())
        .bind(closing_cash.pesos())
        .bind(notes.trim())
        .bind(&actor.id)
        .bind(actor.role.is_supervisor_or_above())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            let err = match fetch_shift(&mut *tx, tenant_id, shift_id).await? {
                None => CoreError::ShiftNotFound(shift_id.to_string()),
                Some(shift) if !shift.is_open() => CoreError::ShiftClosed {
                    shift_id: shift_id.to_string(),
                },
                Some(_) => CoreError::Forbidden {
                    role: actor.role.to_string(),
                    action: "close another cashier's shift".to_string(),
                },
            };
            return Err(err.into());
        }

        let shift = fetch_shift(&mut *tx, tenant_id, shift_id)
            .await?
            .ok_or_else(|| DbError::Internal(format!("shift {} vanished while closing", shift_id)))?;
        let summary = Self::reconcile(&mut *tx, tenant_id, shift, closing_cash).await?;

        tx.commit().await?;

        if summary.difference.is_negative() {
            warn!(
                tenant_id = %tenant_id,
                shift_id,
                expected = %summary.expected_cash,
                counted = %summary.closing_cash,
                difference = %summary.difference,
                "Shift closed with cash shortfall"
            );
        } else {
            info!(
                tenant_id = %tenant_id,
                shift_id,
                orders = summary.order_count,
                total_sales = %summary.total_sales,
                difference = %summary.difference,
                "Shift closed"
            );
        }
        Ok(summary)
    }

    /// Figures for a shift, open or closed, without changing it.
    ///
    /// For an open shift the counted cash is taken as zero.
    pub async fn summary(&self, shift_id: &str) -> DbResult<ShiftSummary> {
        let tenant_id = self.scope.tenant_id();
        let mut conn = self.pool.acquire().await?;

        let shift = fetch_shift(&mut *conn, tenant_id, shift_id)
            .await?
            .ok_or_else(|| CoreError::ShiftNotFound(shift_id.to_string()))?;
        let counted = shift.closing_cash.unwrap_or_else(Money::zero);

        Self::reconcile(&mut *conn, tenant_id, shift, counted).await
    }

    async fn reconcile(
        conn: &mut SqliteConnection,
        tenant_id: &TenantId,
        shift: Shift,
        closing_cash: Money,
    ) -> DbResult<ShiftSummary> {
        let (order_count, total_sales): (i64, i64) = sqlx::query_as(
            r#"
            SELECT COUNT(*), COALESCE(SUM(total_clp), 0)
            FROM orders
            WHERE tenant_id = ?1 AND shift_id = ?2 AND is_paid = 1 AND is_voided = 0
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(&shift.id)
        .fetch_one(&mut *conn)
        .await?;

        let total_cash: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(p.amount_clp), 0)
            FROM payments p
            JOIN orders o ON o.id = p.order_id
            WHERE o.tenant_id = ?1
              AND o.shift_id = ?2
              AND o.is_paid = 1
              AND o.is_voided = 0
              AND p.method = 'CASH'
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(&shift.id)
        .fetch_one(&mut *conn)
        .await?;

        let total_cash = Money::from_pesos(total_cash);
        let expected_cash = shift.opening_cash.checked_add(total_cash, "expected_cash")?;
        let difference = closing_cash.checked_sub(expected_cash, "difference")?;

        Ok(ShiftSummary {
            total_sales: Money::from_pesos(total_sales),
            order_count,
            total_cash,
            expected_cash,
            closing_cash,
            difference,
            shift,
        })
    }

    /// Builds `ShiftAlreadyOpen` for a register whose open shift blocked an
    /// insert, naming the holder.
    async fn already_open(conn: &mut SqliteConnection, tenant_id: &TenantId, register_id: &str) -> DbError {
        let holder: Result<Option<(String, String)>, sqlx::Error> = sqlx::query_as(
            r#"
            SELECT r.name, COALESCE(NULLIF(st.full_name, ''), st.username)
            FROM shifts s
            JOIN cash_registers r ON r.id = s.register_id
            JOIN staff st ON st.id = s.cashier_id
            WHERE s.register_id = ?1 AND s.tenant_id = ?2 AND s.closed_at IS NULL
            "#,
        )
        .bind(register_id)
        .bind(tenant_id.as_str())
        .fetch_optional(&mut *conn)
        .await;

        let (register, holder) = match holder {
            Ok(Some(found)) => found,
            Ok(None) => (register_id.to_string(), "another cashier".to_string()),
            Err(e) => return e.into(),
        };

        warn!(tenant_id = %tenant_id, register = %register, holder = %holder, "Register already has an open shift");
        CoreError::ShiftAlreadyOpen { register, holder }.into()
    }
}
