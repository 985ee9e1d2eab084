//! # Batch Repository
//!
//! Lots of a product with their expiration dates, and the alerts built on
//! them.
//!
//! ## Alert Windows
//! ```text
//!            expired               expiring(today, days)
//!   ◄──────────────────────┤├──────────────────────────────┤
//!                        today                      today + days
//!   expiration_date < today     today <= expiration_date <= today + days
//!
//!   Both lists skip batches with nothing left (current_quantity = 0)
//!   and are ordered by expiration date, soonest first.
//! ```
//!
//! Batches are bookkeeping next to `products.stock_milli`; receiving or
//! counting a batch never moves sellable stock.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{debug, info};

use caja_core::validation::validate_quantity;
use caja_core::{Batch, Quantity, TenantId, ValidationError};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::scope::TenantScope;

/// Input for [`BatchRepository::insert`].
#[derive(Debug, Clone)]
pub struct NewBatch {
    pub product_id: String,
    pub batch_number: String,
    pub expiration_date: NaiveDate,
    pub quantity: Quantity,
}

impl NewBatch {
    pub fn new(
        product_id: impl Into<String>,
        batch_number: impl Into<String>,
        expiration_date: NaiveDate,
        quantity: Quantity,
    ) -> Self {
        NewBatch {
            product_id: product_id.into(),
            batch_number: batch_number.into(),
            expiration_date,
            quantity,
        }
    }
}

/// A batch that needs attention, with the product it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchAlert {
    pub batch: Batch,
    pub product_name: String,
    pub sku: String,
    /// Negative for expired batches.
    pub days_to_expiration: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct BatchRow {
    id: String,
    tenant_id: String,
    product_id: String,
    batch_number: String,
    expiration_date: NaiveDate,
    quantity_milli: i64,
    current_quantity_milli: i64,
    created_at: DateTime<Utc>,
}

impl From<BatchRow> for Batch {
    fn from(row: BatchRow) -> Self {
        Batch {
            id: row.id,
            tenant_id: TenantId::new(row.tenant_id),
            product_id: row.product_id,
            batch_number: row.batch_number,
            expiration_date: row.expiration_date,
            quantity: Quantity::from_milli(row.quantity_milli),
            current_quantity: Quantity::from_milli(row.current_quantity_milli),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AlertRow {
    #[sqlx(flatten)]
    batch: BatchRow,
    product_name: String,
    sku: String,
}

const BATCH_COLUMNS: &str = "b.id, b.tenant_id, b.product_id, b.batch_number, b.expiration_date, \
     b.quantity_milli, b.current_quantity_milli, b.created_at";

/// Tenant-scoped batch tracking.
#[derive(Debug, Clone)]
pub struct BatchRepository {
    pool: SqlitePool,
    scope: TenantScope,
}

impl BatchRepository {
    pub fn new(pool: SqlitePool, scope: TenantScope) -> Self {
        BatchRepository { pool, scope }
    }

    fn tenant_id(&self) -> &TenantId {
        self.scope.tenant_id()
    }

    /// Records a received lot. The whole quantity starts on hand.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for a blank batch number or a non-positive quantity
    /// - `NotFound` if the product is not this tenant's
    /// - `UniqueViolation` if the product already has that batch number
    pub async fn insert(&self, new: NewBatch) -> DbResult<Batch> {
        let batch_number = new.batch_number.trim().to_string();
        if batch_number.is_empty() {
            return Err(ValidationError::Required {
                field: "batch_number".to_string(),
            }
            .into());
        }
        if batch_number.chars().count() > 50 {
            return Err(ValidationError::TooLong {
                field: "batch_number".to_string(),
                max: 50,
            }
            .into());
        }
        validate_quantity(new.quantity)?;

        let batch = Batch {
            id: new_id(),
            tenant_id: self.tenant_id().clone(),
            product_id: new.product_id,
            batch_number,
            expiration_date: new.expiration_date,
            quantity: new.quantity,
            current_quantity: new.quantity,
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO batches (
                id, tenant_id, product_id, batch_number, expiration_date,
                quantity_milli, current_quantity_milli, created_at
            )
            SELECT ?1, p.tenant_id, p.id, ?4, ?5, ?6, ?6, ?7
            FROM products p
            WHERE p.id = ?3 AND p.tenant_id = ?2
            "#,
        )
        .bind(&batch.id)
        .bind(batch.tenant_id.as_str())
        .bind(&batch.product_id)
        .bind(&batch.batch_number)
        .bind(batch.expiration_date)
        .bind(batch.quantity.milli())
        .bind(batch.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_violation_on("batches.") => {
                DbError::duplicate("batch_number", batch.batch_number.clone())
            }
            err => err,
        })?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", batch.product_id));
        }

        info!(
            tenant_id = %batch.tenant_id,
            product_id = %batch.product_id,
            batch_number = %batch.batch_number,
            expires = %batch.expiration_date,
            quantity = %batch.quantity,
            "Batch received"
        );
        Ok(batch)
    }

    pub async fn get(&self, batch_id: &str) -> DbResult<Option<Batch>> {
        let sql = format!(
            "SELECT {} FROM batches b WHERE b.id = ?1 AND b.tenant_id = ?2",
            BATCH_COLUMNS
        );
        let row = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(batch_id)
            .bind(self.tenant_id().as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Batch::from))
    }

    /// Batches of one product, soonest expiration first, empty ones included.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<Batch>> {
        let sql = format!(
            "SELECT {} FROM batches b WHERE b.product_id = ?1 AND b.tenant_id = ?2 \
             ORDER BY b.expiration_date, b.batch_number",
            BATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(product_id)
            .bind(self.tenant_id().as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Batch::from).collect())
    }

    /// Sets what is left of a batch after a physical count.
    pub async fn set_remaining(&self, batch_id: &str, remaining: Quantity) -> DbResult<()> {
        if remaining.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "current_quantity".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let result = sqlx::query(
            "UPDATE batches SET current_quantity_milli = ?3 WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(batch_id)
        .bind(self.tenant_id().as_str())
        .bind(remaining.milli())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Batch", batch_id));
        }

        debug!(batch_id, remaining = %remaining, "Batch count updated");
        Ok(())
    }

    /// Batches with stock left that expire between `today` and
    /// `today + days`, both inclusive.
    pub async fn expiring(&self, today: NaiveDate, days: u32) -> DbResult<Vec<BatchAlert>> {
        let until = today
            .checked_add_signed(Duration::days(i64::from(days) + 1))
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "days".to_string(),
                min: 0,
                max: i64::from(u32::MAX),
            })?;

        self.alerts(today, Some(today), until).await
    }

    /// Batches with stock left whose expiration date is before `today`.
    pub async fn expired(&self, today: NaiveDate) -> DbResult<Vec<BatchAlert>> {
        self.alerts(today, None, today).await
    }

    /// Alerts for `from <= expiration_date < until`; no lower bound when
    /// `from` is `None`.
    async fn alerts(
        &self,
        today: NaiveDate,
        from: Option<NaiveDate>,
        until: NaiveDate,
    ) -> DbResult<Vec<BatchAlert>> {
        let sql = format!(
            r#"
            SELECT {}, p.name AS product_name, p.sku AS sku
            FROM batches b
            JOIN products p ON p.id = b.product_id AND p.tenant_id = b.tenant_id
            WHERE b.tenant_id = ?1
              AND b.current_quantity_milli > 0
              AND (?2 IS NULL OR b.expiration_date >= ?2)
              AND b.expiration_date < ?3
            ORDER BY b.expiration_date, p.name
            "#,
            BATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, AlertRow>(&sql)
            .bind(self.tenant_id().as_str())
            .bind(from)
            .bind(until)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let batch = Batch::from(row.batch);
                BatchAlert {
                    days_to_expiration: batch.days_to_expiration(today),
                    batch,
                    product_name: row.product_name,
                    sku: row.sku,
                }
            })
            .collect())
    }
}
