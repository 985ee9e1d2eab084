//! # Report Repository
//!
//! Sales figures for dashboards. Numbers only, no rendering.
//!
//! Every figure counts only orders with `is_paid = 1 AND is_voided = 0`;
//! voided orders are reported separately as a count.
//!
//! Windows are half-open: `from <= created_at < to`. Calendar days are UTC
//! days, the same days order numbers are counted in.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use caja_core::{FiscalBreakdown, Money, PaymentMethod, Quantity, ValidationError};

use crate::error::DbResult;
use crate::scope::TenantScope;

/// Totals for a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesSummary {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub order_count: i64,
    pub gross: Money,
    pub net: Money,
    pub tax: Money,
    /// Gross divided by order count, truncated. Zero without orders.
    pub average_ticket: Money,
    pub voided_count: i64,
}

/// Revenue collected through one payment method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentBreakdown {
    pub method: PaymentMethod,
    pub payment_count: i64,
    pub total: Money,
}

/// Revenue against cost-at-sale for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProductMargin {
    pub product_id: String,
    pub name: String,
    pub quantity: Quantity,
    pub revenue: Money,
    pub cost: Money,
    pub margin: Money,
}

/// Best sellers by revenue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub product_id: String,
    pub name: String,
    pub sku: String,
    pub quantity: Quantity,
    pub revenue: Money,
}

/// Paid, non-voided sales of one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailySales {
    pub date: NaiveDate,
    pub order_count: i64,
    pub total: Money,
}

#[derive(Debug, sqlx::FromRow)]
struct TotalsRow {
    order_count: i64,
    gross: i64,
    net: i64,
    tax: i64,
    voided_count: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct MethodRow {
    method: PaymentMethod,
    payment_count: i64,
    total: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct TopProductRow {
    product_id: String,
    name: String,
    sku: String,
    quantity_milli: i64,
    revenue: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct DayRow {
    day: String,
    order_count: i64,
    total: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct SoldLineRow {
    product_id: String,
    name_snapshot: String,
    quantity_milli: i64,
    unit_cost_clp: i64,
    line_total_clp: i64,
}

/// Tenant-scoped reporting queries.
#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
    scope: TenantScope,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool, scope: TenantScope) -> Self {
        ReportRepository { pool, scope }
    }

    pub async fn sales_summary(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<SalesSummary> {
        let row = sqlx::query_as::<_, TotalsRow>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN is_paid = 1 AND is_voided = 0 THEN 1 ELSE 0 END), 0) AS order_count,
                COALESCE(SUM(CASE WHEN is_paid = 1 AND is_voided = 0 THEN total_clp ELSE 0 END), 0) AS gross,
                COALESCE(SUM(CASE WHEN is_paid = 1 AND is_voided = 0 THEN net_clp ELSE 0 END), 0) AS net,
                COALESCE(SUM(CASE WHEN is_paid = 1 AND is_voided = 0 THEN tax_clp ELSE 0 END), 0) AS tax,
                COALESCE(SUM(CASE WHEN is_voided = 1 THEN 1 ELSE 0 END), 0) AS voided_count
            FROM orders
            WHERE tenant_id = ?1 AND created_at >= ?2 AND created_at < ?3
            "#,
        )
        .bind(self.scope.tenant_id().as_str())
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        let average_ticket = if row.order_count > 0 {
            Money::from_pesos(row.gross / row.order_count)
        } else {
            Money::zero()
        };

        Ok(SalesSummary {
            from,
            to,
            order_count: row.order_count,
            gross: Money::from_pesos(row.gross),
            net: Money::from_pesos(row.net),
            tax: Money::from_pesos(row.tax),
            average_ticket,
            voided_count: row.voided_count,
        })
    }

    /// Fiscal split of the window's gross at the tenant's tax rate.
    ///
    /// Differs from summing per-order net/tax by at most one peso per order.
    pub async fn fiscal_for(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<FiscalBreakdown> {
        let summary = self.sales_summary(from, to).await?;
        Ok(FiscalBreakdown::from_gross(summary.gross, self.scope.tax_rate()))
    }

    /// Revenue per payment method, largest first.
    pub async fn payment_breakdown(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<PaymentBreakdown>> {
        let rows = sqlx::query_as::<_, MethodRow>(
            r#"
            SELECT p.method AS method,
                   COUNT(*) AS payment_count,
                   COALESCE(SUM(p.amount_clp), 0) AS total
            FROM payments p
            JOIN orders o ON o.id = p.order_id
            WHERE o.tenant_id = ?1
              AND o.is_paid = 1 AND o.is_voided = 0
              AND o.created_at >= ?2 AND o.created_at < ?3
            GROUP BY p.method
            ORDER BY total DESC, p.method
            "#,
        )
        .bind(self.scope.tenant_id().as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PaymentBreakdown {
                method: row.method,
                payment_count: row.payment_count,
                total: Money::from_pesos(row.total),
            })
            .collect())
    }

    /// Margin per product from the prices and costs recorded at sale time,
    /// highest margin first.
    pub async fn product_margins(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<ProductMargin>> {
        let rows = sqlx::query_as::<_, SoldLineRow>(
            r#"
            SELECT i.product_id, i.name_snapshot, i.quantity_milli,
                   i.unit_cost_clp, i.line_total_clp
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            WHERE o.tenant_id = ?1
              AND o.is_paid = 1 AND o.is_voided = 0
              AND o.created_at >= ?2 AND o.created_at < ?3
            ORDER BY o.created_at
            "#,
        )
        .bind(self.scope.tenant_id().as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut by_product: BTreeMap<String, ProductMargin> = BTreeMap::new();
        for row in rows {
            let quantity = Quantity::from_milli(row.quantity_milli);
            let cost = Money::from_pesos(row.unit_cost_clp).times(quantity)?;
            let revenue = Money::from_pesos(row.line_total_clp);

            let entry = by_product
                .entry(row.product_id.clone())
                .or_insert_with(|| ProductMargin {
                    product_id: row.product_id,
                    name: row.name_snapshot,
                    quantity: Quantity::zero(),
                    revenue: Money::zero(),
                    cost: Money::zero(),
                    margin: Money::zero(),
                });
            entry.quantity = entry.quantity + quantity;
            entry.revenue = entry.revenue.checked_add(revenue, "revenue")?;
            entry.cost = entry.cost.checked_add(cost, "cost")?;
            entry.margin = entry.revenue.checked_sub(entry.cost, "margin")?;
        }

        let mut margins: Vec<ProductMargin> = by_product.into_values().collect();
        margins.sort_by(|a, b| b.margin.cmp(&a.margin).then_with(|| a.name.cmp(&b.name)));
        Ok(margins)
    }

    /// The `limit` products with the most revenue in the window.
    ///
    /// Names and SKUs are the products' current ones.
    pub async fn top_products(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> DbResult<Vec<TopProduct>> {
        let rows = sqlx::query_as::<_, TopProductRow>(
            r#"
            SELECT i.product_id AS product_id,
                   p.name AS name,
                   p.sku AS sku,
                   SUM(i.quantity_milli) AS quantity_milli,
                   SUM(i.line_total_clp) AS revenue
            FROM order_items i
            JOIN orders o ON o.id = i.order_id
            JOIN products p ON p.id = i.product_id AND p.tenant_id = o.tenant_id
            WHERE o.tenant_id = ?1
              AND o.is_paid = 1 AND o.is_voided = 0
              AND o.created_at >= ?2 AND o.created_at < ?3
            GROUP BY i.product_id, p.name, p.sku
            ORDER BY revenue DESC, p.name
            LIMIT ?4
            "#,
        )
        .bind(self.scope.tenant_id().as_str())
        .bind(from)
        .bind(to)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TopProduct {
                product_id: row.product_id,
                name: row.name,
                sku: row.sku,
                quantity: Quantity::from_milli(row.quantity_milli),
                revenue: Money::from_pesos(row.revenue),
            })
            .collect())
    }

    /// One entry per day for the `days` days ending on `last_day`, oldest
    /// first. Days without sales are present with zeros.
    ///
    /// ```text
    /// daily_sales(2026-03-07, 7)
    ///   → 03-01, 03-02, 03-03, 03-04, 03-05, 03-06, 03-07
    /// ```
    pub async fn daily_sales(&self, last_day: NaiveDate, days: u32) -> DbResult<Vec<DailySales>> {
        if days == 0 {
            return Ok(Vec::new());
        }

        let out_of_range = || ValidationError::OutOfRange {
            field: "days".to_string(),
            min: 1,
            max: i64::from(u32::MAX),
        };
        let first_day = last_day
            .checked_sub_signed(Duration::days(i64::from(days) - 1))
            .ok_or_else(out_of_range)?;
        let end_day = last_day.succ_opt().ok_or_else(out_of_range)?;

        let from = Utc.from_utc_datetime(&first_day.and_time(NaiveTime::MIN));
        let to = Utc.from_utc_datetime(&end_day.and_time(NaiveTime::MIN));

        let rows = sqlx::query_as::<_, DayRow>(
            r#"
            SELECT substr(created_at, 1, 10) AS day,
                   COUNT(*) AS order_count,
                   COALESCE(SUM(total_clp), 0) AS total
            FROM orders
            WHERE tenant_id = ?1
              AND is_paid = 1 AND is_voided = 0
              AND created_at >= ?2 AND created_at < ?3
            GROUP BY day
            "#,
        )
        .bind(self.scope.tenant_id().as_str())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let by_day: BTreeMap<String, DayRow> = rows.into_iter().map(|row| (row.day.clone(), row)).collect();

        Ok(first_day
            .iter_days()
            .take(days as usize)
            .map(|date| match by_day.get(&date.format("%Y-%m-%d").to_string()) {
                Some(row) => DailySales {
                    date,
                    order_count: row.order_count,
                    total: Money::from_pesos(row.total),
                },
                None => DailySales {
                    date,
                    order_count: 0,
                    total: Money::zero(),
                },
            })
            .collect())
    }
}
