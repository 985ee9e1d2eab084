//! # Order Repository
//!
//! Orders, their lines and their payments.
//!
//! ## Order Lifecycle
//! ```text
//! ┌──────────────┐  checkout commits  ┌──────────────┐  void   ┌──────────────┐
//! │  (nothing)   │ ─────────────────► │  PAID        │ ──────► │  VOIDED      │
//! └──────────────┘                    │  is_paid = 1 │         │  is_voided=1 │
//!                                     └──────────────┘         └──────────────┘
//! ```
//! An unpaid order only exists inside an open checkout transaction; readers
//! never see one. Voided orders keep their amounts and are excluded from
//! every revenue figure by `is_paid = 1 AND is_voided = 0`.
//!
//! ## Order Numbers
//! `YYYYMMDD-NNNN`, sequential per tenant and UTC day. The next number is
//! computed by the INSERT itself, under the write lock the checkout
//! transaction already holds, so two checkouts never draw the same number.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use caja_core::{
    FiscalBreakdown, Money, Order, OrderItem, Payment, PaymentMethod, Quantity, TenantId,
};

use crate::error::DbResult;
use crate::scope::TenantScope;

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    tenant_id: String,
    order_number: String,
    shift_id: Option<String>,
    branch_id: Option<String>,
    cashier_id: Option<String>,
    customer_id: Option<String>,
    total_clp: i64,
    net_clp: i64,
    tax_clp: i64,
    is_paid: bool,
    is_voided: bool,
    voided_by: Option<String>,
    void_reason: String,
    voided_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
    fn from(row: OrderRow) -> Self {
        Order {
            id: row.id,
            tenant_id: TenantId::new(row.tenant_id),
            order_number: row.order_number,
            shift_id: row.shift_id,
            branch_id: row.branch_id,
            cashier_id: row.cashier_id,
            customer_id: row.customer_id,
            total: Money::from_pesos(row.total_clp),
            net: Money::from_pesos(row.net_clp),
            tax: Money::from_pesos(row.tax_clp),
            is_paid: row.is_paid,
            is_voided: row.is_voided,
            voided_by: row.voided_by,
            void_reason: row.void_reason,
            voided_at: row.voided_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    id: String,
    order_id: String,
    product_id: String,
    name_snapshot: String,
    quantity_milli: i64,
    unit_price_clp: i64,
    unit_cost_clp: i64,
    line_total_clp: i64,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id,
            order_id: row.order_id,
            product_id: row.product_id,
            name_snapshot: row.name_snapshot,
            quantity: Quantity::from_milli(row.quantity_milli),
            unit_price: Money::from_pesos(row.unit_price_clp),
            unit_cost: Money::from_pesos(row.unit_cost_clp),
            line_total: Money::from_pesos(row.line_total_clp),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: String,
    tenant_id: String,
    order_id: String,
    amount_clp: i64,
    method: PaymentMethod,
    transaction_id: Option<String>,
    card_last_4: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<PaymentRow> for Payment {
    fn from(row: PaymentRow) -> Self {
        Payment {
            id: row.id,
            tenant_id: TenantId::new(row.tenant_id),
            order_id: row.order_id,
            amount: Money::from_pesos(row.amount_clp),
            method: row.method,
            transaction_id: row.transaction_id,
            card_last_4: row.card_last_4,
            created_at: row.created_at,
        }
    }
}

const ORDER_COLUMNS: &str = "id, tenant_id, order_number, shift_id, branch_id, cashier_id, \
     customer_id, total_clp, net_clp, tax_clp, is_paid, is_voided, voided_by, void_reason, \
     voided_at, created_at";

// =============================================================================
// Transaction-level operations
// =============================================================================

/// Daily prefix of order numbers, e.g. `20260314-`.
pub(crate) fn order_number_prefix(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d-").to_string()
}

/// Header of an order about to be created by a checkout.
#[derive(Debug)]
pub(crate) struct OrderHeader<'a> {
    pub id: &'a str,
    pub tenant_id: &'a TenantId,
    pub cashier_id: &'a str,
    pub customer_id: Option<&'a str>,
    pub created_at: DateTime<Utc>,
}

/// Inserts an unpaid, zero-total order linked to `shift_id`.
///
/// The row is only written if the shift belongs to the tenant and is still
/// open at this instant; branch comes from the shift's register. Returns
/// `false` when nothing was written.
///
/// A customer id that is not this tenant's is stored as NULL; callers
/// compare against what they asked for.
pub(crate) async fn insert_header_for_shift<'e, E>(
    executor: E,
    header: &OrderHeader<'_>,
    shift_id: &str,
) -> DbResult<bool>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        INSERT INTO orders (
            id, tenant_id, order_number, shift_id, branch_id, cashier_id, customer_id,
            total_clp, net_clp, tax_clp, is_paid, is_voided, void_reason, created_at
        )
        SELECT
            ?1,
            s.tenant_id,
            ?2 || printf('%04d', COALESCE((
                SELECT MAX(CAST(substr(o.order_number, 10) AS INTEGER))
                FROM orders o
                WHERE o.tenant_id = ?3 AND o.order_number LIKE ?2 || '%'
            ), 0) + 1),
            s.id,
            r.branch_id,
            ?5,
            (SELECT c.id FROM customers c WHERE c.id = ?6 AND c.tenant_id = ?3),
            0, 0, 0, 0, 0, '',
            ?7
        FROM shifts s
        JOIN cash_registers r ON r.id = s.register_id
        WHERE s.id = ?4 AND s.tenant_id = ?3 AND s.closed_at IS NULL
        "#,
    )
    .bind(header.id)
    .bind(order_number_prefix(header.created_at))
    .bind(header.tenant_id.as_str())
    .bind(shift_id)
    .bind(header.cashier_id)
    .bind(header.customer_id)
    .bind(header.created_at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Inserts an unpaid, zero-total order with no shift.
pub(crate) async fn insert_header_shiftless<'e, E>(
    executor: E,
    header: &OrderHeader<'_>,
    branch_id: Option<&str>,
) -> DbResult<()>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO orders (
            id, tenant_id, order_number, shift_id, branch_id, cashier_id, customer_id,
            total_clp, net_clp, tax_clp, is_paid, is_voided, void_reason, created_at
        )
        VALUES (
            ?1,
            ?3,
            ?2 || printf('%04d', COALESCE((
                SELECT MAX(CAST(substr(o.order_number, 10) AS INTEGER))
                FROM orders o
                WHERE o.tenant_id = ?3 AND o.order_number LIKE ?2 || '%'
            ), 0) + 1),
            NULL,
            ?4,
            ?5,
            (SELECT c.id FROM customers c WHERE c.id = ?6 AND c.tenant_id = ?3),
            0, 0, 0, 0, 0, '',
            ?7
        )
        "#,
    )
    .bind(header.id)
    .bind(order_number_prefix(header.created_at))
    .bind(header.tenant_id.as_str())
    .bind(branch_id)
    .bind(header.cashier_id)
    .bind(header.customer_id)
    .bind(header.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn insert_item<'e, E>(executor: E, item: &OrderItem) -> DbResult<()>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO order_items (
            id, order_id, product_id, name_snapshot, quantity_milli,
            unit_price_clp, unit_cost_clp, line_total_clp
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(&item.name_snapshot)
    .bind(item.quantity.milli())
    .bind(item.unit_price.pesos())
    .bind(item.unit_cost.pesos())
    .bind(item.line_total.pesos())
    .execute(executor)
    .await?;

    Ok(())
}

/// Stores the fiscal breakdown and marks the order paid.
pub(crate) async fn mark_paid<'e, E>(
    executor: E,
    tenant_id: &TenantId,
    order_id: &str,
    fiscal: &FiscalBreakdown,
) -> DbResult<()>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        UPDATE orders
        SET total_clp = ?3, net_clp = ?4, tax_clp = ?5, is_paid = 1
        WHERE id = ?1 AND tenant_id = ?2
        "#,
    )
    .bind(order_id)
    .bind(tenant_id.as_str())
    .bind(fiscal.gross.pesos())
    .bind(fiscal.net.pesos())
    .bind(fiscal.tax.pesos())
    .execute(executor)
    .await?;

    Ok(())
}

pub(crate) async fn insert_payment<'e, E>(executor: E, payment: &Payment) -> DbResult<()>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO payments (
            id, tenant_id, order_id, amount_clp, method, transaction_id, card_last_4, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&payment.id)
    .bind(payment.tenant_id.as_str())
    .bind(&payment.order_id)
    .bind(payment.amount.pesos())
    .bind(payment.method)
    .bind(&payment.transaction_id)
    .bind(&payment.card_last_4)
    .bind(payment.created_at)
    .execute(executor)
    .await?;

    Ok(())
}

/// Flags a paid order as voided. Returns `false` if the order does not
/// exist in this tenant, is unpaid, or is already voided.
pub(crate) async fn mark_voided<'e, E>(
    executor: E,
    tenant_id: &TenantId,
    order_id: &str,
    voided_by: &str,
    reason: &str,
    at: DateTime<Utc>,
) -> DbResult<bool>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET is_voided = 1, voided_by = ?3, void_reason = ?4, voided_at = ?5
        WHERE id = ?1 AND tenant_id = ?2 AND is_paid = 1 AND is_voided = 0
        "#,
    )
    .bind(order_id)
    .bind(tenant_id.as_str())
    .bind(voided_by)
    .bind(reason)
    .bind(at)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub(crate) async fn fetch_order<'e, E>(
    executor: E,
    tenant_id: &TenantId,
    order_id: &str,
) -> DbResult<Option<Order>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM orders WHERE id = ?1 AND tenant_id = ?2",
        ORDER_COLUMNS
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order_id)
        .bind(tenant_id.as_str())
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Order::from))
}

/// Lines of an order; empty if the order is not this tenant's.
pub(crate) async fn fetch_items<'e, E>(
    executor: E,
    tenant_id: &TenantId,
    order_id: &str,
) -> DbResult<Vec<OrderItem>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let rows = sqlx::query_as::<_, OrderItemRow>(
        r#"
        SELECT i.id, i.order_id, i.product_id, i.name_snapshot, i.quantity_milli,
               i.unit_price_clp, i.unit_cost_clp, i.line_total_clp
        FROM order_items i
        JOIN orders o ON o.id = i.order_id
        WHERE i.order_id = ?1 AND o.tenant_id = ?2
        ORDER BY i.rowid
        "#,
    )
    .bind(order_id)
    .bind(tenant_id.as_str())
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(OrderItem::from).collect())
}

// =============================================================================
// OrderRepository
// =============================================================================

/// Tenant-scoped order queries.
///
/// Orders are created by [`CheckoutEngine`](crate::engine::CheckoutEngine)
/// and voided by [`VoidEngine`](crate::engine::VoidEngine); this repository
/// only reads.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
    scope: TenantScope,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool, scope: TenantScope) -> Self {
        OrderRepository { pool, scope }
    }

    pub async fn get(&self, order_id: &str) -> DbResult<Option<Order>> {
        fetch_order(&self.pool, self.scope.tenant_id(), order_id).await
    }

    pub async fn get_by_number(&self, order_number: &str) -> DbResult<Option<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE tenant_id = ?1 AND order_number = ?2",
            ORDER_COLUMNS
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(self.scope.tenant_id().as_str())
            .bind(order_number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Order::from))
    }

    pub async fn items(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        fetch_items(&self.pool, self.scope.tenant_id(), order_id).await
    }

    pub async fn payments(&self, order_id: &str) -> DbResult<Vec<Payment>> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT id, tenant_id, order_id, amount_clp, method, transaction_id, card_last_4, created_at
            FROM payments
            WHERE order_id = ?1 AND tenant_id = ?2
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .bind(self.scope.tenant_id().as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Payment::from).collect())
    }

    /// Orders of a shift, oldest first, voided ones included.
    pub async fn list_for_shift(&self, shift_id: &str) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE tenant_id = ?1 AND shift_id = ?2 ORDER BY order_number",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(self.scope.tenant_id().as_str())
            .bind(shift_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }

    /// Most recent orders of the tenant.
    pub async fn recent(&self, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {} FROM orders WHERE tenant_id = ?1 ORDER BY created_at DESC, order_number DESC LIMIT ?2",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(self.scope.tenant_id().as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Order::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{qty, Store};
    use crate::engine::SaleRequest;
    use caja_core::Cart;
    use chrono::TimeZone;

    #[test]
    fn test_order_number_prefix() {
        let at = Utc.with_ymd_and_hms(2026, 3, 4, 23, 59, 0).unwrap();
        assert_eq!(order_number_prefix(at), "20260304-");
        assert_eq!(order_number_prefix(at).len(), 9);
    }

    #[tokio::test]
    async fn test_get_by_number_is_tenant_scoped() {
        let store = Store::new().await;
        let other = Store::provision(store.db.clone(), "Otra", "11.111.111-1", "otra").await;
        let product = store.product("X", 1000, "10").await;
        let cart = Cart::from_lines([(product.id.as_str(), "1")]).unwrap();

        let order = store
            .tdb
            .checkout()
            .process_sale(None, SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap();

        let found = store.tdb.orders().get_by_number(&order.order_number).await.unwrap().unwrap();
        assert_eq!(found.id, order.id);
        assert!(other.tdb.orders().get_by_number(&order.order_number).await.unwrap().is_none());
        assert!(store.tdb.orders().get_by_number("19700101-0001").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_price_change_keeps_line_snapshot() {
        let store = Store::new().await;
        let product = store.product("X", 1000, "10").await;
        let cart = Cart::from_lines([(product.id.as_str(), "2")]).unwrap();

        let order = store
            .tdb
            .checkout()
            .process_sale(None, SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap();
        store.tdb.products().update_price(&product.id, Money::from_pesos(1500)).await.unwrap();

        let items = store.tdb.orders().items(&order.id).await.unwrap();
        assert_eq!(items[0].unit_price, Money::from_pesos(1000));
        assert_eq!(items[0].line_total, Money::from_pesos(2000));
        assert_eq!(items[0].quantity, qty("2"));
        let reloaded = store.tdb.orders().get(&order.id).await.unwrap().unwrap();
        assert_eq!(reloaded.total, Money::from_pesos(2000));
    }
}
