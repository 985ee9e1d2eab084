//! # Void Engine
//!
//! Reverses a paid sale without deleting it.
//!
//! ```text
//! BEGIN
//!  ├── UPDATE orders SET is_voided = 1 ...
//!  │     WHERE is_paid = 1 AND is_voided = 0   ──0 rows──► AlreadyVoided / OrderNotFound
//!  ├── for each order_item: stock += item.quantity   (recorded quantity)
//! COMMIT
//! ```
//! Totals and `is_paid` are left as they were; every aggregation filters on
//! `is_paid = 1 AND is_voided = 0`.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use caja_core::{authz, Action, CoreError, Order, Staff};

use super::inventory::InventoryLedger;
use crate::error::{DbError, DbResult};
use crate::repository::order::{fetch_items, fetch_order, mark_voided};
use crate::scope::TenantScope;

#[derive(Debug, Clone)]
pub struct VoidEngine {
    pool: SqlitePool,
    scope: TenantScope,
}

impl VoidEngine {
    pub fn new(pool: SqlitePool, scope: TenantScope) -> Self {
        VoidEngine { pool, scope }
    }

    /// Voids `order_id` and puts its items back in stock.
    ///
    /// A second void of the same order fails with `AlreadyVoided`.
    pub async fn void_sale(&self, order_id: &str, voided_by: &Staff, reason: &str) -> DbResult<Order> {
        authz::ensure(voided_by, Action::VoidSale)?;
        self.scope.ensure_owns("Staff", &voided_by.tenant_id)?;

        let tenant_id = self.scope.tenant_id();
        let reason = reason.trim();
        let mut tx = self.pool.begin().await?;

        let flagged = mark_voided(&mut *tx, tenant_id, order_id, &voided_by.id, reason, Utc::now()).await?;
        if !flagged {
            let err = match fetch_order(&mut *tx, tenant_id, order_id).await? {
                Some(order) if order.is_voided => {
                    warn!(tenant_id = %tenant_id, order_id, "Order already voided");
                    CoreError::AlreadyVoided {
                        order_id: order_id.to_string(),
                    }
                }
                _ => CoreError::OrderNotFound(order_id.to_string()),
            };
            return Err(err.into());
        }

        let items = fetch_items(&mut *tx, tenant_id, order_id).await?;
        for item in &items {
            InventoryLedger::restore(&mut *tx, tenant_id, &item.product_id, item.quantity).await?;
        }

        let order = fetch_order(&mut *tx, tenant_id, order_id)
            .await?
            .ok_or_else(|| DbError::Internal(format!("order {} vanished while voiding", order_id)))?;

        tx.commit().await?;

        info!(
            tenant_id = %tenant_id,
            order_number = %order.order_number,
            items = items.len(),
            by = %voided_by.username,
            reason,
            "Sale voided"
        );
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{qty, Store};
    use crate::engine::SaleRequest;
    use caja_core::{Cart, Money};

    async fn sell(store: &Store, lines: &[(&str, &str)]) -> Order {
        let cart = Cart::from_lines(lines.iter().copied()).unwrap();
        store
            .tdb
            .checkout()
            .checkout(SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_void_restores_recorded_quantity() {
        let store = Store::new().await;
        let product = store.product("Z", 1000, "10").await;
        let order = sell(&store, &[(product.id.as_str(), "3")]).await;
        assert_eq!(store.stock(&product).await, qty("7"));

        let voided = store
            .tdb
            .voids()
            .void_sale(&order.id, &store.supervisor, "  cliente desistió ")
            .await
            .unwrap();

        assert!(voided.is_voided);
        assert!(voided.is_paid);
        assert_eq!(voided.total, order.total);
        assert_eq!(voided.net, order.net);
        assert_eq!(voided.tax, order.tax);
        assert_eq!(voided.voided_by.as_deref(), Some(store.supervisor.id.as_str()));
        assert_eq!(voided.void_reason, "cliente desistió");
        assert!(voided.voided_at.is_some());
        assert_eq!(store.stock(&product).await, qty("10"));
    }

    #[tokio::test]
    async fn test_second_void_fails_and_stock_is_untouched() {
        let store = Store::new().await;
        let product = store.product("Z", 1000, "10").await;
        let order = sell(&store, &[(product.id.as_str(), "3")]).await;
        let voids = store.tdb.voids();

        voids.void_sale(&order.id, &store.owner, "").await.unwrap();
        let err = voids.void_sale(&order.id, &store.owner, "").await.unwrap_err();

        assert!(matches!(err.as_domain(), Some(CoreError::AlreadyVoided { .. })));
        assert_eq!(store.stock(&product).await, qty("10"));
    }

    #[tokio::test]
    async fn test_void_restores_every_line() {
        let store = Store::new().await;
        let a = store.product("A", 1000, "5").await;
        let b = store.bulk_product("B", 2500, "3.5").await;
        let order = sell(&store, &[(a.id.as_str(), "2"), (b.id.as_str(), "1.25")]).await;

        store
            .tdb
            .voids()
            .void_sale(&order.id, &store.supervisor, "")
            .await
            .unwrap();

        assert_eq!(store.stock(&a).await, qty("5"));
        assert_eq!(store.stock(&b).await, qty("3.5"));
    }

    #[tokio::test]
    async fn test_cashier_cannot_void() {
        let store = Store::new().await;
        let product = store.product("Z", 1000, "10").await;
        let order = sell(&store, &[(product.id.as_str(), "1")]).await;

        let err = store
            .tdb
            .voids()
            .void_sale(&order.id, &store.cashier, "")
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Forbidden { .. })));
        assert!(!store.tdb.orders().get(&order.id).await.unwrap().unwrap().is_voided);
    }

    #[tokio::test]
    async fn test_other_tenant_cannot_void() {
        let store = Store::new().await;
        let other = Store::provision(store.db.clone(), "Otra", "11.111.111-1", "otra").await;
        let product = store.product("Z", 1000, "10").await;
        let order = sell(&store, &[(product.id.as_str(), "1")]).await;

        let err = other
            .tdb
            .voids()
            .void_sale(&order.id, &other.owner, "")
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::OrderNotFound(_))));

        // A foreign staff member is rejected before any lookup.
        let err = store
            .tdb
            .voids()
            .void_sale(&order.id, &other.owner, "")
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::TenantMismatch { .. })));
        assert_eq!(store.stock(&product).await, qty("9"));
    }

    #[tokio::test]
    async fn test_voided_sale_leaves_revenue() {
        let store = Store::new().await;
        let product = store.product("Z", 1190, "10").await;
        let kept = sell(&store, &[(product.id.as_str(), "1")]).await;
        let voided = sell(&store, &[(product.id.as_str(), "2")]).await;

        store
            .tdb
            .voids()
            .void_sale(&voided.id, &store.owner, "")
            .await
            .unwrap();

        let from = kept.created_at - chrono::Duration::hours(1);
        let to = Utc::now() + chrono::Duration::hours(1);
        let summary = store.tdb.reports().sales_summary(from, to).await.unwrap();
        assert_eq!(summary.order_count, 1);
        assert_eq!(summary.gross, Money::from_pesos(1190));
        assert_eq!(summary.voided_count, 1);
    }
}
