//! # Inventory Ledger
//!
//! Owns product stock. Stock only moves through guarded updates:
//!
//! ```text
//! debit    UPDATE products SET stock = stock - q
//!          WHERE id = ? AND tenant_id = ? AND stock >= q      ← never negative
//!
//! restore  UPDATE products SET stock = stock + q
//!          WHERE id = ? AND tenant_id = ?
//! ```
//! The check and the write are one statement, so two sales racing for the
//! last units cannot both pass. The `stock_milli >= 0` CHECK constraint is
//! a second line behind it.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use caja_core::validation::validate_quantity;
use caja_core::{authz, Action, CoreError, Product, Quantity, Staff, TenantId, ValidationError};

use crate::error::{DbError, DbResult};
use crate::repository::product::fetch_product;
use crate::scope::TenantScope;

/// Stock movements for one tenant.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    pool: SqlitePool,
    scope: TenantScope,
}

impl InventoryLedger {
    pub fn new(pool: SqlitePool, scope: TenantScope) -> Self {
        InventoryLedger { pool, scope }
    }

    // =========================================================================
    // Inside a caller's transaction
    // =========================================================================

    /// Takes `quantity` out of `product`'s stock.
    ///
    /// `product` must have been loaded inside the same transaction; its
    /// stock is reported as the available amount when the debit is refused.
    pub(crate) async fn debit(
        conn: &mut SqliteConnection,
        tenant_id: &TenantId,
        product: &Product,
        quantity: Quantity,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_milli = stock_milli - ?1, updated_at = ?4
            WHERE id = ?2 AND tenant_id = ?3 AND stock_milli >= ?1
            "#,
        )
        .bind(quantity.milli())
        .bind(&product.id)
        .bind(tenant_id.as_str())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            warn!(
                tenant_id = %tenant_id,
                product_id = %product.id,
                available = %product.stock,
                requested = %quantity,
                "Insufficient stock"
            );
            return Err(CoreError::InsufficientStock {
                product: product.name.clone(),
                available: product.stock,
                requested: quantity,
            }
            .into());
        }

        debug!(product_id = %product.id, quantity = %quantity, "Stock debited");
        Ok(())
    }

    /// Puts `quantity` back into a product's stock.
    pub(crate) async fn restore(
        conn: &mut SqliteConnection,
        tenant_id: &TenantId,
        product_id: &str,
        quantity: Quantity,
    ) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE products
            SET stock_milli = stock_milli + ?1, updated_at = ?4
            WHERE id = ?2 AND tenant_id = ?3
            "#,
        )
        .bind(quantity.milli())
        .bind(product_id)
        .bind(tenant_id.as_str())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        debug!(product_id, quantity = %quantity, "Stock restored");
        Ok(())
    }

    // =========================================================================
    // Standalone units of work
    // =========================================================================

    /// Receives goods: adds `quantity` to the stock.
    pub async fn restock(&self, actor: &Staff, product_id: &str, quantity: Quantity) -> DbResult<Product> {
        self.guard(actor)?;
        validate_quantity(quantity)?;

        let tenant_id = self.scope.tenant_id();
        let mut tx = self.pool.begin().await?;

        Self::restore(&mut *tx, tenant_id, product_id, quantity).await?;
        let product = fetch_product(&mut *tx, tenant_id, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        tx.commit().await?;

        info!(
            tenant_id = %tenant_id,
            product_id,
            added = %quantity,
            stock = %product.stock,
            by = %actor.username,
            "Product restocked"
        );
        Ok(product)
    }

    /// Sets the stock to a counted value (stocktake).
    pub async fn adjust(&self, actor: &Staff, product_id: &str, counted: Quantity) -> DbResult<Product> {
        self.guard(actor)?;
        if counted.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "stock".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let tenant_id = self.scope.tenant_id();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE products SET stock_milli = ?1, updated_at = ?4 WHERE id = ?2 AND tenant_id = ?3",
        )
        .bind(counted.milli())
        .bind(product_id)
        .bind(tenant_id.as_str())
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(product_id.to_string()).into());
        }

        let product = fetch_product(&mut *tx, tenant_id, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        tx.commit().await?;

        info!(
            tenant_id = %tenant_id,
            product_id,
            stock = %product.stock,
            by = %actor.username,
            "Stock adjusted"
        );
        Ok(product)
    }

    /// Current stock of a product of this tenant.
    pub async fn stock_of(&self, product_id: &str) -> DbResult<Quantity> {
        let stock: Option<i64> =
            sqlx::query_scalar("SELECT stock_milli FROM products WHERE id = ?1 AND tenant_id = ?2")
                .bind(product_id)
                .bind(self.scope.tenant_id().as_str())
                .fetch_optional(&self.pool)
                .await?;

        stock
            .map(Quantity::from_milli)
            .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
    }

    fn guard(&self, actor: &Staff) -> DbResult<()> {
        authz::ensure(actor, Action::ManageInventory)?;
        self.scope.ensure_owns("Staff", &actor.tenant_id)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{qty, Store};

    #[tokio::test]
    async fn test_restock_and_adjust() {
        let store = Store::new().await;
        let product = store.product("ALIM-1", 1000, "2").await;
        let ledger = store.tdb.inventory();

        let updated = ledger.restock(&store.supervisor, &product.id, qty("10.5")).await.unwrap();
        assert_eq!(updated.stock, qty("12.5"));

        let counted = ledger.adjust(&store.owner, &product.id, qty("7")).await.unwrap();
        assert_eq!(counted.stock, qty("7"));
        assert_eq!(store.stock(&product).await, qty("7"));
    }

    #[tokio::test]
    async fn test_cashier_cannot_touch_inventory() {
        let store = Store::new().await;
        let product = store.product("ALIM-1", 1000, "2").await;

        let err = store
            .tdb
            .inventory()
            .restock(&store.cashier, &product.id, qty("1"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Forbidden { .. })));
        assert_eq!(store.stock(&product).await, qty("2"));
    }

    #[tokio::test]
    async fn test_rejects_non_positive_and_negative_counts() {
        let store = Store::new().await;
        let product = store.product("ALIM-1", 1000, "2").await;
        let ledger = store.tdb.inventory();

        assert!(ledger.restock(&store.owner, &product.id, qty("0")).await.is_err());
        assert!(ledger.restock(&store.owner, &product.id, qty("-1")).await.is_err());
        assert!(ledger.adjust(&store.owner, &product.id, qty("-0.001")).await.is_err());
        assert_eq!(store.stock(&product).await, qty("2"));
    }

    #[tokio::test]
    async fn test_unknown_product() {
        let store = Store::new().await;
        let err = store
            .tdb
            .inventory()
            .restock(&store.owner, "missing", qty("1"))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_debit_refuses_to_go_negative() {
        let store = Store::new().await;
        let product = store.product("ALIM-1", 1000, "2").await;
        let tenant_id = store.tdb.tenant_id().clone();

        let mut conn = store.db.pool().acquire().await.unwrap();
        let err = InventoryLedger::debit(&mut *conn, &tenant_id, &product, qty("2.001"))
            .await
            .unwrap_err();
        match err.as_domain() {
            Some(CoreError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(*available, qty("2"));
                assert_eq!(*requested, qty("2.001"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        InventoryLedger::debit(&mut *conn, &tenant_id, &product, qty("2")).await.unwrap();
        drop(conn);
        assert_eq!(store.stock(&product).await, qty("0"));
    }
}
