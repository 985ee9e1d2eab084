//! # Product Repository
//!
//! Catalog operations for one tenant's products.
//!
//! Stock is read here but only ever changed through
//! [`InventoryLedger`](crate::engine::InventoryLedger), which does it with
//! guarded, tenant-filtered updates.
//!
//! ## Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User types: "royal"                                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LIKE '%royal%' across: sku, name, barcode   (tenant + active only)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  RC-ADULT-15  | Royal Canin Adulto 15kg  | 7790...  ← MATCH            │
//! │  RC-PUPPY-3   | Royal Canin Puppy 3kg    | 7790...  ← MATCH            │
//! │  PED-GRANEL   | Pedigree a granel        |          │                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Results ordered by name                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use caja_core::validation::{validate_name, validate_price, validate_sku};
use caja_core::{Money, Product, Quantity, TenantId, ValidationError};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::scope::TenantScope;

/// Default low-stock threshold: 5 units.
pub const DEFAULT_MIN_STOCK: Quantity = Quantity::from_units(5);

/// Input for [`ProductRepository::insert`].
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub barcode: Option<String>,
    pub name: String,
    pub price: Money,
    pub cost: Money,
    pub stock: Quantity,
    pub min_stock_alert: Quantity,
    pub is_bulk: bool,
}

impl NewProduct {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: Money) -> Self {
        NewProduct {
            sku: sku.into(),
            barcode: None,
            name: name.into(),
            price,
            cost: Money::zero(),
            stock: Quantity::zero(),
            min_stock_alert: DEFAULT_MIN_STOCK,
            is_bulk: false,
        }
    }

    pub fn cost(mut self, cost: Money) -> Self {
        self.cost = cost;
        self
    }

    pub fn stock(mut self, stock: Quantity) -> Self {
        self.stock = stock;
        self
    }

    pub fn min_stock(mut self, min: Quantity) -> Self {
        self.min_stock_alert = min;
        self
    }

    pub fn barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    /// Sold by weight; quantities may carry three decimals.
    pub fn bulk(mut self) -> Self {
        self.is_bulk = true;
        self
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    tenant_id: String,
    sku: String,
    barcode: Option<String>,
    name: String,
    price_clp: i64,
    cost_clp: i64,
    stock_milli: i64,
    min_stock_milli: i64,
    is_bulk: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            tenant_id: TenantId::new(row.tenant_id),
            sku: row.sku,
            barcode: row.barcode,
            name: row.name,
            price: Money::from_pesos(row.price_clp),
            cost: Money::from_pesos(row.cost_clp),
            stock: Quantity::from_milli(row.stock_milli),
            min_stock_alert: Quantity::from_milli(row.min_stock_milli),
            is_bulk: row.is_bulk,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const PRODUCT_COLUMNS: &str = "id, tenant_id, sku, barcode, name, price_clp, cost_clp, \
     stock_milli, min_stock_milli, is_bulk, is_active, created_at, updated_at";

/// Loads one product of `tenant_id`, active or not.
pub(crate) async fn fetch_product<'e, E>(
    executor: E,
    tenant_id: &TenantId,
    product_id: &str,
) -> DbResult<Option<Product>>
where
    E: sqlx::SqliteExecutor<'e>,
{
    let sql = format!(
        "SELECT {} FROM products WHERE id = ?1 AND tenant_id = ?2",
        PRODUCT_COLUMNS
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(product_id)
        .bind(tenant_id.as_str())
        .fetch_optional(executor)
        .await?;

    Ok(row.map(Product::from))
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let products = tdb.products();
///
/// let hits = products.search("royal", 20).await?;
/// let low = products.low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    scope: TenantScope,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool, scope: TenantScope) -> Self {
        ProductRepository { pool, scope }
    }

    fn tenant_id(&self) -> &TenantId {
        self.scope.tenant_id()
    }

    /// Adds a product to this tenant's catalog.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for a bad SKU, name, price or cost, or a
    ///   negative initial stock
    /// - `UniqueViolation` if the SKU already exists in this tenant
    pub async fn insert(&self, new: NewProduct) -> DbResult<Product> {
        let sku = new.sku.trim().to_string();
        validate_sku(&sku)?;
        validate_name("name", &new.name, 200)?;
        validate_price("price", new.price)?;
        validate_price("cost", new.cost)?;
        if new.stock.is_negative() {
            return Err(ValidationError::OutOfRange {
                field: "stock".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into());
        }

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            tenant_id: self.tenant_id().clone(),
            sku,
            barcode: new.barcode.filter(|b| !b.trim().is_empty()),
            name: new.name.trim().to_string(),
            price: new.price,
            cost: new.cost,
            stock: new.stock,
            min_stock_alert: new.min_stock_alert,
            is_bulk: new.is_bulk,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, barcode, name, price_clp, cost_clp,
                stock_milli, min_stock_milli, is_bulk, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&product.id)
        .bind(product.tenant_id.as_str())
        .bind(&product.sku)
        .bind(&product.barcode)
        .bind(&product.name)
        .bind(product.price.pesos())
        .bind(product.cost.pesos())
        .bind(product.stock.milli())
        .bind(product.min_stock_alert.milli())
        .bind(product.is_bulk)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            err if err.is_unique_violation_on("products.") => {
                DbError::duplicate("sku", product.sku.clone())
            }
            err => err,
        })?;

        info!(
            tenant_id = %product.tenant_id,
            product_id = %product.id,
            sku = %product.sku,
            stock = %product.stock,
            "Product created"
        );
        Ok(product)
    }

    pub async fn get(&self, product_id: &str) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, self.tenant_id(), product_id).await
    }

    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE tenant_id = ?1 AND sku = ?2",
            PRODUCT_COLUMNS
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(self.tenant_id().as_str())
            .bind(sku.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Scanner lookup. Only active products.
    pub async fn find_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE tenant_id = ?1 AND barcode = ?2 AND is_active = 1",
            PRODUCT_COLUMNS
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(self.tenant_id().as_str())
            .bind(barcode.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Product::from))
    }

    /// Searches active products by SKU, name or barcode.
    ///
    /// An empty query lists active products.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        // Escape LIKE wildcards typed by the user.
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);

        let sql = format!(
            r#"
            SELECT {}
            FROM products
            WHERE tenant_id = ?1
              AND is_active = 1
              AND (sku LIKE ?2 ESCAPE '\' OR name LIKE ?2 ESCAPE '\' OR barcode LIKE ?2 ESCAPE '\')
            ORDER BY name, id
            LIMIT ?3
            "#,
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(self.tenant_id().as_str())
            .bind(pattern)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = rows.len(), "Search returned products");
        Ok(rows.into_iter().map(Product::from).collect())
    }

    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE tenant_id = ?1 AND is_active = 1 ORDER BY name, id LIMIT ?2",
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(self.tenant_id().as_str())
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Active products at or below their low-stock threshold, scarcest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM products
            WHERE tenant_id = ?1
              AND is_active = 1
              AND stock_milli <= min_stock_milli
            ORDER BY stock_milli, name
            "#,
            PRODUCT_COLUMNS
        );
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(self.tenant_id().as_str())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Number of active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE tenant_id = ?1 AND is_active = 1")
                .bind(self.tenant_id().as_str())
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Changes the sale price. Past order lines keep their snapshot.
    pub async fn update_price(&self, product_id: &str, price: Money) -> DbResult<()> {
        validate_price("price", price)?;

        let result = sqlx::query(
            "UPDATE products SET price_clp = ?3, updated_at = ?4 WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(product_id)
        .bind(self.tenant_id().as_str())
        .bind(price.pesos())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        debug!(product_id, price = %price, "Product price updated");
        Ok(())
    }

    /// Hides a product from sale without deleting its history.
    pub async fn set_active(&self, product_id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = ?3, updated_at = ?4 WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(product_id)
        .bind(self.tenant_id().as_str())
        .bind(active)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        debug!(product_id, active, "Product activation changed");
        Ok(())
    }
}
