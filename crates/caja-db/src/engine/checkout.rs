//! # Checkout Engine
//!
//! Turns a cart into a paid order.
//!
//! ## Sale Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  guard: Sell permission, staff/shift tenant, cart and payment input    │
//! │                                                                         │
//! │  BEGIN                                                                  │
//! │   ├── INSERT order header  (unpaid, total 0, next YYYYMMDD-NNNN)       │
//! │   │     with a shift: only if that shift is still open ──no──► Closed  │
//! │   │                                                                     │
//! │   ├── for each cart line (sorted by product id):                       │
//! │   │     load product          ──missing/inactive──► ProductNotFound    │
//! │   │     line_total = round(price × qty)                                │
//! │   │     debit stock           ──short──► InsufficientStock             │
//! │   │     INSERT order_item (price and cost snapshot)                    │
//! │   │                                                                     │
//! │   ├── total = Σ line_total; net/tax extracted at the tenant's rate     │
//! │   ├── UPDATE order: totals, is_paid = 1                                │
//! │   └── INSERT payment (amount = total)                                  │
//! │  COMMIT                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Any error drops the transaction: no order, no item, no stock movement
//! survives a failed sale.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use caja_core::validation::{validate_card_last_4, validate_transaction_id};
use caja_core::{
    authz, Action, Cart, CoreError, FiscalBreakdown, Money, Order, OrderItem, Payment,
    PaymentDetails, PaymentMethod, Shift, Staff,
};

use super::inventory::InventoryLedger;
use super::shift::ShiftManager;
use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use crate::repository::order::{self, OrderHeader};
use crate::repository::product::fetch_product;
use crate::repository::shift::fetch_open_for_cashier;
use crate::repository::store::{customer_exists, first_active_register};
use crate::scope::TenantScope;

/// Everything a sale needs besides the shift.
#[derive(Debug, Clone)]
pub struct SaleRequest<'a> {
    pub cashier: &'a Staff,
    pub cart: &'a Cart,
    pub customer_id: Option<&'a str>,
    pub method: PaymentMethod,
    pub details: PaymentDetails,
}

impl<'a> SaleRequest<'a> {
    /// A cash sale with no customer.
    pub fn new(cashier: &'a Staff, cart: &'a Cart) -> Self {
        SaleRequest {
            cashier,
            cart,
            customer_id: None,
            method: PaymentMethod::Cash,
            details: PaymentDetails::default(),
        }
    }

    pub fn customer(mut self, customer_id: &'a str) -> Self {
        self.customer_id = Some(customer_id);
        self
    }

    pub fn paid_with(mut self, method: PaymentMethod, details: PaymentDetails) -> Self {
        self.method = method;
        self.details = details;
        self
    }
}

/// Sale processing for one tenant.
#[derive(Debug, Clone)]
pub struct CheckoutEngine {
    pool: SqlitePool,
    scope: TenantScope,
}

impl CheckoutEngine {
    pub fn new(pool: SqlitePool, scope: TenantScope) -> Self {
        CheckoutEngine { pool, scope }
    }

    /// Sells `request.cart` on `shift`, or with no shift at all.
    ///
    /// ## Errors
    /// - `ShiftClosed` if the shift is (or becomes) closed; nothing is written
    /// - `InsufficientStock` for the first short line; the whole sale rolls back
    /// - `ProductNotFound` for an unknown or inactive product
    /// - `EmptyCart`, `Validation`, `Forbidden`, `TenantMismatch` from the guard
    pub async fn process_sale(&self, shift: Option<&Shift>, request: SaleRequest<'_>) -> DbResult<Order> {
        let details = self.guard(&request)?;
        let tenant_id = self.scope.tenant_id();

        if let Some(shift) = shift {
            self.scope.ensure_owns("Shift", &shift.tenant_id)?;
            if !shift.is_open() {
                return Err(CoreError::ShiftClosed {
                    shift_id: shift.id.clone(),
                }
                .into());
            }
        }

        let now = Utc::now();
        let order_id = new_id();
        let header = OrderHeader {
            id: &order_id,
            tenant_id,
            cashier_id: &request.cashier.id,
            customer_id: request.customer_id,
            created_at: now,
        };

        let mut tx = self.pool.begin().await?;

        match shift {
            Some(shift) => {
                let inserted = order::insert_header_for_shift(&mut *tx, &header, &shift.id).await?;
                if !inserted {
                    return Err(CoreError::ShiftClosed {
                        shift_id: shift.id.clone(),
                    }
                    .into());
                }
            }
            None => {
                order::insert_header_shiftless(&mut *tx, &header, request.cashier.branch_id.as_deref())
                    .await?;
            }
        }

        if let Some(customer_id) = request.customer_id {
            if !customer_exists(&mut *tx, tenant_id, customer_id).await? {
                return Err(DbError::not_found("Customer", customer_id));
            }
        }

        let mut total = Money::zero();
        for line in request.cart.lines() {
            let product = fetch_product(&mut *tx, tenant_id, line.product_id)
                .await?
                .filter(|p| p.is_active)
                .ok_or_else(|| CoreError::ProductNotFound(line.product_id.to_string()))?;

            let line_total = product.price.times(line.quantity)?;
            InventoryLedger::debit(&mut *tx, tenant_id, &product, line.quantity).await?;

            let item = OrderItem {
                id: new_id(),
                order_id: order_id.clone(),
                product_id: product.id.clone(),
                name_snapshot: product.name.clone(),
                quantity: line.quantity,
                unit_price: product.price,
                unit_cost: product.cost,
                line_total,
            };
            order::insert_item(&mut *tx, &item).await?;

            debug!(
                order_id = %order_id,
                product_id = %product.id,
                quantity = %line.quantity,
                line_total = %line_total,
                "Line added"
            );
            total = total.checked_add(line_total, "total")?;
        }

        let fiscal = FiscalBreakdown::from_gross(total, self.scope.tax_rate());
        order::mark_paid(&mut *tx, tenant_id, &order_id, &fiscal).await?;

        let payment = Payment {
            id: new_id(),
            tenant_id: tenant_id.clone(),
            order_id: order_id.clone(),
            amount: total,
            method: request.method,
            transaction_id: details.transaction_id,
            card_last_4: details.card_last_4,
            created_at: now,
        };
        order::insert_payment(&mut *tx, &payment).await?;

        let order = order::fetch_order(&mut *tx, tenant_id, &order_id)
            .await?
            .ok_or_else(|| DbError::Internal(format!("order {} vanished before commit", order_id)))?;

        tx.commit().await?;

        info!(
            tenant_id = %tenant_id,
            order_number = %order.order_number,
            shift_id = ?order.shift_id,
            cashier = %request.cashier.username,
            lines = request.cart.len(),
            total = %order.total,
            method = %request.method,
            "Sale completed"
        );
        Ok(order)
    }

    /// Sells with whatever shift the cashier should be on.
    ///
    /// ```text
    /// cashier holds an open shift?      ──yes──► sell on it
    ///        │ no
    /// tenant has an active register?   ──yes──► open a shift there with
    ///        │ no                                $0 opening cash, sell on it
    ///        ▼                                   (held by someone else →
    /// sell with no shift                          ShiftAlreadyOpen)
    /// ```
    ///
    /// Losing the open to a concurrent checkout by the same cashier is not
    /// an error: the sale goes on the shift that won.
    pub async fn checkout(&self, request: SaleRequest<'_>) -> DbResult<Order> {
        authz::ensure(request.cashier, Action::Sell)?;
        self.scope.ensure_owns("Staff", &request.cashier.tenant_id)?;
        let tenant_id = self.scope.tenant_id();

        if let Some(shift) = fetch_open_for_cashier(&self.pool, tenant_id, &request.cashier.id).await? {
            return self.process_sale(Some(&shift), request).await;
        }

        match first_active_register(&self.pool, tenant_id).await? {
            Some(register) => {
                let opened = ShiftManager::new(self.pool.clone(), self.scope.clone())
                    .open_shift(&register.id, request.cashier, Money::zero())
                    .await;

                let shift = match opened {
                    Ok(shift) => {
                        info!(
                            tenant_id = %tenant_id,
                            register = %register.name,
                            cashier = %request.cashier.username,
                            "Shift opened automatically for checkout"
                        );
                        shift
                    }
                    // A concurrent checkout by the same cashier may have won
                    // the open; sell on that shift instead of failing.
                    Err(err) if matches!(err.as_domain(), Some(CoreError::ShiftAlreadyOpen { .. })) => {
                        match fetch_open_for_cashier(&self.pool, tenant_id, &request.cashier.id).await? {
                            Some(shift) => {
                                debug!(
                                    tenant_id = %tenant_id,
                                    shift_id = %shift.id,
                                    cashier = %request.cashier.username,
                                    "Reusing shift opened by a concurrent checkout"
                                );
                                shift
                            }
                            None => return Err(err),
                        }
                    }
                    Err(err) => return Err(err),
                };
                self.process_sale(Some(&shift), request).await
            }
            None => {
                debug!(tenant_id = %tenant_id, "No active register, selling without shift");
                self.process_sale(None, request).await
            }
        }
    }

    /// Checks everything that needs no database access and returns the
    /// payment details that apply to the method.
    fn guard(&self, request: &SaleRequest<'_>) -> DbResult<PaymentDetails> {
        authz::ensure(request.cashier, Action::Sell)?;
        self.scope.ensure_owns("Staff", &request.cashier.tenant_id)?;
        request.cart.validate()?;

        let details = request.details.clone().for_method(request.method);
        if let Some(last_4) = &details.card_last_4 {
            validate_card_last_4(last_4)?;
        }
        if let Some(transaction_id) = &details.transaction_id {
            validate_transaction_id(transaction_id)?;
        }

        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fixtures::{qty, Store};
    use crate::repository::{NewCustomer, NewRegister};
    use caja_core::{Quantity, ValidationError};

    fn cart(lines: &[(&str, &str)]) -> Cart {
        Cart::from_lines(lines.iter().copied()).unwrap()
    }

    async fn open_shift(store: &Store) -> Shift {
        store
            .tdb
            .shift_manager()
            .open_shift(&store.register.id, &store.cashier, Money::from_pesos(10_000))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sale_totals_tax_and_stock() {
        let store = Store::new().await;
        let product = store.product("X", 1000, "10").await;
        let shift = open_shift(&store).await;

        let cart = cart(&[(product.id.as_str(), "2")]);
        let order = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap();

        assert_eq!(order.total, Money::from_pesos(2000));
        assert_eq!(order.net, Money::from_pesos(1680));
        assert_eq!(order.tax, Money::from_pesos(320));
        assert!(order.is_paid);
        assert!(!order.is_voided);
        assert_eq!(order.shift_id.as_deref(), Some(shift.id.as_str()));
        assert_eq!(order.branch_id.as_deref(), Some(store.branch.id.as_str()));
        assert_eq!(store.stock(&product).await, qty("8"));

        let items = store.tdb.orders().items(&order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].line_total, order.total);
        assert_eq!(items[0].unit_cost, Money::from_pesos(500));

        let payments = store.tdb.orders().payments(&order.id).await.unwrap();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, order.total);
        assert_eq!(payments[0].method, PaymentMethod::Cash);
    }

    #[tokio::test]
    async fn test_insufficient_stock_persists_nothing() {
        let store = Store::new().await;
        let product = store.product("Y", 1000, "2").await;
        let shift = open_shift(&store).await;

        let cart = cart(&[(product.id.as_str(), "5")]);
        let err = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap_err();

        match err.as_domain() {
            Some(CoreError::InsufficientStock { available, requested, .. }) => {
                assert_eq!(*available, qty("2"));
                assert_eq!(*requested, qty("5"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.stock(&product).await, qty("2"));
        assert!(store.tdb.orders().recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_short_line_rolls_back_earlier_lines() {
        let store = Store::new().await;
        let a = store.product("A", 500, "10").await;
        let b = store.product("B", 500, "10").await;
        let shift = open_shift(&store).await;

        // Lines run in product id order: starve the second one so the first
        // has already been debited when the sale fails.
        let (plenty, scarce) = if a.id < b.id { (a, b) } else { (b, a) };
        store
            .tdb
            .inventory()
            .adjust(&store.owner, &scarce.id, qty("1"))
            .await
            .unwrap();

        let cart = cart(&[(plenty.id.as_str(), "3"), (scarce.id.as_str(), "4")]);
        let err = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap_err();

        assert!(matches!(err.as_domain(), Some(CoreError::InsufficientStock { .. })));
        assert_eq!(store.stock(&plenty).await, qty("10"));
        assert_eq!(store.stock(&scarce).await, qty("1"));
        assert!(store.tdb.orders().list_for_shift(&shift.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_closed_shift_rejected() {
        let store = Store::new().await;
        let product = store.product("X", 1000, "10").await;
        let shift = open_shift(&store).await;
        store
            .tdb
            .shift_manager()
            .close_shift(&shift.id, &store.cashier, Money::from_pesos(10_000), "")
            .await
            .unwrap();

        let cart = cart(&[(product.id.as_str(), "1")]);

        // Stale in-memory shift that still looks open.
        let err = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ShiftClosed { .. })));

        // Fresh copy that knows it is closed.
        let closed = store.tdb.shifts().get(&shift.id).await.unwrap().unwrap();
        let err = store
            .tdb
            .checkout()
            .process_sale(Some(&closed), SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ShiftClosed { .. })));

        assert_eq!(store.stock(&product).await, qty("10"));
    }

    #[tokio::test]
    async fn test_fractional_bulk_line() {
        let store = Store::new().await;
        let kibble = store.bulk_product("GRANEL", 3990, "25").await;
        let shift = open_shift(&store).await;

        let cart = cart(&[(kibble.id.as_str(), "1.250")]);
        let order = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap();

        // 3990 × 1.25 = 4987.5 → 4988 (half to even)
        assert_eq!(order.total, Money::from_pesos(4988));
        assert_eq!(order.net + order.tax, order.total);
        assert_eq!(store.stock(&kibble).await, qty("23.75"));

        let items = store.tdb.orders().items(&order.id).await.unwrap();
        assert_eq!(items[0].quantity, qty("1.25"));
    }

    #[tokio::test]
    async fn test_order_numbers_are_sequential() {
        let store = Store::new().await;
        let product = store.product("X", 100, "10").await;
        let shift = open_shift(&store).await;
        let cart = cart(&[(product.id.as_str(), "1")]);
        let checkout = store.tdb.checkout();

        let first = checkout
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap();
        let second = checkout
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap();

        let prefix = order::order_number_prefix(first.created_at);
        assert_eq!(first.order_number, format!("{}0001", prefix));
        assert!(second.order_number.ends_with("0002"));
    }

    #[tokio::test]
    async fn test_card_payment_details() {
        let store = Store::new().await;
        let product = store.product("X", 1000, "10").await;
        let shift = open_shift(&store).await;
        let cart = cart(&[(product.id.as_str(), "1")]);

        let details = PaymentDetails {
            transaction_id: Some(" OP-991 ".into()),
            card_last_4: Some("4242".into()),
        };
        let order = store
            .tdb
            .checkout()
            .process_sale(
                Some(&shift),
                SaleRequest::new(&store.cashier, &cart).paid_with(PaymentMethod::Card, details),
            )
            .await
            .unwrap();

        let payment = &store.tdb.orders().payments(&order.id).await.unwrap()[0];
        assert_eq!(payment.method, PaymentMethod::Card);
        assert_eq!(payment.transaction_id.as_deref(), Some("OP-991"));
        assert_eq!(payment.card_last_4.as_deref(), Some("4242"));

        let bad = PaymentDetails {
            transaction_id: None,
            card_last_4: Some("42x2".into()),
        };
        let err = store
            .tdb
            .checkout()
            .process_sale(
                Some(&shift),
                SaleRequest::new(&store.cashier, &cart).paid_with(PaymentMethod::Card, bad),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(ValidationError::InvalidFormat { .. }))
        ));
    }

    #[tokio::test]
    async fn test_customer_must_belong_to_tenant() {
        let store = Store::new().await;
        let other = Store::provision(store.db.clone(), "Otra", "11.111.111-1", "otra").await;
        let product = store.product("X", 1000, "10").await;
        let shift = open_shift(&store).await;
        let cart = cart(&[(product.id.as_str(), "1")]);

        let foreign = other
            .tdb
            .store()
            .create_customer(NewCustomer {
                name: "Ajeno".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let err = store
            .tdb
            .checkout()
            .process_sale(
                Some(&shift),
                SaleRequest::new(&store.cashier, &cart).customer(&foreign.id),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
        assert_eq!(store.stock(&product).await, qty("10"));

        let own = store
            .tdb
            .store()
            .create_customer(NewCustomer {
                name: "Propio".into(),
                ..Default::default()
            })
            .await
            .unwrap();
        let order = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &cart).customer(&own.id))
            .await
            .unwrap();
        assert_eq!(order.customer_id.as_deref(), Some(own.id.as_str()));
    }

    #[tokio::test]
    async fn test_tenant_isolation() {
        let store = Store::new().await;
        let other = Store::provision(store.db.clone(), "Otra", "11.111.111-1", "otra").await;
        let foreign_product = other.product("X", 1000, "10").await;
        let shift = open_shift(&store).await;

        // Another tenant's product is invisible.
        let cart = cart(&[(foreign_product.id.as_str(), "1")]);
        let err = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ProductNotFound(_))));
        assert_eq!(other.stock(&foreign_product).await, qty("10"));

        // Another tenant's cashier and shift are rejected up front.
        let err = other
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&other.cashier, &cart))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::TenantMismatch { .. })));

        let err = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&other.cashier, &cart))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::TenantMismatch { .. })));
    }

    #[tokio::test]
    async fn test_guard_rejects_empty_cart_and_inactive_staff() {
        let store = Store::new().await;
        let shift = open_shift(&store).await;

        let empty = Cart::new();
        let err = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &empty))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::EmptyCart)));

        let product = store.product("X", 1000, "10").await;
        let cart = cart(&[(product.id.as_str(), "1")]);
        let mut inactive = store.cashier.clone();
        inactive.is_active = false;
        let err = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&inactive, &cart))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_inactive_product_cannot_be_sold() {
        let store = Store::new().await;
        let product = store.product("X", 1000, "10").await;
        store.tdb.products().set_active(&product.id, false).await.unwrap();
        let shift = open_shift(&store).await;

        let cart = cart(&[(product.id.as_str(), "1")]);
        let err = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_checkout_opens_shift_automatically_and_reuses_it() {
        let store = Store::new().await;
        let product = store.product("X", 1000, "10").await;
        let cart = cart(&[(product.id.as_str(), "1")]);
        let checkout = store.tdb.checkout();

        let first = checkout
            .checkout(SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap();
        let shift_id = first.shift_id.clone().unwrap();

        let shift = store.tdb.shifts().get(&shift_id).await.unwrap().unwrap();
        assert_eq!(shift.register_id, store.register.id);
        assert_eq!(shift.cashier_id, store.cashier.id);
        assert_eq!(shift.opening_cash, Money::zero());

        let second = checkout
            .checkout(SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap();
        assert_eq!(second.shift_id.as_deref(), Some(shift_id.as_str()));
    }

    #[tokio::test]
    async fn test_checkout_register_held_by_someone_else() {
        let store = Store::new().await;
        let product = store.product("X", 1000, "10").await;
        store
            .tdb
            .shift_manager()
            .open_shift(&store.register.id, &store.supervisor, Money::zero())
            .await
            .unwrap();

        let cart = cart(&[(product.id.as_str(), "1")]);
        let err = store
            .tdb
            .checkout()
            .checkout(SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ShiftAlreadyOpen { .. })));
        assert_eq!(store.stock(&product).await, qty("10"));
    }

    #[tokio::test]
    async fn test_total_overflow_is_rejected() {
        let store = Store::new().await;
        let a = store.product("BIG-A", 1 << 62, "1").await;
        let b = store.product("BIG-B", 1 << 62, "1").await;
        let shift = open_shift(&store).await;

        let cart = cart(&[(a.id.as_str(), "1"), (b.id.as_str(), "1")]);
        let err = store
            .tdb
            .checkout()
            .process_sale(Some(&shift), SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap_err();

        assert!(matches!(
            err.as_domain(),
            Some(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert_eq!(store.stock(&a).await, qty("1"));
        assert_eq!(store.stock(&b).await, qty("1"));
        assert!(store.tdb.orders().list_for_shift(&shift.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_without_registers_sells_shiftless() {
        let store = Store::new().await;
        store.tdb.store().set_register_active(&store.register.id, false).await.unwrap();
        let product = store.product("X", 1190, "3").await;
        let cart = cart(&[(product.id.as_str(), "3")]);

        let order = store
            .tdb
            .checkout()
            .checkout(SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap();

        assert!(order.shift_id.is_none());
        assert_eq!(order.branch_id.as_deref(), Some(store.branch.id.as_str()));
        assert_eq!(order.total, Money::from_pesos(3570));
        assert_eq!(order.net, Money::from_pesos(3000));
        assert_eq!(order.tax, Money::from_pesos(570));
        assert_eq!(store.stock(&product).await, Quantity::zero());
    }

    #[tokio::test]
    async fn test_checkout_picks_first_register_by_name() {
        let store = Store::new().await;
        let earlier = store
            .tdb
            .store()
            .create_register(NewRegister::new(&store.branch.id, "Caja 0"))
            .await
            .unwrap();
        let product = store.product("X", 1000, "10").await;
        let cart = cart(&[(product.id.as_str(), "1")]);

        let order = store
            .tdb
            .checkout()
            .checkout(SaleRequest::new(&store.cashier, &cart))
            .await
            .unwrap();
        let shift = store
            .tdb
            .shifts()
            .get(order.shift_id.as_deref().unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(shift.register_id, earlier.id);
    }
}
