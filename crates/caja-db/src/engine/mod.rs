//! # Transactional Engines
//!
//! The operations that change money or stock. Each public operation is one
//! SQLite transaction: it commits completely or leaves nothing behind.
//!
//! ## Unit Of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Guard        authz::ensure(staff, action), tenant ownership,       │
//! │                  input validation           (no database access)       │
//! │                                                                         │
//! │  2. BEGIN        first statement is always a WRITE, so the write lock  │
//! │                  is taken up front and waits (busy_timeout) instead    │
//! │                  of failing on a stale read snapshot                   │
//! │                                                                         │
//! │  3. Work         conditional UPDATE/INSERT ... WHERE <invariant>       │
//! │                  0 rows affected → re-read to name the domain error   │
//! │                                                                         │
//! │  4. COMMIT       or drop the transaction (rollback) on any error       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite serialises writers, so once step 2 returns no other transaction
//! can change stock, shifts or orders until this one ends. The conditional
//! statements keep the invariants even without that guarantee.

pub mod checkout;
pub mod inventory;
pub mod shift;
pub mod void;

pub use checkout::{CheckoutEngine, SaleRequest};
pub use inventory::InventoryLedger;
pub use shift::ShiftManager;
pub use void::VoidEngine;

#[cfg(test)]
pub(crate) mod fixtures {
    //! A provisioned tenant for engine tests.

    use caja_core::{Branch, CashRegister, Money, Product, Quantity, Role, Staff};

    use crate::pool::{Database, DbConfig};
    use crate::repository::{NewBranch, NewProduct, NewRegister, NewStaff, NewTenant};
    use crate::scope::{TenantDb, TenantScope};

    pub struct Store {
        pub db: Database,
        pub tdb: TenantDb,
        pub branch: Branch,
        pub register: CashRegister,
        pub owner: Staff,
        pub supervisor: Staff,
        pub cashier: Staff,
    }

    impl Store {
        pub async fn new() -> Store {
            let db = Database::new(DbConfig::in_memory()).await.unwrap();
            Store::provision(db, "Mascotas Sur", "12.345.678-5", "sur").await
        }

        pub async fn provision(db: Database, name: &str, rut: &str, subdomain: &str) -> Store {
            let tenant = db
                .unscoped()
                .create(NewTenant::new(name, rut, subdomain))
                .await
                .unwrap();
            let tdb = db.scoped(TenantScope::from(&tenant));
            let store = tdb.store();

            let branch = store.create_branch(NewBranch::new("Centro").main()).await.unwrap();
            let register = store
                .create_register(NewRegister::new(&branch.id, "Caja 1"))
                .await
                .unwrap();
            let owner = store
                .create_staff(NewStaff::new("owner", Role::Owner).full_name("Olga Dueña"))
                .await
                .unwrap();
            let supervisor = store
                .create_staff(NewStaff::new("super", Role::Supervisor))
                .await
                .unwrap();
            let cashier = store
                .create_staff(
                    NewStaff::new("cajero", Role::Cashier)
                        .full_name("Carlos Cajero")
                        .branch(&branch.id),
                )
                .await
                .unwrap();

            Store {
                db,
                tdb,
                branch,
                register,
                owner,
                supervisor,
                cashier,
            }
        }

        pub async fn product(&self, sku: &str, price: i64, stock: &str) -> Product {
            self.tdb
                .products()
                .insert(
                    NewProduct::new(sku, format!("Producto {}", sku), Money::from_pesos(price))
                        .cost(Money::from_pesos(price / 2))
                        .stock(qty(stock)),
                )
                .await
                .unwrap()
        }

        pub async fn bulk_product(&self, sku: &str, price: i64, stock: &str) -> Product {
            self.tdb
                .products()
                .insert(
                    NewProduct::new(sku, format!("Granel {}", sku), Money::from_pesos(price))
                        .stock(qty(stock))
                        .bulk(),
                )
                .await
                .unwrap()
        }

        pub async fn stock(&self, product: &Product) -> Quantity {
            self.tdb.inventory().stock_of(&product.id).await.unwrap()
        }
    }

    pub fn qty(s: &str) -> Quantity {
        s.parse().unwrap()
    }
}
