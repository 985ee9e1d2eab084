//! Races against a file database with a real connection pool.
//!
//! In-memory databases are limited to one connection, which serialises
//! everything before SQLite ever sees two writers. These tests open a
//! temporary file with several connections so the guarded statements are
//! what keeps the invariants.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use caja_core::{Cart, CashRegister, CoreError, Money, Quantity, Role, Staff};
use caja_db::{
    Database, DbConfig, NewBranch, NewProduct, NewRegister, NewStaff, NewTenant, SaleRequest, TenantDb,
    TenantScope,
};

struct TempDb {
    path: PathBuf,
}

impl TempDb {
    fn new() -> Self {
        let path = std::env::temp_dir().join(format!("caja-race-{}.db", uuid::Uuid::new_v4()));
        TempDb { path }
    }

    async fn open(&self) -> Database {
        let config = DbConfig::new(self.path.clone())
            .max_connections(8)
            .busy_timeout(Duration::from_secs(15));
        Database::new(config).await.unwrap()
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}

struct Fixture {
    tdb: TenantDb,
    register: CashRegister,
    first: Staff,
    second: Staff,
}

async fn provision(db: &Database) -> Fixture {
    let tenant = db
        .unscoped()
        .create(NewTenant::new("Mascotas Sur", "12.345.678-5", "sur"))
        .await
        .unwrap();
    let tdb = db.scoped(TenantScope::from(&tenant));
    let store = tdb.store();

    let branch = store.create_branch(NewBranch::new("Centro").main()).await.unwrap();
    let register = store
        .create_register(NewRegister::new(&branch.id, "Caja 1"))
        .await
        .unwrap();
    let first = store
        .create_staff(NewStaff::new("ana", Role::Cashier).full_name("Ana Pérez"))
        .await
        .unwrap();
    let second = store
        .create_staff(NewStaff::new("beto", Role::Cashier).full_name("Beto Soto"))
        .await
        .unwrap();

    Fixture {
        tdb,
        register,
        first,
        second,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_opens_leave_one_shift() {
    let temp = TempDb::new();
    let db = temp.open().await;
    let fx = provision(&db).await;

    let mut handles = Vec::new();
    for cashier in [fx.first.clone(), fx.second.clone()] {
        let tdb = fx.tdb.clone();
        let register_id = fx.register.id.clone();
        handles.push(tokio::spawn(async move {
            tdb.shift_manager()
                .open_shift(&register_id, &cashier, Money::from_pesos(10_000))
                .await
        }));
    }

    let mut opened = 0;
    let mut refused = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => opened += 1,
            Err(err) => {
                assert!(
                    matches!(err.as_domain(), Some(CoreError::ShiftAlreadyOpen { .. })),
                    "unexpected error: {err}"
                );
                refused += 1;
            }
        }
    }

    assert_eq!((opened, refused), (1, 1));
    assert_eq!(fx.tdb.shifts().list_open().await.unwrap().len(), 1);
    db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_never_oversell() {
    let temp = TempDb::new();
    let db = temp.open().await;
    let fx = provision(&db).await;

    let product = fx
        .tdb
        .products()
        .insert(NewProduct::new("ALIM-1", "Alimento 3kg", Money::from_pesos(5000)).stock(Quantity::from_units(10)))
        .await
        .unwrap();
    let shift = fx
        .tdb
        .shift_manager()
        .open_shift(&fx.register.id, &fx.first, Money::zero())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let tdb = fx.tdb.clone();
        let cashier = fx.first.clone();
        let shift = shift.clone();
        let cart = Cart::from_lines([(product.id.as_str(), "6")]).unwrap();
        handles.push(tokio::spawn(async move {
            tdb.checkout()
                .process_sale(Some(&shift), SaleRequest::new(&cashier, &cart))
                .await
        }));
    }

    let mut sold = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(err) => assert!(
                matches!(err.as_domain(), Some(CoreError::InsufficientStock { .. })),
                "unexpected error: {err}"
            ),
        }
    }

    assert_eq!(sold, 1);
    let stock = fx.tdb.inventory().stock_of(&product.id).await.unwrap();
    assert_eq!(stock, Quantity::from_units(4));
    assert_eq!(fx.tdb.orders().list_for_shift(&shift.id).await.unwrap().len(), 1);
    db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_sales_get_distinct_numbers() {
    let temp = TempDb::new();
    let db = temp.open().await;
    let fx = provision(&db).await;

    let product = fx
        .tdb
        .products()
        .insert(NewProduct::new("SNK-1", "Galletas", Money::from_pesos(990)).stock(Quantity::from_units(100)))
        .await
        .unwrap();
    let shift = fx
        .tdb
        .shift_manager()
        .open_shift(&fx.register.id, &fx.first, Money::zero())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let tdb = fx.tdb.clone();
        let cashier = fx.first.clone();
        let shift = shift.clone();
        let cart = Cart::from_lines([(product.id.as_str(), "1")]).unwrap();
        handles.push(tokio::spawn(async move {
            tdb.checkout()
                .process_sale(Some(&shift), SaleRequest::new(&cashier, &cart))
                .await
        }));
    }

    let mut numbers = HashSet::new();
    for handle in handles {
        let order = handle.await.unwrap().unwrap();
        assert!(numbers.insert(order.order_number));
    }

    let mut suffixes: Vec<String> = numbers
        .iter()
        .map(|n| n.rsplit('-').next().unwrap_or_default().to_string())
        .collect();
    suffixes.sort();
    let expected: Vec<String> = (1..=8).map(|n| format!("{:04}", n)).collect();
    assert_eq!(suffixes, expected);

    let stock = fx.tdb.inventory().stock_of(&product.id).await.unwrap();
    assert_eq!(stock, Quantity::from_units(92));
    db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_by_one_cashier_share_a_shift() {
    let temp = TempDb::new();
    let db = temp.open().await;
    let fx = provision(&db).await;

    let product = fx
        .tdb
        .products()
        .insert(NewProduct::new("ARE-1", "Arena 5kg", Money::from_pesos(6990)).stock(Quantity::from_units(50)))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..6 {
        let tdb = fx.tdb.clone();
        let cashier = fx.first.clone();
        let cart = Cart::from_lines([(product.id.as_str(), "1")]).unwrap();
        handles.push(tokio::spawn(async move {
            tdb.checkout().checkout(SaleRequest::new(&cashier, &cart)).await
        }));
    }

    let mut shift_ids = HashSet::new();
    for handle in handles {
        let order = handle.await.unwrap().unwrap();
        shift_ids.insert(order.shift_id.unwrap());
    }

    assert_eq!(shift_ids.len(), 1);
    let open = fx.tdb.shifts().list_open().await.unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].cashier_id, fx.first.id);
    assert!(shift_ids.contains(&open[0].id));

    let stock = fx.tdb.inventory().stock_of(&product.id).await.unwrap();
    assert_eq!(stock, Quantity::from_units(44));
    db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_checkouts_by_two_cashiers_refuse_the_loser() {
    let temp = TempDb::new();
    let db = temp.open().await;
    let fx = provision(&db).await;

    let product = fx
        .tdb
        .products()
        .insert(NewProduct::new("SNK-2", "Hueso", Money::from_pesos(1490)).stock(Quantity::from_units(20)))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for cashier in [fx.first.clone(), fx.second.clone()] {
        let tdb = fx.tdb.clone();
        let cart = Cart::from_lines([(product.id.as_str(), "1")]).unwrap();
        handles.push(tokio::spawn(async move {
            tdb.checkout().checkout(SaleRequest::new(&cashier, &cart)).await
        }));
    }

    let mut sold = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => sold += 1,
            Err(err) => assert!(
                matches!(err.as_domain(), Some(CoreError::ShiftAlreadyOpen { .. })),
                "unexpected error: {err}"
            ),
        }
    }

    assert_eq!(sold, 1);
    let stock = fx.tdb.inventory().stock_of(&product.id).await.unwrap();
    assert_eq!(stock, Quantity::from_units(19));
    db.close().await;
}
