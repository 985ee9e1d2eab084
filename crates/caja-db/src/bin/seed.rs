//! # Seed Data Generator
//!
//! Provisions a demo tenant so a fresh database can take sales right away.
//!
//! ## Usage
//! ```bash
//! # Seed ./caja_dev.db
//! cargo run -p caja-db --bin seed
//!
//! # Specify database path
//! cargo run -p caja-db --bin seed -- --db ./data/caja.db
//!
//! # Read [database] settings from a TOML file (CAJA_* env still wins)
//! cargo run -p caja-db --bin seed -- --config ./caja.toml
//! ```
//!
//! ## Generated Data
//! - Tenant "Mascotas Demo" (subdomain `demo`, IVA 19%)
//! - Branch "Casa Matriz" with register "Caja 1"
//! - Staff: `admin` (owner), `supervisor`, `cajero` (no passwords; the
//!   presentation layer owns authentication)
//! - A small pet-store catalogue, including bulk food sold by the kilo
//!
//! Does nothing if the database already has tenants.

use std::env;
use std::path::PathBuf;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use caja_core::{Money, Quantity, Role};
use caja_db::{Database, NewBranch, NewProduct, NewRegister, NewStaff, NewTenant, PosConfig, TenantScope};

/// (sku, name, price, cost, stock, bulk)
const CATALOGUE: &[(&str, &str, i64, i64, &str, bool)] = &[
    ("ALI-PER-03", "Alimento perro adulto 3kg", 12_990, 8_500, "24", false),
    ("ALI-PER-15", "Alimento perro adulto 15kg", 45_990, 31_000, "8", false),
    ("ALI-GAT-01", "Alimento gato 1kg", 5_490, 3_300, "30", false),
    ("ALI-GRA-PE", "Alimento perro granel (kg)", 3_990, 2_400, "40", true),
    ("ALI-GRA-GA", "Alimento gato granel (kg)", 4_590, 2_900, "25.5", true),
    ("ARE-SAN-05", "Arena sanitaria 5kg", 6_990, 4_100, "18", false),
    ("SNK-HUE-01", "Hueso de carnaza", 1_490, 700, "60", false),
    ("ACC-COL-M", "Collar nylon talla M", 4_990, 2_200, "12", false),
    ("ACC-COR-01", "Correa retráctil 5m", 9_990, 5_600, "6", false),
    ("HIG-SHA-01", "Shampoo antipulgas 250ml", 5_990, 3_200, "3", false),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Caja POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>       Database file path (default: ./caja_dev.db)");
                println!("  -c, --config <PATH>   TOML configuration file");
                println!("  -h, --help            Show this help message");
                return Ok(());
            }
            other => warn!(argument = other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = PosConfig::load(config_path.as_deref())?;
    if let Some(path) = db_path {
        config.database.path = path;
    } else if config_path.is_none() && env::var("CAJA_DATABASE_PATH").is_err() {
        config.database.path = PathBuf::from("./caja_dev.db");
    }

    println!("🌱 Caja POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", config.database.path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.unscoped().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} tenant(s)", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let tenant = db
        .unscoped()
        .create(NewTenant::new("Mascotas Demo", "76.086.428-5", "demo").legal_name("Mascotas Demo SpA"))
        .await?;
    let tdb = db.scoped(TenantScope::from(&tenant));
    println!("✓ Tenant {} ({})", tenant.name, tenant.id);

    let store = tdb.store();
    let branch = store.create_branch(NewBranch::new("Casa Matriz").main()).await?;
    let register = store.create_register(NewRegister::new(&branch.id, "Caja 1")).await?;
    println!("✓ Branch {} with register {}", branch.name, register.name);

    let staff = [
        NewStaff::new("admin", Role::Owner).full_name("Administrador"),
        NewStaff::new("supervisor", Role::Supervisor)
            .full_name("Supervisora Turno")
            .branch(&branch.id),
        NewStaff::new("cajero", Role::Cashier)
            .full_name("Cajero Demo")
            .branch(&branch.id),
    ];
    for new in staff {
        let member = store.create_staff(new).await?;
        println!("  + {} ({})", member.username, member.role);
    }

    let products = tdb.products();
    let mut inserted = 0;
    for (sku, name, price, cost, stock, bulk) in CATALOGUE {
        let stock: Quantity = stock.parse()?;
        let mut new = NewProduct::new(*sku, *name, Money::from_pesos(*price))
            .cost(Money::from_pesos(*cost))
            .stock(stock);
        if *bulk {
            new = new.bulk();
        }

        match products.insert(new).await {
            Ok(_) => inserted += 1,
            Err(e) => eprintln!("Failed to insert {}: {}", sku, e),
        }
    }
    println!("✓ {} products", inserted);

    let low = products.low_stock().await?;
    println!("  {} product(s) at or below minimum stock", low.len());

    info!(tenant_id = %tenant.id, products = inserted, "Seed complete");
    println!();
    println!("✓ Seed complete! Try host demo.<domain> or header X-Tenant-ID: {}", tenant.id);

    db.close().await;
    Ok(())
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` overrides the default `info,caja=debug,sqlx=warn`.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,caja=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .init();
}
