//! # Demo Data Seeder
//!
//! Populates a database with a small candle-workshop catalog and walks it
//! through the full transaction cycle: purchase components, assemble
//! finished goods, sell (including a shortfall sale that assembles on the
//! fly), and revert one transaction.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p stockbook-ledger --bin seed
//!
//! # Specify database path
//! cargo run -p stockbook-ledger --bin seed -- --db ./data/stockbook.db
//! ```
//!
//! Running against a database that already has products is a no-op; delete
//! the file to regenerate.

use std::env;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use stockbook_core::{BomLine, ProductKind, DEFAULT_OWNER_ID};
use stockbook_ledger::{
    NewProduct, PurchaseDraft, PurchaseLine, SaleDraft, SaleLine, Stockbook,
};
use stockbook_store::{SqliteStore, StoreConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from("./stockbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockbook Demo Data Seeder");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./stockbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockbook Demo Data Seeder");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let store = SqliteStore::connect(StoreConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let book = Stockbook::new(Arc::new(store));
    let owner = DEFAULT_OWNER_ID;

    let existing = book.catalog().products_for_owner(owner).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // ===== Catalog =====

    println!();
    println!("Creating catalog...");

    let wax = component(owner, "Soy Wax Block", "WAX-001", 150, 50);
    let wick = component(owner, "Cotton Wick", "WCK-001", 40, 100);
    let jar = component(owner, "Glass Jar 8oz", "JAR-001", 220, 30);
    let oil = component(owner, "Lavender Oil 10ml", "OIL-LAV", 95, 20);

    let wax = book.catalog().create_product(wax).await?;
    let wick = book.catalog().create_product(wick).await?;
    let jar = book.catalog().create_product(jar).await?;
    let oil = book.catalog().create_product(oil).await?;

    let candle = book
        .catalog()
        .create_product(NewProduct {
            owner_id: owner.to_string(),
            name: "Lavender Candle 8oz".to_string(),
            sku: Some("CNDL-LAV".to_string()),
            kind: ProductKind::Finished,
            initial_stock: 0,
            min_stock: 6,
            max_stock: 60,
            cost_price_cents: 0,
            sale_price_cents: 2499,
            supplier_id: None,
            bom: vec![
                bom_line(&wax.id, 2),
                bom_line(&wick.id, 1),
                bom_line(&jar.id, 1),
                bom_line(&oil.id, 1),
            ],
        })
        .await?;

    let soap = book
        .catalog()
        .create_product(NewProduct {
            owner_id: owner.to_string(),
            name: "Gift Soap Bar".to_string(),
            sku: Some("SOAP-001".to_string()),
            kind: ProductKind::Finished,
            initial_stock: 24,
            min_stock: 10,
            max_stock: 100,
            cost_price_cents: 310,
            sale_price_cents: 899,
            supplier_id: None,
            bom: vec![],
        })
        .await?;

    println!("✓ Created 6 products (4 components, 2 finished)");

    // ===== Purchase =====

    println!();
    println!("Recording component purchase...");

    let purchase = book
        .ledger()
        .record_purchase(PurchaseDraft {
            owner_id: owner.to_string(),
            lines: vec![
                purchase_line(&wax.id, 200, 140),
                purchase_line(&wick.id, 300, 35),
                purchase_line(&jar.id, 120, 210),
                purchase_line(&oil.id, 80, 90),
            ],
            discount_cents: 2000,
            supplier_id: None,
            invoice_number: Some("INV-1001".to_string()),
            notes: Some("Opening stock order".to_string()),
            date: None,
        })
        .await?;
    println!(
        "✓ Purchase {} recorded: {} net",
        &purchase.id[..8],
        cents(purchase.net_total_cents)
    );

    // ===== Assembly =====

    println!();
    println!("Assembling 12 candles...");

    let assembly = book.ledger().process_assembly(&candle.id, 12).await?;
    println!(
        "✓ Assembly {} recorded: {} component cost",
        &assembly.id[..8],
        cents(assembly.total_cents)
    );

    // ===== Sales =====

    println!();
    println!("Recording sales...");

    let soap_sale = book
        .ledger()
        .record_sale(SaleDraft {
            owner_id: owner.to_string(),
            lines: vec![SaleLine {
                product_id: soap.id.clone(),
                quantity: 2,
                unit_price_cents: None,
            }],
            discount_cents: 0,
            client_id: None,
            client_name: Some("Walk-in".to_string()),
            notes: None,
            date: None,
            payment_pending: false,
        })
        .await?;
    println!(
        "✓ Sale {} recorded: 2 soap bars, {}",
        &soap_sale.id[..8],
        cents(soap_sale.net_total_cents)
    );

    // 12 candles on hand, 15 requested: 3 get assembled inside the sale.
    let candle_sale = book
        .ledger()
        .record_sale(SaleDraft {
            owner_id: owner.to_string(),
            lines: vec![SaleLine {
                product_id: candle.id.clone(),
                quantity: 15,
                unit_price_cents: None,
            }],
            discount_cents: 1500,
            client_id: None,
            client_name: Some("Corner Store".to_string()),
            notes: Some("Includes 3 units assembled to order".to_string()),
            date: None,
            payment_pending: false,
        })
        .await?;
    println!(
        "✓ Sale {} recorded: 15 candles (3 assembled on the fly), {}",
        &candle_sale.id[..8],
        cents(candle_sale.net_total_cents)
    );

    // ===== Reversal =====

    println!();
    println!("Reverting the soap sale...");

    let outcome = book.ledger().revert_transaction(&soap_sale.id).await?;
    println!("✓ Reverted ({:?}): stock restored, history kept", outcome);

    // ===== Summary =====

    println!();
    println!("Final state");
    println!("-----------");
    for product in book.catalog().products_for_owner(owner).await? {
        let marker = if product.is_low_stock() { "⚠" } else { " " };
        println!(
            "{} {:<22} stock {:>4}   cost {:>8}   price {:>8}",
            marker,
            product.name,
            product.current_stock,
            cents(product.cost_price_cents),
            cents(product.sale_price_cents),
        );
    }

    let buildable = book.catalog().virtual_stock(owner, &candle.id).await?;
    println!();
    println!(
        "Candles on hand + buildable from components: {}",
        buildable
    );

    let history = book.records().transactions_for_owner(owner).await?;
    println!("Transactions recorded: {}", history.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockbook=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn component(owner: &str, name: &str, sku: &str, cost: i64, min_stock: i64) -> NewProduct {
    NewProduct {
        owner_id: owner.to_string(),
        name: name.to_string(),
        sku: Some(sku.to_string()),
        kind: ProductKind::Component,
        initial_stock: 0,
        min_stock,
        max_stock: 1000,
        cost_price_cents: cost,
        sale_price_cents: 0,
        supplier_id: None,
        bom: vec![],
    }
}

fn bom_line(component_id: &str, quantity_per_unit: i64) -> BomLine {
    BomLine {
        component_product_id: component_id.to_string(),
        quantity_per_unit,
    }
}

fn purchase_line(product_id: &str, quantity: i64, unit_cost_cents: i64) -> PurchaseLine {
    PurchaseLine {
        product_id: product_id.to_string(),
        quantity,
        unit_cost_cents,
    }
}

/// Formats cents as a dollar string for display.
fn cents(cents: i64) -> String {
    format!("${}.{:02}", cents / 100, (cents % 100).abs())
}
