//! # Seed Data Generator
//!
//! Provisions a demo shop with a tiffin-centre menu and rings up sample
//! bills through the real commit path.
//!
//! ## Usage
//! ```bash
//! # Demo shop, 25 bills (default)
//! cargo run -p smartbill-db --bin seed
//!
//! # More bills for a different account
//! cargo run -p smartbill-db --bin seed -- --account acct-demo-2 --bills 200
//!
//! # Specify database path (overrides smartbill.toml / SMARTBILL_DB_PATH)
//! cargo run -p smartbill-db --bin seed -- --db ./data/smartbill.db
//! ```
//!
//! Running it again on the same account keeps the menu and appends bills, so
//! it doubles as a quick check that numbering continues where it left off.

use chrono::Local;
use smartbill_core::{Cart, CatalogItem, Money, PaymentMode};
use smartbill_db::{init_tracing, BillingConfig, Database, DbError};
use std::env;
use std::path::PathBuf;

/// Menu: category, then (item, price in paise).
const MENU: &[(&str, &[(&str, i64)])] = &[
    (
        "Tiffin",
        &[
            ("Idli (2 pc)", 3000),
            ("Medu Vada", 3500),
            ("Masala Dosa", 4550),
            ("Rava Dosa", 5000),
            ("Pongal", 4000),
            ("Upma", 3500),
        ],
    ),
    (
        "Meals",
        &[
            ("South Indian Thali", 12000),
            ("Curd Rice", 6000),
            ("Lemon Rice", 5500),
        ],
    ),
    (
        "Beverages",
        &[
            ("Filter Coffee", 1900),
            ("Masala Chai", 1500),
            ("Badam Milk", 3000),
            ("Buttermilk", 2000),
        ],
    ),
    (
        "Sweets",
        &[("Kesari Bath", 3000), ("Mysore Pak", 2500), ("Gulab Jamun", 2750)],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut bills: usize = 25;
    let mut account_id = String::from("acct-demo");
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bills" | "-n" => {
                if i + 1 < args.len() {
                    bills = args[i + 1].parse().unwrap_or(25);
                    i += 1;
                }
            }
            "--account" | "-a" => {
                if i + 1 < args.len() {
                    account_id = args[i + 1].clone();
                    i += 1;
                }
            }
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
                println!("SmartBilling Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --bills <N>        Number of bills to commit (default: 25)");
                println!("  -a, --account <ID>     Account to seed (default: acct-demo)");
                println!("  -d, --db <PATH>        Database file path");
                println!("  -c, --config <PATH>    Config file (default: platform config dir)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = BillingConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }
    init_tracing(&config.log.filter);

    println!("🌱 SmartBilling Seed Data Generator");
    println!("===================================");
    println!("Database: {}", config.database.path.display());
    println!("Account:  {}", account_id);
    println!("Bills:    {}", bills);
    println!();

    let db = Database::new(config.database.to_db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    // Shop
    if db.shops().find(&account_id).await?.is_none() {
        db.shops()
            .provision(&account_id, "Sri Krishna Tiffins", "Lakshmi Narayan", "+91 98450 12345")
            .await?;
        println!("✓ Shop provisioned");
    } else {
        println!("⚠ Shop already exists, keeping it");
    }

    // Menu
    let menu = seed_menu(&db, &account_id).await?;
    println!("✓ Menu has {} items", menu.len());
    if menu.is_empty() {
        println!("  Nothing to bill.");
        return Ok(());
    }

    // Bills
    println!();
    println!("Committing bills...");

    let shop = db.shops().meta(&account_id).await?;
    let allocator = db.allocator(config.retry_policy());
    let today = Local::now().date_naive();
    let start = std::time::Instant::now();

    for n in 0..bills {
        let mut cart = Cart::new();
        let line_count = 1 + n % 4;
        for k in 0..line_count {
            let item = &menu[(n * 7 + k * 3) % menu.len()];
            let quantity = 1 + ((n + k) % 3) as i64;
            cart.add_catalog_item(item, quantity)?;
        }

        let payment_mode = if n % 3 == 0 {
            PaymentMode::Online
        } else {
            PaymentMode::Cash
        };

        let bill = allocator
            .commit_cart(cart.snapshot(), payment_mode, shop.clone(), today)
            .await?;

        if (n + 1) % 10 == 0 || n + 1 == bills {
            println!(
                "  Bill #{} / Token {} ({}, {})",
                bill.bill_no, bill.token_no, bill.grand_total, bill.payment_mode
            );
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Committed {} bills in {:?}", bills, elapsed);

    // Summary
    let summary = db.bills().day_summary(&account_id, today).await?;
    let counters = db.counters().snapshot(&account_id).await?;
    println!();
    println!("Today ({}):", summary.day);
    println!("  Bills:   {}", summary.bill_count);
    println!("  Items:   {}", summary.total_qty);
    println!("  Cash:    {}", summary.cash_total);
    println!("  Online:  {}", summary.online_total);
    println!("  Total:   {}", summary.grand_total);
    println!("  Next:    Bill #{} / Token {}", counters.bill_no_after(), counters.token_no_after(today));

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Creates any missing categories and items, then returns the whole menu.
async fn seed_menu(db: &Database, account_id: &str) -> Result<Vec<CatalogItem>, DbError> {
    let catalog = db.catalog();
    let existing = catalog.list_categories(account_id).await?;

    let mut menu = Vec::new();
    for (category_name, items) in MENU {
        let category = match existing.iter().find(|c| c.name == *category_name) {
            Some(category) => category.clone(),
            None => catalog.create_category(account_id, category_name).await?,
        };

        let mut present = catalog.list_items(account_id, &category.id).await?;
        for (item_name, paise) in items.iter() {
            if present.iter().any(|item| item.name == *item_name) {
                continue;
            }
            let item = catalog
                .create_item(account_id, &category.id, item_name, Money::from_paise(*paise))
                .await?;
            present.push(item);
        }

        menu.extend(present);
    }

    Ok(menu)
}
