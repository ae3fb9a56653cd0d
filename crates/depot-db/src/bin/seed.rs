//! # Seed Data Generator
//!
//! Populates the database with a small catalog for development.
//!
//! ## Usage
//! ```bash
//! # Generate 40 products (default)
//! cargo run -p depot-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p depot-db --bin seed -- --count 100
//!
//! # Specify database path (otherwise DEPOT_DATABASE_PATH or ./depot.db)
//! cargo run -p depot-db --bin seed -- --db ./data/depot.db
//! ```
//!
//! ## Generated Data
//! - Products across a few categories, SKU `{CATEGORY}-{INDEX}`
//! - Opening stock for each product, written as `purchase` transactions
//! - One sample customer order (reserves stock)
//! - One pending purchase order for whatever is low on stock

use std::env;

use depot_core::{
    NewOrder, NewOrderItem, NewProduct, NewPurchaseOrder, NewPurchaseOrderItem, NewTransaction,
    TransactionKind,
};
use depot_db::{AppConfig, Database};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Product categories for realistic test data.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "HW",
        &["Hex Bolt", "Wood Screw", "Wall Anchor", "Hinge", "Drawer Slide"],
    ),
    (
        "TL",
        &["Claw Hammer", "Tape Measure", "Utility Knife", "Hand Saw", "Spirit Level"],
    ),
    (
        "EL",
        &["Extension Cord", "Wall Plate", "Light Switch", "LED Bulb", "Cable Tie"],
    ),
    (
        "PL",
        &["PVC Elbow", "Pipe Clamp", "Ball Valve", "Teflon Tape", "Drain Plug"],
    ),
];

/// Pack sizes with their price multiplier.
const PACKS: &[(&str, i64)] = &[("Single", 1), ("10-Pack", 8)];

const SEED_USER: &str = "seed";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut config = AppConfig::from_env()?;
    let mut count: usize = 40;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(40);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Depot Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of products to generate (default: 40)");
                println!("  -d, --db <PATH>    Database file path (default: $DEPOT_DATABASE_PATH or ./depot.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    info!(
        database = %config.database_path.display(),
        count,
        policy = %config.negative_stock,
        "Seeding database"
    );

    let db = Database::new(config.db_config()).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(existing, "Database already has products, skipping seed");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut product_ids = Vec::new();

    'outer: for (category_idx, (category, names)) in CATEGORIES.iter().enumerate() {
        for (name_idx, name) in names.iter().enumerate() {
            for (pack_idx, (pack, multiplier)) in PACKS.iter().enumerate() {
                if product_ids.len() >= count {
                    break 'outer;
                }

                let seed = category_idx * 100 + name_idx * 10 + pack_idx;
                let input = generate_product(category, name, pack, *multiplier, seed);

                let product = match db.products().create(&input).await {
                    Ok(product) => product,
                    Err(e) => {
                        warn!(sku = %input.sku, error = %e, "Failed to insert product");
                        continue;
                    }
                };

                let opening = (seed % 60) as i64;
                if opening > 0 {
                    let purchase =
                        NewTransaction::new(&product.id, TransactionKind::Purchase, opening)
                            .with_notes("opening stock");
                    db.ledger().apply_transaction(SEED_USER, &purchase).await?;
                }

                product_ids.push((product.id, product.price_cents, product.cost_cents));
            }
        }
    }

    info!(products = product_ids.len(), elapsed = ?start.elapsed(), "Products generated");

    if let Some((product_id, price_cents, _)) = product_ids.last() {
        let order = db
            .orders()
            .create_order(
                SEED_USER,
                &NewOrder {
                    customer_id: "walk-in".to_string(),
                    notes: Some("sample order".to_string()),
                    items: vec![NewOrderItem::new(product_id, 2, *price_cents)],
                },
            )
            .await?;
        info!(order_number = %order.order.order_number, "Sample order created");
    }

    let low = db.inventory().low_stock_products().await?;
    if !low.is_empty() {
        let items = low
            .iter()
            .filter(|row| row.reorder_quantity() > 0)
            .filter_map(|row| {
                product_ids
                    .iter()
                    .find(|(id, _, _)| *id == row.product_id)
                    .map(|(id, _, cost)| NewPurchaseOrderItem::new(id, row.reorder_quantity(), *cost))
            })
            .take(depot_core::MAX_ORDER_ITEMS)
            .collect::<Vec<_>>();

        if !items.is_empty() {
            let po = db
                .purchase_orders()
                .create(
                    SEED_USER,
                    &NewPurchaseOrder {
                        supplier_id: "default-supplier".to_string(),
                        expected_delivery: None,
                        notes: Some("restock low items".to_string()),
                        items,
                    },
                )
                .await?;
            info!(po_number = %po.purchase_order.po_number, "Restock purchase order created");
        }
    }

    let summary = serde_json::json!({
        "products": db.products().count().await?,
        "low_stock": low.len(),
        "orders": db.orders().list_orders(None, 100, 0).await?.len(),
        "purchase_orders": db.purchase_orders().list(None, 100, 0).await?.len(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    db.close().await;
    Ok(())
}

/// Builds one catalog entry.
fn generate_product(category: &str, name: &str, pack: &str, multiplier: i64, seed: usize) -> NewProduct {
    let sku = format!("{}-{:04}", category, seed);

    // $1.49 - $9.48 per unit
    let unit_price = 149 + ((seed * 37) % 800) as i64;
    let price_cents = unit_price * multiplier;

    // Cost is 55-74% of price
    let cost_pct = 55 + (seed % 20) as i64;
    let cost_cents = price_cents * cost_pct / 100;

    let min_level = 5 + (seed % 4) as i64 * 5;

    NewProduct::new(sku, format!("{} {}", name, pack), price_cents, cost_cents)
        .with_category(category)
        .with_stock_levels(min_level, min_level * 10)
}
