//! # Seed Data Generator
//!
//! Populates a development database for the card shop register.
//!
//! ## Usage
//! ```bash
//! cargo run -p cardpos-db --bin seed
//!
//! # Specify database path
//! cargo run -p cardpos-db --bin seed -- --db ./data/cardpos.db
//! ```
//!
//! ## Generated Data
//! - Default operators: `admin`/`admin` (ADMIN), `seller`/`seller` (SELLER)
//! - Singles across a few expansions, languages and finishes
//! - Sealed product (boosters, ETBs, booster boxes)
//! - Accessories (sleeves, binders, deck boxes)
//! - One campaign running for the next two weeks on the sealed product

use cardpos_core::{CampaignDraft, ProductDraft};
use cardpos_db::{Database, DbConfig};
use chrono::{Duration, Local};
use std::env;

/// Singles: (code, name, expansion, rarity, finish, price_cents, stock)
const SINGLES: &[(&str, &str, &str, &str, &str, i64, i64)] = &[
    ("PKM-OBF-125", "Charizard ex", "Obsidian Flames", "Double Rare", "Holo", 4500, 2),
    ("PKM-OBF-215", "Charizard ex (Special Illustration)", "Obsidian Flames", "Special Illustration Rare", "Holo", 38000, 1),
    ("PKM-PAL-203", "Magikarp (Illustration)", "Paldea Evolved", "Illustration Rare", "Holo", 21000, 1),
    ("PKM-PAL-001", "Pineco", "Paldea Evolved", "Common", "Normal", 50, 40),
    ("PKM-PAL-001R", "Pineco", "Paldea Evolved", "Common", "Reverse Holo", 150, 12),
    ("PKM-MEW-151", "Mew ex", "151", "Double Rare", "Holo", 2800, 4),
    ("PKM-MEW-025", "Pikachu", "151", "Common", "Normal", 100, 30),
    ("PKM-MEW-025R", "Pikachu", "151", "Common", "Reverse Holo", 300, 8),
    ("PKM-TEF-123", "Iron Crown ex", "Temporal Forces", "Double Rare", "Holo", 900, 6),
    ("PKM-SVI-086", "Gardevoir ex", "Scarlet & Violet", "Double Rare", "Holo", 1200, 5),
];

/// Sealed: (code, name, expansion, price_cents, stock)
const SEALED: &[(&str, &str, &str, i64, i64)] = &[
    ("SLD-OBF-BST", "Obsidian Flames Booster Pack", "Obsidian Flames", 1800, 72),
    ("SLD-OBF-ETB", "Obsidian Flames Elite Trainer Box", "Obsidian Flames", 21000, 6),
    ("SLD-MEW-BST", "151 Booster Pack", "151", 2500, 48),
    ("SLD-MEW-ETB", "151 Elite Trainer Box", "151", 32000, 3),
    ("SLD-TEF-BOX", "Temporal Forces Booster Box", "Temporal Forces", 62000, 2),
];

/// Accessories: (code, name, price_cents, stock)
const ACCESSORIES: &[(&str, &str, i64, i64)] = &[
    ("ACC-SLV-BLK", "Card Sleeves Black (100)", 2500, 20),
    ("ACC-SLV-CLR", "Penny Sleeves Clear (100)", 500, 50),
    ("ACC-TL-35PT", "Toploader 35pt (25)", 1200, 25),
    ("ACC-BND-9P", "9-Pocket Binder", 6500, 4),
    ("ACC-DBX-100", "Deck Box 100+", 3000, 8),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./cardpos_dev.db");

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
                println!("CardPOS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./cardpos_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 CardPOS Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let created = db.users().ensure_default_users().await?;
    println!("✓ Default users ready ({} created)", created);

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping catalog seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating catalog...");

    let mut drafts = Vec::new();

    for &(code, name, expansion, rarity, finish, price_cents, stock) in SINGLES {
        drafts.push(ProductDraft {
            code: code.to_string(),
            name: name.to_string(),
            category: Some("Single".to_string()),
            expansion: Some(expansion.to_string()),
            language: Some("EN".to_string()),
            rarity: Some(rarity.to_string()),
            finish: Some(finish.to_string()),
            price_cents,
            sale_price_cents: None,
            stock,
            min_stock: 1,
        });
    }

    for &(code, name, expansion, price_cents, stock) in SEALED {
        drafts.push(ProductDraft {
            code: code.to_string(),
            name: name.to_string(),
            category: Some("Sealed".to_string()),
            expansion: Some(expansion.to_string()),
            language: Some("EN".to_string()),
            price_cents,
            stock,
            min_stock: 2,
            ..Default::default()
        });
    }

    for &(code, name, price_cents, stock) in ACCESSORIES {
        drafts.push(ProductDraft {
            code: code.to_string(),
            name: name.to_string(),
            category: Some("Accessory".to_string()),
            price_cents,
            stock,
            min_stock: 3,
            ..Default::default()
        });
    }

    let mut sealed_ids = Vec::new();
    let mut generated = 0;

    for draft in &drafts {
        match db.products().insert(draft).await {
            Ok(product) => {
                if draft.category.as_deref() == Some("Sealed") {
                    sealed_ids.push(product.id);
                }
                generated += 1;
            }
            Err(e) => eprintln!("Failed to insert {}: {}", draft.code, e),
        }
    }

    println!("✓ Generated {} products", generated);

    let admin = db.users().get_by_username("admin").await?;
    let today = Local::now().date_naive();
    let campaign = db
        .campaigns()
        .create(
            &CampaignDraft {
                name: "Sealed Week".to_string(),
                discount_bps: 1000,
                start_date: today,
                end_date: today + Duration::days(14),
                is_active: true,
            },
            &sealed_ids,
            admin.as_ref().map(|u| u.id.as_str()),
        )
        .await?;

    println!(
        "✓ Campaign '{}' ({}) on {} sealed products until {}",
        campaign.name,
        campaign.percentage(),
        sealed_ids.len(),
        campaign.end_date
    );

    println!();
    println!("Verifying search...");
    let results = db.products().search("charizard", 10).await?;
    println!("  Search 'charizard': {} results", results.len());
    let low = db.products().list_low_stock().await?;
    println!("  Low stock: {} products", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
