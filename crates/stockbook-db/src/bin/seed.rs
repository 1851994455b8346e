//! # Seed Data Generator
//!
//! Populates a database with a demo pharmacy for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./stockbook_dev.db for owner@demo.example
//! cargo run -p stockbook-db --bin seed
//!
//! # Another owner, more invoices
//! cargo run -p stockbook-db --bin seed -- --email me@shop.example --invoices 40
//!
//! # Specify database path
//! cargo run -p stockbook-db --bin seed -- --db ./data/stockbook.db
//! ```
//!
//! ## Generated Data
//! - Two-level categories (Medicines › Analgesics, Dressings, ...)
//! - ~30 products with opening stock, some deliberately low or empty
//! - A handful of clients and destinations
//! - Stock exits to destinations and invoices in every status

use std::env;
use stockbook_core::{
    DeductRequest, InvoiceLine, InvoiceStatus, NewCategory, NewClient, NewDestination, NewInvoice,
    NewProduct, Product, StockLine, TransactionKind,
};
use stockbook_db::{Database, DbConfig};

/// (category, sub-category, products as (name, unit, sale price cents))
const CATALOGUE: &[(&str, Option<&str>, &[(&str, &str, i64)])] = &[
    (
        "Medicines",
        Some("Analgesics"),
        &[
            ("Paracetamol 500mg", "box", 350),
            ("Ibuprofen 400mg", "box", 520),
            ("Aspirin 300mg", "box", 290),
            ("Naproxen 250mg", "box", 740),
            ("Codeine Linctus", "bottle", 890),
        ],
    ),
    (
        "Medicines",
        Some("Antibiotics"),
        &[
            ("Amoxicillin 250mg", "box", 1250),
            ("Doxycycline 100mg", "box", 1480),
            ("Azithromycin 500mg", "box", 2100),
            ("Clarithromycin 250mg", "box", 1890),
        ],
    ),
    (
        "Dressings",
        None,
        &[
            ("Gauze Swabs", "pack", 180),
            ("Crepe Bandage", "roll", 240),
            ("Adhesive Plasters", "box", 310),
            ("Surgical Tape", "roll", 275),
            ("Burn Dressing", "pack", 960),
            ("Cotton Wool", "bag", 150),
        ],
    ),
    (
        "Equipment",
        None,
        &[
            ("Digital Thermometer", "unit", 1599),
            ("Blood Pressure Cuff", "unit", 3499),
            ("Pulse Oximeter", "unit", 2799),
            ("Syringe 5ml", "pack", 420),
            ("Nitrile Gloves", "box", 890),
            ("Face Masks", "box", 650),
        ],
    ),
    (
        "Personal Care",
        None,
        &[
            ("Hand Sanitiser", "bottle", 399),
            ("Antiseptic Cream", "tube", 455),
            ("Lip Balm", "unit", 199),
            ("Sunscreen SPF50", "bottle", 1150),
            ("Oral Rehydration Salts", "sachet", 85),
        ],
    ),
];

const CLIENTS: &[(&str, &str)] = &[
    ("Harbour Clinic", "14 Quay Street"),
    ("St. Anne's Care Home", "2 Chapel Lane"),
    ("Riverside Vets", "88 Mill Road"),
    ("Northgate School", "1 College Way"),
];

const DESTINATIONS: &[&str] = &["Front Counter", "Ward A", "Ward B", "Supplier Returns"];

const STATUSES: &[InvoiceStatus] = &[InvoiceStatus::Paid, InvoiceStatus::Unpaid, InvoiceStatus::Pending];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./stockbook_dev.db");
    let mut email = String::from("owner@demo.example");
    let mut invoices: usize = 12;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--email" | "-e" => {
                if i + 1 < args.len() {
                    email = args[i + 1].clone();
                    i += 1;
                }
            }
            "--invoices" | "-n" => {
                if i + 1 < args.len() {
                    invoices = args[i + 1].parse().unwrap_or(12);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Stockbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>        Database file path (default: ./stockbook_dev.db)");
                println!("  -e, --email <EMAIL>    Owner email of the seeded tenant");
                println!("  -n, --invoices <N>     Number of invoices to create (default: 12)");
                println!("  -h, --help             Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Stockbook Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Owner:    {}", email);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let tenant = db.tenants().resolve_or_create(&email).await?.tenant_id();

    let existing = db.products().count(&tenant).await?;
    if existing > 0 {
        println!("⚠ Tenant already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        return Ok(());
    }

    // Catalogue
    let start = std::time::Instant::now();
    let mut products: Vec<Product> = Vec::new();
    let mut parents: Vec<(String, String)> = Vec::new();

    for (index, (category, sub_category, items)) in CATALOGUE.iter().enumerate() {
        let parent_id = match parents.iter().find(|(name, _)| name == category) {
            Some((_, id)) => id.clone(),
            None => {
                let created = db
                    .categories()
                    .create(&tenant, &NewCategory { name: category.to_string(), parent_id: None })
                    .await?;
                parents.push((category.to_string(), created.id.clone()));
                created.id
            }
        };

        let category_id = match sub_category {
            Some(name) => {
                db.categories()
                    .create(
                        &tenant,
                        &NewCategory { name: name.to_string(), parent_id: Some(parent_id) },
                    )
                    .await?
                    .id
            }
            None => parent_id,
        };

        for (offset, (name, unit, price)) in items.iter().enumerate() {
            let seed = index * 10 + offset;
            let product = db
                .products()
                .create(
                    &tenant,
                    &NewProduct {
                        name: name.to_string(),
                        unit: unit.to_string(),
                        opening_quantity: opening_quantity(seed),
                        sale_price_cents: *price,
                        // Cost at 55-75% of the sale price
                        purchase_price_cents: price * (55 + (seed % 21) as i64) / 100,
                        category_id: Some(category_id.clone()),
                        image_url: None,
                    },
                )
                .await?;
            products.push(product);
        }
    }
    println!("✓ Created {} products", products.len());

    let mut clients = Vec::new();
    for (name, address) in CLIENTS {
        let slug: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        clients.push(
            db.clients()
                .create(
                    &tenant,
                    &NewClient {
                        name: name.to_string(),
                        email: Some(format!("accounts@{}.example", slug)),
                        phone: None,
                        address: address.to_string(),
                    },
                )
                .await?,
        );
    }

    let mut destinations = Vec::new();
    for name in DESTINATIONS {
        destinations.push(
            db.destinations()
                .create(&tenant, &NewDestination { name: name.to_string(), description: None })
                .await?,
        );
    }
    println!("✓ Created {} clients, {} destinations", clients.len(), destinations.len());

    // Stock movements; rejected exits are expected for the low items
    let mut exits = 0;
    for (n, product) in products.iter().enumerate().filter(|(_, p)| p.quantity > 0) {
        let destination = &destinations[n % destinations.len()];
        let kind = if destination.name == "Supplier Returns" {
            TransactionKind::Return
        } else {
            TransactionKind::Sale
        };
        let request = DeductRequest {
            items: vec![StockLine::new(&product.id, 1 + (n % 3) as i64)],
            destination_id: Some(destination.id.clone()),
            kind,
            note: None,
        };
        match db.stock().deduct_stock(&tenant, &request).await {
            Ok(_) => exits += 1,
            Err(e) => eprintln!("  Skipped exit for {}: {}", product.name, e),
        }
    }

    let mut created = 0;
    for n in 0..invoices {
        let first = &products[(n * 7) % products.len()];
        let second = &products[(n * 7 + 3) % products.len()];
        let request = NewInvoice {
            invoice_number: None,
            client_id: clients[n % clients.len()].id.clone(),
            lines: vec![InvoiceLine::new(&first.id, 1), InvoiceLine::new(&second.id, 2)],
            tax_rate_bps: 2000,
            tax_enabled: n % 4 != 0,
            status: STATUSES[n % STATUSES.len()],
            destination_id: None,
        };
        match db.invoicing().create_invoice(&tenant, &request).await {
            Ok(_) => created += 1,
            Err(e) => eprintln!("  Skipped invoice {}: {}", n + 1, e),
        }
    }

    let elapsed = start.elapsed();
    println!("✓ Recorded {} stock exits and {} invoices in {:?}", exits, created, elapsed);

    // Verify the ledger still explains every stock level
    println!();
    println!("Reconciling ledger...");
    let mut drift = 0;
    for product in &products {
        if !db.ledger().reconcile(&tenant, &product.id).await?.is_consistent() {
            drift += 1;
        }
    }
    println!("  {} of {} products consistent", products.len() - drift, products.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Opening stock: mostly healthy, every seventh low, every eleventh empty.
fn opening_quantity(seed: usize) -> i64 {
    if seed % 11 == 0 {
        0
    } else if seed % 7 == 0 {
        (seed % 15) as i64 + 1
    } else {
        40 + ((seed * 13) % 160) as i64
    }
}
