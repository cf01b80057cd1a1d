//! # Demo Store Seeder
//!
//! Creates and populates a demo store database for development.
//!
//! ## Usage
//! ```bash
//! # Default path (stores/demo-coffee.db)
//! cargo run -p till-store --bin seed
//!
//! # Custom path
//! cargo run -p till-store --bin seed -- stores/my-store.db
//! ```
//!
//! Creates the database file, runs the reference migrations, and inserts a
//! small coffee-shop catalog with a modifier rule graph (temperature group,
//! milk options, iced/hot incompatibility, implication to ice cubes).

use std::path::PathBuf;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use till_store::{reference_migrations, run_migrations, StoreDb, StoreDbConfig};

const DEMO_DATA: &str = r#"
INSERT OR REPLACE INTO products (sku, name, description, category_id, base_price_cents, is_active) VALUES
    ('COFFEE.SMALL', 'Small Coffee', 'House blend, 8oz', 'drinks', 350, 1),
    ('COFFEE.LARGE', 'Large Coffee', 'House blend, 16oz', 'drinks', 450, 1),
    ('LATTE', 'Cafe Latte', 'Double shot with steamed milk', 'drinks', 500, 1),
    ('TEA.GREEN', 'Green Tea', NULL, 'drinks', 300, 1),
    ('BAGEL', 'Plain Bagel', 'Toasted on request', 'food', 200, 1),
    ('CROISSANT', 'Butter Croissant', NULL, 'food', 275, 1);

INSERT OR REPLACE INTO modification_groups (code, name, selection_type, is_required) VALUES
    ('TEMPERATURE', 'Temperature', 'single', 1),
    ('MILK', 'Milk', 'single', 0),
    ('SWEETNESS', 'Sweetness', 'multi', 0),
    ('PREP', 'Preparation', 'multi', 0);

INSERT OR REPLACE INTO product_modifications
    (modification_id, name, modification_type, price_adjustment_type,
     base_price_cents, is_automatic, display_order, is_active) VALUES
    ('HOT', 'Hot', 'preparation', 'FREE', 0, 1, 1, 1),
    ('ICED', 'Iced', 'preparation', 'SURCHARGE', 10, 0, 2, 1),
    ('OAT_MILK', 'Oat Milk', 'recipe', 'SURCHARGE', 60, 0, 3, 1),
    ('SOY_MILK', 'Soy Milk', 'recipe', 'SURCHARGE', 50, 0, 4, 1),
    ('LESS_SUGAR', 'Less Sugar', 'recipe', 'FREE', 0, 0, 5, 1),
    ('NO_SUGAR', 'No Sugar', 'recipe', 'FREE', 0, 0, 6, 1),
    ('ICE_CUBES', 'Ice Cubes', 'preparation', 'FREE', 0, 0, 7, 1);

INSERT OR REPLACE INTO modification_group_members (modification_id, group_code) VALUES
    ('HOT', 'TEMPERATURE'),
    ('ICED', 'TEMPERATURE'),
    ('OAT_MILK', 'MILK'),
    ('SOY_MILK', 'MILK'),
    ('LESS_SUGAR', 'SWEETNESS'),
    ('NO_SUGAR', 'SWEETNESS'),
    ('ICE_CUBES', 'PREP');

INSERT OR REPLACE INTO product_modifier_applicability (sku, modification_id, is_active) VALUES
    ('COFFEE.SMALL', 'HOT', 1), ('COFFEE.SMALL', 'ICED', 1),
    ('COFFEE.SMALL', 'LESS_SUGAR', 1), ('COFFEE.SMALL', 'NO_SUGAR', 1),
    ('COFFEE.SMALL', 'ICE_CUBES', 1),
    ('COFFEE.LARGE', 'HOT', 1), ('COFFEE.LARGE', 'ICED', 1),
    ('COFFEE.LARGE', 'LESS_SUGAR', 1), ('COFFEE.LARGE', 'NO_SUGAR', 1),
    ('COFFEE.LARGE', 'ICE_CUBES', 1),
    ('LATTE', 'HOT', 1), ('LATTE', 'ICED', 1),
    ('LATTE', 'OAT_MILK', 1), ('LATTE', 'SOY_MILK', 1),
    ('LATTE', 'ICE_CUBES', 1),
    ('TEA.GREEN', 'HOT', 1), ('TEA.GREEN', 'ICED', 1),
    ('TEA.GREEN', 'ICE_CUBES', 1);

INSERT OR REPLACE INTO modification_implications (source_modification_id, implied_modification_id) VALUES
    ('ICED', 'ICE_CUBES');

INSERT OR REPLACE INTO modification_incompatibilities (modification_id, incompatible_modification_id) VALUES
    ('ICED', 'HOT'),
    ('LESS_SUGAR', 'NO_SUGAR');
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    let path: PathBuf = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "stores/demo-coffee.db".to_string())
        .into();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        // The migration runner refuses to conjure databases; seeding is the
        // one place a new file is legitimate.
        std::fs::File::create(&path)?;
        info!(path = %path.display(), "created empty store database");
    }

    let outcome = run_migrations(&path, &reference_migrations("demo-coffee")).await?;
    info!(schema_version = outcome.schema_version, applied = ?outcome.applied, "schema ready");

    let db = StoreDb::open(StoreDbConfig::new(&path)).await?;
    sqlx::raw_sql(DEMO_DATA).execute(db.pool()).await?;
    db.close().await;

    info!(path = %path.display(), "demo store seeded");
    Ok(())
}
