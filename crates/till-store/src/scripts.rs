//! # Reference Migration Scripts
//!
//! The schema scripts the store layer ships for its own catalog databases.
//! Version 1 is the catalog proper; version 2 adds the modifier rule-graph
//! tables. NEVER modify an existing script - its checksum is recorded in
//! every store database it has touched. Always add a new version.

use crate::migrate::{MigrationInfo, MigrationScript};

const V1_CATALOG_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    sku TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    category_id TEXT,
    base_price_cents INTEGER NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS product_modifications (
    modification_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    modification_type TEXT,
    price_adjustment_type TEXT NOT NULL DEFAULT 'FREE',
    base_price_cents INTEGER NOT NULL DEFAULT 0,
    is_automatic BOOLEAN NOT NULL DEFAULT 0,
    display_order INTEGER NOT NULL DEFAULT 0,
    is_active BOOLEAN NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS product_modifier_applicability (
    sku TEXT NOT NULL,
    modification_id TEXT NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT 1,
    PRIMARY KEY (sku, modification_id)
);

CREATE TABLE IF NOT EXISTS modification_groups (
    code TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    selection_type TEXT NOT NULL DEFAULT 'multi',
    is_required BOOLEAN NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS modification_group_members (
    modification_id TEXT NOT NULL,
    group_code TEXT NOT NULL,
    PRIMARY KEY (modification_id, group_code)
);
"#;

const V2_MODIFIER_RULES: &str = r#"
CREATE TABLE IF NOT EXISTS modification_implications (
    source_modification_id TEXT NOT NULL,
    implied_modification_id TEXT NOT NULL,
    PRIMARY KEY (source_modification_id, implied_modification_id)
);

CREATE TABLE IF NOT EXISTS modification_incompatibilities (
    modification_id TEXT NOT NULL,
    incompatible_modification_id TEXT NOT NULL,
    PRIMARY KEY (modification_id, incompatible_modification_id)
);

CREATE TABLE IF NOT EXISTS modification_group_incompatibilities (
    modification_id TEXT NOT NULL,
    incompatible_group_code TEXT NOT NULL,
    PRIMARY KEY (modification_id, incompatible_group_code)
);
"#;

/// The script list for the reference store schema.
pub fn reference_migrations(store_name: impl Into<String>) -> MigrationInfo {
    MigrationInfo {
        store_name: store_name.into(),
        target_version: 2,
        scripts: vec![
            MigrationScript::new(1, "001_catalog_schema", V1_CATALOG_SCHEMA),
            MigrationScript::new(2, "002_modifier_rules", V2_MODIFIER_RULES),
        ],
    }
}
