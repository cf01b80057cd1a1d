//! # till-store: Data-Driven Store Layer for Till POS
//!
//! Everything a store supplies to the culture-neutral kernel: the SQLite
//! product catalog, the modifier rule engine, currency formatting, schema
//! migrations, and profile loading.
//!
//! ## Modules
//!
//! - [`db`] - SQLite pool configuration (WAL, foreign keys)
//! - [`catalog`] - product lookup/search over the `products` table
//! - [`modifiers`] - modifier graph load + validation + surcharge pricing
//! - [`format`] - culture-aware currency formatting
//! - [`migrate`] - versioned, checksummed, backup-before-mutate migrations
//! - [`scripts`] - the reference schema script list
//! - [`profile`] - store profile + index documents (TOML)
//! - [`extension`] - the composed `StoreExtension` implementation
//! - [`error`] - store error types
//!
//! ## Ownership
//! The modifier graph is loaded once at store activation into immutable
//! in-memory maps; there are no concurrent writers. The migration runner
//! uses its own single connection so scripts execute in one serial
//! transaction stream, never through the catalog pool.

pub mod catalog;
pub mod db;
pub mod error;
pub mod extension;
pub mod format;
pub mod migrate;
pub mod modifiers;
pub mod profile;
pub mod scripts;

pub use catalog::SqlCatalog;
pub use db::{StoreDb, StoreDbConfig};
pub use error::{StoreError, StoreResult};
pub use extension::SqlStoreExtension;
pub use format::CultureFormatter;
pub use migrate::{run_migrations, MigrationInfo, MigrationOutcome, MigrationScript};
pub use modifiers::{GraphModifierService, ModifierRuleEngine};
pub use profile::{load_profile, load_profiles};
pub use scripts::reference_migrations;
