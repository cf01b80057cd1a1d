//! # Store Database Pool
//!
//! Connection pool creation and configuration for per-store SQLite catalogs.
//!
//! ## WAL Mode
//! WAL (Write-Ahead Logging) journal mode is enabled for:
//! - Better concurrent read performance (catalog lookups during a sale)
//! - Readers don't block writers, writers don't block readers
//! - Better crash recovery
//!
//! The pool serves the catalog and the modifier graph load. Migrations do
//! NOT run through this pool: the migration runner opens its own single
//! connection so its scripts execute in one serial transaction stream.

use std::path::PathBuf;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Configuration
// =============================================================================

/// Store database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreDbConfig::new("./stores/coffee.db").max_connections(5);
/// let db = StoreDb::open(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StoreDbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub connect_timeout: Duration,

    /// Whether to create the file when missing. Off by default: a store
    /// catalog that does not exist is a configuration problem, not
    /// something to conjure up empty.
    pub create_if_missing: bool,
}

impl StoreDbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreDbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            create_if_missing: false,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    /// In-memory database configuration (for testing).
    pub fn in_memory() -> Self {
        StoreDbConfig {
            database_path: PathBuf::from(":memory:"),
            // In-memory requires a single connection or every connection
            // sees its own empty database.
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            create_if_missing: true,
        }
    }
}

// =============================================================================
// Store Database
// =============================================================================

/// Handle to one store's catalog database.
#[derive(Debug, Clone)]
pub struct StoreDb {
    pool: SqlitePool,
}

impl StoreDb {
    /// Opens the pool with POS-appropriate SQLite settings (WAL journal,
    /// NORMAL synchronous, foreign keys on).
    pub async fn open(config: StoreDbConfig) -> StoreResult<Self> {
        info!(path = %config.database_path.display(), "opening store database");

        let connect_options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(config.create_if_missing);

        debug!("connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        Ok(StoreDb { pool })
    }

    /// Convenience constructor for isolated in-memory databases in tests.
    pub async fn in_memory() -> StoreResult<Self> {
        StoreDb::open(StoreDbConfig::in_memory()).await
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Checks if the database is responsive.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }

    /// Closes the pool. Further operations fail afterwards.
    pub async fn close(&self) {
        info!("closing store database pool");
        self.pool.close().await;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
