//! # Schema Migration Runner
//!
//! Brings a per-store catalog database to its required schema version using
//! an ordered, checksummed script list.
//!
//! ## Migration Process
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  Store activation                                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database file exists? ── no ──► FAIL (never conjure an empty store)   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Ensure schema_version table (create = legacy adoption path)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Validate: script list contiguous from 1, applied versions known,      │
//! │  recorded checksums match recomputed SHA-256 over UTF-8 bytes          │
//! │       │                                                                 │
//! │       ├── gap ──────────────► FAIL                                     │
//! │       ├── checksum mismatch ► FAIL ("potential tampering")             │
//! │       ├── applied > known ──► FAIL ("extension outdated")              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Pending scripts? ── none ──► DONE (idempotent)                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Copy database to <path>.backup-<timestamp>                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  For each pending script, in ONE transaction:                          │
//! │    execute SQL + insert schema_version row, commit                     │
//! │    (failure → roll back, abort the whole run)                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The runner opens its own single connection; scripts run inside that
//! connection's serial transactions. Cancelling the future mid-script drops
//! the open transaction (SQLite rolls it back); scripts committed earlier
//! stay applied.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Contract Types
// =============================================================================

/// One SQL text unit with a monotonic integer version. Applied once; its
/// checksum is recorded for tamper detection.
#[derive(Debug, Clone)]
pub struct MigrationScript {
    pub version: i64,
    pub name: String,
    pub sql: String,
    /// Overrides the computed digest, for scripts whose recorded checksum
    /// predates a whitespace-only reformat.
    pub checksum_override: Option<String>,
}

impl MigrationScript {
    pub fn new(version: i64, name: impl Into<String>, sql: impl Into<String>) -> Self {
        MigrationScript {
            version,
            name: name.into(),
            sql: sql.into(),
            checksum_override: None,
        }
    }

    /// SHA-256 over the script's UTF-8 bytes, hex-encoded, unless
    /// overridden.
    pub fn checksum(&self) -> String {
        if let Some(fixed) = &self.checksum_override {
            return fixed.clone();
        }
        let mut hasher = Sha256::new();
        hasher.update(self.sql.as_bytes());
        hex::encode(hasher.finalize())
    }
}

/// The migration-info contract a store extension supplies.
#[derive(Debug, Clone)]
pub struct MigrationInfo {
    pub store_name: String,
    pub target_version: i64,
    /// Must be ordered and contiguous starting at version 1.
    pub scripts: Vec<MigrationScript>,
}

/// What one run did.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub store_name: String,
    /// Schema version after the run.
    pub schema_version: i64,
    /// Versions applied by THIS run (empty when already current).
    pub applied: Vec<i64>,
    /// Backup written before the first pending script, if any were pending.
    pub backup_path: Option<PathBuf>,
}

#[derive(Debug, sqlx::FromRow)]
struct AppliedRow {
    version: i64,
    script_name: String,
    checksum: String,
}

// =============================================================================
// Runner
// =============================================================================

/// Runs pending migrations against one store database. Idempotent: a second
/// run with the same script list changes nothing.
pub async fn run_migrations(db_path: &Path, info: &MigrationInfo) -> StoreResult<MigrationOutcome> {
    let store = &info.store_name;

    if !db_path.exists() {
        return Err(StoreError::schema_integrity(
            store,
            format!("database file '{}' does not exist", db_path.display()),
        ));
    }

    validate_script_list(info)?;

    let mut conn: SqliteConnection = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(false)
        .connect()
        .await
        .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

    // Legacy adoption path: a database predating versioning gets the
    // bookkeeping table and is treated as version 0.
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            script_name TEXT NOT NULL,
            applied_utc TEXT NOT NULL,
            checksum TEXT NOT NULL
        )
        "#,
    )
    .execute(&mut conn)
    .await?;

    let applied = sqlx::query_as::<_, AppliedRow>(
        "SELECT version, script_name, checksum FROM schema_version ORDER BY version",
    )
    .fetch_all(&mut conn)
    .await?;

    let highest_known = info.scripts.last().map(|s| s.version).unwrap_or(0);
    for row in &applied {
        if row.version > highest_known {
            return Err(StoreError::schema_integrity(
                store,
                format!(
                    "database is at schema version {} but this build only knows up to {}; extension outdated",
                    row.version, highest_known
                ),
            ));
        }
        // Contiguity of the script list guarantees version N sits at N-1.
        let script = &info.scripts[(row.version - 1) as usize];
        let expected = script.checksum();
        if row.checksum != expected {
            return Err(StoreError::schema_integrity(
                store,
                format!(
                    "checksum mismatch for applied script '{}' (version {}); potential tampering",
                    row.script_name, row.version
                ),
            ));
        }
    }

    let current_version = applied.last().map(|r| r.version).unwrap_or(0);
    let pending: Vec<&MigrationScript> = info
        .scripts
        .iter()
        .filter(|s| s.version > current_version)
        .collect();

    if pending.is_empty() {
        debug!(store = %store, version = current_version, "schema already current");
        return Ok(MigrationOutcome {
            store_name: store.clone(),
            schema_version: current_version,
            applied: Vec::new(),
            backup_path: None,
        });
    }

    let backup_path = backup_database(db_path, store)?;

    let mut applied_now = Vec::new();
    for script in pending {
        info!(store = %store, version = script.version, script = %script.name, "applying migration");

        let mut tx = conn.begin().await.map_err(|e| StoreError::MigrationFailed {
            script: script.name.clone(),
            reason: e.to_string(),
        })?;

        let step = async {
            sqlx::raw_sql(&script.sql).execute(&mut *tx).await?;
            sqlx::query(
                "INSERT INTO schema_version (version, script_name, applied_utc, checksum) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(script.version)
            .bind(&script.name)
            .bind(Utc::now().to_rfc3339())
            .bind(script.checksum())
            .execute(&mut *tx)
            .await?;
            Ok::<_, sqlx::Error>(())
        }
        .await;

        match step {
            Ok(()) => {
                tx.commit().await.map_err(|e| StoreError::MigrationFailed {
                    script: script.name.clone(),
                    reason: e.to_string(),
                })?;
                applied_now.push(script.version);
            }
            Err(e) => {
                warn!(store = %store, script = %script.name, error = %e, "migration failed; rolling back");
                tx.rollback().await.ok();
                return Err(StoreError::MigrationFailed {
                    script: script.name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(store = %store, applied = ?applied_now, "migrations complete");
    Ok(MigrationOutcome {
        store_name: store.clone(),
        schema_version: info.target_version,
        applied: applied_now,
        backup_path: Some(backup_path),
    })
}

/// The code-side list must be ordered and contiguous from version 1 and
/// must reach the declared target version.
fn validate_script_list(info: &MigrationInfo) -> StoreResult<()> {
    for (index, script) in info.scripts.iter().enumerate() {
        let expected = (index + 1) as i64;
        if script.version != expected {
            return Err(StoreError::schema_integrity(
                &info.store_name,
                format!(
                    "script list has a gap: expected version {}, found {} ('{}')",
                    expected, script.version, script.name
                ),
            ));
        }
    }
    let highest = info.scripts.last().map(|s| s.version).unwrap_or(0);
    if highest != info.target_version {
        return Err(StoreError::schema_integrity(
            &info.store_name,
            format!(
                "script list reaches version {} but target is {}",
                highest, info.target_version
            ),
        ));
    }
    Ok(())
}

/// Filesystem copy with a timestamped suffix, written before the first
/// pending script mutates anything.
fn backup_database(db_path: &Path, store: &str) -> StoreResult<PathBuf> {
    let stamp = Utc::now().format("%Y%m%d%H%M%S%3f");
    let backup = PathBuf::from(format!("{}.backup-{}", db_path.display(), stamp));
    std::fs::copy(db_path, &backup)
        .map_err(|e| StoreError::BackupFailed(format!("{}: {}", backup.display(), e)))?;
    info!(store = %store, backup = %backup.display(), "database backed up");
    Ok(backup)
}

// =============================================================================
// Unit Tests
// =============================================================================
