//! # Store Error Types
//!
//! Error types for the store extension layer.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)                                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreError (this module) ← adds store context and categorization      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  KernelError::Extension ← what the kernel-facing services surface      │
//! │                                                                         │
//! │  Schema-integrity failures (gap, checksum, outdated) never convert:    │
//! │  the migration runner fails fast and the host stops.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Store layer errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database file/pool could not be opened.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A catalog or modifier query failed at runtime.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// The schema-version bookkeeping disagrees with the code-side script
    /// list: gaps, checksum mismatches, unknown applied versions.
    #[error("Schema integrity violation for store '{store}': {reason}")]
    SchemaIntegrity { store: String, reason: String },

    /// A pending migration script failed to apply; the run was aborted and
    /// the script's transaction rolled back.
    #[error("Migration script '{script}' failed: {reason}")]
    MigrationFailed { script: String, reason: String },

    /// Pre-migration database backup could not be written (commonly a
    /// read-only filesystem).
    #[error("Database backup failed: {0}")]
    BackupFailed(String),

    /// A store profile or profile index could not be read or parsed.
    #[error("Store profile error: {0}")]
    Profile(String),
}

impl StoreError {
    pub fn schema_integrity(store: impl Into<String>, reason: impl Into<String>) -> Self {
        StoreError::SchemaIntegrity {
            store: store.into(),
            reason: reason.into(),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => StoreError::ConnectionFailed("pool is closed".to_string()),
            sqlx::Error::PoolTimedOut => {
                StoreError::ConnectionFailed("pool timed out".to_string())
            }
            other => StoreError::QueryFailed(other.to_string()),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_integrity_message() {
        let err = StoreError::schema_integrity("coffee-lahore", "checksum mismatch for script '001_catalog_schema' (version 1); potential tampering");
        assert!(err.to_string().contains("coffee-lahore"));
        assert!(err.to_string().contains("potential tampering"));
    }
}
