//! # Store Profiles
//!
//! Loading of store profile documents and the index that enumerates them.
//!
//! ## File Layout
//! ```text
//! stores/
//! ├── stores.toml          # index: enumerates profile files
//! ├── coffee-lahore.toml   # one profile per store
//! └── kiosk-berlin.toml
//! ```
//!
//! ## Profile Format
//! ```toml
//! store_id = "coffee-lahore"
//! display_name = "Coffee Corner Lahore"
//! currency = "PKR"
//! culture = "ur-PK"
//! version = 2
//!
//! [payment_types.cash]
//! allows_change = true
//! requires_exact = false
//!
//! [payment_types.card]
//! allows_change = false
//! requires_exact = true
//!
//! [database]
//! type = "sqlite"
//! connection_string = "stores/coffee-lahore.db"
//! ```
//!
//! The kernel consumes parsed [`StoreProfile`] records; the on-disk format
//! belongs to this module alone.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info};

use till_core::{PaymentTenderType, StoreDatabase, StoreProfile};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// On-Disk Shapes
// =============================================================================

#[derive(Debug, Deserialize)]
struct IndexDoc {
    #[serde(default)]
    profiles: Vec<IndexEntry>,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    path: String,
}

#[derive(Debug, Deserialize)]
struct ProfileDoc {
    store_id: String,
    display_name: String,
    currency: String,
    culture: String,
    version: i64,
    #[serde(default)]
    payment_types: HashMap<String, TenderDoc>,
    database: Option<DatabaseDoc>,
}

#[derive(Debug, Deserialize)]
struct TenderDoc {
    #[serde(default)]
    allows_change: bool,
    #[serde(default)]
    requires_exact: bool,
}

#[derive(Debug, Deserialize)]
struct DatabaseDoc {
    #[serde(rename = "type")]
    db_type: String,
    connection_string: String,
}

// =============================================================================
// Loading
// =============================================================================

/// Loads every profile the index enumerates. Paths in the index resolve
/// relative to the index file's directory.
pub fn load_profiles(index_path: &Path) -> StoreResult<Vec<StoreProfile>> {
    let text = std::fs::read_to_string(index_path).map_err(|e| {
        StoreError::Profile(format!("cannot read index '{}': {}", index_path.display(), e))
    })?;
    let index: IndexDoc = toml::from_str(&text).map_err(|e| {
        StoreError::Profile(format!("cannot parse index '{}': {}", index_path.display(), e))
    })?;

    let base = index_path.parent().unwrap_or_else(|| Path::new("."));
    let mut profiles = Vec::new();
    for entry in index.profiles {
        let path = base.join(&entry.path);
        profiles.push(load_profile(&path)?);
    }

    info!(count = profiles.len(), index = %index_path.display(), "store profiles loaded");
    Ok(profiles)
}

/// Loads and validates a single profile document.
pub fn load_profile(path: &Path) -> StoreResult<StoreProfile> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        StoreError::Profile(format!("cannot read profile '{}': {}", path.display(), e))
    })?;
    let doc: ProfileDoc = toml::from_str(&text).map_err(|e| {
        StoreError::Profile(format!("cannot parse profile '{}': {}", path.display(), e))
    })?;

    if doc.store_id.trim().is_empty() {
        return Err(StoreError::Profile(format!(
            "profile '{}' has a blank store_id",
            path.display()
        )));
    }
    let currency = doc.currency.trim().to_uppercase();
    if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(StoreError::Profile(format!(
            "profile '{}' has invalid currency '{}' (expected 3-letter ISO code)",
            path.display(),
            doc.currency
        )));
    }

    let payment_types = doc
        .payment_types
        .into_iter()
        .map(|(id, t)| {
            (
                id.clone(),
                PaymentTenderType {
                    id,
                    allows_change: t.allows_change,
                    requires_exact: t.requires_exact,
                },
            )
        })
        .collect();

    debug!(store = %doc.store_id, profile = %path.display(), "profile parsed");
    Ok(StoreProfile {
        store_id: doc.store_id.trim().to_string(),
        display_name: doc.display_name,
        currency,
        culture: doc.culture,
        version: doc.version,
        payment_types,
        database: doc.database.map(|d| StoreDatabase {
            db_type: d.db_type,
            connection_string: d.connection_string,
        }),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    const PROFILE: &str = r#"
store_id = "coffee-lahore"
display_name = "Coffee Corner Lahore"
currency = "pkr"
culture = "ur-PK"
version = 2

[payment_types.cash]
allows_change = true

[payment_types.card]
requires_exact = true

[database]
type = "sqlite"
connection_string = "coffee-lahore.db"
"#;

    #[test]
    fn test_load_profile_and_index() {
        let dir = tempfile::tempdir().unwrap();
        write_file(dir.path(), "coffee-lahore.toml", PROFILE);
        let index = write_file(
            dir.path(),
            "stores.toml",
            "[[profiles]]\npath = \"coffee-lahore.toml\"\n",
        );

        let profiles = load_profiles(&index).unwrap();
        assert_eq!(profiles.len(), 1);
        let p = &profiles[0];
        assert_eq!(p.store_id, "coffee-lahore");
        assert_eq!(p.currency, "PKR");
        assert!(p.payment_types["cash"].allows_change);
        assert!(!p.payment_types["cash"].requires_exact);
        assert!(p.payment_types["card"].requires_exact);
        assert_eq!(p.database.as_ref().unwrap().db_type, "sqlite");
    }

    #[test]
    fn test_invalid_currency_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let bad = PROFILE.replace("\"pkr\"", "\"rupees\"");
        let path = write_file(dir.path(), "bad.toml", &bad);
        let err = load_profile(&path).unwrap_err();
        assert!(err.to_string().contains("invalid currency"));
    }

    #[test]
    fn test_missing_index_fails() {
        let err = load_profiles(Path::new("/no/such/stores.toml")).unwrap_err();
        assert!(matches!(err, StoreError::Profile(_)));
    }

    #[test]
    fn test_empty_index_yields_no_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let index = write_file(dir.path(), "stores.toml", "profiles = []\n");
        let profiles = load_profiles(&index).unwrap();
        assert!(profiles.is_empty());
    }
}
