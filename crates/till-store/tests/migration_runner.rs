//! Integration tests for the migration runner: idempotence, tamper
//! detection, gap handling, outdated databases, and partial-failure
//! rollback, all against real database files.

use std::path::PathBuf;

use till_store::{
    reference_migrations, run_migrations, MigrationInfo, MigrationScript, StoreDb, StoreDbConfig,
    StoreError,
};

fn fresh_db(dir: &tempfile::TempDir) -> PathBuf {
    let path = dir.path().join("store.db");
    // An empty file is a valid empty SQLite database.
    std::fs::File::create(&path).unwrap();
    path
}

async fn applied_versions(path: &PathBuf) -> Vec<(i64, String)> {
    let db = StoreDb::open(StoreDbConfig::new(path)).await.unwrap();
    let rows: Vec<(i64, String)> = sqlx::query_as(
        "SELECT version, checksum FROM schema_version ORDER BY version",
    )
    .fetch_all(db.pool())
    .await
    .unwrap();
    db.close().await;
    rows
}

#[tokio::test]
async fn applies_reference_scripts_and_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = fresh_db(&dir);
    let info = reference_migrations("test-store");

    let first = run_migrations(&path, &info).await.unwrap();
    assert_eq!(first.applied, vec![1, 2]);
    assert_eq!(first.schema_version, 2);
    let backup = first.backup_path.unwrap();
    assert!(backup.exists());

    let recorded = applied_versions(&path).await;

    // Second run: nothing pending, no new backup, bookkeeping unchanged.
    let second = run_migrations(&path, &info).await.unwrap();
    assert!(second.applied.is_empty());
    assert!(second.backup_path.is_none());
    assert_eq!(applied_versions(&path).await, recorded);
}

#[tokio::test]
async fn missing_database_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ghost.db");
    let err = run_migrations(&path, &reference_migrations("test"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::SchemaIntegrity { .. }));
    assert!(err.to_string().contains("does not exist"));
}

#[tokio::test]
async fn tampered_script_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = fresh_db(&dir);
    let mut info = reference_migrations("test-store");
    run_migrations(&path, &info).await.unwrap();

    // Alter the body of an already-applied script.
    info.scripts[0].sql.push_str("\n-- sneaky edit\n");
    let err = run_migrations(&path, &info).await.unwrap_err();
    assert!(err.to_string().contains("potential tampering"));

    // A checksum override restores the recorded digest and the run passes.
    let original = reference_migrations("test-store").scripts[0].checksum();
    info.scripts[0].checksum_override = Some(original);
    run_migrations(&path, &info).await.unwrap();
}

#[tokio::test]
async fn gap_in_script_list_fails_before_touching_the_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = fresh_db(&dir);

    let info = MigrationInfo {
        store_name: "test".into(),
        target_version: 3,
        scripts: vec![
            MigrationScript::new(1, "001_a", "CREATE TABLE a (id INTEGER);"),
            MigrationScript::new(3, "003_c", "CREATE TABLE c (id INTEGER);"),
        ],
    };
    let err = run_migrations(&path, &info).await.unwrap_err();
    assert!(err.to_string().contains("gap"));

    // Nothing was applied.
    let metadata = std::fs::metadata(&path).unwrap();
    assert_eq!(metadata.len(), 0);
}

#[tokio::test]
async fn database_ahead_of_code_fails_as_outdated() {
    let dir = tempfile::tempdir().unwrap();
    let path = fresh_db(&dir);
    run_migrations(&path, &reference_migrations("test"))
        .await
        .unwrap();

    // A build that only knows version 1 meets a version-2 database.
    let old_build = MigrationInfo {
        store_name: "test".into(),
        target_version: 1,
        scripts: vec![reference_migrations("test").scripts.remove(0)],
    };
    let err = run_migrations(&path, &old_build).await.unwrap_err();
    assert!(err.to_string().contains("extension outdated"));
}

#[tokio::test]
async fn failing_script_rolls_back_and_aborts_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = fresh_db(&dir);

    let broken = MigrationInfo {
        store_name: "test".into(),
        target_version: 2,
        scripts: vec![
            MigrationScript::new(1, "001_good", "CREATE TABLE good (id INTEGER);"),
            MigrationScript::new(2, "002_bad", "CREATE TABLE broken (;"),
        ],
    };
    let err = run_migrations(&path, &broken).await.unwrap_err();
    assert!(matches!(err, StoreError::MigrationFailed { .. }));

    // Script 1 committed; script 2 left no trace.
    assert_eq!(
        applied_versions(&path)
            .await
            .iter()
            .map(|(v, _)| *v)
            .collect::<Vec<_>>(),
        vec![1]
    );

    // Fixing the script completes the run from where it stopped.
    let fixed = MigrationInfo {
        store_name: "test".into(),
        target_version: 2,
        scripts: vec![
            MigrationScript::new(1, "001_good", "CREATE TABLE good (id INTEGER);"),
            MigrationScript::new(2, "002_bad", "CREATE TABLE fixed (id INTEGER);"),
        ],
    };
    let outcome = run_migrations(&path, &fixed).await.unwrap();
    assert_eq!(outcome.applied, vec![2]);
}
