mod helpers;

use helpers::{badge_record, test_engine, MemoryIndex, ScriptedModel};
use std::sync::Arc;

use badgerec::backup::BackupMethod;
use badgerec::record::Namespace;

async fn engine_with_badge(
    backup_dir: &std::path::Path,
    retention_minutes: i64,
) -> (badgerec::engine::RecommendEngine, Arc<MemoryIndex>) {
    let index = Arc::new(MemoryIndex::default());
    let model = Arc::new(ScriptedModel::new("{}"));
    let engine = test_engine(index.clone(), model, backup_dir, retention_minutes);

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("badge.json"),
        serde_json::to_string(&badge_record("B001", "SQL Fundamentals", &["sql"])).unwrap(),
    )
    .unwrap();
    engine.ingest(dir.path(), None).await.unwrap();
    assert!(index.contains(Namespace::Badge, "B001"));
    (engine, index)
}

#[tokio::test]
async fn delete_then_restore_round_trip_via_file_store() {
    let backups = tempfile::tempdir().unwrap();
    let (engine, index) = engine_with_badge(backups.path(), 30).await;

    let outcome = engine
        .delete_with_backup("B001", BackupMethod::File)
        .await
        .unwrap();
    assert!(outcome.deleted);
    assert!(outcome.backed_up);
    assert!(!index.contains(Namespace::Badge, "B001"));

    let restored = engine.restore("B001").await.unwrap();
    assert!(restored.restored, "{}", restored.message);
    assert!(index.contains(Namespace::Badge, "B001"));
}

#[tokio::test]
async fn delete_then_restore_round_trip_via_memory_store() {
    let backups = tempfile::tempdir().unwrap();
    let (engine, index) = engine_with_badge(backups.path(), 30).await;

    let outcome = engine
        .delete_with_backup("B001", BackupMethod::Memory)
        .await
        .unwrap();
    assert!(outcome.deleted && outcome.backed_up);

    assert!(engine.restore("B001").await.unwrap().restored);
    assert!(index.contains(Namespace::Badge, "B001"));
}

#[tokio::test]
async fn deleting_missing_vector_is_reported_not_errored() {
    let backups = tempfile::tempdir().unwrap();
    let (engine, _index) = engine_with_badge(backups.path(), 30).await;

    let outcome = engine
        .delete_with_backup("B404", BackupMethod::File)
        .await
        .unwrap();
    assert!(!outcome.deleted);
    assert!(outcome.message.contains("no vector found"));
}

#[tokio::test]
async fn delete_rejects_unknown_id_prefix() {
    let backups = tempfile::tempdir().unwrap();
    let (engine, _index) = engine_with_badge(backups.path(), 30).await;

    let err = engine
        .delete_with_backup("X123", BackupMethod::File)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("X123"));
}

#[tokio::test]
async fn expired_backup_cannot_be_restored() {
    let backups = tempfile::tempdir().unwrap();
    // Negative retention expires snapshots the moment they are written.
    let (engine, index) = engine_with_badge(backups.path(), -1).await;

    engine
        .delete_with_backup("B001", BackupMethod::File)
        .await
        .unwrap();

    let outcome = engine.restore("B001").await.unwrap();
    assert!(!outcome.restored);
    assert!(outcome.message.contains("expired"));
    assert!(!index.contains(Namespace::Badge, "B001"));
}

#[tokio::test]
async fn restore_without_backup_reports_not_found() {
    let backups = tempfile::tempdir().unwrap();
    let (engine, _index) = engine_with_badge(backups.path(), 30).await;

    let outcome = engine.restore("B777").await.unwrap();
    assert!(!outcome.restored);
    assert!(outcome.message.contains("no backup found"));
}
