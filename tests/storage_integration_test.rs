//! Integration tests for the storage backends
//!
//! Every test runs against both the in-memory and the file backend, since the
//! concurrency contract is part of the `Storage` trait rather than of one
//! implementation.

use chrono::{Duration, SubsecRound, Utc};
use snaplink::models::{ClickRecord, LinkRecord};
use snaplink::storage::{FileStorage, MemoryStorage, Storage, StorageError};
use std::sync::Arc;
use tempfile::TempDir;

/// Helper to create in-memory test storage
async fn create_memory_storage() -> Arc<dyn Storage> {
    let storage = MemoryStorage::new();
    storage.init().await.unwrap();
    Arc::new(storage)
}

/// Helper to create file test storage; the directory must outlive the storage
async fn create_file_storage() -> (Arc<dyn Storage>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let storage = FileStorage::new(dir.path().join("db.json")).await.unwrap();
    storage.init().await.unwrap();
    (Arc::new(storage), dir)
}

fn record(code: &str, url: &str) -> LinkRecord {
    let now = Utc::now().trunc_subsecs(3);
    LinkRecord {
        code: code.to_string(),
        target_url: url.to_string(),
        created_at: now,
        expiry: now + Duration::minutes(30),
        clicks: vec![],
    }
}

fn click(n: usize) -> ClickRecord {
    ClickRecord {
        at: Utc::now().trunc_subsecs(3),
        referrer: format!("https://ref{n}.example"),
        location: "127.0.0.1".to_string(),
    }
}

async fn check_insert_conflict(storage: Arc<dyn Storage>) {
    storage
        .try_insert(record("abcd", "https://example.com/first"))
        .await
        .unwrap();

    let err = storage
        .try_insert(record("abcd", "https://example.com/second"))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    // the first record is untouched
    let stored = storage.get("abcd").await.unwrap().unwrap();
    assert_eq!(stored.target_url, "https://example.com/first");
}

async fn check_concurrent_insert_single_winner(storage: Arc<dyn Storage>) {
    let mut handles = vec![];

    for i in 0..10 {
        let storage_clone = Arc::clone(&storage);
        let handle = tokio::spawn(async move {
            storage_clone
                .try_insert(record("samecode", &format!("https://example.com/{i}")))
                .await
        });
        handles.push(handle);
    }

    // Exactly one should succeed, others should get Conflict error
    let mut success_count = 0;
    let mut conflict_count = 0;

    for handle in handles {
        match handle.await.unwrap() {
            Ok(()) => success_count += 1,
            Err(StorageError::Conflict) => conflict_count += 1,
            Err(e) => panic!("Unexpected error: {:?}", e),
        }
    }

    assert_eq!(success_count, 1, "Exactly one insert should succeed");
    assert_eq!(conflict_count, 9, "Nine inserts should conflict");
}

async fn check_append_preserves_order(storage: Arc<dyn Storage>) {
    storage
        .try_insert(record("ordered", "https://example.com"))
        .await
        .unwrap();

    let mut expected = vec![];
    for n in 0..5 {
        let c = click(n);
        expected.push(c.clone());
        storage.append_click("ordered", c).await.unwrap();

        let stored = storage.get("ordered").await.unwrap().unwrap();
        assert_eq!(stored.clicks, expected, "prior clicks must be unchanged");
    }
}

async fn check_concurrent_appends_are_not_lost(storage: Arc<dyn Storage>) {
    storage
        .try_insert(record("hot", "https://example.com/hot"))
        .await
        .unwrap();
    storage
        .try_insert(record("cold", "https://example.com/cold"))
        .await
        .unwrap();

    let mut handles = vec![];
    for n in 0..50 {
        let storage_clone = Arc::clone(&storage);
        let code = if n % 5 == 0 { "cold" } else { "hot" };
        handles.push(tokio::spawn(async move {
            storage_clone.append_click(code, click(n)).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let hot = storage.get("hot").await.unwrap().unwrap();
    let cold = storage.get("cold").await.unwrap().unwrap();
    assert_eq!(hot.clicks.len(), 40);
    assert_eq!(cold.clicks.len(), 10);
}

async fn check_append_to_missing_code(storage: Arc<dyn Storage>) {
    let err = storage.append_click("missing", click(0)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert!(storage.get("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_insert_conflict_memory() {
    check_insert_conflict(create_memory_storage().await).await;
}

#[tokio::test]
async fn test_insert_conflict_file() {
    let (storage, _dir) = create_file_storage().await;
    check_insert_conflict(storage).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_insert_single_winner_memory() {
    check_concurrent_insert_single_winner(create_memory_storage().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_insert_single_winner_file() {
    let (storage, _dir) = create_file_storage().await;
    check_concurrent_insert_single_winner(storage).await;
}

#[tokio::test]
async fn test_append_preserves_order_memory() {
    check_append_preserves_order(create_memory_storage().await).await;
}

#[tokio::test]
async fn test_append_preserves_order_file() {
    let (storage, _dir) = create_file_storage().await;
    check_append_preserves_order(storage).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_memory() {
    check_concurrent_appends_are_not_lost(create_memory_storage().await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_file() {
    let (storage, _dir) = create_file_storage().await;
    check_concurrent_appends_are_not_lost(storage).await;
}

#[tokio::test]
async fn test_append_to_missing_code_memory() {
    check_append_to_missing_code(create_memory_storage().await).await;
}

#[tokio::test]
async fn test_append_to_missing_code_file() {
    let (storage, _dir) = create_file_storage().await;
    check_append_to_missing_code(storage).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_file_storage_concurrent_writes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("db.json");

    {
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(&path).await.unwrap());
        storage.init().await.unwrap();

        let mut handles = vec![];
        for i in 0..20 {
            let storage_clone = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                let code = format!("code{i:02}");
                storage_clone
                    .try_insert(record(&code, "https://example.com"))
                    .await
                    .unwrap();
                storage_clone.append_click(&code, click(i)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    // the file on disk is a complete, parseable document
    let contents = std::fs::read_to_string(&path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&contents).unwrap();
    assert_eq!(value["urls"].as_object().unwrap().len(), 20);

    let reopened = FileStorage::new(&path).await.unwrap();
    for i in 0..20 {
        let stored = reopened.get(&format!("code{i:02}")).await.unwrap().unwrap();
        assert_eq!(stored.clicks.len(), 1);
    }
}
