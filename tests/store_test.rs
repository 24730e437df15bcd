//! # Recording Store Tests
//!
//! These tests exercise the store directly against a temporary SQLite file and
//! a temporary content directory.
//!
//! ## Running the Tests
//!
//! ```bash
//! cargo test --test store_test
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use screen_recordings::{RecordingStore, StoreError};

/// Helper to open a store whose database and content live in one temp dir
/// Returns (store, _guard) - keep _guard alive to prevent temp dir deletion
async fn create_test_store() -> (RecordingStore, tempfile::TempDir) {
    let guard = tempfile::tempdir().unwrap();
    let store = RecordingStore::open(
        &guard.path().join("recordings.sqlite"),
        &guard.path().join("uploads"),
    )
    .await
    .unwrap();
    (store, guard)
}

/// Helper to count files in the content directory
fn count_content_files(store: &RecordingStore) -> usize {
    std::fs::read_dir(store.uploads_dir()).unwrap().count()
}

/// Helper to count rows without going through the store
async fn count_rows(store: &RecordingStore) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM recordings")
        .fetch_one(store.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_then_list_reports_stored_size() {
    let (store, _guard) = create_test_store().await;
    let content = vec![7u8; 1024];

    let created = store.create(&content[..], "clip.webm").await.unwrap();

    let recordings = store.list().await.unwrap();
    assert_eq!(recordings.len(), 1);
    let listed = &recordings[0];
    assert_eq!(listed, &created);
    assert_eq!(listed.filesize, 1024);
    assert_eq!(listed.filename, "clip.webm");
    assert!(listed.title.starts_with("Recording-"));
    assert!(listed.filepath.starts_with("uploads/video-"));
    assert!(listed.filepath.ends_with(".webm"));

    let path = store.content_path(&listed.filepath).unwrap();
    let on_disk = std::fs::read(path).unwrap();
    assert_eq!(on_disk, content);
}

#[tokio::test]
async fn test_empty_upload_is_stored() {
    let (store, _guard) = create_test_store().await;

    let created = store.create(&b""[..], "empty.webm").await.unwrap();

    assert_eq!(created.filesize, 0);
    let path = store.content_path(&created.filepath).unwrap();
    assert_eq!(std::fs::metadata(path).unwrap().len(), 0);
}

#[tokio::test]
async fn test_rename_round_trip_keeps_other_fields() {
    let (store, _guard) = create_test_store().await;
    let created = store.create(&[1u8; 300][..], "clip.webm").await.unwrap();

    store.rename(created.id, "Demo").await.unwrap();

    let recordings = store.list().await.unwrap();
    let renamed = recordings.iter().find(|r| r.id == created.id).unwrap();
    assert_eq!(renamed.title, "Demo");
    assert_eq!(renamed.filesize, created.filesize);
    assert_eq!(renamed.filepath, created.filepath);
    assert_eq!(renamed.filename, created.filename);
    assert_eq!(renamed.created_at, created.created_at);
}

#[tokio::test]
async fn test_rename_to_same_title_succeeds() {
    let (store, _guard) = create_test_store().await;
    let created = store.create(&b"abc"[..], "clip.webm").await.unwrap();

    store.rename(created.id, "Demo").await.unwrap();
    store.rename(created.id, "Demo").await.unwrap();

    assert_eq!(store.get(created.id).await.unwrap().title, "Demo");
}

#[tokio::test]
async fn test_rename_unknown_id_is_not_found() {
    let (store, _guard) = create_test_store().await;

    let err = store.rename(999, "Demo").await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(999)));
}

#[tokio::test]
async fn test_rename_empty_title_leaves_row_unchanged() {
    let (store, _guard) = create_test_store().await;
    let created = store.create(&b"abc"[..], "clip.webm").await.unwrap();

    let err = store.rename(created.id, "").await.unwrap_err();
    assert!(matches!(err, StoreError::Validation(_)));
    assert_eq!(store.get(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn test_delete_twice() {
    let (store, _guard) = create_test_store().await;
    let created = store.create(&b"abc"[..], "clip.webm").await.unwrap();
    let path = store.content_path(&created.filepath).unwrap();

    store.delete(created.id).await.unwrap();
    assert!(!path.exists(), "content file should be removed");
    assert_eq!(count_rows(&store).await, 0);

    let err = store.delete(created.id).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_with_missing_file_still_removes_row() {
    let (store, _guard) = create_test_store().await;
    let created = store.create(&b"abc"[..], "clip.webm").await.unwrap();
    std::fs::remove_file(store.content_path(&created.filepath).unwrap()).unwrap();

    store.delete(created.id).await.unwrap();

    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_delete_does_not_touch_other_recordings() {
    let (store, _guard) = create_test_store().await;
    let keep = store.create(&b"keep"[..], "keep.webm").await.unwrap();
    let removed = store.create(&b"drop"[..], "drop.webm").await.unwrap();

    store.delete(removed.id).await.unwrap();

    assert_eq!(store.list().await.unwrap(), vec![keep.clone()]);
    assert!(store.content_path(&keep.filepath).unwrap().exists());
    assert_eq!(count_content_files(&store), 1);
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let (store, _guard) = create_test_store().await;

    let first = store.create(&b"1"[..], "1.webm").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = store.create(&b"2"[..], "2.webm").await.unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let third = store.create(&b"3"[..], "3.webm").await.unwrap();

    let ids: Vec<i64> = store.list().await.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![third.id, second.id, first.id]);
}

#[tokio::test]
async fn test_ids_are_not_reused_after_delete() {
    let (store, _guard) = create_test_store().await;
    let first = store.create(&b"a"[..], "a.webm").await.unwrap();
    let second = store.create(&b"b"[..], "b.webm").await.unwrap();

    store.delete(second.id).await.unwrap();
    let third = store.create(&b"c"[..], "c.webm").await.unwrap();

    assert!(third.id > second.id, "id {} was reused", third.id);
    assert!(second.id > first.id);
}

#[tokio::test]
async fn test_concurrent_creates_never_share_a_file() {
    let (store, _guard) = create_test_store().await;
    let store = Arc::new(store);

    let mut handles = Vec::new();
    for i in 0..20u8 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let content = vec![i; 100 + i as usize];
            store.create(&content[..], "clip.webm").await.unwrap()
        }));
    }

    let mut filepaths = HashSet::new();
    for handle in handles {
        let recording = handle.await.unwrap();
        let path = store.content_path(&recording.filepath).unwrap();
        assert_eq!(
            std::fs::metadata(&path).unwrap().len() as i64,
            recording.filesize
        );
        filepaths.insert(recording.filepath);
    }

    assert_eq!(filepaths.len(), 20);
    assert_eq!(count_content_files(&store), 20);
    assert_eq!(count_rows(&store).await, 20);
}

#[tokio::test]
async fn test_content_write_failure_creates_no_row() {
    let guard = tempfile::tempdir().unwrap();
    let (pool, _db_guard) = screen_recordings::db::create_test_connection_in_temporary_file()
        .await
        .unwrap();
    screen_recordings::db::init_database_schema(&pool)
        .await
        .unwrap();
    // Content directory that was never created
    let store = RecordingStore::new(pool, guard.path().join("missing"));

    let err = store.create(&b"abc"[..], "clip.webm").await.unwrap_err();

    assert!(matches!(err, StoreError::StorageWrite(_)));
    assert_eq!(count_rows(&store).await, 0);
}

#[tokio::test]
async fn test_row_insert_failure_leaves_orphaned_content() {
    let (store, _guard) = create_test_store().await;
    sqlx::query("DROP TABLE recordings")
        .execute(store.pool())
        .await
        .unwrap();

    let err = store.create(&b"abc"[..], "clip.webm").await.unwrap_err();

    assert!(matches!(err, StoreError::Persistence(_)));
    // The written content is not rolled back
    assert_eq!(count_content_files(&store), 1);
}

#[tokio::test]
async fn test_reopen_keeps_recordings() {
    let guard = tempfile::tempdir().unwrap();
    let db_path = guard.path().join("recordings.sqlite");
    let uploads = guard.path().join("uploads");

    let store = RecordingStore::open(&db_path, &uploads).await.unwrap();
    let created = store.create(&b"persist"[..], "clip.webm").await.unwrap();
    store.close().await;

    let reopened = RecordingStore::open(&db_path, &uploads).await.unwrap();
    assert_eq!(reopened.list().await.unwrap(), vec![created]);
}
