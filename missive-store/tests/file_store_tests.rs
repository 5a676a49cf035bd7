#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::PathBuf;

use chrono::Utc;
use missive_store::{
    FileRecordStore, NotificationContent, NotificationStatus, RecordStore, StoreError,
};
use pretty_assertions::assert_eq;

fn content(recipient: &str) -> NotificationContent {
    NotificationContent::new(recipient, "Subject", "Body")
}

#[test]
fn test_path_validation_rejects_parent_dir() {
    let result = FileRecordStore::builder()
        .path(PathBuf::from("/var/lib/../etc/missive"))
        .build();

    assert!(result.unwrap_err().to_string().contains("cannot contain '..'"));
}

#[test]
fn test_path_validation_rejects_relative_paths() {
    let result = FileRecordStore::builder()
        .path(PathBuf::from("relative/path"))
        .build();

    assert!(result.unwrap_err().to_string().contains("must be absolute"));
}

#[test]
#[cfg(unix)]
fn test_path_validation_rejects_unix_system_directories() {
    for path in ["/etc/missive", "/bin/records", "/usr/sbin/x", "/proc/mail", "/dev/db"] {
        let result = FileRecordStore::builder().path(PathBuf::from(path)).build();

        assert!(
            result.unwrap_err().to_string().contains("system directory"),
            "Path {path} should be rejected"
        );
    }
}

#[test]
fn test_init_rejects_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("not-a-dir");
    std::fs::write(&file, b"x").unwrap();

    let err = FileRecordStore::open(&file).unwrap_err();
    assert!(err.to_string().contains("not a directory"));
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("records");

    let store = FileRecordStore::open(&path).unwrap();
    let mut record = store.create(&content("a@x.com")).await.unwrap();
    record.mark_failed("SMTP timeout").unwrap();
    store.update(&record).await.unwrap();
    drop(store);

    let reopened = FileRecordStore::open(&path).unwrap();
    let read = reopened.get(&record.id()).await.unwrap().unwrap();
    assert_eq!(read, record);
    assert_eq!(read.error(), Some("SMTP timeout"));
    assert_eq!(reopened.count(None).await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_refuses_terminal_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRecordStore::open(dir.path()).unwrap();

    let mut record = store.create(&content("a@x.com")).await.unwrap();
    record.mark_sent(Utc::now()).unwrap();
    store.update(&record).await.unwrap();

    let result = store.update(&record).await;
    assert!(matches!(result, Err(StoreError::AlreadyFinalised(id)) if id == record.id()));
}

#[tokio::test]
async fn test_find_lowest_identifier_and_listing_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRecordStore::open(dir.path()).unwrap();

    let mut sent_ids = Vec::new();
    for _ in 0..3 {
        let mut record = store.create(&content("a@x.com")).await.unwrap();
        record.mark_sent(Utc::now()).unwrap();
        store.update(&record).await.unwrap();
        sent_ids.push(record.id());
    }
    let pending = store.create(&content("a@x.com")).await.unwrap();

    let found = store
        .find(&content("a@x.com"), NotificationStatus::Sent)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id(), sent_ids[0]);

    let listed = store.list(None).await.unwrap();
    assert_eq!(listed.first().map(|r| r.id()), Some(pending.id()));
    assert_eq!(listed.last().map(|r| r.id()), Some(sent_ids[0]));

    assert_eq!(store.count(Some(NotificationStatus::Sent)).await.unwrap(), 3);
    assert_eq!(store.count(Some(NotificationStatus::Pending)).await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_and_missing_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRecordStore::open(dir.path()).unwrap();

    let record = store.create(&content("a@x.com")).await.unwrap();
    assert!(store.delete(&record.id()).await.unwrap());
    assert!(!store.delete(&record.id()).await.unwrap());
    assert_eq!(store.get(&record.id()).await.unwrap(), None);
    assert!(store.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_init_cleans_orphaned_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRecordStore::open(dir.path()).unwrap();
    let record = store.create(&content("a@x.com")).await.unwrap();

    let tmp = dir.path().join(".tmp_01ARZ3NDEKTSV4RRFFQ69G5FAV.bin");
    let deleted = dir.path().join("01ARZ3NDEKTSV4RRFFQ69G5FAV.bin.deleted");
    let unrelated = dir.path().join("README");
    std::fs::write(&tmp, b"partial").unwrap();
    std::fs::write(&deleted, b"gone").unwrap();
    std::fs::write(&unrelated, b"keep").unwrap();

    let reopened = FileRecordStore::open(dir.path()).unwrap();
    assert!(!tmp.exists());
    assert!(!deleted.exists());
    assert!(unrelated.exists());

    let ids: Vec<_> = reopened
        .list(None)
        .await
        .unwrap()
        .iter()
        .map(|r| r.id())
        .collect();
    assert_eq!(ids, vec![record.id()]);
}

#[tokio::test]
async fn test_find_uses_records_written_before_open() {
    let dir = tempfile::tempdir().unwrap();

    let store = FileRecordStore::open(dir.path()).unwrap();
    let mut record = store.create(&content("a@x.com")).await.unwrap();
    record.mark_sent(Utc::now()).unwrap();
    store.update(&record).await.unwrap();
    store.create(&content("b@x.com")).await.unwrap();
    drop(store);

    let reopened = FileRecordStore::open(dir.path()).unwrap();
    let found = reopened
        .find(&content("a@x.com"), NotificationStatus::Sent)
        .await
        .unwrap();
    assert_eq!(found, Some(record));
    assert_eq!(
        reopened
            .find(&content("b@x.com"), NotificationStatus::Sent)
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
async fn test_find_follows_status_changes_and_deletes() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRecordStore::open(dir.path()).unwrap();

    let mut record = store.create(&content("a@x.com")).await.unwrap();
    let sent = |store: FileRecordStore| async move {
        store
            .find(&content("a@x.com"), NotificationStatus::Sent)
            .await
            .unwrap()
    };

    assert_eq!(sent(store.clone()).await, None);

    record.mark_sent(Utc::now()).unwrap();
    store.update(&record).await.unwrap();
    assert_eq!(sent(store.clone()).await.map(|r| r.id()), Some(record.id()));
    assert_eq!(
        store
            .find(&content("a@x.com"), NotificationStatus::Pending)
            .await
            .unwrap(),
        None
    );

    assert!(store.delete(&record.id()).await.unwrap());
    assert_eq!(sent(store.clone()).await, None);
}

#[tokio::test]
async fn test_find_skips_files_removed_outside_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileRecordStore::open(dir.path()).unwrap();

    let mut first = store.create(&content("a@x.com")).await.unwrap();
    first.mark_sent(Utc::now()).unwrap();
    store.update(&first).await.unwrap();
    let mut second = store.create(&content("a@x.com")).await.unwrap();
    second.mark_sent(Utc::now()).unwrap();
    store.update(&second).await.unwrap();

    std::fs::remove_file(dir.path().join(format!("{}.bin", first.id()))).unwrap();

    let found = store
        .find(&content("a@x.com"), NotificationStatus::Sent)
        .await
        .unwrap();
    assert_eq!(found.map(|r| r.id()), Some(second.id()));
}
