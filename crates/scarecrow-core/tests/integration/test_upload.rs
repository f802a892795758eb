//! Single-file placement, dry run and retry behaviour

use std::time::Duration;

use scarecrow_core::usecases::{FileUploader, UploadError};

use crate::common::*;

#[tokio::test]
async fn test_new_file_is_created() {
    let client = FakeStorageClient::new();
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), &[("report.txt", "hello")]);
    let uploader = FileUploader::new(executor(&client));

    let outcome = uploader
        .upload_or_update(&root_folder(), &tmp.path().join("report.txt"))
        .await
        .unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.file.name, "report.txt");
    assert_eq!(outcome.file.parent, id(ROOT_ID));
    assert_eq!(client.content("report.txt"), Some(b"hello".to_vec()));
    assert_eq!(client.counts().create_file, 1);
    assert_eq!(client.counts().update, 0);
}

#[tokio::test]
async fn test_existing_file_is_updated_in_place() {
    let client = FakeStorageClient::new();
    let existing = client.add_file(&id(ROOT_ID), "report.txt", b"old");
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), &[("report.txt", "new")]);
    let uploader = FileUploader::new(executor(&client));

    let outcome = uploader
        .upload_or_update(&root_folder(), &tmp.path().join("report.txt"))
        .await
        .unwrap();

    assert!(!outcome.created);
    assert_eq!(outcome.file.id, existing);
    assert_eq!(client.content("report.txt"), Some(b"new".to_vec()));
    assert_eq!(client.counts().update, 1);
    assert_eq!(client.counts().create_file, 0);
}

#[tokio::test]
async fn test_missing_local_file_fails_before_remote_calls() {
    let client = FakeStorageClient::new();
    let tmp = tempfile::tempdir().unwrap();
    let uploader = FileUploader::new(executor(&client));

    let err = uploader
        .upload_or_update(&root_folder(), &tmp.path().join("missing.txt"))
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::LocalIo { .. }));
    assert_eq!(client.counts(), CallCounts::default());
}

#[tokio::test]
async fn test_directory_is_not_a_regular_file() {
    let client = FakeStorageClient::new();
    let tmp = tempfile::tempdir().unwrap();
    let uploader = FileUploader::new(executor(&client));

    let err = uploader
        .upload_or_update(&root_folder(), tmp.path())
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::LocalIo { .. }));
    assert_eq!(client.counts().list, 0);
}

#[tokio::test]
async fn test_dry_run_does_not_mutate() {
    let client = FakeStorageClient::new();
    client.add_file(&id(ROOT_ID), "existing.txt", b"old");
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), &[("existing.txt", "new"), ("fresh.txt", "fresh")]);
    let uploader = FileUploader::new(dry_run_executor(&client));
    let items_before = client.item_count();

    let updated = uploader
        .upload_or_update(&root_folder(), &tmp.path().join("existing.txt"))
        .await
        .unwrap();
    let created = uploader
        .upload_or_update(&root_folder(), &tmp.path().join("fresh.txt"))
        .await
        .unwrap();

    // Lookups still hit the store, mutations do not.
    let counts = client.counts();
    assert_eq!(counts.list, 2);
    assert_eq!(counts.update, 0);
    assert_eq!(counts.create_file, 0);
    assert_eq!(client.item_count(), items_before);
    assert_eq!(client.content("existing.txt"), Some(b"old".to_vec()));

    assert!(!updated.created && updated.file.is_synthetic());
    assert!(created.created && created.file.is_synthetic());
    assert_ne!(updated.file.id, created.file.id);
}

#[tokio::test(start_paused = true)]
async fn test_transient_listing_failure_is_retried() {
    let client = FakeStorageClient::new();
    client.fail_next(Op::List, api_error(503));
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), &[("x.txt", "x")]);
    let uploader = FileUploader::new(executor(&client));
    let started = tokio::time::Instant::now();

    let outcome = uploader
        .upload_or_update(&root_folder(), &tmp.path().join("x.txt"))
        .await
        .unwrap();

    assert!(outcome.created);
    assert_eq!(client.counts().list, 2);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn test_not_found_is_not_retried() {
    let client = FakeStorageClient::new();
    client.fail_next(Op::Create, api_error(404));
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), &[("x.txt", "x")]);
    let uploader = FileUploader::new(executor(&client));

    let err = uploader
        .upload_or_update(&root_folder(), &tmp.path().join("x.txt"))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(404));
    assert_eq!(client.counts().create_file, 1);
}

#[tokio::test(start_paused = true)]
async fn test_transient_update_failure_is_retried() {
    let client = FakeStorageClient::new();
    client.add_file(&id(ROOT_ID), "x.txt", b"old");
    client.fail_next(Op::Update, api_error(429));
    client.fail_next(Op::Update, api_error(500));
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), &[("x.txt", "new")]);
    let uploader = FileUploader::new(executor(&client));

    let outcome = uploader
        .upload_or_update(&root_folder(), &tmp.path().join("x.txt"))
        .await
        .unwrap();

    assert!(!outcome.created);
    assert_eq!(client.counts().update, 3);
    assert_eq!(client.content("x.txt"), Some(b"new".to_vec()));
}
