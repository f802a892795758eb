//! Complete upload runs: root check, destination, dispatch and cleanup

use std::path::PathBuf;

use scarecrow_core::domain::{PathSegments, UploadSource};
use scarecrow_core::usecases::UploadRun;

use crate::common::*;

fn destination(path: &str) -> PathSegments {
    PathSegments::parse_remote(path).unwrap()
}

#[tokio::test]
async fn test_check_root_reports_root_metadata() {
    let client = FakeStorageClient::new();
    let run = UploadRun::new(executor(&client), id(ROOT_ID));

    let root = run.check_root().await.unwrap();

    assert_eq!(root.name(), "root");
    assert_eq!(root.drive_id(), Some(DRIVE_ID));
    assert_eq!(client.counts().get, 1);
    assert_eq!(client.counts().list, 0);
}

#[tokio::test]
async fn test_inaccessible_root_fails() {
    let client = FakeStorageClient::new();
    let run = UploadRun::new(executor(&client), id("unknown"));

    let err = run.check_root().await.unwrap_err();

    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn test_single_file_lands_in_destination() {
    let client = FakeStorageClient::new();
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), &[("frame.jpg", "jpeg")]);
    let mut run = UploadRun::new(executor(&client), id(ROOT_ID));

    let report = run
        .execute(
            &UploadSource::SingleFile(tmp.path().join("frame.jpg")),
            &destination("/scarecrow/site-a"),
        )
        .await
        .unwrap();

    assert_eq!(report.source, "file");
    assert_eq!(report.destination_path, "root/scarecrow/site-a");
    assert_eq!(report.destination.name(), "site-a");
    assert_eq!(report.walk.files_created, 1);
    assert_eq!(report.walk.folders_resolved, 2);
    assert!(!report.dry_run);
    assert!(!report.cleaned_up);
    assert_eq!(
        client.content("scarecrow/site-a/frame.jpg"),
        Some(b"jpeg".to_vec())
    );
    assert!(tmp.path().join("frame.jpg").exists());
}

#[tokio::test]
async fn test_local_directory_with_cleanup() {
    let client = FakeStorageClient::new();
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), &[("site/a/x.txt", "x"), ("site/y.txt", "y")]);
    let mut run = UploadRun::new(executor(&client), id(ROOT_ID)).with_cleanup(true);

    let report = run
        .execute(
            &UploadSource::LocalDirectory {
                root: tmp.path().to_path_buf(),
                subdir: PathBuf::from("site"),
            },
            &PathSegments::empty(),
        )
        .await
        .unwrap();

    assert_eq!(report.source, "local-directory");
    assert_eq!(report.destination_path, "root");
    assert_eq!(report.walk.files_uploaded(), 2);
    assert!(report.cleaned_up);
    assert!(client.content("site/a/x.txt").is_some());
    assert!(!tmp.path().join("site").exists());
    assert!(tmp.path().exists());
}

#[tokio::test]
async fn test_dry_run_keeps_source_and_remote_untouched() {
    let client = FakeStorageClient::new();
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), &[("site/x.txt", "x")]);
    let mut run = UploadRun::new(dry_run_executor(&client), id(ROOT_ID)).with_cleanup(true);
    let items_before = client.item_count();

    let report = run
        .execute(
            &UploadSource::LocalDirectory {
                root: tmp.path().to_path_buf(),
                subdir: PathBuf::from("site"),
            },
            &destination("uploads"),
        )
        .await
        .unwrap();

    assert!(report.dry_run);
    assert!(!report.cleaned_up);
    assert!(report.destination.id().is_synthetic());
    assert_eq!(client.item_count(), items_before);
    assert_eq!(client.counts().create_folder, 0);
    assert_eq!(client.counts().create_file, 0);
    // Only the lookup of `uploads` under the real root reaches the store.
    assert_eq!(client.counts().list, 1);
    assert!(tmp.path().join("site/x.txt").exists());
}

#[tokio::test]
async fn test_failed_run_keeps_source() {
    let client = FakeStorageClient::new();
    client.fail_next(Op::Create, api_error(401));
    let tmp = tempfile::tempdir().unwrap();
    write_tree(tmp.path(), &[("frame.jpg", "jpeg")]);
    let mut run = UploadRun::new(executor(&client), id(ROOT_ID)).with_cleanup(true);

    let err = run
        .execute(
            &UploadSource::SingleFile(tmp.path().join("frame.jpg")),
            &PathSegments::empty(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert!(tmp.path().join("frame.jpg").exists());
}

#[tokio::test]
async fn test_archived_directory_is_uploaded_as_tar() {
    let client = FakeStorageClient::new();
    let tmp = tempfile::tempdir().unwrap();
    let site = tmp.path().join("site-b");
    write_tree(&site, &[("x.txt", "x")]);
    let mut run = UploadRun::new(executor(&client), id(ROOT_ID));

    let report = run
        .execute(
            &UploadSource::ArchivedDirectory(site),
            &destination("archives"),
        )
        .await
        .unwrap();

    assert_eq!(report.source, "archived-directory");
    assert_eq!(report.walk.files_created, 1);
    assert!(client.content("archives/site-b.tar").is_some());
}
