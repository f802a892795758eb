//! Folder resolution: lookups, creation and the per-run cache

use scarecrow_core::domain::PathSegments;
use scarecrow_core::ports::ItemKind;
use scarecrow_core::usecases::{FolderResolver, UploadError};

use crate::common::*;

fn segments(path: &str) -> PathSegments {
    PathSegments::parse_remote(path).unwrap()
}

#[tokio::test]
async fn test_empty_path_returns_start_without_calls() {
    let client = FakeStorageClient::new();
    let mut resolver = FolderResolver::new(executor(&client));

    let folder = resolver
        .resolve_or_create(&root_folder(), &PathSegments::empty())
        .await
        .unwrap();

    assert_eq!(folder, root_folder());
    assert_eq!(client.counts(), CallCounts::default());
}

#[tokio::test]
async fn test_missing_folders_are_created_once() {
    let client = FakeStorageClient::new();
    let mut resolver = FolderResolver::new(executor(&client));

    let first = resolver
        .resolve_or_create(&root_folder(), &segments("a/b"))
        .await
        .unwrap();
    assert_eq!(first.name(), "b");
    assert_eq!(Some(first.id().clone()), client.lookup("a/b"));
    assert_eq!(first.drive_id(), Some(DRIVE_ID));

    let counts = client.counts();
    assert_eq!(counts.list, 2);
    assert_eq!(counts.create_folder, 2);

    // The same path again is served from the cache.
    let second = resolver
        .resolve_or_create(&root_folder(), &segments("a/b"))
        .await
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(client.counts(), counts);
    assert_eq!(resolver.resolved_count(), 2);
}

#[tokio::test]
async fn test_shared_prefix_is_not_resolved_twice() {
    let client = FakeStorageClient::new();
    let mut resolver = FolderResolver::new(executor(&client));

    resolver
        .resolve_or_create(&root_folder(), &segments("a/b"))
        .await
        .unwrap();
    resolver
        .resolve_or_create(&root_folder(), &segments("a/c"))
        .await
        .unwrap();

    let counts = client.counts();
    assert_eq!(counts.list, 3);
    assert_eq!(counts.create_folder, 3);
    assert!(client.lookup("a/c").is_some());
}

#[tokio::test]
async fn test_existing_folder_is_reused() {
    let client = FakeStorageClient::new();
    let existing = client.add_folder(&id(ROOT_ID), "a");
    let mut resolver = FolderResolver::new(executor(&client));

    let folder = resolver
        .resolve_or_create(&root_folder(), &segments("a"))
        .await
        .unwrap();

    assert_eq!(folder.id(), &existing);
    assert_eq!(client.counts().create_folder, 0);
}

#[tokio::test]
async fn test_trashed_folder_and_same_named_file_are_ignored() {
    let client = FakeStorageClient::new();
    let trashed = client.add_folder(&id(ROOT_ID), "a");
    client.trash(&trashed);
    client.add_file(&id(ROOT_ID), "a", b"not a folder");
    let mut resolver = FolderResolver::new(executor(&client));

    let folder = resolver
        .resolve_or_create(&root_folder(), &segments("a"))
        .await
        .unwrap();

    assert_ne!(folder.id(), &trashed);
    assert_eq!(client.counts().create_folder, 1);
}

#[tokio::test]
async fn test_listing_is_scoped_to_root_drive() {
    let client = FakeStorageClient::new();
    let mut resolver = FolderResolver::new(executor(&client));

    resolver
        .resolve_or_create(&root_folder(), &segments("a/b"))
        .await
        .unwrap();

    let requests = client.list_requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.drive_id.as_deref(), Some(DRIVE_ID));
        assert_eq!(request.page_size, 1);
        assert_eq!(request.query.kind, ItemKind::Folder);
        assert!(!request.query.include_trashed);
    }
    assert_eq!(requests[0].query.parent, id(ROOT_ID));
    assert_eq!(requests[1].query.name, "b");
}

#[tokio::test]
async fn test_fatal_creation_error_keeps_earlier_folders() {
    let client = FakeStorageClient::new();
    let mut resolver = FolderResolver::new(executor(&client));
    resolver
        .resolve_or_create(&root_folder(), &segments("a"))
        .await
        .unwrap();
    client.fail_next(Op::Create, api_error(403));

    let err = resolver
        .resolve_or_create(&root_folder(), &segments("a/b"))
        .await
        .unwrap_err();

    match &err {
        UploadError::Remote {
            operation, target, ..
        } => {
            assert_eq!(*operation, "create folder");
            assert_eq!(target, "root/a/b");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.status(), Some(403));
    assert!(client.lookup("a").is_some());
    assert!(client.lookup("a/b").is_none());
}

#[tokio::test]
async fn test_cache_hits_when_store_reports_a_different_name() {
    let client = FakeStorageClient::new();
    let stored = client.add_folder(&id(ROOT_ID), "A");
    client.fold_case();
    let mut resolver = FolderResolver::new(executor(&client));

    let first = resolver
        .resolve_or_create(&root_folder(), &segments("a"))
        .await
        .unwrap();
    let second = resolver
        .resolve_or_create(&root_folder(), &segments("a"))
        .await
        .unwrap();

    assert_eq!(first.id(), &stored);
    assert_eq!(first.name(), "A");
    assert_eq!(second, first);
    let counts = client.counts();
    assert_eq!(counts.list, 1);
    assert_eq!(counts.create_folder, 0);
}
