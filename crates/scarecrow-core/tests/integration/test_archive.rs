//! Archive extraction and directory packing

use std::fs::File;
use std::io::Write;
use std::path::Path;

use scarecrow_core::usecases::{
    ArchiveMaterializer, FileUploader, FolderResolver, HierarchyWalker, UploadError,
};

use crate::common::*;

fn materializer(client: &std::sync::Arc<FakeStorageClient>) -> ArchiveMaterializer {
    let executor = executor(client);
    ArchiveMaterializer::new(HierarchyWalker::new(
        FolderResolver::new(executor.clone()),
        FileUploader::new(executor),
    ))
}

fn build_tar<W: Write>(writer: W, files: &[(&str, &str)]) -> W {
    let mut builder = tar::Builder::new(writer);
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap()
}

#[tokio::test]
async fn test_plain_tar_round_trip() {
    let client = FakeStorageClient::new();
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("captures.tar");
    build_tar(
        File::create(&archive).unwrap(),
        &[("x.txt", "x content"), ("y/z.txt", "z content")],
    );

    let report = materializer(&client)
        .upload_from_archive(&archive, &root_folder())
        .await
        .unwrap();

    assert_eq!(report.files_created, 2);
    assert_eq!(client.content("x.txt"), Some(b"x content".to_vec()));
    assert_eq!(client.content("y/z.txt"), Some(b"z content".to_vec()));

    // Files were uploaded from the extraction directory, which is gone now.
    let media = client.media_paths();
    assert_eq!(media.len(), 2);
    assert!(media.iter().all(|p| !p.exists()));
}

#[tokio::test]
async fn test_gzip_tar_is_detected() {
    let client = FakeStorageClient::new();
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("captures.tgz");
    let encoder = flate2::write::GzEncoder::new(
        File::create(&archive).unwrap(),
        flate2::Compression::default(),
    );
    build_tar(encoder, &[("cam/frame.jpg", "jpeg")])
        .finish()
        .unwrap();

    materializer(&client)
        .upload_from_archive(&archive, &root_folder())
        .await
        .unwrap();

    assert_eq!(client.content("cam/frame.jpg"), Some(b"jpeg".to_vec()));
}

#[tokio::test]
async fn test_extraction_dir_removed_on_failure() {
    let client = FakeStorageClient::new();
    client.add_file(&id(ROOT_ID), "b.txt", b"old");
    client.fail_next(Op::Update, api_error(403));
    let tmp = tempfile::tempdir().unwrap();
    let archive = tmp.path().join("captures.tar");
    build_tar(File::create(&archive).unwrap(), &[("a.txt", "a"), ("b.txt", "b")]);

    let err = materializer(&client)
        .upload_from_archive(&archive, &root_folder())
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(403));
    let media = client.media_paths();
    assert_eq!(media.len(), 1);
    assert!(!media[0].exists());
}

#[tokio::test]
async fn test_missing_archive_is_an_archive_error() {
    let client = FakeStorageClient::new();

    let err = materializer(&client)
        .upload_from_archive(Path::new("/nonexistent/captures.tar"), &root_folder())
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Archive { .. }));
    assert_eq!(client.counts(), CallCounts::default());
}

#[tokio::test]
async fn test_corrupt_archive_leaves_no_extraction_directory() {
    let client = FakeStorageClient::new();
    let tmp = tempfile::tempdir().unwrap();
    let scratch = tmp.path().join("scratch");
    std::fs::create_dir(&scratch).unwrap();
    let archive = tmp.path().join("corrupt.tar");
    std::fs::write(&archive, vec![b'x'; 1024]).unwrap();

    let err = materializer(&client)
        .with_scratch_dir(&scratch)
        .upload_from_archive(&archive, &root_folder())
        .await
        .unwrap_err();

    assert!(matches!(err, UploadError::Archive { .. }));
    assert_eq!(std::fs::read_dir(&scratch).unwrap().count(), 0);
    assert_eq!(client.counts(), CallCounts::default());
}

#[tokio::test]
async fn test_directory_is_packed_and_uploaded_as_one_file() {
    let client = FakeStorageClient::new();
    let tmp = tempfile::tempdir().unwrap();
    let site = tmp.path().join("site-a");
    write_tree(&site, &[("x.txt", "x"), ("y/z.txt", "z")]);

    let outcome = materializer(&client)
        .archive_and_upload(&site, &root_folder())
        .await
        .unwrap();

    assert!(outcome.created);
    assert_eq!(outcome.file.name, "site-a.tar");
    assert_eq!(client.counts().create_folder, 0);

    let bytes = client.content("site-a.tar").unwrap();
    let mut archive = tar::Archive::new(bytes.as_slice());
    let names: Vec<String> = archive
        .entries()
        .unwrap()
        .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
        .collect();
    assert!(names.contains(&"site-a/x.txt".to_string()));
    assert!(names.contains(&"site-a/y/z.txt".to_string()));
}
