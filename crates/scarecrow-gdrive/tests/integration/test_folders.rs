//! Folder lookup, listing and creation requests

use serde_json::json;
use wiremock::matchers::{
    bearer_token, body_json, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, ResponseTemplate};

use scarecrow_core::ports::{CreateRequest, IStorageClient, ItemQuery, ListRequest};

use crate::common::*;

#[tokio::test]
async fn test_get_folder_returns_drive_id() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files/root1"))
        .and(query_param("fields", "id,name,driveId"))
        .and(query_param("supportsAllDrives", "true"))
        .and(bearer_token(TEST_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "root1",
            "name": "Scarecrow",
            "driveId": "drive1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let folder = client.get_folder(&id("root1")).await.unwrap();

    assert_eq!(folder.id(), &id("root1"));
    assert_eq!(folder.name(), "Scarecrow");
    assert_eq!(folder.drive_id(), Some("drive1"));
}

#[tokio::test]
async fn test_list_folder_scoped_to_shared_drive() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            "name = 'site-a' and 'root1' in parents and \
             mimeType = 'application/vnd.google-apps.folder' and trashed = false",
        ))
        .and(query_param("pageSize", "1"))
        .and(query_param("fields", "files(id,name)"))
        .and(query_param("supportsAllDrives", "true"))
        .and(query_param("includeItemsFromAllDrives", "true"))
        .and(query_param("corpora", "drive"))
        .and(query_param("driveId", "drive1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"id": "folderA", "name": "site-a"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ListRequest::new(ItemQuery::folder(&id("root1"), "site-a")).in_drive(Some("drive1"));
    let items = client.list(&request).await.unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, id("folderA"));
    assert_eq!(items[0].name, "site-a");
}

#[tokio::test]
async fn test_list_without_drive_omits_corpora() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param_is_missing("corpora"))
        .and(query_param_is_missing("driveId"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ListRequest::new(ItemQuery::file(&id("p1"), "x.jpg"));
    let items = client.list(&request).await.unwrap();

    assert!(items.is_empty());
}

#[tokio::test]
async fn test_list_escapes_quotes_in_names() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("GET"))
        .and(path("/drive/v3/files"))
        .and(query_param(
            "q",
            "name = 'o\\'brien' and 'p1' in parents and \
             mimeType != 'application/vnd.google-apps.folder' and trashed = false",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "files": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let request = ListRequest::new(ItemQuery::file(&id("p1"), "o'brien"));
    client.list(&request).await.unwrap();
}

#[tokio::test]
async fn test_create_folder_sends_mime_type_and_parent() {
    let (server, client) = setup_drive_mock().await;

    Mock::given(method("POST"))
        .and(path("/drive/v3/files"))
        .and(query_param("supportsAllDrives", "true"))
        .and(body_json(json!({
            "name": "2024",
            "mimeType": FOLDER_MIME,
            "parents": ["folderA"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "folder2024",
            "name": "2024"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let item = client
        .create(&CreateRequest::folder(&id("folderA"), "2024"))
        .await
        .unwrap();

    assert_eq!(item.id, id("folder2024"));
    assert_eq!(item.name, "2024");
}
