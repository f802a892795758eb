//! DriveStorageClient - IStorageClient implementation for Google Drive
//!
//! Wraps the [`DriveClient`] and delegates to the client and upload modules
//! to fulfil the [`IStorageClient`] port contract.
//!
//! ## Design Notes
//!
//! - Every call sets `supportsAllDrives=true`, so folders on shared drives
//!   behave like folders in "My Drive".
//! - Listings scoped to a shared drive add `corpora=drive` and `driveId`.
//! - No retries happen here; the core's executor owns them.

use std::path::Path;
use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use scarecrow_core::domain::{RemoteFolder, RemoteId};
use scarecrow_core::ports::{
    CreateContent, CreateRequest, IStorageClient, ListRequest, RemoteItem, StorageError,
    UpdateRequest,
};

use crate::auth::{AccessTokenSource, ServiceAccountAuth};
use crate::client::{
    file_fields, list_fields, render_query, DriveClient, DriveFile, FileList, FOLDER_MIME_TYPE,
};
use crate::upload;
use crate::DriveError;

/// Folder metadata returned by `files.get`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FolderMetadata {
    id: String,
    name: String,
    drive_id: Option<String>,
}

/// Google Drive implementation of the storage port
#[derive(Debug, Clone)]
pub struct DriveStorageClient {
    client: DriveClient,
}

impl DriveStorageClient {
    /// Creates a storage client on top of an existing [`DriveClient`]
    pub fn new(client: DriveClient) -> Self {
        Self { client }
    }

    /// Creates a storage client authenticated with the service-account key at `path`
    ///
    /// # Errors
    /// Returns [`DriveError::Auth`] if the key cannot be loaded
    pub fn from_service_account_file(path: &Path) -> Result<Self, DriveError> {
        let auth: Arc<dyn AccessTokenSource> = Arc::new(ServiceAccountAuth::from_file(path)?);
        Ok(Self::new(DriveClient::new(auth)))
    }

    /// The underlying REST client
    pub fn client(&self) -> &DriveClient {
        &self.client
    }

    async fn get_folder_impl(&self, id: &RemoteId) -> Result<RemoteFolder, DriveError> {
        let path = format!("/drive/v3/files/{}", id.as_str());
        let request = self
            .client
            .request(Method::GET, &path)
            .await?
            .query(&[("fields", "id,name,driveId"), ("supportsAllDrives", "true")]);
        let folder: FolderMetadata = DriveClient::send_json(request).await?;
        let id = RemoteId::new(folder.id)
            .map_err(|e| DriveError::InvalidResponse(format!("bad folder id: {e}")))?;
        Ok(RemoteFolder::new(id, folder.name, folder.drive_id))
    }

    async fn list_impl(&self, request: &ListRequest) -> Result<Vec<RemoteItem>, DriveError> {
        let q = render_query(&request.query);
        debug!(query = %q, drive_id = ?request.drive_id, "Listing files");

        let mut builder = self
            .client
            .request(Method::GET, "/drive/v3/files")
            .await?
            .query(&[
                ("q", q.as_str()),
                ("fields", list_fields(request.fields).as_str()),
                ("supportsAllDrives", "true"),
                ("includeItemsFromAllDrives", "true"),
            ])
            .query(&[("pageSize", request.page_size)]);
        if let Some(drive_id) = &request.drive_id {
            builder = builder.query(&[
                ("corpora", "drive"),
                ("driveId", drive_id.as_str()),
                ("spaces", "drive"),
            ]);
        }

        let list: FileList = DriveClient::send_json(builder).await?;
        list.files.into_iter().map(DriveFile::into_item).collect()
    }

    async fn create_impl(&self, request: &CreateRequest) -> Result<RemoteItem, DriveError> {
        let parent = request.parent.as_str();
        let file = match &request.content {
            CreateContent::Folder => {
                debug!(name = %request.name, parent, "Creating folder");
                let builder = self
                    .client
                    .request(Method::POST, "/drive/v3/files")
                    .await?
                    .query(&[
                        ("supportsAllDrives", "true"),
                        ("fields", file_fields(request.fields)),
                    ])
                    .json(&json!({
                        "name": request.name,
                        "mimeType": FOLDER_MIME_TYPE,
                        "parents": [parent],
                    }));
                DriveClient::send_json::<DriveFile>(builder).await?
            }
            CreateContent::File(media) => {
                debug!(name = %request.name, parent, path = %media.display(), "Creating file");
                upload::create_file(&self.client, &request.name, parent, media, request.fields)
                    .await?
            }
        };
        file.into_item()
    }

    async fn update_impl(&self, request: &UpdateRequest) -> Result<RemoteItem, DriveError> {
        debug!(
            file_id = %request.file_id,
            path = %request.media.display(),
            "Updating file content"
        );
        upload::update_file(
            &self.client,
            request.file_id.as_str(),
            &request.media,
            request.fields,
        )
        .await?
        .into_item()
    }
}

#[async_trait::async_trait]
impl IStorageClient for DriveStorageClient {
    async fn get_folder(&self, id: &RemoteId) -> Result<RemoteFolder, StorageError> {
        Ok(self.get_folder_impl(id).await?)
    }

    async fn list(&self, request: &ListRequest) -> Result<Vec<RemoteItem>, StorageError> {
        Ok(self.list_impl(request).await?)
    }

    async fn create(&self, request: &CreateRequest) -> Result<RemoteItem, StorageError> {
        Ok(self.create_impl(request).await?)
    }

    async fn update(&self, request: &UpdateRequest) -> Result<RemoteItem, StorageError> {
        Ok(self.update_impl(request).await?)
    }
}
