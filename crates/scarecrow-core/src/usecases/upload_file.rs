//! File upload use case
//!
//! Places one local file into one remote folder: the content of an existing
//! file with the same name is replaced in place, otherwise a new file is
//! created.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::errors::UploadError;
use super::executor::RemoteExecutor;
use crate::domain::{file_name_of, DomainError, RemoteFile, RemoteFolder, UploadTask};
use crate::ports::{CreateRequest, ItemQuery, ListRequest, UpdateRequest};

/// Result of placing one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    /// Minimal metadata of the remote file
    pub file: RemoteFile,
    /// True if a new file was created, false if an existing one was updated
    pub created: bool,
}

/// Use case uploading or updating single files
#[derive(Debug)]
pub struct FileUploader {
    executor: Arc<RemoteExecutor>,
}

impl FileUploader {
    pub fn new(executor: Arc<RemoteExecutor>) -> Self {
        Self { executor }
    }

    /// Performs one task produced by the hierarchy walker
    pub async fn upload(&self, task: &UploadTask) -> Result<UploadOutcome, UploadError> {
        self.upload_or_update(&task.destination, &task.local_path).await
    }

    /// Uploads `local_path` into `destination`, updating a same-named file
    ///
    /// Only the first existing file with the name is considered; duplicates
    /// are left alone.
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::LocalIo`] before any remote call if
    /// `local_path` is missing or not a regular file, and
    /// [`UploadError::Remote`] for a fatal lookup, create or update failure.
    pub async fn upload_or_update(
        &self,
        destination: &RemoteFolder,
        local_path: &Path,
    ) -> Result<UploadOutcome, UploadError> {
        let metadata = tokio::fs::metadata(local_path)
            .await
            .map_err(|e| UploadError::local(local_path, e))?;
        if !metadata.is_file() {
            return Err(UploadError::local(
                local_path,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
            ));
        }
        let name = file_name_of(local_path).ok_or_else(|| {
            DomainError::InvalidPathSegment(local_path.display().to_string())
        })?;
        let target = format!("{}/{}", destination.name(), name);

        let listing = ListRequest::new(ItemQuery::file(destination.id(), name))
            .in_drive(destination.drive_id());
        let existing = self
            .executor
            .list(&listing)
            .await
            .map_err(|e| UploadError::remote("list file", target.clone(), e))?
            .into_iter()
            .next();

        let (item, created) = match existing {
            Some(found) => {
                debug!(path = %target, id = %found.id, "Updating existing file");
                let request = UpdateRequest::new(&found.id, name, local_path);
                let item = self
                    .executor
                    .update(&request)
                    .await
                    .map_err(|e| UploadError::remote("update file", target.clone(), e))?;
                (item, false)
            }
            None => {
                debug!(path = %target, "Creating new file");
                let request = CreateRequest::file(destination.id(), name, local_path);
                let item = self
                    .executor
                    .create(&request)
                    .await
                    .map_err(|e| UploadError::remote("create file", target.clone(), e))?;
                (item, true)
            }
        };

        let file = RemoteFile {
            id: item.id,
            name: name.to_string(),
            parent: destination.id().clone(),
        };
        info!(
            path = %target,
            id = %file.id,
            size_bytes = metadata.len(),
            action = if created { "created" } else { "updated" },
            "Uploaded file"
        );

        Ok(UploadOutcome { file, created })
    }
}
