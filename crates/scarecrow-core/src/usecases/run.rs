//! Upload run use case
//!
//! Entry point of an `upload` invocation: verifies the shared root, resolves
//! the destination folder below it, then dispatches once on the selected
//! [`UploadSource`].

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::archive::ArchiveMaterializer;
use super::errors::UploadError;
use super::executor::RemoteExecutor;
use super::resolve_folder::FolderResolver;
use super::upload_file::FileUploader;
use super::walk::{HierarchyWalker, WalkReport};
use crate::domain::{PathSegments, RemoteFolder, RemoteId, UploadSource};

/// Summary of one upload run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Kind of source uploaded, e.g. `"archive"`
    pub source: &'static str,
    /// Remote folder the source was placed into
    pub destination: RemoteFolder,
    /// Remote path of `destination` below the shared root
    pub destination_path: String,
    /// File and folder counters
    #[serde(flatten)]
    pub walk: WalkReport,
    /// True if no remote mutation was performed
    pub dry_run: bool,
    /// True if the local source was removed afterwards
    pub cleaned_up: bool,
}

/// Use case driving a complete upload
#[derive(Debug)]
pub struct UploadRun {
    executor: Arc<RemoteExecutor>,
    root_id: RemoteId,
    materializer: ArchiveMaterializer,
    cleanup: bool,
}

impl UploadRun {
    /// Creates a run placing content below the shared root `root_id`
    pub fn new(executor: Arc<RemoteExecutor>, root_id: RemoteId) -> Self {
        let walker = HierarchyWalker::new(
            FolderResolver::new(Arc::clone(&executor)),
            FileUploader::new(Arc::clone(&executor)),
        );
        Self {
            executor,
            root_id,
            materializer: ArchiveMaterializer::new(walker),
            cleanup: false,
        }
    }

    /// Removes the local source after a successful, non dry-run upload
    #[must_use]
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// Verifies the shared root is reachable and returns its metadata
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Remote`] if the root cannot be fetched.
    pub async fn check_root(&self) -> Result<RemoteFolder, UploadError> {
        let root = self
            .executor
            .get_folder(&self.root_id)
            .await
            .map_err(|e| UploadError::remote("get root folder", self.root_id.to_string(), e))?;
        info!(
            name = %root.name(),
            id = %root.id(),
            drive_id = root.drive_id().unwrap_or("-"),
            "Shared root is accessible"
        );
        Ok(root)
    }

    /// Uploads `source` into the folder at `destination` below the root
    ///
    /// # Arguments
    ///
    /// * `source` - What to upload
    /// * `destination` - Remote folder path below the shared root
    ///
    /// # Errors
    ///
    /// Returns the first fatal error; the local source is never removed
    /// when the upload failed.
    pub async fn execute(
        &mut self,
        source: &UploadSource,
        destination: &PathSegments,
    ) -> Result<RunReport, UploadError> {
        let root = self.check_root().await?;
        let resolved_before = self.resolver_count();
        let folder = self
            .materializer
            .walker_mut()
            .resolver_mut()
            .resolve_or_create(&root, destination)
            .await?;
        info!(
            source = source.kind(),
            path = %source.local_path().display(),
            destination = %folder,
            "Starting upload"
        );

        let mut walk = match source {
            UploadSource::SingleFile(path) => {
                let mut report = WalkReport::default();
                let outcome = self
                    .materializer
                    .walker_mut()
                    .uploader()
                    .upload_or_update(&folder, path)
                    .await?;
                report.record(&outcome);
                report
            }
            UploadSource::LocalDirectory { root, subdir } => {
                self.materializer
                    .walker_mut()
                    .walk_and_upload(root, &folder, subdir)
                    .await?
            }
            UploadSource::Archive(path) => {
                self.materializer.upload_from_archive(path, &folder).await?
            }
            UploadSource::ArchivedDirectory(path) => {
                let mut report = WalkReport::default();
                let outcome = self.materializer.archive_and_upload(path, &folder).await?;
                report.record(&outcome);
                report
            }
        };
        walk.folders_resolved = self.resolver_count() - resolved_before;

        let dry_run = self.executor.is_dry_run();
        let cleaned_up = if self.cleanup && !dry_run {
            remove_local(&source.local_path()).await?;
            true
        } else {
            if self.cleanup {
                warn!("Dry run: keeping local source");
            }
            false
        };

        let destination_path = if destination.is_empty() {
            root.name().to_string()
        } else {
            format!("{}/{}", root.name(), destination)
        };
        Ok(RunReport {
            source: source.kind(),
            destination: folder,
            destination_path,
            walk,
            dry_run,
            cleaned_up,
        })
    }

    fn resolver_count(&mut self) -> usize {
        self.materializer
            .walker_mut()
            .resolver_mut()
            .resolved_count()
    }
}

async fn remove_local(path: &Path) -> Result<(), UploadError> {
    let metadata = tokio::fs::symlink_metadata(path)
        .await
        .map_err(|e| UploadError::local(path, e))?;
    let removed = if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await
    } else {
        tokio::fs::remove_file(path).await
    };
    removed.map_err(|e| UploadError::local(path, e))?;
    info!(path = %path.display(), "Removed local source");
    Ok(())
}
