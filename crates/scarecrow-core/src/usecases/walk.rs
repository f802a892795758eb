//! Hierarchy walk use case
//!
//! Mirrors a local directory tree into a remote folder: every regular file is
//! uploaded into the remote folder matching its directory relative to the
//! walk root.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;
use walkdir::WalkDir;

use super::errors::UploadError;
use super::resolve_folder::FolderResolver;
use super::upload_file::{FileUploader, UploadOutcome};
use crate::domain::{PathSegments, RemoteFolder, UploadTask};

/// Summary of one walk
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkReport {
    /// Files uploaded as new remote files
    pub files_created: usize,
    /// Existing remote files whose content was replaced
    pub files_updated: usize,
    /// Remote folders looked up or created (cache misses)
    pub folders_resolved: usize,
}

impl WalkReport {
    /// Counts one uploaded file
    pub fn record(&mut self, outcome: &UploadOutcome) {
        if outcome.created {
            self.files_created += 1;
        } else {
            self.files_updated += 1;
        }
    }

    /// Total number of files placed
    pub fn files_uploaded(&self) -> usize {
        self.files_created + self.files_updated
    }
}

/// Use case walking a local tree and uploading its files
#[derive(Debug)]
pub struct HierarchyWalker {
    resolver: FolderResolver,
    uploader: FileUploader,
}

impl HierarchyWalker {
    pub fn new(resolver: FolderResolver, uploader: FileUploader) -> Self {
        Self { resolver, uploader }
    }

    /// The folder resolver, shared with callers resolving destinations
    pub fn resolver_mut(&mut self) -> &mut FolderResolver {
        &mut self.resolver
    }

    /// The single-file uploader
    pub fn uploader(&self) -> &FileUploader {
        &self.uploader
    }

    /// Uploads every regular file below `local_root / relative_subdir`
    ///
    /// Files are visited depth-first in sorted-name order and symbolic links
    /// are not followed. Each file lands in the remote folder whose path below
    /// `destination` equals the file's directory relative to `local_root`.
    ///
    /// # Arguments
    ///
    /// * `local_root` - Directory remote paths are computed from
    /// * `destination` - Remote folder matching `local_root`
    /// * `relative_subdir` - Where the walk starts; used as is when absolute
    ///
    /// # Errors
    ///
    /// The first fatal error aborts the walk. A file outside `local_root`
    /// yields [`UploadError::PathOutsideRoot`].
    pub async fn walk_and_upload(
        &mut self,
        local_root: &Path,
        destination: &RemoteFolder,
        relative_subdir: &Path,
    ) -> Result<WalkReport, UploadError> {
        let root = absolute(local_root)?;
        let start = if relative_subdir.is_absolute() {
            relative_subdir.to_path_buf()
        } else {
            root.join(relative_subdir)
        };
        info!(root = %root.display(), start = %start.display(), "Walking local tree");

        let resolved_before = self.resolver.resolved_count();
        let mut report = WalkReport::default();

        for entry in WalkDir::new(&start)
            .follow_links(false)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().map_or_else(|| start.clone(), Path::to_path_buf);
                UploadError::local(path, e.into())
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let file = entry.path();
            let dir = file.parent().unwrap_or(&start);
            let segments = PathSegments::relative_to(dir, &root)?;
            let folder = self.resolver.resolve_or_create(destination, &segments).await?;
            let task = UploadTask::new(file, folder);
            let outcome = self.uploader.upload(&task).await?;
            report.record(&outcome);
        }

        report.folders_resolved = self.resolver.resolved_count() - resolved_before;
        info!(
            created = report.files_created,
            updated = report.files_updated,
            folders = report.folders_resolved,
            "Walk finished"
        );
        Ok(report)
    }
}

fn absolute(path: &Path) -> Result<PathBuf, UploadError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| UploadError::local(path, e))?;
    Ok(cwd.join(path))
}
