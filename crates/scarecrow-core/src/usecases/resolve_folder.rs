//! Remote folder resolution use case
//!
//! Turns a sequence of folder names below a starting folder into the remote
//! folder at the end of that path, creating whatever is missing. Results are
//! memoised in a [`FolderCache`] so each (parent, name) pair costs at most one
//! listing and one creation per run.

use std::sync::Arc;

use tracing::debug;

use super::errors::UploadError;
use super::executor::RemoteExecutor;
use super::folder_cache::FolderCache;
use crate::domain::{PathSegments, RemoteFolder};
use crate::ports::{CreateRequest, ItemQuery, ListRequest};

/// Use case resolving (and creating) remote folder paths
#[derive(Debug)]
pub struct FolderResolver {
    executor: Arc<RemoteExecutor>,
    cache: FolderCache,
}

impl FolderResolver {
    /// Creates a resolver with an empty cache
    pub fn new(executor: Arc<RemoteExecutor>) -> Self {
        Self {
            executor,
            cache: FolderCache::new(),
        }
    }

    /// Number of distinct folders resolved so far
    pub fn resolved_count(&self) -> usize {
        self.cache.len()
    }

    /// Resolves `segments` below `start`, creating missing folders
    ///
    /// For every segment the cache is consulted first; on a miss the folder
    /// is looked up by exact name among the non-trashed children of the
    /// current folder (within the starting folder's shared drive) and
    /// created when absent.
    ///
    /// # Arguments
    ///
    /// * `start` - Folder the path is relative to
    /// * `segments` - Folder names below `start`; empty returns `start`
    ///
    /// # Errors
    ///
    /// Returns [`UploadError::Remote`] for the first fatal listing or
    /// creation failure. Folders created before the failure are kept.
    pub async fn resolve_or_create(
        &mut self,
        start: &RemoteFolder,
        segments: &PathSegments,
    ) -> Result<RemoteFolder, UploadError> {
        let drive_id = start.drive_id().map(str::to_string);
        let mut current = start.clone();
        let mut path = start.name().to_string();

        for name in segments.iter() {
            path.push('/');
            path.push_str(name);

            if let Some(cached) = self.cache.get(current.id(), name) {
                current = cached.clone();
                continue;
            }

            let parent = current.id().clone();
            let listing = ListRequest::new(ItemQuery::folder(&parent, name))
                .in_drive(drive_id.as_deref());
            let found = self
                .executor
                .list(&listing)
                .await
                .map_err(|e| UploadError::remote("list folder", path.clone(), e))?
                .into_iter()
                .next();

            let folder = match found {
                Some(item) => {
                    let folder = item.into_folder().inheriting_drive(drive_id.as_deref());
                    debug!(path = %path, id = %folder.id(), "Resolved existing folder");
                    folder
                }
                None => {
                    let created = self
                        .executor
                        .create(&CreateRequest::folder(&parent, name))
                        .await
                        .map_err(|e| UploadError::remote("create folder", path.clone(), e))?;
                    let folder = created.into_folder().inheriting_drive(drive_id.as_deref());
                    debug!(path = %path, id = %folder.id(), "Created folder");
                    folder
                }
            };

            self.cache.insert(&parent, name, folder.clone());
            current = folder;
        }

        Ok(current)
    }
}
