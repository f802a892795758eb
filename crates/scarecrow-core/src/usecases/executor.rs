//! Remote call executor
//!
//! Every call the use cases make to the storage port goes through
//! [`RemoteExecutor`]. It applies the shared [`RetryPolicy`] to listing,
//! creation and update calls alike, and in dry-run mode answers creations and
//! updates with synthetic metadata instead of contacting the store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::domain::{RemoteFolder, RemoteId};
use crate::ports::{
    CreateRequest, IStorageClient, ListRequest, RemoteItem, StorageError, UpdateRequest,
};
use crate::retry::{is_retryable, RetryPolicy};

/// Retrying, dry-run aware front of an [`IStorageClient`]
pub struct RemoteExecutor {
    client: Arc<dyn IStorageClient>,
    policy: RetryPolicy,
    dry_run: bool,
    synthetic_ids: AtomicU64,
}

impl RemoteExecutor {
    /// Creates an executor that performs every call for real
    pub fn new(client: Arc<dyn IStorageClient>, policy: RetryPolicy) -> Self {
        Self {
            client,
            policy,
            dry_run: false,
            synthetic_ids: AtomicU64::new(0),
        }
    }

    /// Enables or disables dry-run mode
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Returns true if mutations are short-circuited
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// The retry policy applied to every call
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetches folder metadata, retrying transient failures
    ///
    /// Runs in dry-run mode too: it does not mutate anything.
    pub async fn get_folder(&self, id: &RemoteId) -> Result<RemoteFolder, StorageError> {
        self.policy
            .run("get", is_retryable, || self.client.get_folder(id))
            .await
    }

    /// Lists matching items, retrying transient failures
    ///
    /// Runs in dry-run mode too, so lookups see the real remote state. A
    /// folder that only exists as a dry-run placeholder has no children.
    pub async fn list(&self, request: &ListRequest) -> Result<Vec<RemoteItem>, StorageError> {
        if self.dry_run && request.query.parent.is_synthetic() {
            return Ok(Vec::new());
        }
        self.policy
            .run("list", is_retryable, || self.client.list(request))
            .await
    }

    /// Creates a folder or file, retrying transient failures
    pub async fn create(&self, request: &CreateRequest) -> Result<RemoteItem, StorageError> {
        if self.dry_run {
            let id = self.next_synthetic_id();
            info!(
                name = %request.name,
                parent = %request.parent,
                folder = request.is_folder(),
                id = %id,
                "Dry run: skipping create"
            );
            return Ok(RemoteItem::minimal(id, request.name.clone()));
        }

        self.policy
            .run("create", is_retryable, || self.client.create(request))
            .await
    }

    /// Replaces file content, retrying transient failures
    pub async fn update(&self, request: &UpdateRequest) -> Result<RemoteItem, StorageError> {
        if self.dry_run {
            let id = self.next_synthetic_id();
            info!(
                name = %request.name,
                file_id = %request.file_id,
                id = %id,
                "Dry run: skipping update"
            );
            return Ok(RemoteItem::minimal(id, request.name.clone()));
        }

        self.policy
            .run("update", is_retryable, || self.client.update(request))
            .await
    }

    fn next_synthetic_id(&self) -> RemoteId {
        RemoteId::synthetic(self.synthetic_ids.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

impl std::fmt::Debug for RemoteExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteExecutor")
            .field("policy", &self.policy)
            .field("dry_run", &self.dry_run)
            .finish_non_exhaustive()
    }
}
