//! Storage client port (driven/secondary port)
//!
//! This module defines the interface for the remote object store holding the
//! destination folder hierarchy. The primary implementation targets Google
//! Drive through its v3 REST API, but the trait only speaks in terms of
//! folders, files and typed request structures.
//!
//! ## Design Notes
//!
//! - Errors are a classified [`StorageError`] rather than `anyhow::Error`,
//!   because the retry policy has to tell transient failures from fatal ones.
//! - Every operation takes an explicit request struct; adapters translate the
//!   fields into their own wire format (query language, field masks).
//! - [`RemoteItem`] is a port-level DTO; use cases map it to `RemoteFolder`
//!   or `RemoteFile`.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{RemoteFolder, RemoteId};

/// Default number of items requested by a lookup listing
pub const DEFAULT_PAGE_SIZE: u32 = 1;

// ============================================================================
// StorageError
// ============================================================================

/// Errors surfaced by a storage client
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The service answered with a non-success HTTP status
    #[error("API returned {status}: {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// The request never produced a response (DNS, TLS, connection reset)
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response could not be parsed or was missing required fields
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Credentials could not be loaded or exchanged for an access token
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Reading the local content to upload failed
    #[error("Local I/O error: {0}")]
    Io(String),
}

impl StorageError {
    /// The HTTP-style status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// ============================================================================
// Request structures
// ============================================================================

/// Which kind of item a lookup matches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Only folders
    Folder,
    /// Only non-folder items
    File,
}

/// Exact-name lookup of a child item inside one parent folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemQuery {
    /// Exact item name to match
    pub name: String,
    /// Folder the item must be a direct child of
    pub parent: RemoteId,
    /// Item kind to match
    pub kind: ItemKind,
    /// Whether trashed items match too (default: false)
    pub include_trashed: bool,
}

impl ItemQuery {
    /// Query for a non-trashed folder named `name` under `parent`
    pub fn folder(parent: &RemoteId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: parent.clone(),
            kind: ItemKind::Folder,
            include_trashed: false,
        }
    }

    /// Query for a non-trashed file named `name` under `parent`
    pub fn file(parent: &RemoteId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: parent.clone(),
            kind: ItemKind::File,
            include_trashed: false,
        }
    }
}

/// Metadata fields requested from the service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldSet {
    /// Identifier and name only
    #[default]
    Minimal,
    /// Identifier, name, mime type, parents and owning drive
    Full,
}

/// Parameters of a listing call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    /// Which items to match
    pub query: ItemQuery,
    /// Maximum number of items returned (default: [`DEFAULT_PAGE_SIZE`])
    pub page_size: u32,
    /// Fields returned per item (default: [`FieldSet::Minimal`])
    pub fields: FieldSet,
    /// Shared drive to scope the search to (default: none, the caller's own drive)
    pub drive_id: Option<String>,
}

impl ListRequest {
    /// Creates a listing with default page size and fields
    pub fn new(query: ItemQuery) -> Self {
        Self {
            query,
            page_size: DEFAULT_PAGE_SIZE,
            fields: FieldSet::Minimal,
            drive_id: None,
        }
    }

    /// Scopes the listing to a shared drive
    pub fn in_drive(mut self, drive_id: Option<&str>) -> Self {
        self.drive_id = drive_id.map(str::to_string);
        self
    }
}

/// What a creation call creates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateContent {
    /// An empty folder
    Folder,
    /// A file whose content is read from the given local path
    File(PathBuf),
}

/// Parameters of a creation call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Name of the new item
    pub name: String,
    /// Sole parent folder of the new item
    pub parent: RemoteId,
    /// Folder or file content
    pub content: CreateContent,
    /// Fields returned for the created item (default: [`FieldSet::Minimal`])
    pub fields: FieldSet,
}

impl CreateRequest {
    /// Request creating folder `name` under `parent`
    pub fn folder(parent: &RemoteId, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: parent.clone(),
            content: CreateContent::Folder,
            fields: FieldSet::Minimal,
        }
    }

    /// Request creating file `name` under `parent` with the content of `media`
    pub fn file(parent: &RemoteId, name: impl Into<String>, media: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            parent: parent.clone(),
            content: CreateContent::File(media.into()),
            fields: FieldSet::Minimal,
        }
    }

    /// Returns true if this request creates a folder
    pub fn is_folder(&self) -> bool {
        matches!(self.content, CreateContent::Folder)
    }
}

/// Parameters of a content update call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    /// File whose content is replaced
    pub file_id: RemoteId,
    /// Current name of the file (unchanged by the update)
    pub name: String,
    /// Local path of the new content
    pub media: PathBuf,
    /// Fields returned for the updated file (default: [`FieldSet::Minimal`])
    pub fields: FieldSet,
}

impl UpdateRequest {
    /// Request replacing the content of `file_id` with `media`
    pub fn new(file_id: &RemoteId, name: impl Into<String>, media: impl Into<PathBuf>) -> Self {
        Self {
            file_id: file_id.clone(),
            name: name.into(),
            media: media.into(),
            fields: FieldSet::Minimal,
        }
    }
}

// ============================================================================
// RemoteItem
// ============================================================================

/// An item returned by the storage service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteItem {
    /// Storage identifier
    pub id: RemoteId,
    /// Item name
    pub name: String,
    /// Mime type, when requested
    pub mime_type: Option<String>,
    /// Parent folder identifiers, when requested
    pub parents: Vec<RemoteId>,
    /// Owning shared drive, when requested
    pub drive_id: Option<String>,
}

impl RemoteItem {
    /// Creates an item carrying only identifier and name
    pub fn minimal(id: RemoteId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mime_type: None,
            parents: Vec::new(),
            drive_id: None,
        }
    }

    /// Converts into folder metadata
    pub fn into_folder(self) -> RemoteFolder {
        RemoteFolder::new(self.id, self.name, self.drive_id)
    }
}

// ============================================================================
// IStorageClient trait
// ============================================================================

/// Port trait for remote object-store operations
///
/// All methods assume the client is already authenticated. Implementations
/// must not retry internally; retries are owned by the core's
/// [`RemoteExecutor`](crate::usecases::RemoteExecutor).
#[async_trait::async_trait]
pub trait IStorageClient: Send + Sync {
    /// Fetches folder metadata (including owning drive) by identifier
    ///
    /// Used to verify that the configured shared root is accessible.
    async fn get_folder(&self, id: &RemoteId) -> Result<RemoteFolder, StorageError>;

    /// Lists items matching the request, at most `page_size` of them
    async fn list(&self, request: &ListRequest) -> Result<Vec<RemoteItem>, StorageError>;

    /// Creates a folder or uploads a new file
    async fn create(&self, request: &CreateRequest) -> Result<RemoteItem, StorageError>;

    /// Replaces the content of an existing file, keeping its identifier
    async fn update(&self, request: &UpdateRequest) -> Result<RemoteItem, StorageError>;
}
