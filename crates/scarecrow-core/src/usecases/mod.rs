//! Use cases (interactors) for scarecrow-upload
//!
//! This module contains the application use cases that orchestrate
//! domain entities and port interfaces. Every remote call goes through the
//! shared [`RemoteExecutor`], which owns retries and dry-run behaviour.
//!
//! ## Use Cases
//!
//! - [`FolderResolver`] - Resolve or create a remote folder path
//! - [`FileUploader`] - Create or update one remote file
//! - [`HierarchyWalker`] - Mirror a local directory tree
//! - [`ArchiveMaterializer`] - Upload from, or as, a tar archive
//! - [`UploadRun`] - Complete upload invocation with root check and cleanup
//! - [`CaptureFetcher`] - Pull capture archives from field hosts

pub mod archive;
pub mod errors;
pub mod executor;
pub mod fetch_captures;
pub mod folder_cache;
pub mod resolve_folder;
pub mod run;
pub mod upload_file;
pub mod walk;

pub use archive::ArchiveMaterializer;
pub use errors::UploadError;
pub use executor::RemoteExecutor;
pub use fetch_captures::{capture_date, CaptureFetcher, FetchOptions};
pub use folder_cache::FolderCache;
pub use resolve_folder::FolderResolver;
pub use run::{RunReport, UploadRun};
pub use upload_file::{FileUploader, UploadOutcome};
pub use walk::{HierarchyWalker, WalkReport};
