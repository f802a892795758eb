//! Scarecrow Core - Folder synchronization logic and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `RemoteFolder`, `RemoteFile`, `PathSegments`, `UploadTask`, `UploadSource`
//! - **Use cases** - `FolderResolver`, `FileUploader`, `HierarchyWalker`, `ArchiveMaterializer`,
//!   `UploadRun`, `CaptureFetcher`
//! - **Port definitions** - Traits for adapters: `IStorageClient`, `IRemoteShell`
//! - **Retry policy** - The single backoff policy applied to every remote call
//!
//! # Architecture
//!
//! The domain module contains pure types with no I/O. Ports define trait
//! interfaces that adapter crates implement (Google Drive, OpenSSH). Use cases
//! orchestrate domain entities through port interfaces.

pub mod config;
pub mod domain;
pub mod ports;
pub mod retry;
pub mod usecases;
