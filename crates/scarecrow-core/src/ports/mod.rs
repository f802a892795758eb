//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the domain core
//! depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IStorageClient`] - Remote object-store operations (Google Drive)
//! - [`IRemoteShell`] - Command execution and file copy on capture hosts (OpenSSH)

pub mod remote_shell;
pub mod storage_client;

pub use remote_shell::IRemoteShell;
pub use storage_client::{
    CreateContent, CreateRequest, FieldSet, IStorageClient, ItemKind, ItemQuery, ListRequest,
    RemoteItem, StorageError, UpdateRequest, DEFAULT_PAGE_SIZE,
};
