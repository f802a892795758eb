//! Domain entities
//!
//! This module contains the core domain types for scarecrow-upload:
//! - Newtypes for validated remote identifiers and folder path segments
//! - Remote folder and file metadata
//! - Upload tasks and the upload source selector
//! - Domain-specific error types

pub mod errors;
pub mod newtypes;
pub mod remote;

// Re-export commonly used types
pub use errors::DomainError;
pub use newtypes::{PathSegments, RemoteId};
pub use remote::{file_name_of, RemoteFile, RemoteFolder, UploadSource, UploadTask};
