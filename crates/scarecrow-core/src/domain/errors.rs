//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! mainly validation failures of identifiers and path segments.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// A path component cannot be used as a remote folder name
    #[error("Invalid path segment: {0}")]
    InvalidPathSegment(String),

    /// Path is not within the declared local root
    #[error("Path {path} is not within root {root}")]
    PathOutsideRoot {
        /// The offending path
        path: String,
        /// The declared root
        root: String,
    },

    /// Generic validation failure
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
