//! Errors raised by the upload use cases

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::DomainError;
use crate::ports::StorageError;

/// A fatal failure of an upload run
///
/// Every variant names what was being attempted, so the CLI can report the
/// failing operation together with the path or remote identifier involved.
#[derive(Debug, Error)]
pub enum UploadError {
    /// A remote call failed, after retries where the failure was transient
    #[error("{operation} failed for {target}: {source}")]
    Remote {
        /// Name of the remote operation, e.g. `"create folder"`
        operation: &'static str,
        /// Remote path or identifier the operation targeted
        target: String,
        #[source]
        source: StorageError,
    },

    /// Reading or removing local content failed
    #[error("Local file error at {}: {source}", path.display())]
    LocalIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Packing or unpacking a tar archive failed
    #[error("Archive error at {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file discovered by the walk lies outside the walk root
    #[error("{} is not within {}", path.display(), root.display())]
    PathOutsideRoot { path: PathBuf, root: PathBuf },

    /// A local or remote path could not be turned into folder names
    #[error("Invalid path: {0}")]
    InvalidPath(#[source] DomainError),

    /// The run was started with unusable settings
    #[error("Configuration error: {0}")]
    Config(String),
}

impl UploadError {
    /// Wraps a storage failure with the operation and target it belongs to
    pub fn remote(operation: &'static str, target: impl Into<String>, source: StorageError) -> Self {
        Self::Remote {
            operation,
            target: target.into(),
            source,
        }
    }

    /// Wraps a local I/O failure with the path it concerns
    pub fn local(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalIo {
            path: path.into(),
            source,
        }
    }

    /// The HTTP-style status of an underlying remote failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { source, .. } => source.status(),
            _ => None,
        }
    }
}

impl From<DomainError> for UploadError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::PathOutsideRoot { path, root } => Self::PathOutsideRoot {
                path: path.into(),
                root: root.into(),
            },
            other => Self::InvalidPath(other),
        }
    }
}
