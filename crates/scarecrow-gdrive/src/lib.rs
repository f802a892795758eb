//! Scarecrow GDrive - Google Drive v3 storage adapter
//!
//! Provides async client for:
//! - Service-account authentication (signed JWT exchanged for access tokens)
//! - Folder lookup and creation on shared drives
//! - Multipart and resumable (chunked) file uploads and content updates
//!
//! ## Modules
//!
//! - [`auth`] - Service-account key loading and token caching
//! - [`client`] - Drive REST client, query rendering and error mapping
//! - [`provider`] - [`IStorageClient`](scarecrow_core::ports::IStorageClient) implementation
//! - [`upload`] - File upload operations (multipart and resumable)

pub mod auth;
pub mod client;
pub mod provider;
pub mod upload;

use scarecrow_core::ports::StorageError;
use thiserror::Error;

/// Errors that can occur when communicating with the Google Drive API
#[derive(Debug, Error)]
pub enum DriveError {
    /// Authentication credentials are invalid or expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Insufficient permissions for the requested operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded
    #[error("Too many requests: {0}")]
    TooManyRequests(String),

    /// A server-side error occurred (5xx)
    #[error("Server error {status}: {message}")]
    ServerError {
        /// HTTP status code
        status: u16,
        /// Error message from the response body
        message: String,
    },

    /// Any other non-success status
    #[error("HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Error message from the response body
        message: String,
    },

    /// A network-level error occurred
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The API response could not be parsed or was malformed
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// The service-account key could not be used to obtain a token
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Reading local content failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl DriveError {
    /// Builds the error matching an HTTP status and its message
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => Self::Unauthorized(message),
            403 => Self::Forbidden(message),
            404 => Self::NotFound(message),
            429 => Self::TooManyRequests(message),
            500..=599 => Self::ServerError { status, message },
            _ => Self::Http { status, message },
        }
    }

    /// The HTTP status this error was built from, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::TooManyRequests(_) => Some(429),
            Self::ServerError { status, .. } | Self::Http { status, .. } => Some(*status),
            Self::NetworkError(e) => e.status().map(|s| s.as_u16()),
            Self::InvalidResponse(_) | Self::Auth(_) | Self::Io(_) => None,
        }
    }
}

impl From<DriveError> for StorageError {
    fn from(err: DriveError) -> Self {
        if let Some(status) = err.status() {
            let message = match err {
                DriveError::Unauthorized(m)
                | DriveError::Forbidden(m)
                | DriveError::NotFound(m)
                | DriveError::TooManyRequests(m)
                | DriveError::ServerError { message: m, .. }
                | DriveError::Http { message: m, .. } => m,
                other => other.to_string(),
            };
            return StorageError::Api { status, message };
        }
        match err {
            DriveError::NetworkError(e) => StorageError::Transport(e.to_string()),
            DriveError::Auth(m) => StorageError::Auth(m),
            DriveError::Io(e) => StorageError::Io(e.to_string()),
            other => StorageError::InvalidResponse(other.to_string()),
        }
    }
}
