//! Google Drive v3 REST client
//!
//! Provides a typed HTTP client for the Drive API. Handles bearer tokens,
//! endpoint construction, search-query rendering and the mapping of error
//! responses to [`DriveError`].
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use scarecrow_gdrive::auth::StaticToken;
//! use scarecrow_gdrive::client::DriveClient;
//!
//! # async fn example() -> Result<(), scarecrow_gdrive::DriveError> {
//! let client = DriveClient::new(Arc::new(StaticToken::new("access-token-here")));
//! let request = client.request(reqwest::Method::GET, "/drive/v3/about").await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder, Response};
use scarecrow_core::domain::RemoteId;
use scarecrow_core::ports::{FieldSet, ItemKind, ItemQuery, RemoteItem};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::auth::AccessTokenSource;
use crate::DriveError;

/// Base URL of the Google APIs
const DRIVE_BASE_URL: &str = "https://www.googleapis.com";

/// Mime type identifying folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

// ============================================================================
// Drive API response types
// ============================================================================

/// A file resource as returned by the Drive API
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// File ID
    pub id: String,
    /// File name
    pub name: String,
    /// Mime type, when requested
    pub mime_type: Option<String>,
    /// Parent folder IDs, when requested
    #[serde(default)]
    pub parents: Vec<String>,
    /// Owning shared drive, when requested
    pub drive_id: Option<String>,
}

impl DriveFile {
    /// Converts into the port-level item
    pub fn into_item(self) -> Result<RemoteItem, DriveError> {
        let id = RemoteId::new(self.id)
            .map_err(|e| DriveError::InvalidResponse(format!("bad file id: {e}")))?;
        let parents = self
            .parents
            .into_iter()
            .map(RemoteId::new)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DriveError::InvalidResponse(format!("bad parent id: {e}")))?;
        Ok(RemoteItem {
            id,
            name: self.name,
            mime_type: self.mime_type,
            parents,
            drive_id: self.drive_id,
        })
    }
}

/// Response of `files.list`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Error envelope of a failed request
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// Query and field rendering
// ============================================================================

/// Escapes a value for use inside a single-quoted query string literal
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Renders an [`ItemQuery`] in the Drive search language
pub fn render_query(query: &ItemQuery) -> String {
    let mut clauses = vec![
        format!("name = '{}'", escape_query_value(&query.name)),
        format!("'{}' in parents", escape_query_value(query.parent.as_str())),
    ];
    clauses.push(match query.kind {
        ItemKind::Folder => format!("mimeType = '{FOLDER_MIME_TYPE}'"),
        ItemKind::File => format!("mimeType != '{FOLDER_MIME_TYPE}'"),
    });
    if !query.include_trashed {
        clauses.push("trashed = false".to_string());
    }
    clauses.join(" and ")
}

/// Field mask for a single file resource
pub fn file_fields(fields: FieldSet) -> &'static str {
    match fields {
        FieldSet::Minimal => "id,name",
        FieldSet::Full => "id,name,mimeType,parents,driveId",
    }
}

/// Field mask for a file listing
pub fn list_fields(fields: FieldSet) -> String {
    format!("files({})", file_fields(fields))
}

// ============================================================================
// DriveClient
// ============================================================================

/// HTTP client for Google Drive API calls
///
/// Wraps `reqwest::Client` with bearer authentication and base URL
/// construction.
#[derive(Clone)]
pub struct DriveClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Source of bearer tokens
    tokens: Arc<dyn AccessTokenSource>,
}

impl DriveClient {
    /// Creates a new DriveClient for the public Google APIs endpoint
    pub fn new(tokens: Arc<dyn AccessTokenSource>) -> Self {
        Self::with_base_url(tokens, DRIVE_BASE_URL)
    }

    /// Creates a new DriveClient with a custom base URL (useful for testing)
    pub fn with_base_url(tokens: Arc<dyn AccessTokenSource>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns a reference to the underlying HTTP client
    ///
    /// Upload session URLs are absolute, so chunk uploads build their
    /// requests directly on it.
    pub(crate) fn http_client(&self) -> &Client {
        &self.client
    }

    /// Current bearer token
    pub async fn access_token(&self) -> Result<String, DriveError> {
        self.tokens.access_token().await
    }

    /// Creates an authenticated request builder for `path` below the base URL
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - API path, e.g. `/drive/v3/files`
    pub async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, DriveError> {
        let token = self.access_token().await?;
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "Drive request");
        Ok(self.client.request(method, &url).bearer_auth(token))
    }

    /// Sends `request` and parses a JSON success body
    pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, DriveError> {
        let response = check_status(request.send().await?).await?;
        response
            .json()
            .await
            .map_err(|e| DriveError::InvalidResponse(e.to_string()))
    }
}

impl std::fmt::Debug for DriveClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Passes successful responses through and turns the rest into [`DriveError`]
///
/// The message is taken from the `error.message` field of the JSON error
/// envelope, or the raw body when it is not JSON.
pub async fn check_status(response: Response) -> Result<Response, DriveError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unable to read error body".to_string());
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);
    Err(DriveError::from_status(status.as_u16(), message))
}
