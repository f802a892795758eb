//! Upload operations for the Google Drive API
//!
//! Provides functions for placing local file content on Drive:
//! - [`create_file`] - New file, multipart for small files, resumable otherwise
//! - [`update_file`] - Replace content of an existing file, keeping its ID
//! - [`start_session`] - Opens a resumable upload session
//! - [`upload_chunks`] - Streams a file through a session in fixed-size chunks
//!
//! ## Drive API References
//!
//! - [Upload file data](https://developers.google.com/drive/api/guides/manage-uploads)

use std::path::Path;

use reqwest::{Method, StatusCode};
use scarecrow_core::ports::FieldSet;
use serde_json::json;
use tokio::io::AsyncReadExt;
use tracing::{debug, info};

use crate::client::{check_status, file_fields, DriveClient, DriveFile};
use crate::DriveError;

/// Files up to this size are sent in a single request: 5 MiB
pub const SIMPLE_UPLOAD_LIMIT: u64 = 5 * 1024 * 1024;

/// Chunk size for resumable uploads: 8 MiB
///
/// Drive requires chunk sizes that are multiples of 256 KiB.
pub const CHUNK_SIZE: usize = 8 * 1024 * 1024;

/// Boundary separating the parts of a multipart upload body
const MULTIPART_BOUNDARY: &str = "scarecrow_upload_boundary";

// ============================================================================
// Multipart body
// ============================================================================

/// Builds a `multipart/related` body: JSON metadata, then the media
pub fn multipart_body(metadata: &serde_json::Value, media: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(media.len() + 256);
    body.extend_from_slice(
        format!(
            "--{MULTIPART_BOUNDARY}\r\n\
             Content-Type: application/json; charset=UTF-8\r\n\r\n\
             {metadata}\r\n\
             --{MULTIPART_BOUNDARY}\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(media);
    body.extend_from_slice(format!("\r\n--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

// ============================================================================
// create_file / update_file
// ============================================================================

/// Uploads `media` as a new file `name` inside folder `parent`
///
/// Files up to [`SIMPLE_UPLOAD_LIMIT`] use `uploadType=multipart`; larger
/// files go through a resumable session.
///
/// # Errors
/// Returns an error if the file cannot be read or any request fails
pub async fn create_file(
    client: &DriveClient,
    name: &str,
    parent: &str,
    media: &Path,
    fields: FieldSet,
) -> Result<DriveFile, DriveError> {
    let size = tokio::fs::metadata(media).await?.len();
    let metadata = json!({ "name": name, "parents": [parent] });
    let query = [
        ("supportsAllDrives", "true"),
        ("fields", file_fields(fields)),
    ];

    if size <= SIMPLE_UPLOAD_LIMIT {
        debug!(name, size, "Multipart upload");
        let content = tokio::fs::read(media).await?;
        let request = client
            .request(Method::POST, "/upload/drive/v3/files")
            .await?
            .query(&[("uploadType", "multipart")])
            .query(&query)
            .header(
                "Content-Type",
                format!("multipart/related; boundary={MULTIPART_BOUNDARY}"),
            )
            .body(multipart_body(&metadata, &content));
        return DriveClient::send_json(request).await;
    }

    let request = client
        .request(Method::POST, "/upload/drive/v3/files")
        .await?
        .query(&[("uploadType", "resumable")])
        .query(&query)
        .header("X-Upload-Content-Length", size.to_string())
        .json(&metadata);
    let session = start_session(request).await?;
    upload_chunks(client, &session, media, size).await
}

/// Replaces the content of file `file_id` with `media`
///
/// Files up to [`SIMPLE_UPLOAD_LIMIT`] use `uploadType=media`; larger files
/// go through a resumable session. Name and parents are left unchanged.
///
/// # Errors
/// Returns an error if the file cannot be read or any request fails
pub async fn update_file(
    client: &DriveClient,
    file_id: &str,
    media: &Path,
    fields: FieldSet,
) -> Result<DriveFile, DriveError> {
    let size = tokio::fs::metadata(media).await?.len();
    let path = format!("/upload/drive/v3/files/{file_id}");
    let query = [
        ("supportsAllDrives", "true"),
        ("fields", file_fields(fields)),
    ];

    if size <= SIMPLE_UPLOAD_LIMIT {
        debug!(file_id, size, "Media update");
        let content = tokio::fs::read(media).await?;
        let request = client
            .request(Method::PATCH, &path)
            .await?
            .query(&[("uploadType", "media")])
            .query(&query)
            .header("Content-Type", "application/octet-stream")
            .body(content);
        return DriveClient::send_json(request).await;
    }

    let request = client
        .request(Method::PATCH, &path)
        .await?
        .query(&[("uploadType", "resumable")])
        .query(&query)
        .header("X-Upload-Content-Length", size.to_string())
        .json(&json!({}));
    let session = start_session(request).await?;
    upload_chunks(client, &session, media, size).await
}

// ============================================================================
// Resumable sessions
// ============================================================================

/// Sends a session initiation request and returns the session URL
///
/// # Errors
/// Returns an error if the request fails or no `Location` header is returned
pub async fn start_session(request: reqwest::RequestBuilder) -> Result<String, DriveError> {
    let response = check_status(request.send().await?).await?;
    let location = response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            DriveError::InvalidResponse("resumable session without Location header".into())
        })?;
    debug!(session = location, "Upload session created");
    Ok(location.to_string())
}

/// Uploads `media` (of `total` bytes) through session `session_url`
///
/// Each chunk is sent with a `Content-Range` header; the service answers
/// `308 Resume Incomplete` until the last chunk, which returns the file.
///
/// # Errors
/// Returns an error if reading fails, a chunk is rejected, or the session
/// ends without returning the file
pub async fn upload_chunks(
    client: &DriveClient,
    session_url: &str,
    media: &Path,
    total: u64,
) -> Result<DriveFile, DriveError> {
    let chunks = total.div_ceil(CHUNK_SIZE as u64);
    info!(path = %media.display(), total, chunks, "Starting resumable upload");

    let mut file = tokio::fs::File::open(media).await?;
    let mut buffer = vec![0u8; CHUNK_SIZE];
    let mut offset: u64 = 0;

    while offset < total {
        let len = read_chunk(&mut file, &mut buffer).await?;
        if len == 0 {
            return Err(DriveError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("{} shrank during upload", media.display()),
            )));
        }
        let end = offset + len as u64;
        let content_range = format!("bytes {}-{}/{}", offset, end - 1, total);
        debug!(range = %content_range, "Uploading chunk");

        let token = client.access_token().await?;
        let response = client
            .http_client()
            .put(session_url)
            .bearer_auth(token)
            .header("Content-Length", len.to_string())
            .header("Content-Range", &content_range)
            .body(buffer[..len].to_vec())
            .send()
            .await?;

        if response.status() == StatusCode::PERMANENT_REDIRECT {
            offset = end;
            continue;
        }

        let response = check_status(response).await?;
        let file: DriveFile = response
            .json()
            .await
            .map_err(|e| DriveError::InvalidResponse(e.to_string()))?;
        info!(id = %file.id, name = %file.name, total, "Resumable upload completed");
        return Ok(file);
    }

    Err(DriveError::InvalidResponse(
        "upload session completed without returning the file".into(),
    ))
}

/// Fills `buffer` from `file`, returning fewer bytes only at end of file
async fn read_chunk(file: &mut tokio::fs::File, buffer: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let n = file.read(&mut buffer[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

// ============================================================================
// Tests
// ============================================================================
