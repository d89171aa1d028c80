//! Upload operations for the Yandex Disk API
//!
//! Uploading is a two-step exchange:
//! 1. [`get_upload_link`] asks `GET /v1/disk/resources/upload` for a
//!    pre-signed URL, stating whether an existing file may be replaced.
//! 2. [`put_bytes`] sends the file content to that URL with `PUT`.
//!
//! [`upload_file`] combines both steps for a file on disk.

use std::path::Path;

use diskmirror_core::ports::remote_store::{UploadMode, UploadOutcome};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tracing::debug;

use crate::client::DiskClient;
use crate::YandexError;

/// Path of the upload-link endpoint relative to the base URL
const UPLOAD_LINK_PATH: &str = "/v1/disk/resources/upload";

/// Response from the upload-link endpoint
#[derive(Debug, Deserialize)]
struct UploadLink {
    /// Pre-signed URL receiving the file bytes
    href: String,
    /// HTTP method to use against `href` (always `PUT` today)
    method: Option<String>,
}

/// Requests an upload URL for `remote_path`
///
/// With [`UploadMode::Create`] the service refuses (409) when the file
/// already exists; [`UploadMode::Overwrite`] replaces it.
///
/// # Returns
/// The pre-signed URL and the method to send the bytes with
pub async fn get_upload_link(
    client: &DiskClient,
    remote_path: &str,
    mode: UploadMode,
) -> Result<(String, Method), YandexError> {
    let overwrite = if mode.overwrites() { "true" } else { "false" };
    let request = client.request(Method::GET, UPLOAD_LINK_PATH).query(&[
        ("path", remote_path),
        ("overwrite", overwrite),
        ("fields", "href,method"),
    ]);

    let response = client.execute_with_retry(request).await?;
    if response.status() != StatusCode::OK {
        return Err(DiskClient::error_from_response(response).await);
    }

    let link: UploadLink = response
        .json()
        .await
        .map_err(|e| YandexError::InvalidResponse(format!("upload link: {e}")))?;

    let method = match link.method.as_deref() {
        None => Method::PUT,
        Some(m) => Method::from_bytes(m.to_ascii_uppercase().as_bytes())
            .map_err(|_| YandexError::InvalidResponse(format!("upload method {m:?}")))?,
    };

    debug!(remote_path, overwrite, "Obtained upload link");
    Ok((link.href, method))
}

/// Sends `data` to a pre-signed upload URL
///
/// 201 means the file is in place; 202 means the server took the bytes but
/// has not yet moved them into the folder.
pub async fn put_bytes(
    client: &DiskClient,
    href: &str,
    method: Method,
    data: Vec<u8>,
) -> Result<UploadOutcome, YandexError> {
    let size = data.len();
    let request = client
        .request_absolute(method, href)
        .header("Content-Type", "application/octet-stream")
        .body(data);

    let response = client.execute_with_retry(request).await?;
    match response.status() {
        StatusCode::CREATED | StatusCode::OK => {
            debug!(size, "Upload stored");
            Ok(UploadOutcome::Stored)
        }
        StatusCode::ACCEPTED => {
            debug!(size, "Upload accepted, placement pending");
            Ok(UploadOutcome::Accepted)
        }
        _ => Err(DiskClient::error_from_response(response).await),
    }
}

/// Uploads the file at `local_path` to `remote_path`
///
/// The local file is read before the upload link is requested, so a file
/// that vanished never costs a round trip.
pub async fn upload_file(
    client: &DiskClient,
    local_path: &Path,
    remote_path: &str,
    mode: UploadMode,
) -> Result<UploadOutcome, YandexError> {
    let data = tokio::fs::read(local_path)
        .await
        .map_err(|source| YandexError::LocalFile {
            path: local_path.to_path_buf(),
            source,
        })?;

    debug!(
        local = %local_path.display(),
        remote_path,
        size = data.len(),
        ?mode,
        "Uploading file"
    );

    let (href, method) = get_upload_link(client, remote_path, mode).await?;
    put_bytes(client, &href, method, data).await
}
