//! Yandex Disk REST API client
//!
//! Provides a typed HTTP client for the `/v1/disk/resources` family of
//! endpoints. Handles the OAuth header, JSON deserialization, pagination and
//! retrying of rate-limited (HTTP 429) requests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use diskmirror_yandex::client::DiskClient;
//!
//! # async fn example() -> Result<(), diskmirror_yandex::YandexError> {
//! let client = DiskClient::new("oauth-token")?;
//! let items = client.list_folder("/Mirror", 1000).await?;
//! println!("{} entries", items.len());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use chrono::{DateTime, Utc};
use diskmirror_core::ports::remote_store::FolderStatus;
use reqwest::header::{HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::YandexError;

/// Base URL of the Yandex Disk REST API
pub const YANDEX_BASE_URL: &str = "https://cloud-api.yandex.net";

/// Path of the resources endpoint relative to the base URL
const RESOURCES_PATH: &str = "/v1/disk/resources";

/// Fields requested from folder listings
const LISTING_FIELDS: &str =
    "_embedded.items.name,_embedded.items.type,_embedded.items.modified,_embedded.total,_embedded.offset";

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Retry-After used when the header is missing or unparseable
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

/// Upper bound on a single Retry-After wait
const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// Maximum number of retries for 429 responses
const DEFAULT_MAX_RETRIES: u32 = 3;

// ============================================================================
// API response types
// ============================================================================

/// Response of `GET /v1/disk/resources` for a folder
#[derive(Debug, Deserialize)]
struct ResourceResponse {
    #[serde(rename = "_embedded")]
    embedded: Option<ResourceList>,
}

/// Embedded page of folder entries
#[derive(Debug, Deserialize)]
struct ResourceList {
    #[serde(default)]
    items: Vec<RawResource>,
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawResource {
    name: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    modified: Option<String>,
}

/// One entry of a remote folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Entry name within the folder
    pub name: String,
    /// Whether the entry is a file (as opposed to a directory)
    pub is_file: bool,
    /// Last modification time, converted to UTC
    pub modified: Option<DateTime<Utc>>,
}

impl TryFrom<RawResource> for RemoteEntry {
    type Error = YandexError;

    fn try_from(raw: RawResource) -> Result<Self, Self::Error> {
        let modified = raw
            .modified
            .as_deref()
            .map(parse_modified)
            .transpose()?;

        Ok(Self {
            is_file: raw.kind.as_deref() == Some("file"),
            name: raw.name,
            modified,
        })
    }
}

/// Parses a `modified` value such as `2024-03-01T12:30:45+03:00` into UTC
pub fn parse_modified(value: &str) -> Result<DateTime<Utc>, YandexError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| YandexError::InvalidResponse(format!("bad modified time {value:?}: {e}")))
}

/// Parses a `Retry-After` header value (delay-seconds or HTTP-date)
pub fn parse_retry_after(value: &str, default: Duration) -> Duration {
    if let Ok(seconds) = value.trim().parse::<u64>() {
        return Duration::from_secs(seconds).min(MAX_RETRY_AFTER);
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(value.trim()) {
        let wait = date.with_timezone(&Utc) - Utc::now();
        if let Ok(wait) = wait.to_std() {
            return wait.min(MAX_RETRY_AFTER);
        }
        return Duration::ZERO;
    }

    warn!(value, "Could not parse Retry-After header, using default");
    default
}

// ============================================================================
// DiskClient
// ============================================================================

/// HTTP client for Yandex Disk API calls
///
/// Wraps `reqwest::Client` with the `OAuth` authorization header and base
/// URL construction.
#[derive(Debug, Clone)]
pub struct DiskClient {
    /// The underlying HTTP client
    client: Client,
    /// Base URL for API requests
    base_url: String,
    /// Pre-built `Authorization` header value
    auth_header: HeaderValue,
    /// Retries granted to a request answered with 429
    max_retries: u32,
}

impl DiskClient {
    /// Creates a client for the public Yandex Disk API
    ///
    /// # Errors
    /// Returns an error if the token is not a valid header value or the
    /// HTTP client cannot be built
    pub fn new(token: &str) -> Result<Self, YandexError> {
        Self::with_base_url(token, YANDEX_BASE_URL)
    }

    /// Creates a client with a custom base URL (useful for testing)
    ///
    /// # Errors
    /// See [`DiskClient::new`]
    pub fn with_base_url(token: &str, base_url: impl Into<String>) -> Result<Self, YandexError> {
        Self::with_timeout(token, base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with a custom base URL and per-request timeout
    ///
    /// # Errors
    /// See [`DiskClient::new`]
    pub fn with_timeout(
        token: &str,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, YandexError> {
        let mut auth_header = HeaderValue::from_str(&format!("OAuth {token}"))
            .map_err(|_| YandexError::Unauthorized("token contains invalid characters".into()))?;
        auth_header.set_sensitive(true);

        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_header,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// Overrides the number of retries for rate-limited requests
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Returns the base URL for API requests
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// Automatically prepends the base URL and adds the Authorization header.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client
            .request(method, url)
            .header(AUTHORIZATION, self.auth_header.clone())
    }

    /// Creates an unauthenticated request to an absolute URL
    ///
    /// Upload links are pre-signed and must not receive the OAuth header.
    pub(crate) fn request_absolute(&self, method: Method, url: &str) -> RequestBuilder {
        self.client.request(method, url)
    }

    // ========================================================================
    // 429 handling
    // ========================================================================

    /// Sends a request, retrying while the server answers 429
    ///
    /// The wait between attempts follows the `Retry-After` header. Any other
    /// status is returned to the caller as-is.
    ///
    /// # Errors
    /// [`YandexError::NetworkError`] on transport failures and
    /// [`YandexError::TooManyRequests`] once the retries are exhausted
    pub async fn execute_with_retry(&self, request: RequestBuilder) -> Result<Response, YandexError> {
        let mut pending = request;

        for attempt in 0..=self.max_retries {
            // Keep a copy for the next attempt before the builder is consumed.
            let retry = pending.try_clone();
            let response = pending.send().await?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                if attempt > 0 {
                    info!(url = %response.url(), attempt, "Request succeeded after retry");
                }
                return Ok(response);
            }

            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(|v| parse_retry_after(v, DEFAULT_RETRY_AFTER))
                .unwrap_or(DEFAULT_RETRY_AFTER);

            let Some(next) = retry.filter(|_| attempt < self.max_retries) else {
                warn!(url = %response.url(), attempts = attempt + 1, "429 retry limit exhausted");
                return Err(YandexError::TooManyRequests { retry_after });
            };

            info!(
                url = %response.url(),
                attempt,
                retry_after_ms = retry_after.as_millis() as u64,
                "Received 429, backing off"
            );
            tokio::time::sleep(retry_after).await;
            pending = next;
        }

        Err(YandexError::TooManyRequests {
            retry_after: DEFAULT_RETRY_AFTER,
        })
    }

    /// Turns a non-success response into the matching [`YandexError`]
    pub(crate) async fn error_from_response(response: Response) -> YandexError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        YandexError::from_status(status, body.trim())
    }

    // ========================================================================
    // Resource endpoints
    // ========================================================================

    /// Creates the folder at `path`
    ///
    /// `PUT /v1/disk/resources?path=...`. An existing folder is reported as
    /// [`FolderStatus::AlreadyExists`] rather than an error.
    pub async fn create_folder(&self, path: &str) -> Result<FolderStatus, YandexError> {
        debug!(path, "Creating remote folder");
        let request = self
            .request(Method::PUT, RESOURCES_PATH)
            .query(&[("path", path)]);
        let response = self.execute_with_retry(request).await?;

        match response.status() {
            StatusCode::CREATED => Ok(FolderStatus::Created),
            StatusCode::CONFLICT => Ok(FolderStatus::AlreadyExists),
            _ => Err(Self::error_from_response(response).await),
        }
    }

    /// Lists every entry of the folder at `path`, following pagination
    ///
    /// Requests pages of `page_size` entries until the reported total is
    /// reached or a page comes back empty.
    pub async fn list_folder(
        &self,
        path: &str,
        page_size: u32,
    ) -> Result<Vec<RemoteEntry>, YandexError> {
        let page_size = page_size.max(1);
        let mut entries = Vec::new();
        let mut offset: u64 = 0;

        loop {
            let request = self.request(Method::GET, RESOURCES_PATH).query(&[
                ("path", path.to_string()),
                ("fields", LISTING_FIELDS.to_string()),
                ("limit", page_size.to_string()),
                ("offset", offset.to_string()),
            ]);
            let response = self.execute_with_retry(request).await?;
            if !response.status().is_success() {
                return Err(Self::error_from_response(response).await);
            }

            let body: ResourceResponse = response
                .json()
                .await
                .map_err(|e| YandexError::InvalidResponse(format!("folder listing: {e}")))?;
            let page = body.embedded.ok_or_else(|| {
                YandexError::InvalidResponse(format!("{path} is not a folder listing"))
            })?;

            let received = page.items.len() as u64;
            for raw in page.items {
                entries.push(RemoteEntry::try_from(raw)?);
            }
            offset += received;

            debug!(path, received, offset, total = ?page.total, "Listed folder page");
            match page.total {
                Some(total) if offset < total && received > 0 => continue,
                None if received == u64::from(page_size) => continue,
                _ => break,
            }
        }

        Ok(entries)
    }

    /// Deletes the resource at `path`, moving it to the Disk trash
    ///
    /// `DELETE /v1/disk/resources?path=...`. Returns `true` if the resource
    /// existed.
    pub async fn delete_resource(&self, path: &str) -> Result<bool, YandexError> {
        debug!(path, "Deleting remote resource");
        let request = self
            .request(Method::DELETE, RESOURCES_PATH)
            .query(&[("path", path)]);
        let response = self.execute_with_retry(request).await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::ACCEPTED => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(Self::error_from_response(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_modified_converts_offset_to_utc() {
        let dt = parse_modified("2024-03-01T12:30:45+03:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-03-01T09:30:45+00:00");
    }

    #[test]
    fn test_parse_modified_rejects_garbage() {
        assert!(matches!(
            parse_modified("yesterday"),
            Err(YandexError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_retry_after_seconds() {
        assert_eq!(
            parse_retry_after("7", DEFAULT_RETRY_AFTER),
            Duration::from_secs(7)
        );
    }

    #[test]
    fn test_parse_retry_after_caps_long_waits() {
        assert_eq!(
            parse_retry_after("86400", DEFAULT_RETRY_AFTER),
            MAX_RETRY_AFTER
        );
    }

    #[test]
    fn test_parse_retry_after_past_date_is_immediate() {
        assert_eq!(
            parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT", DEFAULT_RETRY_AFTER),
            Duration::ZERO
        );
    }

    #[test]
    fn test_parse_retry_after_invalid_uses_default() {
        assert_eq!(
            parse_retry_after("soon", Duration::from_secs(3)),
            Duration::from_secs(3)
        );
    }

    #[test]
    fn test_entry_from_raw_resource() {
        let raw = RawResource {
            name: "a.txt".into(),
            kind: Some("file".into()),
            modified: Some("2024-01-01T00:00:00+00:00".into()),
        };
        let entry = RemoteEntry::try_from(raw).unwrap();
        assert!(entry.is_file);
        assert_eq!(entry.modified.unwrap().timestamp(), 1_704_067_200);

        let dir = RawResource {
            name: "sub".into(),
            kind: Some("dir".into()),
            modified: None,
        };
        assert!(!RemoteEntry::try_from(dir).unwrap().is_file);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = DiskClient::with_base_url("t", "http://localhost:1234/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:1234");
    }

    #[test]
    fn test_token_with_newline_is_rejected() {
        assert!(matches!(
            DiskClient::new("bad\ntoken"),
            Err(YandexError::Unauthorized(_))
        ));
    }
}
