//! Shared test helpers for Yandex Disk API integration tests
//!
//! Provides wiremock-based mock server setup for the resources endpoints.
//! Each helper mounts the necessary mock endpoints on the given server.

use diskmirror_core::domain::newtypes::RemoteFolder;
use diskmirror_yandex::client::DiskClient;
use diskmirror_yandex::provider::YandexRemoteStore;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TOKEN: &str = "test-token";
pub const FOLDER: &str = "/Mirror";

/// Starts a mock server and returns a client pointing at it
pub async fn setup_disk_mock() -> (MockServer, DiskClient) {
    let server = MockServer::start().await;
    let client = DiskClient::with_base_url(TOKEN, server.uri()).expect("client");
    (server, client)
}

/// Starts a mock server and a store over a fresh temporary local directory
pub async fn setup_store() -> (MockServer, YandexRemoteStore, TempDir) {
    let (server, client) = setup_disk_mock().await;
    let local = TempDir::new().expect("temp dir");
    let store = YandexRemoteStore::new(client, RemoteFolder::new(FOLDER).unwrap(), local.path());
    (server, store, local)
}

/// A listing item in the shape returned by the API
pub fn item(name: &str, kind: &str, modified: &str) -> serde_json::Value {
    serde_json::json!({ "name": name, "type": kind, "modified": modified })
}

/// Mounts a single-page listing of `FOLDER`
pub async fn mount_listing(server: &MockServer, items: serde_json::Value) {
    let total = items.as_array().map_or(0, Vec::len);
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", FOLDER))
        .and(header("Authorization", "OAuth test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "_embedded": { "items": items, "total": total, "offset": 0 }
        })))
        .mount(server)
        .await;
}

/// Mounts one listing page served for a specific offset
pub async fn mount_listing_page(
    server: &MockServer,
    offset: u64,
    items: serde_json::Value,
    total: u64,
) {
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", FOLDER))
        .and(query_param("offset", offset.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "_embedded": { "items": items, "total": total, "offset": offset }
        })))
        .expect(1)
        .mount(server)
        .await;
}

/// Mounts the upload-link endpoint for `remote_path`, pointing at `/upload-target/<name>`
pub async fn mount_upload_link(server: &MockServer, remote_path: &str, overwrite: bool, name: &str) {
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources/upload"))
        .and(query_param("path", remote_path))
        .and(query_param("overwrite", if overwrite { "true" } else { "false" }))
        .and(header("Authorization", "OAuth test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "href": format!("{}/upload-target/{}", server.uri(), name),
            "method": "PUT",
            "templated": false
        })))
        .mount(server)
        .await;
}

/// Mounts the byte-receiving endpoint for `name` answering with `status`
pub async fn mount_upload_target(server: &MockServer, name: &str, status: u16) {
    Mock::given(method("PUT"))
        .and(path(format!("/upload-target/{name}")))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
