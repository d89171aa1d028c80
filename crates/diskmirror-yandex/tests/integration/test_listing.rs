//! Integration tests for folder listings and modification times

use diskmirror_core::domain::newtypes::FileName;
use diskmirror_core::ports::remote_store::IRemoteStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common::{self, item};

#[tokio::test]
async fn test_list_files_reports_files_only() {
    let (server, store, _local) = common::setup_store().await;
    common::mount_listing(
        &server,
        serde_json::json!([
            item("a.txt", "file", "2024-01-01T00:00:00+00:00"),
            item("photos", "dir", "2024-01-01T00:00:00+00:00"),
            item("b.txt", "file", "2024-01-02T00:00:00+00:00"),
        ]),
    )
    .await;

    let files = store.list_files().await.expect("listing");

    let names: Vec<&str> = files.iter().map(FileName::as_str).collect();
    assert_eq!(names, vec!["a.txt", "b.txt"]);
}

#[tokio::test]
async fn test_list_files_empty_folder() {
    let (server, store, _local) = common::setup_store().await;
    common::mount_listing(&server, serde_json::json!([])).await;

    assert!(store.list_files().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_files_follows_pagination() {
    let (server, client) = common::setup_disk_mock().await;
    common::mount_listing_page(
        &server,
        0,
        serde_json::json!([
            item("1.txt", "file", "2024-01-01T00:00:00+00:00"),
            item("2.txt", "file", "2024-01-01T00:00:00+00:00"),
        ]),
        3,
    )
    .await;
    common::mount_listing_page(
        &server,
        2,
        serde_json::json!([item("3.txt", "file", "2024-01-01T00:00:00+00:00")]),
        3,
    )
    .await;

    let entries = client.list_folder(common::FOLDER, 2).await.expect("listing");

    let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["1.txt", "2.txt", "3.txt"]);
}

#[tokio::test]
async fn test_modification_times_are_utc_seconds() {
    let (server, store, _local) = common::setup_store().await;
    common::mount_listing(
        &server,
        serde_json::json!([
            item("a.txt", "file", "2024-03-01T12:30:45+03:00"),
            item("b.txt", "file", "2024-03-01T09:30:45+00:00"),
        ]),
    )
    .await;

    let index = store.modification_times().await.expect("times");

    let a = index.get(&FileName::new("a.txt").unwrap()).unwrap();
    let b = index.get(&FileName::new("b.txt").unwrap()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.to_rfc3339(), "2024-03-01T09:30:45+00:00");
}

#[tokio::test]
async fn test_listing_server_error_is_transient() {
    let (server, store, _local) = common::setup_store().await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = store.list_files().await.unwrap_err();
    assert!(err.is_transient(), "got {err:?}");
    assert!(err.to_string().contains("maintenance"));
}

#[tokio::test]
async fn test_listing_malformed_body_is_transient() {
    let (server, store, _local) = common::setup_store().await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    assert!(store.modification_times().await.unwrap_err().is_transient());
}

#[tokio::test]
async fn test_listing_revoked_token_is_unauthorized() {
    let (server, store, _local) = common::setup_store().await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert!(store.list_files().await.unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn test_listing_retries_after_429() {
    let (server, store, _local) = common::setup_store().await;
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    common::mount_listing(
        &server,
        serde_json::json!([item("a.txt", "file", "2024-01-01T00:00:00+00:00")]),
    )
    .await;

    let files = store.list_files().await.expect("listing after retry");
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_listing_gives_up_after_repeated_429() {
    let (server, client) = common::setup_disk_mock().await;
    let client = client.with_max_retries(2);
    Mock::given(method("GET"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(3)
        .mount(&server)
        .await;

    let err = client.list_folder(common::FOLDER, 100).await.unwrap_err();
    assert!(matches!(
        err,
        diskmirror_yandex::YandexError::TooManyRequests { .. }
    ));
}
