//! Integration tests for uploads through the remote store

use diskmirror_core::domain::newtypes::FileName;
use diskmirror_core::ports::remote_store::{IRemoteStore, RemoteError, UploadMode, UploadOutcome};
use wiremock::matchers::{body_bytes, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

fn name(n: &str) -> FileName {
    FileName::new(n).unwrap()
}

#[tokio::test]
async fn test_upload_create_sends_file_bytes() {
    let (server, store, local) = common::setup_store().await;
    std::fs::write(local.path().join("a.txt"), b"hello mirror").unwrap();

    common::mount_upload_link(&server, "/Mirror/a.txt", false, "a.txt").await;
    Mock::given(method("PUT"))
        .and(path("/upload-target/a.txt"))
        .and(body_bytes(b"hello mirror".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = store.upload(&name("a.txt"), UploadMode::Create).await;
    assert_eq!(outcome, Ok(UploadOutcome::Stored));
}

#[tokio::test]
async fn test_upload_overwrite_accepted() {
    let (server, store, local) = common::setup_store().await;
    std::fs::write(local.path().join("a.txt"), b"v2").unwrap();

    common::mount_upload_link(&server, "/Mirror/a.txt", true, "a.txt").await;
    common::mount_upload_target(&server, "a.txt", 202).await;

    let outcome = store.upload(&name("a.txt"), UploadMode::Overwrite).await;
    assert_eq!(outcome, Ok(UploadOutcome::Accepted));
}

#[tokio::test]
async fn test_upload_empty_file() {
    let (server, store, local) = common::setup_store().await;
    std::fs::write(local.path().join("empty"), b"").unwrap();

    common::mount_upload_link(&server, "/Mirror/empty", false, "empty").await;
    common::mount_upload_target(&server, "empty", 201).await;

    assert_eq!(
        store.upload(&name("empty"), UploadMode::Create).await,
        Ok(UploadOutcome::Stored)
    );
}

async fn upload_with_target_status(status: u16) -> Result<UploadOutcome, RemoteError> {
    let (server, store, local) = common::setup_store().await;
    std::fs::write(local.path().join("big.bin"), vec![0u8; 64]).unwrap();

    common::mount_upload_link(&server, "/Mirror/big.bin", false, "big.bin").await;
    common::mount_upload_target(&server, "big.bin", status).await;

    store.upload(&name("big.bin"), UploadMode::Create).await
}

#[tokio::test]
async fn test_upload_too_large_is_size_error() {
    assert!(matches!(
        upload_with_target_status(413).await,
        Err(RemoteError::Size(_))
    ));
}

#[tokio::test]
async fn test_upload_insufficient_storage_is_size_error() {
    assert!(matches!(
        upload_with_target_status(507).await,
        Err(RemoteError::Size(_))
    ));
}

#[tokio::test]
async fn test_upload_server_error() {
    assert!(matches!(
        upload_with_target_status(500).await,
        Err(RemoteError::Server(_))
    ));
}

#[tokio::test]
async fn test_upload_create_on_existing_file_is_server_error() {
    let (server, store, local) = common::setup_store().await;
    std::fs::write(local.path().join("a.txt"), b"x").unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources/upload"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_json(serde_json::json!({ "error": "DiskResourceAlreadyExistsError" })),
        )
        .mount(&server)
        .await;

    let err = store
        .upload(&name("a.txt"), UploadMode::Create)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::Server(_)), "got {err:?}");
}

#[tokio::test]
async fn test_upload_missing_local_file_is_not_found_without_requests() {
    let (server, store, _local) = common::setup_store().await;

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources/upload"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = store
        .upload(&name("vanished.txt"), UploadMode::Create)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::NotFound(_)), "got {err:?}");
}

#[tokio::test]
async fn test_upload_link_for_missing_folder_is_not_found() {
    let (server, store, local) = common::setup_store().await;
    std::fs::write(local.path().join("a.txt"), b"x").unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/disk/resources/upload"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = store
        .upload(&name("a.txt"), UploadMode::Create)
        .await
        .unwrap_err();
    assert!(matches!(err, RemoteError::NotFound(_)), "got {err:?}");
}
