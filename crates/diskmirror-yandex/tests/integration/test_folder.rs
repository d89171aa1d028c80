//! Integration tests for remote folder creation and deletes

use diskmirror_core::domain::newtypes::FileName;
use diskmirror_core::ports::remote_store::{FolderStatus, IRemoteStore, RemoteError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, ResponseTemplate};

use crate::common;

// ============================================================================
// ensure_folder
// ============================================================================

async fn ensure_with_status(status: u16) -> Result<FolderStatus, RemoteError> {
    let (server, store, _local) = common::setup_store().await;

    Mock::given(method("PUT"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", common::FOLDER))
        .and(header("Authorization", "OAuth test-token"))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(&server)
        .await;

    store.ensure_folder().await
}

#[tokio::test]
async fn test_ensure_folder_created() {
    assert_eq!(ensure_with_status(201).await, Ok(FolderStatus::Created));
}

#[tokio::test]
async fn test_ensure_folder_already_exists() {
    assert_eq!(ensure_with_status(409).await, Ok(FolderStatus::AlreadyExists));
}

#[tokio::test]
async fn test_ensure_folder_bad_token_is_unauthorized() {
    let err = ensure_with_status(401).await.unwrap_err();
    assert!(err.is_unauthorized(), "got {err:?}");
}

#[tokio::test]
async fn test_ensure_folder_server_error_is_transient() {
    let err = ensure_with_status(503).await.unwrap_err();
    assert!(err.is_transient(), "got {err:?}");
}

#[tokio::test]
async fn test_ensure_folder_unreachable_server_is_transient() {
    let (server, store, _local) = common::setup_store().await;
    drop(server);

    let err = store.ensure_folder().await.unwrap_err();
    assert!(err.is_transient(), "got {err:?}");
}

// ============================================================================
// delete
// ============================================================================

async fn delete_with_status(status: u16) -> Result<(), RemoteError> {
    let (server, store, _local) = common::setup_store().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/disk/resources"))
        .and(query_param("path", "/Mirror/old.txt"))
        .respond_with(ResponseTemplate::new(status))
        .expect(1)
        .mount(&server)
        .await;

    store.delete(&FileName::new("old.txt").unwrap()).await
}

#[tokio::test]
async fn test_delete_no_content() {
    assert_eq!(delete_with_status(204).await, Ok(()));
}

#[tokio::test]
async fn test_delete_accepted_async_operation() {
    assert_eq!(delete_with_status(202).await, Ok(()));
}

#[tokio::test]
async fn test_delete_already_gone_is_ok() {
    assert_eq!(delete_with_status(404).await, Ok(()));
}

#[tokio::test]
async fn test_delete_server_error_is_transient() {
    let err = delete_with_status(500).await.unwrap_err();
    assert!(err.is_transient(), "got {err:?}");
}

#[tokio::test]
async fn test_delete_moves_file_to_trash() {
    let (server, store, _local) = common::setup_store().await;

    Mock::given(method("DELETE"))
        .and(path("/v1/disk/resources"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    store.delete(&FileName::new("x.txt").unwrap()).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let params: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    assert_eq!(params, vec![("path".to_string(), "/Mirror/x.txt".to_string())]);
}
