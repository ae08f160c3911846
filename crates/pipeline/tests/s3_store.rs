//! Smoke test for the S3 object store.
//!
//! Requires a reachable bucket (`S3_BUCKET` plus the standard AWS
//! environment, e.g. a MinIO `AWS_ENDPOINT_URL`); run with
//! `cargo test -p cuedeck-pipeline --test s3_store -- --ignored`.

use std::time::Duration;

use assert_matches::assert_matches;
use cuedeck_core::formats::CANONICAL_MIME_TYPE;
use cuedeck_pipeline::storage::{ObjectStore, S3Store, StorageError};
use uuid::Uuid;

async fn store() -> S3Store {
    let bucket = std::env::var("S3_BUCKET").expect("S3_BUCKET must be set");
    S3Store::from_env(bucket).await
}

#[tokio::test]
#[ignore = "requires S3_BUCKET"]
async fn put_then_get_returns_same_bytes() {
    let store = store().await;
    let key = Uuid::now_v7().to_string();
    let body = b"%PDF-1.4 smoke".to_vec();

    store
        .put_object(&key, body.clone(), CANONICAL_MIME_TYPE)
        .await
        .unwrap();

    assert_eq!(store.get_object(&key).await.unwrap(), body);
}

#[tokio::test]
#[ignore = "requires S3_BUCKET"]
async fn missing_key_is_not_found() {
    let store = store().await;
    let result = store.get_object(&Uuid::now_v7().to_string()).await;

    assert_matches!(result, Err(StorageError::NotFound(_)));
}

#[tokio::test]
#[ignore = "requires S3_BUCKET"]
async fn presigned_url_names_bucket_and_key() {
    let store = store().await;
    let key = Uuid::now_v7().to_string();

    let url = store
        .presign_put(&key, Duration::from_secs(60))
        .await
        .unwrap();

    assert!(url.contains(&key));
    assert!(url.starts_with("http"));
}
