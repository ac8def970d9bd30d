mod common;

use axum::body::{Body, to_bytes};
use axum::extract::Request;
use common::{file, jpeg, multipart_body, multipart_request};
use http::StatusCode;
use intake_server::routes::{UploadTarget, router};
use intake_server::{UploadPolicy, UploadProcessor};
use serde_json::Value;
use tower::ServiceExt;

fn app(dir: &std::path::Path, policy: UploadPolicy) -> axum::Router {
    router(UploadTarget {
        processor: UploadProcessor::new(),
        directory: dir.to_path_buf(),
        policy,
    })
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_check() {
    let dir = tempfile::tempdir().unwrap();
    let response = app(dir.path(), UploadPolicy::default())
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn upload_returns_records_as_json() {
    let dir = tempfile::tempdir().unwrap();
    let a = jpeg(100);
    let b = jpeg(300);
    let body = multipart_body(&[file("a.jpg", &a), file("b.jpeg", &b)]);

    let response = app(dir.path(), UploadPolicy::default())
        .oneshot(multipart_request("/upload", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let records = json.as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["original_name"], "a.jpg");
    assert_eq!(records[0]["byte_count"], 100);
    assert_eq!(records[1]["byte_count"], 300);
    assert!(records[1]["stored_name"].as_str().unwrap().ends_with(".jpeg"));
}

#[tokio::test]
async fn upload_one_returns_a_single_record() {
    let dir = tempfile::tempdir().unwrap();
    let data = jpeg(42);
    let body = multipart_body(&[file("one.jpg", &data)]);

    let response = app(dir.path(), UploadPolicy::default())
        .oneshot(multipart_request("/upload-one", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["original_name"], "one.jpg");
    assert_eq!(json["byte_count"], 42);
}

#[tokio::test]
async fn disallowed_type_is_415() {
    let dir = tempfile::tempdir().unwrap();
    let body = multipart_body(&[file("notes.jpg", b"plain text")]);
    let policy = UploadPolicy::default().with_allowed_mime_types(["image/jpeg"]);

    let response = app(dir.path(), policy)
        .oneshot(multipart_request("/upload", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn oversized_body_is_413() {
    let dir = tempfile::tempdir().unwrap();
    let data = jpeg(2048);
    let body = multipart_body(&[file("big.jpg", &data)]);
    let policy = UploadPolicy {
        max_total_size: 1024,
        ..UploadPolicy::default()
    };

    let response = app(dir.path(), policy)
        .oneshot(multipart_request("/upload", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn upload_one_without_file_is_400() {
    let dir = tempfile::tempdir().unwrap();
    let body = multipart_body(&[]);

    let response = app(dir.path(), UploadPolicy::default())
        .oneshot(multipart_request("/upload-one", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
