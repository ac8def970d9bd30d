use axum::{
    Json, Router,
    extract::{Extension, Request},
    routing::{get, post},
};
use std::{path::PathBuf, sync::Arc};

use crate::errors::UploadError;
use crate::upload::{BatchAborted, StoredFileRecord, UploadPolicy, UploadProcessor};

/// Where uploads go and under which rules.
#[derive(Debug, Clone)]
pub struct UploadTarget {
    pub processor: UploadProcessor,
    pub directory: PathBuf,
    pub policy: UploadPolicy,
}

pub fn router(target: UploadTarget) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/upload", post(upload))
        .route("/upload-one", post(upload_one))
        .layer(Extension(Arc::new(target)))
}

async fn health() -> &'static str {
    "OK\nAPI Version: 1.0"
}

async fn upload(
    Extension(target): Extension<Arc<UploadTarget>>,
    request: Request,
) -> Result<Json<Vec<StoredFileRecord>>, UploadError> {
    let files = target
        .processor
        .process_batch(request, &target.directory, &target.policy)
        .await
        .map_err(log_aborted)?;

    Ok(Json(files))
}

async fn upload_one(
    Extension(target): Extension<Arc<UploadTarget>>,
    request: Request,
) -> Result<Json<StoredFileRecord>, UploadError> {
    let file = target
        .processor
        .process_single(request, &target.directory, &target.policy)
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Single upload failed"))?;

    Ok(Json(file))
}

fn log_aborted(aborted: BatchAborted) -> UploadError {
    let left_behind: Vec<&str> = aborted
        .written
        .iter()
        .map(|r| r.stored_name.as_str())
        .collect();
    tracing::warn!(
        error = %aborted.error,
        ?left_behind,
        "Upload batch aborted"
    );
    aborted.error
}
