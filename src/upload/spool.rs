use axum::body::Body;
use futures_util::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncSeekExt, AsyncWriteExt};

use crate::errors::UploadError;

/// Copies the whole request body into an anonymous temporary file, refusing
/// anything larger than `limit` bytes.
///
/// The returned file is positioned at the start and disappears once dropped.
pub async fn spool_body(body: Body, limit: u64) -> Result<File, UploadError> {
    let spool_failed = |source| UploadError::StorageUnavailable {
        path: std::env::temp_dir(),
        source,
    };

    let spool = tempfile::tempfile().map_err(spool_failed)?;
    let mut spool = File::from_std(spool);

    let mut stream = body.into_data_stream();
    let mut total: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            UploadError::MalformedRequest(format!("Failed to read request body: {e}"))
        })?;

        total += chunk.len() as u64;
        if total > limit {
            tracing::warn!(limit, received = total, "Request body over limit");
            return Err(UploadError::PayloadTooLarge { limit });
        }

        spool.write_all(&chunk).await.map_err(spool_failed)?;
    }

    spool.flush().await.map_err(spool_failed)?;
    spool.rewind().await.map_err(spool_failed)?;

    tracing::debug!(bytes = total, "Spooled request body");
    Ok(spool)
}
