use crate::errors::UploadError;
use std::io;
use std::path::Path;
use tokio::fs::{self, DirBuilder, File};

#[cfg(unix)]
const DIR_MODE: u32 = 0o755;

/// Creates `path` and any missing ancestors.
///
/// Succeeds silently when `path` is already a directory. A non-directory at
/// `path` is an error.
pub async fn ensure_directory(path: &Path) -> Result<(), UploadError> {
    let unavailable = |source: io::Error| UploadError::StorageUnavailable {
        path: path.to_path_buf(),
        source,
    };

    match fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => return Ok(()),
        Ok(_) => {
            return Err(unavailable(io::Error::new(
                io::ErrorKind::AlreadyExists,
                "path exists and is not a directory",
            )));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(unavailable(e)),
    }

    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(DIR_MODE);

    builder.create(path).await.map_err(unavailable)?;
    tracing::info!(path = %path.display(), "Created upload directory");
    Ok(())
}

/// Creates (or truncates) `directory/stored_name` for writing.
pub async fn create_destination(directory: &Path, stored_name: &str) -> Result<File, UploadError> {
    File::create(directory.join(stored_name))
        .await
        .map_err(|source| UploadError::StorageWriteFailed {
            stored_name: stored_name.to_string(),
            source,
        })
}

/// Removes a partially written destination file. Failures are logged only.
pub async fn discard_destination(directory: &Path, stored_name: &str) {
    match fs::remove_file(directory.join(stored_name)).await {
        Ok(()) => tracing::debug!(stored = stored_name, "Removed partial upload"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(stored = stored_name, error = %e, "Failed to remove partial upload")
        }
    }
}
