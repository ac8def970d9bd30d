use axum::response::{IntoResponse, Response};
use http::StatusCode;
use std::{io, path::PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Upload directory {} is unavailable: {source}", .path.display())]
    StorageUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("The uploaded payload exceeds the limit of {limit} bytes")]
    PayloadTooLarge { limit: u64 },
    #[error("The uploaded file type is not permitted: {file_name} ({detected})")]
    UnsupportedFileType { file_name: String, detected: String },
    #[error("Failed to store {stored_name}: {source}")]
    StorageWriteFailed {
        stored_name: String,
        #[source]
        source: io::Error,
    },
    #[error("No file was provided")]
    NoFileProvided,
    #[error("Bad request: {0}")]
    MalformedRequest(String),
}

impl UploadError {
    pub fn status(&self) -> StatusCode {
        match self {
            UploadError::StorageUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            UploadError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            UploadError::UnsupportedFileType { .. } => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            UploadError::StorageWriteFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            UploadError::NoFileProvided | UploadError::MalformedRequest(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }
}

impl IntoResponse for UploadError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Filesystem details stay in the logs.
        let body = match self {
            UploadError::StorageUnavailable { .. } => "Upload storage is unavailable".to_string(),
            UploadError::StorageWriteFailed { .. } => "Internal server error".to_string(),
            _ => self.to_string(),
        };

        (status, body).into_response()
    }
}
