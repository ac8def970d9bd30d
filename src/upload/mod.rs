//! Multipart file intake.
//!
//! A batch runs in four stages per file: decode the part, sniff its real
//! content type against the policy, pick a stored name, and stream the bytes
//! into the destination directory. The first failing file aborts the batch;
//! files stored before it are left in place.

mod naming;
mod part;
mod sniff;
mod spool;

pub use naming::{STORED_NAME_LEN, random_string, safe_extension};
pub use part::IncomingFilePart;
pub use sniff::detect_content_type;

use axum::extract::Request;
use headers::{ContentLength, HeaderMapExt};
use http::header::CONTENT_TYPE;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tokio_util::io::ReaderStream;
use tracing::Instrument;
use uuid::Uuid;

use crate::errors::UploadError;
use crate::storage;

pub const DEFAULT_MAX_TOTAL_SIZE: u64 = 1024 * 1024 * 1024;

/// Limits applied to one request. Build one per call site or request.
#[derive(Debug, Clone)]
pub struct UploadPolicy {
    /// Upper bound on the whole request body, not on each file.
    pub max_total_size: u64,
    /// Sniffed types to accept, compared case-insensitively. Empty accepts everything.
    pub allowed_mime_types: BTreeSet<String>,
    pub rename_on_store: bool,
    /// Drop non-alphanumeric extensions and refuse path-like names.
    pub harden_extensions: bool,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_total_size: DEFAULT_MAX_TOTAL_SIZE,
            allowed_mime_types: BTreeSet::new(),
            rename_on_store: true,
            harden_extensions: false,
        }
    }
}

impl UploadPolicy {
    pub fn with_allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn allows(&self, content_type: &str) -> bool {
        self.allowed_mime_types.is_empty()
            || self
                .allowed_mime_types
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(content_type))
    }
}

/// A file that has been fully written to the destination directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFileRecord {
    /// As declared by the client; untrusted.
    pub original_name: String,
    pub stored_name: String,
    pub byte_count: u64,
}

/// A batch that stopped at its first failure.
///
/// `written` lists the files already stored before `error` occurred. They
/// remain on disk, but the batch as a whole has failed.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct BatchAborted {
    #[source]
    pub error: UploadError,
    pub written: Vec<StoredFileRecord>,
}

impl From<UploadError> for BatchAborted {
    fn from(error: UploadError) -> Self {
        Self {
            error,
            written: Vec::new(),
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct UploadProcessor;

impl UploadProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Stores every file part of `request` under `destination`.
    pub async fn process_batch(
        &self,
        request: Request,
        destination: &Path,
        policy: &UploadPolicy,
    ) -> Result<Vec<StoredFileRecord>, BatchAborted> {
        let span = tracing::info_span!(
            "upload_batch",
            batch_id = %Uuid::new_v4(),
            destination = %destination.display(),
        );
        self.run_batch(request, destination, policy)
            .instrument(span)
            .await
    }

    /// Like [`process_batch`](Self::process_batch) but for a single file.
    ///
    /// Any parts beyond the first are still stored; only the first record is
    /// returned.
    pub async fn process_single(
        &self,
        request: Request,
        destination: &Path,
        policy: &UploadPolicy,
    ) -> Result<StoredFileRecord, UploadError> {
        self.process_batch(request, destination, policy)
            .await
            .map_err(|aborted| {
                if !aborted.written.is_empty() {
                    let left_behind: Vec<&str> = aborted
                        .written
                        .iter()
                        .map(|r| r.stored_name.as_str())
                        .collect();
                    tracing::warn!(?left_behind, "Single upload aborted after storing files");
                }
                aborted.error
            })?
            .into_iter()
            .next()
            .ok_or(UploadError::NoFileProvided)
    }

    async fn run_batch(
        &self,
        request: Request,
        destination: &Path,
        policy: &UploadPolicy,
    ) -> Result<Vec<StoredFileRecord>, BatchAborted> {
        storage::ensure_directory(destination).await?;

        let (parts, body) = request.into_parts();
        let boundary = multipart_boundary(&parts.headers)?;

        if let Some(ContentLength(declared)) = parts.headers.typed_get::<ContentLength>()
            && declared > policy.max_total_size
        {
            tracing::warn!(declared, limit = policy.max_total_size, "Declared body over limit");
            return Err(UploadError::PayloadTooLarge {
                limit: policy.max_total_size,
            }
            .into());
        }

        let spool = spool::spool_body(body, policy.max_total_size).await?;
        let mut multipart = multer::Multipart::new(ReaderStream::new(spool), boundary);

        let mut written = Vec::new();
        loop {
            let field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    return Err(BatchAborted {
                        error: UploadError::MalformedRequest(format!(
                            "Failed to read multipart: {e}"
                        )),
                        written,
                    });
                }
            };

            // Plain form values are skipped; dropping the field drains it.
            let Some(part) = IncomingFilePart::from_field(field) else {
                continue;
            };

            match store_part(part, destination, policy).await {
                Ok(record) => written.push(record),
                Err(error) => return Err(BatchAborted { error, written }),
            }
        }

        tracing::info!(files = written.len(), "Upload batch stored");
        Ok(written)
    }
}

/// Sniff, check, name and persist one file. The part and the destination
/// handle are both dropped before this returns.
async fn store_part(
    mut part: IncomingFilePart<'_>,
    destination: &Path,
    policy: &UploadPolicy,
) -> Result<StoredFileRecord, UploadError> {
    let detected = part.sniff().await?;
    tracing::debug!(
        file = part.original_name(),
        detected,
        declared = ?part.declared_type().map(|m| m.essence_str()),
        "Sniffed upload"
    );

    if !policy.allows(detected) {
        tracing::warn!(file = part.original_name(), detected, "Rejected file type");
        return Err(UploadError::UnsupportedFileType {
            file_name: part.original_name().to_string(),
            detected: detected.to_string(),
        });
    }

    let original_name = part.original_name().to_string();
    let stored_name = naming::stored_name(&original_name, policy)?;

    let mut file = storage::create_destination(destination, &stored_name).await?;
    let copied = match part.copy_to(&mut file, &stored_name).await {
        Ok(byte_count) => file
            .sync_all()
            .await
            .map(|()| byte_count)
            .map_err(|source| UploadError::StorageWriteFailed {
                stored_name: stored_name.clone(),
                source,
            }),
        Err(e) => Err(e),
    };
    drop(file);

    let byte_count = match copied {
        Ok(byte_count) => byte_count,
        Err(e) => {
            storage::discard_destination(destination, &stored_name).await;
            return Err(e);
        }
    };

    tracing::info!(
        original = %original_name,
        stored = %stored_name,
        bytes = byte_count,
        "Stored upload"
    );

    Ok(StoredFileRecord {
        original_name,
        stored_name,
        byte_count,
    })
}

fn multipart_boundary(headers: &http::HeaderMap) -> Result<String, UploadError> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| UploadError::MalformedRequest("Missing content type".to_string()))?;

    let mime: mime::Mime = content_type.parse().map_err(|_| {
        UploadError::MalformedRequest(format!("Invalid content type: {content_type}"))
    })?;
    if mime.essence_str() != mime::MULTIPART_FORM_DATA.essence_str() {
        return Err(UploadError::MalformedRequest(format!(
            "Expected multipart/form-data, got {}",
            mime.essence_str()
        )));
    }

    multer::parse_boundary(content_type)
        .map_err(|e| UploadError::MalformedRequest(format!("Invalid multipart boundary: {e}")))
}
