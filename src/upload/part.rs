use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::sniff::{SNIFF_LEN, detect_content_type};
use crate::errors::UploadError;

/// One uploaded file inside a multipart body.
///
/// Bytes pulled in for sniffing are kept and written out first by
/// [`IncomingFilePart::copy_to`], so nothing read for detection is lost.
pub struct IncomingFilePart<'r> {
    field: multer::Field<'r>,
    original_name: String,
    head: BytesMut,
    exhausted: bool,
}

impl<'r> IncomingFilePart<'r> {
    /// Plain form values yield `None`.
    pub fn from_field(field: multer::Field<'r>) -> Option<Self> {
        let original_name = field.file_name().filter(|n| !n.is_empty())?.to_string();
        Some(Self {
            field,
            original_name,
            head: BytesMut::new(),
            exhausted: false,
        })
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn declared_type(&self) -> Option<&mime::Mime> {
        self.field.content_type()
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, UploadError> {
        if self.exhausted {
            return Ok(None);
        }
        let chunk = self.field.chunk().await.map_err(|e| {
            UploadError::MalformedRequest(format!(
                "Failed to read {}: {e}",
                self.original_name
            ))
        })?;
        if chunk.is_none() {
            self.exhausted = true;
        }
        Ok(chunk)
    }

    pub async fn sniff(&mut self) -> Result<&'static str, UploadError> {
        while self.head.len() < SNIFF_LEN {
            match self.next_chunk().await? {
                Some(chunk) => self.head.extend_from_slice(&chunk),
                None => break,
            }
        }
        Ok(detect_content_type(&self.head))
    }

    /// Streams every byte of the part, from offset zero, into `out`.
    ///
    /// Read failures surface as `MalformedRequest`, write failures as
    /// `StorageWriteFailed` tagged with `stored_name`.
    pub async fn copy_to<W>(mut self, out: &mut W, stored_name: &str) -> Result<u64, UploadError>
    where
        W: AsyncWrite + Unpin,
    {
        let write_failed = |source| UploadError::StorageWriteFailed {
            stored_name: stored_name.to_string(),
            source,
        };

        let head = std::mem::take(&mut self.head);
        out.write_all(&head).await.map_err(write_failed)?;
        let mut written = head.len() as u64;

        while let Some(chunk) = self.next_chunk().await? {
            out.write_all(&chunk).await.map_err(write_failed)?;
            written += chunk.len() as u64;
        }

        out.flush().await.map_err(write_failed)?;
        Ok(written)
    }
}
