pub mod config;
pub mod errors;
pub mod routes;
pub mod storage;
pub mod upload;

pub use errors::UploadError;
pub use upload::{BatchAborted, StoredFileRecord, UploadPolicy, UploadProcessor};
