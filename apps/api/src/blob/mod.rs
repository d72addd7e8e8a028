//! Blob storage seam: path-addressed uploads yielding durable public URLs,
//! plus best-effort delete-by-URL (reverse URL→key mapping may fail, in which
//! case the delete is skipped with a warning, never an error).

pub mod memory;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Storage failures, collapsed into the four classes surfaced to users.
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("storage rejected the credentials")]
    Unauthenticated,

    #[error("storage denied access")]
    Unauthorized,

    #[error("storage transiently unavailable: {0}")]
    Transient(String),

    #[error("storage failed: {0}")]
    Unknown(String),
}

impl BlobError {
    pub fn user_message(&self) -> &'static str {
        match self {
            BlobError::Unauthenticated => "You are not signed in to storage. Sign in and retry.",
            BlobError::Unauthorized => "Your account is not allowed to modify storage.",
            BlobError::Transient(_) => "Storage is temporarily unavailable. Try again in a moment.",
            BlobError::Unknown(_) => "The upload failed for an unexpected reason.",
        }
    }
}

/// Byte-progress observer: called with 0–100, monotonically.
pub type ProgressFn = Box<dyn Fn(u8) + Send + Sync>;

#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload `bytes` under `key` and return the durable public URL.
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        progress: Option<ProgressFn>,
    ) -> Result<String, BlobError>;

    /// Delete the blob a previously-returned URL points at. URLs that do not
    /// map back to a key in this store are skipped; missing keys are success.
    async fn delete_by_url(&self, url: &str) -> Result<(), BlobError>;
}
