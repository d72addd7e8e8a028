//! Upload pipeline: validate locally, then push to blob storage with a
//! byte-progress callback. Validation failures never issue a network call.

use bytes::Bytes;
use tracing::debug;

use crate::blob::{BlobStore, ProgressFn};
use crate::errors::AppError;

const MB: usize = 1024 * 1024;

/// What is being uploaded; drives the MIME allow-list and the size ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Resume PDFs. Hard ceiling 10 MB.
    Document,
    /// Project images. Hard ceiling 5 MB.
    Image,
}

impl UploadKind {
    pub fn allowed_types(&self) -> &'static [&'static str] {
        match self {
            UploadKind::Document => &["application/pdf"],
            UploadKind::Image => &["image/png", "image/jpeg", "image/webp", "image/gif"],
        }
    }

    pub fn max_bytes(&self) -> usize {
        match self {
            UploadKind::Document => 10 * MB,
            UploadKind::Image => 5 * MB,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            UploadKind::Document => "document",
            UploadKind::Image => "image",
        }
    }
}

/// Rejects wrong-type and oversized files before anything touches the network.
pub fn validate(kind: UploadKind, content_type: &str, len: usize) -> Result<(), AppError> {
    if !kind.allowed_types().contains(&content_type) {
        return Err(AppError::Validation(format!(
            "'{content_type}' is not an accepted {} type (accepted: {})",
            kind.label(),
            kind.allowed_types().join(", ")
        )));
    }
    if len > kind.max_bytes() {
        return Err(AppError::Validation(format!(
            "{} exceeds the {} MB {} limit",
            human_size(len),
            kind.max_bytes() / MB,
            kind.label()
        )));
    }
    Ok(())
}

/// Validates, uploads, and returns the durable URL for the stored blob.
pub async fn upload(
    blobs: &dyn BlobStore,
    kind: UploadKind,
    key: &str,
    content_type: &str,
    bytes: Bytes,
    progress: Option<ProgressFn>,
) -> Result<String, AppError> {
    validate(kind, content_type, bytes.len())?;
    debug!(key, len = bytes.len(), "upload validated, pushing to storage");
    let url = blobs.put(key, bytes, content_type, progress).await?;
    Ok(url)
}

fn human_size(len: usize) -> String {
    if len >= MB {
        format!("{:.1} MB", len as f64 / MB as f64)
    } else {
        format!("{} KB", len / 1024)
    }
}
