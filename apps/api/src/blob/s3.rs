use async_trait::async_trait;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use aws_sdk_s3::Client as S3Client;
use bytes::Bytes;
use tracing::{info, warn};

use super::{BlobError, BlobStore, ProgressFn};

/// S3 minimum part size; payloads at or under this go through a single
/// put_object, larger ones through a multipart upload with per-part progress.
const PART_SIZE: usize = 5 * 1024 * 1024;

/// S3/MinIO-backed blob store. URLs are path-style:
/// `{public_base}/{bucket}/{key}`.
pub struct S3Blobs {
    client: S3Client,
    bucket: String,
    public_base: String,
}

impl S3Blobs {
    pub fn new(client: S3Client, bucket: &str, public_base: &str) -> Self {
        S3Blobs {
            client,
            bucket: bucket.to_string(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base, self.bucket, key)
    }

    /// Reverse mapping from a durable URL back to an object key.
    /// Returns `None` for URLs this store did not issue.
    fn key_from_url(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/{}/", self.public_base, self.bucket);
        url.strip_prefix(&prefix)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
    }

    async fn put_multipart(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        progress: &Option<ProgressFn>,
    ) -> Result<(), BlobError> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(classify_s3_error)?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| BlobError::Unknown("multipart upload id missing".to_string()))?
            .to_string();

        let total_parts = bytes.len().div_ceil(PART_SIZE);
        let mut completed = Vec::with_capacity(total_parts);

        for (idx, chunk) in bytes.chunks(PART_SIZE).enumerate() {
            let part_number = (idx + 1) as i32;
            let result = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(key)
                .upload_id(&upload_id)
                .part_number(part_number)
                .body(ByteStream::from(chunk.to_vec()))
                .send()
                .await;

            let part = match result {
                Ok(part) => part,
                Err(e) => {
                    // Abandon the upload; leftover parts are garbage-collected
                    // by the bucket's lifecycle rules.
                    let _ = self
                        .client
                        .abort_multipart_upload()
                        .bucket(&self.bucket)
                        .key(key)
                        .upload_id(&upload_id)
                        .send()
                        .await;
                    return Err(classify_s3_error(e));
                }
            };

            completed.push(
                CompletedPart::builder()
                    .set_e_tag(part.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
            if let Some(f) = progress {
                f(part_percent(idx + 1, total_parts));
            }
        }

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(&upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(classify_s3_error)?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for S3Blobs {
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        progress: Option<ProgressFn>,
    ) -> Result<String, BlobError> {
        if bytes.len() <= PART_SIZE {
            self.client
                .put_object()
                .bucket(&self.bucket)
                .key(key)
                .content_type(content_type)
                .body(ByteStream::from(bytes))
                .send()
                .await
                .map_err(classify_s3_error)?;
            if let Some(f) = &progress {
                f(100);
            }
        } else {
            self.put_multipart(key, bytes, content_type, &progress)
                .await?;
        }

        let url = self.url_for(key);
        info!(key, "blob uploaded");
        Ok(url)
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), BlobError> {
        let Some(key) = self.key_from_url(url) else {
            warn!(url, "blob URL does not map to this store; skipping delete");
            return Ok(());
        };

        // S3 deletes are idempotent: deleting a missing key succeeds.
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
            .map_err(classify_s3_error)?;
        info!(key, "blob deleted");
        Ok(())
    }
}

/// Monotonic percent for `done` of `total` parts; the final part lands on 100.
fn part_percent(done: usize, total: usize) -> u8 {
    ((done * 100) / total.max(1)) as u8
}

/// Collapses provider error codes into the four user-facing storage classes.
fn classify_s3_error<E: ProvideErrorMetadata>(err: SdkError<E>) -> BlobError {
    match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) => {
            BlobError::Transient("request did not reach storage".to_string())
        }
        _ => {
            let code = err.code();
            let detail = err.message().unwrap_or("no detail").to_string();
            match code {
                Some("AccessDenied") | Some("AllAccessDisabled") => BlobError::Unauthorized,
                Some("InvalidAccessKeyId")
                | Some("SignatureDoesNotMatch")
                | Some("ExpiredToken")
                | Some("TokenRefreshRequired") => BlobError::Unauthenticated,
                Some("SlowDown")
                | Some("InternalError")
                | Some("ServiceUnavailable")
                | Some("RequestTimeout") => BlobError::Transient(detail),
                other => {
                    BlobError::Unknown(format!("{}: {detail}", other.unwrap_or("unclassified")))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_percent_is_monotonic_and_ends_at_100() {
        for total in 1..=12usize {
            let mut last = 0u8;
            for done in 1..=total {
                let pct = part_percent(done, total);
                assert!(pct >= last, "progress regressed at {done}/{total}");
                last = pct;
            }
            assert_eq!(last, 100);
        }
    }

    #[test]
    fn test_key_from_url_round_trip() {
        let cfg = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .build();
        let blobs = S3Blobs::new(S3Client::from_conf(cfg), "atelier", "http://localhost:9000");

        let url = blobs.url_for("resume/abc.pdf");
        assert_eq!(url, "http://localhost:9000/atelier/resume/abc.pdf");
        assert_eq!(blobs.key_from_url(&url).as_deref(), Some("resume/abc.pdf"));
        assert_eq!(blobs.key_from_url("https://elsewhere.example/x.png"), None);
    }
}
