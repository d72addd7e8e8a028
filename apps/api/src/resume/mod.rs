pub mod handlers;

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::blob::BlobStore;
use crate::store::{DocumentStore, Subscription};

pub const RESUME_PATH: &str = "site/resume";

/// The single resume record. `file_name` preserves the user-facing download
/// name; `updated_at` is store-stamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

pub async fn get_resume(store: &dyn DocumentStore) -> Result<Option<Resume>> {
    store
        .get(RESUME_PATH)
        .await?
        .map(|doc| serde_json::from_value(doc).context("malformed resume document"))
        .transpose()
}

pub async fn put_resume(store: &dyn DocumentStore, resume: &Resume) -> Result<()> {
    store.set(RESUME_PATH, serde_json::to_value(resume)?).await
}

/// Best-effort blob cleanup first, then the document; the record disappearing
/// from clients happens via the subscription, not manual state surgery.
pub async fn delete_resume(store: &dyn DocumentStore, blobs: &dyn BlobStore) -> Result<()> {
    if let Some(resume) = get_resume(store).await? {
        if let Err(e) = blobs.delete_by_url(&resume.url).await {
            warn!(error = %e, "resume blob delete failed; continuing with document delete");
        }
    }
    store.delete(RESUME_PATH).await
}

pub fn watch(store: &Arc<dyn DocumentStore>) -> Subscription {
    store.subscribe(RESUME_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::memory::MemoryBlobs;
    use crate::store::memory::MemoryStore;

    fn record() -> Resume {
        Resume {
            title: "Resume".to_string(),
            url: "mem://blobs/resume/cv.pdf".to_string(),
            file_name: Some("jane-doe-cv.pdf".to_string()),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_put_then_get_round_trips_with_server_stamp() {
        let store = MemoryStore::new();
        put_resume(&store, &record()).await.unwrap();

        let fetched = get_resume(&store).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Resume");
        assert_eq!(fetched.file_name.as_deref(), Some("jane-doe-cv.pdf"));
        assert!(fetched.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_delete_cleans_blob_then_document() {
        let store = MemoryStore::new();
        let blobs = MemoryBlobs::new();
        put_resume(&store, &record()).await.unwrap();

        delete_resume(&store, &blobs).await.unwrap();
        assert!(get_resume(&store).await.unwrap().is_none());
        assert_eq!(blobs.deleted_urls(), vec!["mem://blobs/resume/cv.pdf"]);

        // No record: still success, no blob call.
        delete_resume(&store, &blobs).await.unwrap();
        assert_eq!(blobs.deleted_urls().len(), 1);
    }
}
