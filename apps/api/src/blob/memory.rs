#![allow(dead_code)]

//! In-memory blob store for tests. Records every network-shaped call so suites
//! can assert, for example, that an oversized upload never reaches storage.

use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::{BlobError, BlobStore, ProgressFn};

#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub key: String,
    pub len: usize,
    pub content_type: String,
}

pub struct MemoryBlobs {
    base: String,
    puts: Mutex<Vec<RecordedPut>>,
    deletes: Mutex<Vec<String>>,
    fail_puts: Mutex<Option<BlobError>>,
}

impl MemoryBlobs {
    pub fn new() -> Self {
        MemoryBlobs {
            base: "mem://blobs".to_string(),
            puts: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            fail_puts: Mutex::new(None),
        }
    }

    /// Every subsequent `put` fails with `err`.
    pub fn fail_puts_with(&self, err: BlobError) {
        *self.fail_puts.lock().unwrap() = Some(err);
    }

    pub fn put_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.puts.lock().unwrap().clone()
    }

    pub fn deleted_urls(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

impl Default for MemoryBlobs {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobs {
    async fn put(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        progress: Option<ProgressFn>,
    ) -> Result<String, BlobError> {
        if let Some(err) = self.fail_puts.lock().unwrap().take() {
            return Err(err);
        }
        self.puts.lock().unwrap().push(RecordedPut {
            key: key.to_string(),
            len: bytes.len(),
            content_type: content_type.to_string(),
        });
        if let Some(f) = &progress {
            f(100);
        }
        Ok(format!("{}/{}", self.base, key))
    }

    async fn delete_by_url(&self, url: &str) -> Result<(), BlobError> {
        self.deletes.lock().unwrap().push(url.to_string());
        Ok(())
    }
}
