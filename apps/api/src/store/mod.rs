//! Path-addressed document store: the persistence seam for all site content.
//!
//! Documents live at slash-separated paths (`sections/{id}/projects/{key}`,
//! `site/resume`, `messages/{id}`). Writes stamp `updated_at` with a
//! server-generated timestamp; callers never supply clock values. Change
//! notifications are delivered through a cancellable [`Subscription`] rather
//! than a bare callback: dropping the subscription unsubscribes.
//!
//! `AppState` holds an `Arc<dyn DocumentStore>`; production uses [`pg::PgStore`],
//! tests use [`memory::MemoryStore`].

pub mod memory;
pub mod pg;

use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Put,
    Delete,
}

/// A single remote mutation, as delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct StoreEvent {
    pub path: String,
    pub kind: ChangeKind,
    /// The document as stored (server-stamped), absent for deletes.
    pub data: Option<Value>,
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, path: &str) -> Result<Option<Value>>;

    /// Create-or-replace the document at `path`. The stored copy carries a
    /// server-stamped `updated_at` field regardless of what the caller sent.
    async fn set(&self, path: &str, value: Value) -> Result<()>;

    /// Delete the document at `path` and its entire subtree.
    /// Deleting a missing path is success (idempotent deletes).
    async fn delete(&self, path: &str) -> Result<()>;

    /// Direct children of `path`, keyed by child segment.
    async fn list(&self, path: &str) -> Result<BTreeMap<String, Value>>;

    /// Mint a fresh child key for a create. Keys are store-assigned, never
    /// derived from document content.
    fn push_key(&self) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Subscribe to every mutation at or below `prefix`.
    fn subscribe(&self, prefix: &str) -> Subscription;
}

/// A cancellable change stream scoped to a path prefix.
/// Delivery is eventually-consistent push: events are emitted after local
/// commit, with no transactional coupling to the write.
pub struct Subscription {
    prefix: String,
    rx: broadcast::Receiver<StoreEvent>,
}

impl Subscription {
    pub(crate) fn new(prefix: &str, rx: broadcast::Receiver<StoreEvent>) -> Self {
        Subscription {
            prefix: prefix.to_string(),
            rx,
        }
    }

    /// Next event under this subscription's prefix, or `None` once the store
    /// is gone. Lagged events are skipped, not treated as errors.
    pub async fn recv(&mut self) -> Option<StoreEvent> {
        loop {
            match self.rx.recv().await {
                Ok(ev) if path_matches(&self.prefix, &ev.path) => return Some(ev),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn into_stream(self) -> impl futures::Stream<Item = StoreEvent> {
        futures::stream::unfold(self, |mut sub| async move {
            sub.recv().await.map(|ev| (ev, sub))
        })
    }
}

fn path_matches(prefix: &str, path: &str) -> bool {
    path == prefix || path.starts_with(&format!("{prefix}/"))
}

pub fn join_path(parent: &str, child: &str) -> String {
    format!("{parent}/{child}")
}
