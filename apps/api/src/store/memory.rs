#![allow(dead_code)]

//! In-memory document store used by the test suites. Same contract as
//! [`super::pg::PgStore`], with the process clock standing in for the
//! database's `now()`, plus write-failure injection for the non-atomic
//! bulk-operation tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::broadcast;

use super::{ChangeKind, DocumentStore, StoreEvent, Subscription};

/// Fail the nth write (0-based) whose path starts with `prefix`.
struct FailRule {
    prefix: String,
    fail_at: usize,
    seen: usize,
}

pub struct MemoryStore {
    docs: Mutex<BTreeMap<String, Value>>,
    fail_rule: Mutex<Option<FailRule>>,
    tx: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        MemoryStore {
            docs: Mutex::new(BTreeMap::new()),
            fail_rule: Mutex::new(None),
            tx,
        }
    }

    /// Arrange for the nth write (0-based) under `prefix` to fail.
    pub fn fail_write_at(&self, prefix: &str, fail_at: usize) {
        *self.fail_rule.lock().unwrap() = Some(FailRule {
            prefix: prefix.to_string(),
            fail_at,
            seen: 0,
        });
    }

    fn check_fail(&self, path: &str) -> Result<()> {
        let mut guard = self.fail_rule.lock().unwrap();
        if let Some(rule) = guard.as_mut() {
            if path.starts_with(&rule.prefix) {
                let n = rule.seen;
                rule.seen += 1;
                if n == rule.fail_at {
                    bail!("injected write failure at {path}");
                }
            }
        }
        Ok(())
    }

    fn emit(&self, ev: StoreEvent) {
        let _ = self.tx.send(ev);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        Ok(self.docs.lock().unwrap().get(path).cloned())
    }

    async fn set(&self, path: &str, mut value: Value) -> Result<()> {
        self.check_fail(path)?;
        if let Value::Object(map) = &mut value {
            map.insert(
                "updated_at".to_string(),
                Value::String(Utc::now().to_rfc3339()),
            );
        }
        self.docs
            .lock()
            .unwrap()
            .insert(path.to_string(), value.clone());
        self.emit(StoreEvent {
            path: path.to_string(),
            kind: ChangeKind::Put,
            data: Some(value),
        });
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let removed = {
            let mut docs = self.docs.lock().unwrap();
            let subtree = format!("{path}/");
            let keys: Vec<String> = docs
                .keys()
                .filter(|k| k.as_str() == path || k.starts_with(&subtree))
                .cloned()
                .collect();
            for k in &keys {
                docs.remove(k);
            }
            !keys.is_empty()
        };
        if removed {
            self.emit(StoreEvent {
                path: path.to_string(),
                kind: ChangeKind::Delete,
                data: None,
            });
        }
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<BTreeMap<String, Value>> {
        let docs = self.docs.lock().unwrap();
        let prefix = format!("{path}/");
        Ok(docs
            .iter()
            .filter(|(k, _)| {
                k.starts_with(&prefix) && !k[prefix.len()..].contains('/')
            })
            .map(|(k, v)| (k[prefix.len()..].to_string(), v.clone()))
            .collect())
    }

    fn subscribe(&self, prefix: &str) -> Subscription {
        Subscription::new(prefix, self.tx.subscribe())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_stamps_server_updated_at() {
        let store = MemoryStore::new();
        store
            .set("site/settings", json!({"resume_url": null}))
            .await
            .unwrap();
        let doc = store.get("site/settings").await.unwrap().unwrap();
        assert!(doc.get("updated_at").and_then(|v| v.as_str()).is_some());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent_and_removes_subtree() {
        let store = MemoryStore::new();
        store.set("messages/m1", json!({"title": "hi"})).await.unwrap();
        store
            .set("messages/m1/replies/r1", json!({"content": "yo"}))
            .await
            .unwrap();

        store.delete("messages/m1").await.unwrap();
        assert!(store.get("messages/m1").await.unwrap().is_none());
        assert!(store.get("messages/m1/replies/r1").await.unwrap().is_none());

        // Second delete of the same path is still success.
        store.delete("messages/m1").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_returns_direct_children_only() {
        let store = MemoryStore::new();
        store
            .set("sections/portfolio", json!({"title": "Portfolio"}))
            .await
            .unwrap();
        store
            .set("sections/portfolio/projects/p1", json!({"title": "One"}))
            .await
            .unwrap();

        let children = store.list("sections").await.unwrap();
        assert_eq!(children.len(), 1);
        assert!(children.contains_key("portfolio"));
    }

    #[tokio::test]
    async fn test_subscription_sees_puts_and_deletes_under_prefix() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("sections");

        store
            .set("sections/portfolio/projects/p1", json!({"title": "One"}))
            .await
            .unwrap();
        store.set("site/resume", json!({"title": "CV"})).await.unwrap();
        store.delete("sections/portfolio/projects/p1").await.unwrap();

        let first = sub.recv().await.unwrap();
        assert_eq!(first.kind, ChangeKind::Put);
        assert_eq!(first.path, "sections/portfolio/projects/p1");

        // The site/resume write is filtered out by the prefix.
        let second = sub.recv().await.unwrap();
        assert_eq!(second.kind, ChangeKind::Delete);
    }

    #[tokio::test]
    async fn test_fail_injection_hits_the_nth_write() {
        let store = MemoryStore::new();
        store.fail_write_at("sections/beta", 1);

        store
            .set("sections/beta/projects/a", json!({"title": "A"}))
            .await
            .unwrap();
        let err = store
            .set("sections/beta/projects/b", json!({"title": "B"}))
            .await;
        assert!(err.is_err());
        store
            .set("sections/beta/projects/c", json!({"title": "C"}))
            .await
            .unwrap();
    }
}
