pub mod handlers;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::store::{join_path, DocumentStore};

pub const MESSAGES_PATH: &str = "messages";

/// Submissions from one IP hash inside the window beyond this count are
/// flagged for review, not rejected.
pub const ABUSE_WINDOW_SECS: i64 = 600;
pub const ABUSE_THRESHOLD: i64 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    New,
    Read,
    Answered,
}

/// An admin reply appended to a message. The author tag is fixed; ordering is
/// by server-assigned timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
}

pub const REPLY_AUTHOR: &str = "admin";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub body: String,
    pub ip_hash: String,
    #[serde(default)]
    pub user_agent: String,
    /// Abuse flag, stamped at write time from the submitter's recent volume.
    #[serde(default)]
    pub flagged: bool,
    #[serde(default)]
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies: Vec<Reply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Salted sha256 of the submitter IP; the raw address is never stored.
pub fn ip_hash(salt: &str, ip: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(ip.as_bytes());
    hex::encode(hasher.finalize())
}

fn message_path(id: &str) -> String {
    join_path(MESSAGES_PATH, id)
}

pub async fn get_message(store: &dyn DocumentStore, id: &str) -> Result<Option<Message>> {
    store
        .get(&message_path(id))
        .await?
        .map(|doc| serde_json::from_value(doc).context("malformed message document"))
        .transpose()
}

pub async fn put_message(store: &dyn DocumentStore, message: &Message) -> Result<()> {
    store
        .set(&message_path(&message.id), serde_json::to_value(message)?)
        .await
}

pub async fn delete_message(store: &dyn DocumentStore, id: &str) -> Result<()> {
    store.delete(&message_path(id)).await
}

/// Inbox listing, newest first.
pub async fn list_messages(store: &dyn DocumentStore) -> Result<Vec<Message>> {
    let docs = store.list(MESSAGES_PATH).await?;
    let mut messages = Vec::with_capacity(docs.len());
    for (_, doc) in docs {
        messages.push(serde_json::from_value(doc).context("malformed message document")?);
    }
    messages.sort_by(|a: &Message, b: &Message| b.created_at.cmp(&a.created_at));
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    fn message(id: &str, minutes_ago: i64) -> Message {
        Message {
            id: id.to_string(),
            title: format!("hello {id}"),
            body: "body".to_string(),
            ip_hash: ip_hash("pepper", "203.0.113.7"),
            user_agent: "test-agent".to_string(),
            flagged: false,
            status: MessageStatus::default(),
            created_at: Utc::now() - chrono::Duration::minutes(minutes_ago),
            replies: Vec::new(),
            updated_at: None,
        }
    }

    #[test]
    fn test_ip_hash_is_salted_and_stable() {
        let a = ip_hash("pepper", "203.0.113.7");
        let b = ip_hash("pepper", "203.0.113.7");
        let c = ip_hash("other", "203.0.113.7");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_status_defaults_to_new() {
        let json = r#"{
            "title": "hi", "body": "there",
            "ip_hash": "x", "created_at": "2026-02-01T00:00:00Z"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.status, MessageStatus::New);
        assert!(msg.replies.is_empty());
        assert!(!msg.flagged);
    }

    #[tokio::test]
    async fn test_list_orders_newest_first() {
        let store = MemoryStore::new();
        put_message(&store, &message("old", 30)).await.unwrap();
        put_message(&store, &message("new", 1)).await.unwrap();
        put_message(&store, &message("mid", 10)).await.unwrap();

        let listed = list_messages(&store).await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "mid", "old"]);
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found_and_idempotent() {
        let store = MemoryStore::new();
        put_message(&store, &message("m1", 0)).await.unwrap();
        delete_message(&store, "m1").await.unwrap();
        assert!(get_message(&store, "m1").await.unwrap().is_none());
        delete_message(&store, "m1").await.unwrap();
    }
}
