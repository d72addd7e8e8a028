use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use tokio::sync::broadcast;
use tracing::debug;

use super::{ChangeKind, DocumentStore, StoreEvent, Subscription};

/// Postgres-backed document store. One JSONB row per path; `updated_at` is
/// stamped into the stored document by SQL `now()`, so ordering never depends
/// on a caller's clock.
pub struct PgStore {
    pool: PgPool,
    tx: broadcast::Sender<StoreEvent>,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        let (tx, _) = broadcast::channel(256);
        PgStore { pool, tx }
    }

    fn emit(&self, ev: StoreEvent) {
        // No receivers is fine: nobody is watching.
        let _ = self.tx.send(ev);
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn get(&self, path: &str) -> Result<Option<Value>> {
        let row: Option<(Value,)> = sqlx::query_as("SELECT data FROM documents WHERE path = $1")
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(data,)| data))
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        let (stored,): (Value,) = sqlx::query_as(
            r#"
            INSERT INTO documents (path, data, updated_at)
            VALUES ($1, jsonb_set($2, '{updated_at}', to_jsonb(now())), now())
            ON CONFLICT (path)
            DO UPDATE SET data = EXCLUDED.data, updated_at = now()
            RETURNING data
            "#,
        )
        .bind(path)
        .bind(value)
        .fetch_one(&self.pool)
        .await?;

        debug!(path, "document written");
        self.emit(StoreEvent {
            path: path.to_string(),
            kind: ChangeKind::Put,
            data: Some(stored),
        });
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM documents WHERE path = $1 OR path LIKE $1 || '/%'")
            .bind(path)
            .execute(&self.pool)
            .await?;

        // Deleting a missing path is success; emit only for real removals.
        if result.rows_affected() > 0 {
            debug!(path, rows = result.rows_affected(), "document deleted");
            self.emit(StoreEvent {
                path: path.to_string(),
                kind: ChangeKind::Delete,
                data: None,
            });
        }
        Ok(())
    }

    async fn list(&self, path: &str) -> Result<BTreeMap<String, Value>> {
        let rows: Vec<(String, Value)> = sqlx::query_as(
            r#"
            SELECT path, data FROM documents
            WHERE path LIKE $1 || '/%' AND path NOT LIKE $1 || '/%/%'
            "#,
        )
        .bind(path)
        .fetch_all(&self.pool)
        .await?;

        let prefix_len = path.len() + 1;
        Ok(rows
            .into_iter()
            .map(|(p, data)| (p[prefix_len..].to_string(), data))
            .collect())
    }

    fn subscribe(&self, prefix: &str) -> Subscription {
        Subscription::new(prefix, self.tx.subscribe())
    }
}
