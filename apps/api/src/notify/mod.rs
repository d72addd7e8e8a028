//! Toast queue. A dependency-injected service (held in `AppState`, not a
//! global): pushed toasts auto-dismiss after a fixed delay, a manual dismiss
//! aborts the pending timer, and subscribers receive every push/dismiss over
//! a broadcast channel for SSE delivery to the admin client.

pub mod handlers;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Fixed auto-dismiss delay.
pub const TOAST_DISMISS_MS: u64 = 4200;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastIntent {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct Toast {
    pub id: Uuid,
    pub message: String,
    pub intent: ToastIntent,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ToastEvent {
    Pushed { toast: Toast },
    Dismissed { id: Uuid },
}

struct Inner {
    active: Mutex<HashMap<Uuid, (Toast, JoinHandle<()>)>>,
    tx: broadcast::Sender<ToastEvent>,
}

#[derive(Clone)]
pub struct ToastHub {
    inner: Arc<Inner>,
}

impl ToastHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        ToastHub {
            inner: Arc::new(Inner {
                active: Mutex::new(HashMap::new()),
                tx,
            }),
        }
    }

    /// Push with the default intent (info).
    pub fn push(&self, message: impl Into<String>) -> Uuid {
        self.push_with(message, ToastIntent::default())
    }

    pub fn push_with(&self, message: impl Into<String>, intent: ToastIntent) -> Uuid {
        let toast = Toast {
            id: Uuid::new_v4(),
            message: message.into(),
            intent,
            created_at: Utc::now(),
        };
        let id = toast.id;

        let inner = self.inner.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(TOAST_DISMISS_MS)).await;
            if inner.active.lock().unwrap().remove(&id).is_some() {
                let _ = inner.tx.send(ToastEvent::Dismissed { id });
            }
        });

        self.inner
            .active
            .lock()
            .unwrap()
            .insert(id, (toast.clone(), timer));
        let _ = self.inner.tx.send(ToastEvent::Pushed { toast });
        id
    }

    /// Remove a toast immediately and cancel its pending timer.
    /// Dismissing an already-gone toast is a no-op, not an error.
    pub fn dismiss(&self, id: Uuid) {
        if let Some((_, timer)) = self.inner.active.lock().unwrap().remove(&id) {
            timer.abort();
            let _ = self.inner.tx.send(ToastEvent::Dismissed { id });
        }
    }

    /// Currently visible toasts, oldest first.
    pub fn list(&self) -> Vec<Toast> {
        let mut toasts: Vec<Toast> = self
            .inner
            .active
            .lock()
            .unwrap()
            .values()
            .map(|(t, _)| t.clone())
            .collect();
        toasts.sort_by_key(|t| t.created_at);
        toasts
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ToastEvent> {
        self.inner.tx.subscribe()
    }
}

impl Default for ToastHub {
    fn default() -> Self {
        Self::new()
    }
}
