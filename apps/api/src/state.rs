use std::sync::Arc;

use redis::Client as RedisClient;
use sqlx::PgPool;

use crate::auth::IdentityProvider;
use crate::blob::BlobStore;
use crate::config::Config;
use crate::notify::ToastHub;
use crate::store::DocumentStore;

/// Shared application state injected into all route handlers via Axum
/// extractors. The trait objects are the swap points: Postgres/S3/Redis in
/// production, in-memory doubles in tests.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    /// Redis backs sessions and the contact-form abuse counters.
    pub redis: RedisClient,
    pub store: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub identity: Arc<dyn IdentityProvider>,
    pub toasts: ToastHub,
    /// Outbound client for the resume PDF proxy.
    pub http: reqwest::Client,
    pub config: Config,
}
