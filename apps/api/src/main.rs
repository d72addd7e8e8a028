mod auth;
mod blob;
mod config;
mod db;
mod errors;
mod messages;
mod notify;
mod projects;
mod resume;
mod routes;
mod settings;
mod state;
mod store;
mod upload;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::{IdentityProvider, RedisIdentity};
use crate::blob::s3::S3Blobs;
use crate::blob::BlobStore;
use crate::config::Config;
use crate::db::{create_pool, ensure_schema};
use crate::notify::ToastHub;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::pg::PgStore;
use crate::store::DocumentStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("atelier_api={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Atelier API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL and the document table
    let db = create_pool(&config.database_url).await?;
    ensure_schema(&db).await?;

    // Initialize Redis (sessions + abuse counters)
    let redis = redis::Client::open(config.redis_url.clone())?;
    info!("Redis client initialized");

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Services behind the trait seams
    let store: Arc<dyn DocumentStore> = Arc::new(PgStore::new(db.clone()));
    let blobs: Arc<dyn BlobStore> = Arc::new(S3Blobs::new(
        s3,
        &config.s3_bucket,
        &config.s3_public_url,
    ));
    let identity: Arc<dyn IdentityProvider> = Arc::new(RedisIdentity::new(
        redis.clone(),
        &config.admin_email,
        &config.admin_password_hash,
        config.session_ttl_secs,
    ));
    let toasts = ToastHub::new();

    // Build app state
    let state = AppState {
        db,
        redis,
        store,
        blobs,
        identity,
        toasts,
        http: reqwest::Client::new(),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "atelier-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
