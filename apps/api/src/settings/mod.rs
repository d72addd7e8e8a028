//! Site settings: the resume URL surfaced on the public site plus an open
//! social-link map (github/linkedin/anything).

use std::collections::HashMap;

use anyhow::{Context, Result};
use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AdminSession;
use crate::errors::AppError;
use crate::state::AppState;
use crate::store::DocumentStore;

pub const SETTINGS_PATH: &str = "site/settings";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resume_url: Option<String>,
    #[serde(default)]
    pub social: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

pub async fn get_settings(store: &dyn DocumentStore) -> Result<Settings> {
    Ok(store
        .get(SETTINGS_PATH)
        .await?
        .map(|doc| serde_json::from_value(doc).context("malformed settings document"))
        .transpose()?
        .unwrap_or_default())
}

pub async fn put_settings(store: &dyn DocumentStore, settings: &Settings) -> Result<()> {
    store
        .set(SETTINGS_PATH, serde_json::to_value(settings)?)
        .await
}

/// GET /api/v1/settings
pub async fn handle_get_settings(
    State(state): State<AppState>,
) -> Result<Json<Settings>, AppError> {
    let settings = get_settings(state.store.as_ref())
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(settings))
}

/// PUT /api/v1/admin/settings
pub async fn handle_put_settings(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(settings): Json<Settings>,
) -> Result<Json<Settings>, AppError> {
    put_settings(state.store.as_ref(), &settings)
        .await
        .map_err(AppError::Internal)?;
    let stored = get_settings(state.store.as_ref())
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(stored))
}
