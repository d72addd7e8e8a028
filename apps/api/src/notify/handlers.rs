use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::errors::AppError;
use crate::state::AppState;

use super::Toast;

/// GET /api/v1/admin/toasts
pub async fn handle_list_toasts(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<Json<Vec<Toast>>, AppError> {
    Ok(Json(state.toasts.list()))
}

/// DELETE /api/v1/admin/toasts/:id
/// Manual dismiss; already-expired toasts are a quiet no-op.
pub async fn handle_dismiss_toast(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.toasts.dismiss(id);
    Ok(StatusCode::NO_CONTENT)
}
