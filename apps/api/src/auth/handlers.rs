use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use super::Session;
use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignOutRequest {
    pub token: String,
}

/// POST /api/v1/auth/sign-in
pub async fn handle_sign_in(
    State(state): State<AppState>,
    Json(req): Json<SignInRequest>,
) -> Result<Json<Session>, AppError> {
    let session = state.identity.sign_in(&req.email, &req.password).await?;
    Ok(Json(session))
}

/// POST /api/v1/auth/sign-out
pub async fn handle_sign_out(
    State(state): State<AppState>,
    Json(req): Json<SignOutRequest>,
) -> Result<StatusCode, AppError> {
    state.identity.sign_out(&req.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
