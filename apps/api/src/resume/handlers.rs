use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    Json,
};
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::errors::AppError;
use crate::notify::ToastIntent;
use crate::state::AppState;
use crate::upload::{self, UploadKind};

use super::Resume;

/// GET /api/v1/resume
pub async fn handle_get_resume(
    State(state): State<AppState>,
) -> Result<Json<Resume>, AppError> {
    let resume = super::get_resume(state.store.as_ref())
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound("No resume has been uploaded".to_string()))?;
    Ok(Json(resume))
}

/// POST /api/v1/admin/resume
/// Multipart upload: a `file` part (PDF) and an optional `title` part.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    _admin: AdminSession,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Resume>), AppError> {
    let mut title = "Resume".to_string();
    let mut file: Option<(String, String, bytes::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => {
                title = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("bad title field: {e}")))?;
            }
            Some("file") => {
                let file_name = field
                    .file_name()
                    .unwrap_or("resume.pdf")
                    .to_string();
                let content_type = field
                    .content_type()
                    .ok_or_else(|| AppError::Validation("missing content type".to_string()))?
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
                file = Some((file_name, content_type, data));
            }
            _ => {}
        }
    }

    let (file_name, content_type, data) =
        file.ok_or_else(|| AppError::Validation("missing file field".to_string()))?;

    let key = format!("resume/{}.pdf", Uuid::new_v4().simple());
    let url = upload::upload(
        state.blobs.as_ref(),
        UploadKind::Document,
        &key,
        &content_type,
        data,
        Some(Box::new(|pct| {
            tracing::debug!(pct, "resume upload progress");
        })),
    )
    .await?;

    let resume = Resume {
        title,
        url,
        file_name: Some(file_name),
        updated_at: None,
    };
    super::put_resume(state.store.as_ref(), &resume)
        .await
        .map_err(AppError::Internal)?;

    state
        .toasts
        .push_with("Resume uploaded", ToastIntent::Success);
    Ok((StatusCode::CREATED, Json(resume)))
}

/// DELETE /api/v1/admin/resume
/// The client confirms the irreversible delete before calling this.
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    _admin: AdminSession,
) -> Result<StatusCode, AppError> {
    super::delete_resume(state.store.as_ref(), state.blobs.as_ref())
        .await
        .map_err(AppError::Internal)?;
    state.toasts.push("Resume deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/resume/view
/// Proxies the stored PDF through the origin so caching headers are ours and
/// the browser renders it inline instead of navigating cross-origin.
pub async fn handle_view_resume(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, AppError> {
    let resume = super::get_resume(state.store.as_ref())
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound("No resume has been uploaded".to_string()))?;

    let response = state
        .http
        .get(&resume.url)
        .send()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?
        .error_for_status()
        .map_err(|e| AppError::Upstream(e.to_string()))?;
    let body = response
        .bytes()
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    let file_name = resume.file_name.as_deref().unwrap_or("resume.pdf");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{file_name}\""),
            ),
            (header::CACHE_CONTROL, "no-store".to_string()),
        ],
        body,
    ))
}
