use std::collections::BTreeMap;

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AdminSession;
use crate::errors::AppError;
use crate::notify::ToastIntent;
use crate::state::AppState;
use crate::upload::{self, UploadKind};

use super::gateway::SectionsGateway;
use super::models::{ProjectDraft, ProjectPatch, ProjectSection};
use super::mutators;
use super::view::{self, FlatProject, ListParams, SortDirection, SortKey};

fn gateway(state: &AppState) -> SectionsGateway {
    SectionsGateway::new(state.store.clone())
}

/// GET /api/v1/sections
pub async fn handle_list_sections(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, ProjectSection>>, AppError> {
    let sections = gateway(&state)
        .sections()
        .await
        .map_err(AppError::Internal)?;
    Ok(Json(sections))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQueryParams {
    pub search: Option<String>,
    pub section: Option<String>,
    /// Comma-separated tag list; all must be present on a match.
    pub tags: Option<String>,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub dir: SortDirection,
}

impl ListQueryParams {
    fn into_params(self) -> ListParams {
        ListParams {
            search: self.search,
            section: self.section,
            tags: self
                .tags
                .map(|t| {
                    t.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            sort: self.sort,
            dir: self.dir,
        }
    }
}

/// GET /api/v1/admin/projects
/// The flattened, filtered, sorted project list the admin manager renders.
pub async fn handle_admin_list(
    State(state): State<AppState>,
    _admin: AdminSession,
    Query(params): Query<ListQueryParams>,
) -> Result<Json<Vec<FlatProject>>, AppError> {
    let sections = gateway(&state)
        .sections()
        .await
        .map_err(AppError::Internal)?;
    let flat = view::flatten(&sections);
    Ok(Json(view::query(&flat, &params.into_params())))
}

/// POST /api/v1/admin/sections/:section/projects
pub async fn handle_create_project(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path(section): Path<String>,
    Json(draft): Json<ProjectDraft>,
) -> Result<(StatusCode, Json<super::models::Project>), AppError> {
    let project = mutators::add_project(&gateway(&state), &section, draft).await?;
    state
        .toasts
        .push_with(format!("Created \"{}\"", project.title), ToastIntent::Success);
    Ok((StatusCode::CREATED, Json(project)))
}

/// PATCH /api/v1/admin/sections/:section/projects/:id
pub async fn handle_update_project(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path((section, id)): Path<(String, String)>,
    Json(patch): Json<ProjectPatch>,
) -> Result<Json<super::models::Project>, AppError> {
    let project = mutators::update_project(&gateway(&state), &section, &id, patch).await?;
    Ok(Json(project))
}

/// DELETE /api/v1/admin/sections/:section/projects/:id
pub async fn handle_delete_project(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path((section, id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    mutators::delete_project(&gateway(&state), state.blobs.as_ref(), &section, &id).await?;
    state.toasts.push("Project deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/admin/sections/:section/projects/:id/duplicate
pub async fn handle_duplicate_project(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path((section, id)): Path<(String, String)>,
) -> Result<(StatusCode, Json<super::models::Project>), AppError> {
    let copy = mutators::duplicate_project(&gateway(&state), &section, &id).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub to_section: String,
}

/// POST /api/v1/admin/sections/:section/projects/:id/move
pub async fn handle_move_project(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path((section, id)): Path<(String, String)>,
    Json(req): Json<MoveRequest>,
) -> Result<Json<super::models::Project>, AppError> {
    let moved = mutators::move_project(&gateway(&state), &section, &req.to_section, &id).await?;
    Ok(Json(moved))
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub section: String,
    pub ids: Vec<String>,
}

/// POST /api/v1/admin/projects/bulk-delete
pub async fn handle_bulk_delete(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<BulkDeleteRequest>,
) -> Result<StatusCode, AppError> {
    mutators::bulk_delete(
        &gateway(&state),
        state.blobs.as_ref(),
        &req.section,
        &req.ids,
    )
    .await?;
    state.toasts.push(format!("Deleted {} projects", req.ids.len()));
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct BulkMoveRequest {
    pub from: String,
    pub to: String,
    pub ids: Vec<String>,
}

/// POST /api/v1/admin/projects/bulk-move
pub async fn handle_bulk_move(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<BulkMoveRequest>,
) -> Result<Json<Vec<super::models::Project>>, AppError> {
    let moved = mutators::bulk_move(&gateway(&state), &req.from, &req.to, &req.ids).await?;
    state.toasts.push_with(
        format!("Moved {} projects to {}", moved.len(), req.to),
        ToastIntent::Success,
    );
    Ok(Json(moved))
}

#[derive(Debug, Deserialize)]
pub struct SelectAllRequest {
    /// The admin client's current selection.
    #[serde(default)]
    pub selected: Vec<String>,
    pub search: Option<String>,
    pub section: Option<String>,
    pub tags: Option<String>,
}

#[derive(Debug, serde::Serialize)]
pub struct SelectAllResponse {
    pub selected: Vec<String>,
}

/// POST /api/v1/admin/projects/select-all
/// Toggles between empty and full relative to the currently filtered list.
pub async fn handle_toggle_select_all(
    State(state): State<AppState>,
    _admin: AdminSession,
    Json(req): Json<SelectAllRequest>,
) -> Result<Json<SelectAllResponse>, AppError> {
    let sections = gateway(&state)
        .sections()
        .await
        .map_err(AppError::Internal)?;
    let params = ListQueryParams {
        search: req.search,
        section: req.section,
        tags: req.tags,
        ..Default::default()
    }
    .into_params();

    let flat = view::flatten(&sections);
    let filtered = view::query(&flat, &params);
    let selection: std::collections::HashSet<String> = req.selected.into_iter().collect();

    let mut selected: Vec<String> = view::toggle_select_all(&selection, &filtered)
        .into_iter()
        .collect();
    selected.sort();
    Ok(Json(SelectAllResponse { selected }))
}

/// POST /api/v1/admin/sections/:section/projects/:id/image
/// Multipart image upload; the resulting URL is merged into the project.
pub async fn handle_upload_project_image(
    State(state): State<AppState>,
    _admin: AdminSession,
    Path((section, id)): Path<(String, String)>,
    mut multipart: Multipart,
) -> Result<Json<super::models::Project>, AppError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
        .ok_or_else(|| AppError::Validation("missing file field".to_string()))?;

    let content_type = field
        .content_type()
        .ok_or_else(|| AppError::Validation("missing content type".to_string()))?
        .to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;

    let key = format!("projects/{}/{}", section, Uuid::new_v4().simple());
    let url = upload::upload(
        state.blobs.as_ref(),
        UploadKind::Image,
        &key,
        &content_type,
        data,
        Some(Box::new(|pct| {
            tracing::debug!(pct, "project image upload progress");
        })),
    )
    .await?;

    let patch = ProjectPatch {
        image_url: Some(url),
        ..Default::default()
    };
    let project = mutators::update_project(&gateway(&state), &section, &id, patch).await?;
    Ok(Json(project))
}
