//! Entity mutators for projects: thin sequences of gateway calls.
//!
//! Multi-step mutations here are deliberately non-atomic, mirroring the
//! store's lack of cross-document transactions: move is copy-then-delete,
//! bulk operations fan out independently and reject on the first failure
//! (losing per-item success detail), and image blobs are cleaned up
//! best-effort before their owning document goes away.

use chrono::Utc;
use futures::future::try_join_all;
use tracing::{info, warn};

use crate::blob::BlobStore;
use crate::errors::AppError;

use super::gateway::SectionsGateway;
use super::models::{Project, ProjectDraft, ProjectPatch};

const COPY_SUFFIX: &str = " (copy)";

pub async fn add_project(
    gw: &SectionsGateway,
    section: &str,
    draft: ProjectDraft,
) -> Result<Project, AppError> {
    gw.ensure_section(section).await.map_err(AppError::Internal)?;
    let project = draft.into_project(Utc::now());
    let stored = gw
        .upsert(section, project)
        .await
        .map_err(AppError::Internal)?;
    info!(section, id = %stored.id, "project created");
    Ok(stored)
}

/// Merges the patch over the previously-fetched full record so omitted fields
/// are never nulled, then re-asserts the identifier before writing.
pub async fn update_project(
    gw: &SectionsGateway,
    section: &str,
    id: &str,
    patch: ProjectPatch,
) -> Result<Project, AppError> {
    let mut project = gw
        .get(section, id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Project {id} not found in {section}")))?;

    patch.apply(&mut project);
    project.id = id.to_string();

    gw.upsert(section, project).await.map_err(AppError::Internal)
}

/// Best-effort deletes the image blob first (failure is logged and swallowed,
/// not fatal), then deletes the document. A missing project is success.
pub async fn delete_project(
    gw: &SectionsGateway,
    blobs: &dyn BlobStore,
    section: &str,
    id: &str,
) -> Result<(), AppError> {
    let Some(project) = gw.get(section, id).await.map_err(AppError::Internal)? else {
        return Ok(());
    };

    if let Some(image_url) = &project.image_url {
        if let Err(e) = blobs.delete_by_url(image_url).await {
            warn!(id, error = %e, "image blob delete failed; continuing with document delete");
        }
    }

    gw.delete(section, id).await.map_err(AppError::Internal)?;
    info!(section, id, "project deleted");
    Ok(())
}

/// Clones all fields except the identifier (stripped so the store assigns a
/// fresh one) and the title (copy-marked); the creation timestamp resets.
pub async fn duplicate_project(
    gw: &SectionsGateway,
    section: &str,
    id: &str,
) -> Result<Project, AppError> {
    let original = gw
        .get(section, id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Project {id} not found in {section}")))?;

    let copy = Project {
        id: String::new(),
        title: format!("{}{COPY_SUFFIX}", original.title),
        created_at: Utc::now(),
        updated_at: None,
        ..original
    };
    gw.upsert(section, copy).await.map_err(AppError::Internal)
}

/// Copy-then-delete across two sections, not an atomic rename. A crash
/// between the two steps leaves the item duplicated (copy landed, delete
/// didn't) or intact in the source.
pub async fn move_project(
    gw: &SectionsGateway,
    from: &str,
    to: &str,
    id: &str,
) -> Result<Project, AppError> {
    gw.ensure_section(to).await.map_err(AppError::Internal)?;
    let moved = copy_across(gw, from, to, id).await?;
    gw.delete(from, id).await.map_err(AppError::Internal)?;
    info!(from, to, id, new_id = %moved.id, "project moved");
    Ok(moved)
}

/// Independent parallel deletes. The aggregate rejects on the first failure,
/// losing per-item success information; already-deleted items count as
/// success.
pub async fn bulk_delete(
    gw: &SectionsGateway,
    blobs: &dyn BlobStore,
    section: &str,
    ids: &[String],
) -> Result<(), AppError> {
    try_join_all(
        ids.iter()
            .map(|id| delete_project(gw, blobs, section, id)),
    )
    .await?;
    info!(section, count = ids.len(), "bulk delete finished");
    Ok(())
}

/// Fan-out move: all adds run first, then all deletes. A failure mid-add
/// leaves the target holding the successfully-added subset while the source
/// still holds every original: a documented intermediate state, not a bug
/// to paper over.
pub async fn bulk_move(
    gw: &SectionsGateway,
    from: &str,
    to: &str,
    ids: &[String],
) -> Result<Vec<Project>, AppError> {
    gw.ensure_section(to).await.map_err(AppError::Internal)?;

    let moved = try_join_all(ids.iter().map(|id| copy_across(gw, from, to, id))).await?;
    try_join_all(ids.iter().map(|id| async move {
        gw.delete(from, id).await.map_err(AppError::Internal)
    }))
    .await?;

    info!(from, to, count = moved.len(), "bulk move finished");
    Ok(moved)
}

async fn copy_across(
    gw: &SectionsGateway,
    from: &str,
    to: &str,
    id: &str,
) -> Result<Project, AppError> {
    let original = gw
        .get(from, id)
        .await
        .map_err(AppError::Internal)?
        .ok_or_else(|| AppError::NotFound(format!("Project {id} not found in {from}")))?;

    let copy = Project {
        id: String::new(),
        updated_at: None,
        ..original
    };
    gw.upsert(to, copy).await.map_err(AppError::Internal)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::blob::memory::MemoryBlobs;
    use crate::projects::models::ProjectPatch;
    use crate::store::memory::MemoryStore;

    fn draft(title: &str) -> ProjectDraft {
        ProjectDraft {
            title: title.to_string(),
            description: "desc".to_string(),
            image_url: None,
            tags: vec!["a".to_string(), "b".to_string()],
            live_url: None,
            repo_url: None,
            featured: false,
        }
    }

    fn fixtures() -> (Arc<MemoryStore>, SectionsGateway, MemoryBlobs) {
        let store = Arc::new(MemoryStore::new());
        let gw = SectionsGateway::new(store.clone());
        (store, gw, MemoryBlobs::new())
    }

    #[tokio::test]
    async fn test_add_update_delete_scenario() {
        let (_, gw, blobs) = fixtures();

        // add → list() includes it
        let foo = add_project(&gw, "portfolio", draft("Foo")).await.unwrap();
        let listed = gw.projects_in("portfolio").await.unwrap();
        assert!(listed.contains_key(&foo.id));

        // update title → list() shows the new title, tags unchanged
        let patch = ProjectPatch {
            title: Some("Foo2".to_string()),
            ..Default::default()
        };
        update_project(&gw, "portfolio", &foo.id, patch).await.unwrap();
        let listed = gw.projects_in("portfolio").await.unwrap();
        assert_eq!(listed[&foo.id].title, "Foo2");
        assert_eq!(listed[&foo.id].tags, vec!["a", "b"]);

        // delete → list() no longer includes it
        delete_project(&gw, &blobs, "portfolio", &foo.id).await.unwrap();
        assert!(gw.projects_in("portfolio").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_project_is_not_found() {
        let (_, gw, _) = fixtures();
        let err = update_project(&gw, "portfolio", "ghost", ProjectPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_image_blob_first_and_tolerates_missing() {
        let (_, gw, blobs) = fixtures();
        let mut project = draft("Pictured").into_project(Utc::now());
        project.image_url = Some("mem://blobs/projects/p.png".to_string());
        let stored = gw.upsert("portfolio", project).await.unwrap();

        delete_project(&gw, &blobs, "portfolio", &stored.id).await.unwrap();
        assert_eq!(blobs.deleted_urls(), vec!["mem://blobs/projects/p.png"]);

        // Deleting an already-gone project is success, with no blob call.
        delete_project(&gw, &blobs, "portfolio", &stored.id).await.unwrap();
        assert_eq!(blobs.deleted_urls().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_strips_id_and_marks_title() {
        let (_, gw, _) = fixtures();
        let original = add_project(&gw, "portfolio", draft("Foo")).await.unwrap();

        let copy = duplicate_project(&gw, "portfolio", &original.id).await.unwrap();
        assert_ne!(copy.id, original.id);
        assert_eq!(copy.title, "Foo (copy)");
        assert_eq!(copy.tags, original.tags);
        assert!(copy.created_at >= original.created_at);

        let listed = gw.projects_in("portfolio").await.unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn test_move_lands_in_target_and_leaves_source() {
        let (_, gw, _) = fixtures();
        let p = add_project(&gw, "portfolio", draft("Foo")).await.unwrap();

        let moved = move_project(&gw, "portfolio", "beta", &p.id).await.unwrap();
        assert_ne!(moved.id, p.id, "target copy gets a fresh store key");
        assert!(gw.get("portfolio", &p.id).await.unwrap().is_none());
        assert_eq!(gw.projects_in("beta").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bulk_delete_removes_all() {
        let (_, gw, blobs) = fixtures();
        let mut ids = Vec::new();
        for title in ["A", "B", "C"] {
            ids.push(add_project(&gw, "portfolio", draft(title)).await.unwrap().id);
        }
        bulk_delete(&gw, &blobs, "portfolio", &ids).await.unwrap();
        assert!(gw.projects_in("portfolio").await.unwrap().is_empty());
    }

    /// The documented non-atomic behavior, asserted as-is: a failure during
    /// the add fan-out leaves the target with the successfully-added subset
    /// and the source untouched, because deletes only run after every add.
    #[tokio::test]
    async fn test_bulk_move_partial_failure_leaves_mixed_state() {
        let (store, gw, _) = fixtures();

        let mut ids = Vec::new();
        for title in ["A", "B", "C", "D", "E"] {
            ids.push(add_project(&gw, "portfolio", draft(title)).await.unwrap().id);
        }
        gw.ensure_section("beta").await.unwrap();

        // Second write into beta's project subtree fails.
        store.fail_write_at("sections/beta/projects", 1);

        let result = bulk_move(&gw, "portfolio", "beta", &ids[..3].to_vec()).await;
        assert!(result.is_err(), "aggregate rejects on first failure");

        // Source still contains all five originals.
        let source = gw.projects_in("portfolio").await.unwrap();
        assert_eq!(source.len(), 5);

        // Target holds exactly the adds that completed before the failure.
        let target = gw.projects_in("beta").await.unwrap();
        let titles: Vec<&str> = target.values().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["A"]);
    }
}
