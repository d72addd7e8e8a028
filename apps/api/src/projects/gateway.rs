//! Typed gateway between project entities and their document paths.
//!
//! Paths: section metadata at `sections/{section}`, each project at
//! `sections/{section}/projects/{id}`. Errors from the store propagate
//! unchanged; there is no retry and no local fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::json;

use crate::store::{join_path, DocumentStore, Subscription};

use super::models::{Project, ProjectSection};

pub const SECTIONS_PATH: &str = "sections";

#[derive(Clone)]
pub struct SectionsGateway {
    store: Arc<dyn DocumentStore>,
}

impl SectionsGateway {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        SectionsGateway { store }
    }

    fn section_path(section: &str) -> String {
        join_path(SECTIONS_PATH, section)
    }

    fn projects_path(section: &str) -> String {
        join_path(&Self::section_path(section), "projects")
    }

    fn project_path(section: &str, id: &str) -> String {
        join_path(&Self::projects_path(section), id)
    }

    /// All sections with their project maps, keyed by section id.
    pub async fn sections(&self) -> Result<BTreeMap<String, ProjectSection>> {
        let metas = self.store.list(SECTIONS_PATH).await?;
        let mut out = BTreeMap::new();
        for (section_id, meta) in metas {
            let title = meta
                .get("title")
                .and_then(|v| v.as_str())
                .unwrap_or(&section_id)
                .to_string();
            let projects = self.projects_in(&section_id).await?;
            out.insert(section_id, ProjectSection { title, projects });
        }
        Ok(out)
    }

    pub async fn projects_in(
        &self,
        section: &str,
    ) -> Result<std::collections::HashMap<String, Project>> {
        let docs = self.store.list(&Self::projects_path(section)).await?;
        let mut projects = std::collections::HashMap::new();
        for (key, doc) in docs {
            let project: Project = serde_json::from_value(doc)
                .with_context(|| format!("malformed project document at {section}/{key}"))?;
            projects.insert(key, project);
        }
        Ok(projects)
    }

    pub async fn get(&self, section: &str, id: &str) -> Result<Option<Project>> {
        let doc = self.store.get(&Self::project_path(section, id)).await?;
        doc.map(|d| {
            serde_json::from_value(d)
                .with_context(|| format!("malformed project document at {section}/{id}"))
        })
        .transpose()
    }

    /// Create-or-update, keyed by the project's optional id: an empty id means
    /// create, and the store assigns a fresh key. Returns the stored project
    /// with its identifier re-asserted.
    pub async fn upsert(&self, section: &str, mut project: Project) -> Result<Project> {
        if project.id.is_empty() {
            project.id = self.store.push_key();
        }
        let path = Self::project_path(section, &project.id);
        let doc = serde_json::to_value(&project)?;
        self.store.set(&path, doc).await?;
        Ok(project)
    }

    pub async fn delete(&self, section: &str, id: &str) -> Result<()> {
        self.store.delete(&Self::project_path(section, id)).await
    }

    /// Create the section's metadata document if this is its first use.
    pub async fn ensure_section(&self, section: &str) -> Result<()> {
        let path = Self::section_path(section);
        if self.store.get(&path).await?.is_none() {
            self.store.set(&path, json!({ "title": section })).await?;
        }
        Ok(())
    }

    /// Push-based change feed for everything under `sections/`.
    pub fn watch(&self) -> Subscription {
        self.store.subscribe(SECTIONS_PATH)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::projects::models::ProjectDraft;
    use crate::store::memory::MemoryStore;

    fn gateway() -> SectionsGateway {
        SectionsGateway::new(Arc::new(MemoryStore::new()))
    }

    fn draft(title: &str) -> Project {
        ProjectDraft {
            title: title.to_string(),
            description: "desc".to_string(),
            image_url: None,
            tags: vec!["a".to_string(), "b".to_string()],
            live_url: None,
            repo_url: None,
            featured: false,
        }
        .into_project(Utc::now())
    }

    #[tokio::test]
    async fn test_upsert_then_get_round_trips_every_field() {
        let gw = gateway();
        gw.ensure_section("portfolio").await.unwrap();
        let stored = gw.upsert("portfolio", draft("Foo")).await.unwrap();
        assert!(!stored.id.is_empty(), "create assigns an id");

        let fetched = gw.get("portfolio", &stored.id).await.unwrap().unwrap();
        // Equal in every field except the server-assigned timestamp.
        assert_eq!(fetched.id, stored.id);
        assert_eq!(fetched.title, stored.title);
        assert_eq!(fetched.description, stored.description);
        assert_eq!(fetched.tags, stored.tags);
        assert_eq!(fetched.featured, stored.featured);
        assert_eq!(fetched.created_at, stored.created_at);
        assert!(fetched.updated_at.is_some(), "store stamps updated_at");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let gw = gateway();
        let stored = gw.upsert("portfolio", draft("Foo")).await.unwrap();
        gw.delete("portfolio", &stored.id).await.unwrap();
        assert!(gw.get("portfolio", &stored.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sections_assemble_titles_and_projects() {
        let gw = gateway();
        gw.ensure_section("portfolio").await.unwrap();
        gw.ensure_section("beta").await.unwrap();
        gw.upsert("portfolio", draft("One")).await.unwrap();
        gw.upsert("portfolio", draft("Two")).await.unwrap();

        let sections = gw.sections().await.unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections["portfolio"].projects.len(), 2);
        assert!(sections["beta"].projects.is_empty());
    }
}
