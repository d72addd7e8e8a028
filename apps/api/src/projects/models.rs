use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A showcased project. `id` is the store-assigned child key, unique within
/// its owning section. `updated_at` is stamped by the store on every write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A named grouping of projects. The store is an associative map, not a
/// sequence: key order carries no meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    pub title: String,
    #[serde(default)]
    pub projects: HashMap<String, Project>,
}

/// Fields accepted when creating a project. Everything but the title is
/// optional; the id and timestamps are assigned server-side.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectDraft {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub live_url: Option<String>,
    #[serde(default)]
    pub repo_url: Option<String>,
    #[serde(default)]
    pub featured: bool,
}

impl ProjectDraft {
    pub fn into_project(self, now: DateTime<Utc>) -> Project {
        Project {
            id: String::new(),
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            tags: self.tags,
            live_url: self.live_url,
            repo_url: self.repo_url,
            featured: self.featured,
            created_at: now,
            updated_at: None,
        }
    }
}

/// An explicit partial update: named optional fields with an explicit merge,
/// not loose key spreading. Omitted fields keep their previous values, so a
/// partial edit can never null out data it did not mention.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub live_url: Option<String>,
    pub repo_url: Option<String>,
    pub featured: Option<bool>,
}

impl ProjectPatch {
    /// Merge this patch over a previously-fetched full record.
    pub fn apply(self, base: &mut Project) {
        if let Some(title) = self.title {
            base.title = title;
        }
        if let Some(description) = self.description {
            base.description = description;
        }
        if let Some(image_url) = self.image_url {
            base.image_url = Some(image_url);
        }
        if let Some(tags) = self.tags {
            base.tags = tags;
        }
        if let Some(live_url) = self.live_url {
            base.live_url = Some(live_url);
        }
        if let Some(repo_url) = self.repo_url {
            base.repo_url = Some(repo_url);
        }
        if let Some(featured) = self.featured {
            base.featured = featured;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project(title: &str) -> Project {
        Project {
            id: "p1".to_string(),
            title: title.to_string(),
            description: "A thing".to_string(),
            image_url: Some("http://blobs/x.png".to_string()),
            tags: vec!["rust".to_string(), "web".to_string()],
            live_url: None,
            repo_url: Some("https://github.com/x/y".to_string()),
            featured: true,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn test_patch_merge_keeps_omitted_fields() {
        let mut project = sample_project("Foo");
        let patch = ProjectPatch {
            title: Some("Foo2".to_string()),
            ..Default::default()
        };
        patch.apply(&mut project);

        assert_eq!(project.title, "Foo2");
        assert_eq!(project.description, "A thing");
        assert_eq!(project.tags, vec!["rust", "web"]);
        assert!(project.featured);
        assert_eq!(project.image_url.as_deref(), Some("http://blobs/x.png"));
    }

    #[test]
    fn test_patch_merge_overwrites_named_fields() {
        let mut project = sample_project("Foo");
        let patch = ProjectPatch {
            tags: Some(vec!["cli".to_string()]),
            featured: Some(false),
            ..Default::default()
        };
        patch.apply(&mut project);

        assert_eq!(project.tags, vec!["cli"]);
        assert!(!project.featured);
        assert_eq!(project.title, "Foo");
    }

    #[test]
    fn test_missing_tags_default_to_empty() {
        let json = r#"{"title": "Bare", "created_at": "2026-01-05T10:00:00Z"}"#;
        let project: Project = serde_json::from_str(json).unwrap();
        assert!(project.tags.is_empty());
        assert!(!project.featured);
        assert!(project.id.is_empty());
    }
}
