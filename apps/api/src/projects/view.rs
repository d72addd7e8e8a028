//! List view-model for the admin project manager.
//!
//! Pure, synchronous transformations over an already-fetched collection:
//! flatten sections, filter conjunctively (search AND section AND all
//! selected tags), stable-sort by one of four keys, and track a selection
//! set relative to the filtered list. Recomputed from scratch on every
//! change; there is no incremental state to invalidate.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use super::models::{Project, ProjectSection};

/// A project plus the transient section label attached during flattening.
/// The label exists only for filtering and display; it is never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatProject {
    pub section: String,
    #[serde(flatten)]
    pub project: Project,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    CreatedAt,
    Title,
    Featured,
    TagCount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// One fully-specified list computation.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub search: Option<String>,
    pub section: Option<String>,
    pub tags: Vec<String>,
    pub sort: SortKey,
    pub dir: SortDirection,
}

/// Flattens sections into one list, attaching each project's section id.
pub fn flatten(sections: &BTreeMap<String, ProjectSection>) -> Vec<FlatProject> {
    let mut flat = Vec::new();
    for (section_id, section) in sections {
        // Deterministic order within a section: the map itself is unordered.
        let mut entries: Vec<&Project> = section.projects.values().collect();
        entries.sort_by(|a, b| a.id.cmp(&b.id));
        for project in entries {
            flat.push(FlatProject {
                section: section_id.clone(),
                project: project.clone(),
            });
        }
    }
    flat
}

/// Case-insensitive search over title, description, and tags.
fn matches_search(item: &FlatProject, term: &str) -> bool {
    let needle = term.to_lowercase();
    item.project.title.to_lowercase().contains(&needle)
        || item.project.description.to_lowercase().contains(&needle)
        || item
            .project
            .tags
            .iter()
            .any(|t| t.to_lowercase().contains(&needle))
}

/// Conjunctive filter: search AND section AND every selected tag present.
pub fn apply_filters(
    items: &[FlatProject],
    search: Option<&str>,
    section: Option<&str>,
    tags: &[String],
) -> Vec<FlatProject> {
    items
        .iter()
        .filter(|item| match search {
            Some(term) if !term.trim().is_empty() => matches_search(item, term.trim()),
            _ => true,
        })
        .filter(|item| match section {
            Some(s) => item.section == s,
            None => true,
        })
        .filter(|item| tags.iter().all(|t| item.project.tags.contains(t)))
        .cloned()
        .collect()
}

/// Stable sort with no secondary key: equal elements keep their prior
/// relative order.
pub fn sort_projects(items: &mut [FlatProject], key: SortKey, dir: SortDirection) {
    items.sort_by(|a, b| {
        let ordering = match key {
            SortKey::Title => a
                .project
                .title
                .to_lowercase()
                .cmp(&b.project.title.to_lowercase()),
            SortKey::CreatedAt => a.project.created_at.cmp(&b.project.created_at),
            // Boolean-to-number: descending puts featured first.
            SortKey::Featured => (a.project.featured as u8).cmp(&(b.project.featured as u8)),
            SortKey::TagCount => a.project.tags.len().cmp(&b.project.tags.len()),
        };
        match dir {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

/// Filter, then sort. Filter application order does not affect the result
/// set, only iteration cost.
pub fn query(items: &[FlatProject], params: &ListParams) -> Vec<FlatProject> {
    let mut out = apply_filters(
        items,
        params.search.as_deref(),
        params.section.as_deref(),
        &params.tags,
    );
    sort_projects(&mut out, params.sort, params.dir);
    out
}

/// "Select all" relative to the currently filtered list: if every filtered id
/// is already selected, clear the selection; otherwise select exactly the
/// filtered ids.
pub fn toggle_select_all(selection: &HashSet<String>, filtered: &[FlatProject]) -> HashSet<String> {
    let filtered_ids: HashSet<String> =
        filtered.iter().map(|f| f.project.id.clone()).collect();
    if !filtered_ids.is_empty() && filtered_ids.is_subset(selection) {
        HashSet::new()
    } else {
        filtered_ids
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn item(section: &str, id: &str, title: &str, tags: &[&str], featured: bool, day: u32) -> FlatProject {
        FlatProject {
            section: section.to_string(),
            project: Project {
                id: id.to_string(),
                title: title.to_string(),
                description: format!("about {title}"),
                image_url: None,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                live_url: None,
                repo_url: None,
                featured,
                created_at: Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap(),
                updated_at: None,
            },
        }
    }

    fn fixture() -> Vec<FlatProject> {
        vec![
            item("portfolio", "a", "Raytracer", &["rust", "graphics"], true, 1),
            item("portfolio", "b", "Chat Server", &["rust", "net"], false, 3),
            item("beta", "c", "Vibe Editor", &["web"], true, 2),
            item("beta", "d", "Notes", &["web", "rust"], false, 4),
        ]
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let items = fixture();
        let out = apply_filters(
            &items,
            Some("rust"),
            Some("beta"),
            &["web".to_string()],
        );
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].project.id, "d");
    }

    #[test]
    fn test_search_is_case_insensitive_and_covers_tags() {
        let items = fixture();
        let by_title = apply_filters(&items, Some("RAYTRACER"), None, &[]);
        assert_eq!(by_title.len(), 1);

        let by_tag = apply_filters(&items, Some("graphics"), None, &[]);
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].project.id, "a");
    }

    #[test]
    fn test_filter_composition_matches_independent_stages() {
        let items = fixture();
        let params = ListParams {
            search: Some("rust".to_string()),
            section: Some("portfolio".to_string()),
            tags: vec!["rust".to_string()],
            sort: SortKey::Title,
            dir: SortDirection::Asc,
        };

        // Independently applied stages, in a different order.
        let stage1 = apply_filters(&items, None, params.section.as_deref(), &[]);
        let stage2 = apply_filters(&stage1, None, None, &params.tags);
        let mut stage3 = apply_filters(&stage2, params.search.as_deref(), None, &[]);
        sort_projects(&mut stage3, params.sort, params.dir);

        assert_eq!(query(&items, &params), stage3);
    }

    #[test]
    fn test_sort_keys_and_direction() {
        let items = fixture();

        let mut by_title = items.clone();
        sort_projects(&mut by_title, SortKey::Title, SortDirection::Asc);
        assert_eq!(by_title[0].project.title, "Chat Server");

        let mut newest_first = items.clone();
        sort_projects(&mut newest_first, SortKey::CreatedAt, SortDirection::Desc);
        assert_eq!(newest_first[0].project.id, "d");

        let mut featured_first = items.clone();
        sort_projects(&mut featured_first, SortKey::Featured, SortDirection::Desc);
        assert!(featured_first[0].project.featured);
        assert!(featured_first[1].project.featured);

        let mut by_tag_count = items;
        sort_projects(&mut by_tag_count, SortKey::TagCount, SortDirection::Desc);
        assert_eq!(by_tag_count[0].project.tags.len(), 2);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let items = fixture();
        let mut sorted = items.clone();
        // All featured values tie pairwise; equal elements keep prior order.
        sort_projects(&mut sorted, SortKey::Featured, SortDirection::Desc);
        let featured: Vec<&str> = sorted
            .iter()
            .filter(|i| i.project.featured)
            .map(|i| i.project.id.as_str())
            .collect();
        assert_eq!(featured, vec!["a", "c"], "ties retain prior relative order");
    }

    #[test]
    fn test_select_all_toggles_relative_to_filtered_list() {
        let items = fixture();
        let filtered = apply_filters(&items, None, Some("beta"), &[]);

        let none = HashSet::new();
        let all = toggle_select_all(&none, &filtered);
        assert_eq!(all.len(), 2);
        assert!(all.contains("c") && all.contains("d"));

        // Toggled twice returns to the original value for a stable list.
        let back = toggle_select_all(&all, &filtered);
        assert_eq!(back, none);

        // A wider selection that already covers the filtered list also clears.
        let wider: HashSet<String> =
            ["a", "c", "d"].iter().map(|s| s.to_string()).collect();
        assert!(toggle_select_all(&wider, &filtered).is_empty());
    }

    #[test]
    fn test_flatten_attaches_section_labels() {
        let mut sections = BTreeMap::new();
        let mut projects = std::collections::HashMap::new();
        for f in fixture().into_iter().filter(|f| f.section == "beta") {
            projects.insert(f.project.id.clone(), f.project);
        }
        sections.insert(
            "beta".to_string(),
            ProjectSection {
                title: "Beta".to_string(),
                projects,
            },
        );

        let flat = flatten(&sections);
        assert_eq!(flat.len(), 2);
        assert!(flat.iter().all(|f| f.section == "beta"));
    }
}
