use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::CatalogError;
use crate::types::{ALL_CATEGORIES, CatalogItem, ItemId};

/// Anything that can hand over the catalog at startup.
pub trait CatalogSource {
    fn load_catalog(&self) -> Result<Catalog, CatalogError>;
}

/// Reads the catalog from a JSON array on disk.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    pub path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CatalogSource for JsonFileSource {
    fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        Catalog::from_path(&self.path)
    }
}

/// Already-built item list, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct StaticSource(pub Vec<CatalogItem>);

impl CatalogSource for StaticSource {
    fn load_catalog(&self) -> Result<Catalog, CatalogError> {
        Catalog::new(self.0.clone())
    }
}

/// Immutable, validated list of playable items.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Arc<CatalogItem>>,
}

impl Catalog {
    pub fn new(items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        validate(&items)?;
        Ok(Self {
            items: items.into_iter().map(Arc::new).collect(),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, CatalogError> {
        let items: Vec<CatalogItem> = serde_json::from_str(json)?;
        Self::new(items)
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter().map(Arc::as_ref)
    }

    pub fn get(&self, id: &ItemId) -> Option<Arc<CatalogItem>> {
        self.items.iter().find(|i| &i.id == id).cloned()
    }

    /// Resolve a path segment such as the `42` in `/v/42`.
    pub fn resolve_route(&self, raw: &str) -> Option<Arc<CatalogItem>> {
        self.items.iter().find(|i| i.id.matches_route(raw)).cloned()
    }

    /// "All" followed by each distinct category in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = vec![ALL_CATEGORIES.to_string()];
        for item in &self.items {
            if seen.insert(item.category.as_str()) {
                out.push(item.category.clone());
            }
        }
        out
    }
}

fn validate(items: &[CatalogItem]) -> Result<(), CatalogError> {
    let mut ids = HashSet::new();
    for item in items {
        if !ids.insert(&item.id) {
            return Err(CatalogError::DuplicateId(item.id.clone()));
        }
        if item.category.trim().is_empty() {
            return Err(CatalogError::MissingCategory(item.id.clone()));
        }
        if item.locked && item.password.as_deref().is_none_or(str::is_empty) {
            return Err(CatalogError::MissingPassword(item.id.clone()));
        }
        if let Some(episodes) = &item.episodes {
            if episodes.is_empty() {
                return Err(CatalogError::EmptyEpisodes(item.id.clone()));
            }
            let mut episode_ids = HashSet::new();
            for ep in episodes {
                if !episode_ids.insert(&ep.id) {
                    return Err(CatalogError::DuplicateEpisodeId {
                        item: item.id.clone(),
                        episode: ep.id.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"id": 1, "title": "Foo", "category": "Drama", "url": "a.mp4"},
        {"id": 2, "title": "Bar", "category": "Comedy", "locked": true, "password": "x", "url": "b.mp4"},
        {"id": "one-piece", "title": "One Piece", "category": "Drama", "url": "",
         "episodes": [
            {"id": 1, "title": "Romance Dawn", "url": "op/1.mp4", "duration": "24:00"},
            {"id": 2, "title": "Pirate Hunter", "url": "op/2.mp4", "duration": "24:00"}
         ]}
    ]"#;

    #[test]
    fn loads_and_derives_categories() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.categories(), vec!["All", "Drama", "Comedy"]);
    }

    #[test]
    fn resolves_routes_for_both_id_shapes() {
        let catalog = Catalog::from_json_str(SAMPLE).unwrap();
        assert_eq!(catalog.resolve_route("2").unwrap().title, "Bar");
        assert_eq!(catalog.resolve_route("one-piece").unwrap().episode_count(), 2);
        assert!(catalog.resolve_route("404").is_none());
    }

    #[test]
    fn rejects_duplicate_ids() {
        let err = Catalog::from_json_str(
            r#"[{"id":1,"title":"A","category":"X"},{"id":1,"title":"B","category":"X"}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateId(ItemId::Int(1))));
    }

    #[test]
    fn rejects_locked_without_password() {
        let err = Catalog::from_json_str(
            r#"[{"id":1,"title":"A","category":"X","locked":true,"password":""}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::MissingPassword(_)));
    }

    #[test]
    fn rejects_bad_episode_lists() {
        let err = Catalog::from_json_str(
            r#"[{"id":1,"title":"A","category":"X","episodes":[]}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::EmptyEpisodes(_)));

        let err = Catalog::from_json_str(
            r#"[{"id":1,"title":"A","category":"X","episodes":[
                {"id":"e","title":"1","url":"1.mp4"},
                {"id":"e","title":"2","url":"2.mp4"}]}]"#,
        )
        .unwrap_err();
        assert!(matches!(err, CatalogError::DuplicateEpisodeId { .. }));
    }
}
