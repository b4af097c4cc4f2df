use serde::{Deserialize, Serialize};

/// Wildcard category that matches every item.
pub const ALL_CATEGORIES: &str = "All";

/// Catalog key. The catalog file may use integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Int(i64),
    Str(String),
}

impl ItemId {
    /// Match against a raw path segment. Numeric segments match integer ids.
    pub fn matches_route(&self, raw: &str) -> bool {
        match self {
            Self::Int(n) => raw.trim().parse::<i64>().is_ok_and(|v| v == *n),
            Self::Str(s) => s == raw,
        }
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for ItemId {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

/// One playable part of a series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    pub id: ItemId,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub duration: String,
}

/// A title as it appears in the catalog file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub thumbnail: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub locked: bool,
    /// Plaintext and shipped with the catalog. Not a real secret.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub episodes: Option<Vec<Episode>>,
}

impl CatalogItem {
    pub fn is_series(&self) -> bool {
        self.episodes.as_ref().is_some_and(|eps| !eps.is_empty())
    }

    pub fn first_episode(&self) -> Option<&Episode> {
        self.episodes.as_ref().and_then(|eps| eps.first())
    }

    pub fn episode(&self, id: &ItemId) -> Option<&Episode> {
        self.episodes
            .as_ref()
            .and_then(|eps| eps.iter().find(|e| &e.id == id))
    }

    pub fn episode_count(&self) -> usize {
        self.episodes.as_ref().map_or(0, Vec::len)
    }
}

/// Client-facing projection of a catalog item. Never carries the password.
#[derive(Debug, Clone, Serialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub title: String,
    pub category: String,
    pub thumbnail: String,
    pub description: String,
    pub locked: bool,
    pub episode_count: usize,
}

impl From<&CatalogItem> for ItemSummary {
    fn from(item: &CatalogItem) -> Self {
        Self {
            id: item.id.clone(),
            title: item.title.clone(),
            category: item.category.clone(),
            thumbnail: item.thumbnail.clone(),
            description: item.description.clone(),
            locked: item.locked,
            episode_count: item.episode_count(),
        }
    }
}

/// Episode listing without the media locator.
#[derive(Debug, Clone, Serialize)]
pub struct EpisodeSummary {
    pub id: ItemId,
    pub title: String,
    pub duration: String,
}

impl From<&Episode> for EpisodeSummary {
    fn from(ep: &Episode) -> Self {
        Self {
            id: ep.id.clone(),
            title: ep.title.clone(),
            duration: ep.duration.clone(),
        }
    }
}

/// Domain-level error kinds recorded on the selection and shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    WrongPassword,
    ItemNotFound,
    MediaLoadFailed,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::WrongPassword => "wrong_password",
            Self::ItemNotFound => "item_not_found",
            Self::MediaLoadFailed => "media_load_failed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
