use serde::{Deserialize, Serialize};

use crate::types::{ALL_CATEGORIES, CatalogItem};

pub const NO_RESULTS_MESSAGE: &str = "No movies found. Try a different search or category.";

/// Stable filter over the catalog: case-insensitive title substring AND category.
pub fn filter<'a, I>(items: I, query: &str, category: &str) -> Vec<&'a CatalogItem>
where
    I: IntoIterator<Item = &'a CatalogItem>,
{
    let needle = query.to_lowercase();
    items
        .into_iter()
        .filter(|item| needle.is_empty() || item.title.to_lowercase().contains(&needle))
        .filter(|item| category == ALL_CATEGORIES || item.category == category)
        .collect()
}

/// The only filter state a session keeps. Results are always recomputed from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    #[serde(default)]
    pub query: String,
    #[serde(default = "all_categories")]
    pub category: String,
}

fn all_categories() -> String {
    ALL_CATEGORIES.to_string()
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            query: String::new(),
            category: all_categories(),
        }
    }
}

impl FilterState {
    pub fn new(query: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: category.into(),
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_default(&self) -> bool {
        self.query.is_empty() && self.category == ALL_CATEGORIES
    }

    pub fn apply<'a, I>(&self, items: I, total: usize) -> FilterResult<'a>
    where
        I: IntoIterator<Item = &'a CatalogItem>,
    {
        FilterResult {
            items: filter(items, &self.query, &self.category),
            total,
        }
    }
}

/// Visible subset plus what the grid needs to describe it.
#[derive(Debug)]
pub struct FilterResult<'a> {
    pub items: Vec<&'a CatalogItem>,
    pub total: usize,
}

impl FilterResult<'_> {
    pub fn shown(&self) -> usize {
        self.items.len()
    }

    pub fn summary(&self) -> String {
        format!("Showing {} of {} movies", self.shown(), self.total)
    }

    /// `Some` when nothing matched; the grid must show it instead of staying blank.
    pub fn empty_message(&self) -> Option<&'static str> {
        self.items.is_empty().then_some(NO_RESULTS_MESSAGE)
    }
}
