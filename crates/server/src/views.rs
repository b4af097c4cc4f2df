use moviewatch_core::catalog::Catalog;
use moviewatch_core::filter::{FilterResult, FilterState};
use moviewatch_core::notify::ShownNotification;
use moviewatch_core::playback::Binding;
use moviewatch_core::popup::Popups;
use moviewatch_core::types::{CatalogItem, EpisodeSummary, ErrorKind, ItemSummary};
use serde::Serialize;

/// One rendered grid: the visible items and how to describe them.
#[derive(Debug, Serialize)]
pub struct CatalogPage {
    pub items: Vec<ItemSummary>,
    pub shown: usize,
    pub total: usize,
    pub summary: String,
    pub empty_message: Option<&'static str>,
}

impl From<FilterResult<'_>> for CatalogPage {
    fn from(res: FilterResult<'_>) -> Self {
        Self {
            shown: res.shown(),
            total: res.total,
            summary: res.summary(),
            empty_message: res.empty_message(),
            items: res.items.into_iter().map(ItemSummary::from).collect(),
        }
    }
}

impl CatalogPage {
    pub fn build(catalog: &Catalog, filter: &FilterState) -> Self {
        filter.apply(catalog.iter(), catalog.len()).into()
    }
}

#[derive(Debug, Serialize)]
pub struct ItemDetail {
    #[serde(flatten)]
    pub summary: ItemSummary,
    pub episodes: Vec<EpisodeSummary>,
}

impl From<&CatalogItem> for ItemDetail {
    fn from(item: &CatalogItem) -> Self {
        Self {
            summary: ItemSummary::from(item),
            episodes: item
                .episodes
                .iter()
                .flatten()
                .map(EpisodeSummary::from)
                .collect(),
        }
    }
}

/// Everything a client needs to render one browsing session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub id: String,
    pub phase: &'static str,
    pub item: Option<ItemSummary>,
    pub episode: Option<EpisodeSummary>,
    pub playback: Option<Binding>,
    pub password_attempted: bool,
    pub last_error: Option<ErrorKind>,
    pub notification: Option<ShownNotification>,
    pub popups: Popups,
    pub filter: FilterState,
    pub page: CatalogPage,
}
