use serde::{Deserialize, Serialize};

use crate::store::{HAS_VISITED, KeyValueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupKind {
    Welcome,
    Feature,
    Info,
}

impl PopupKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Welcome => "welcome",
            Self::Feature => "feature",
            Self::Info => "info",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "welcome" => Some(Self::Welcome),
            "feature" => Some(Self::Feature),
            "info" => Some(Self::Info),
            _ => None,
        }
    }
}

impl std::fmt::Display for PopupKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a click on an open popup landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickOrigin {
    /// The dimmed overlay around the dialog.
    Backdrop,
    /// Anywhere inside the dialog content.
    Body,
    CloseButton,
}

/// Modal overlays. Independent flags, closed only by the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Popups {
    pub welcome: bool,
    pub feature: bool,
    pub info: bool,
}

impl Popups {
    /// Opens the welcome popup for first-time visitors and marks them visited.
    pub fn on_start(store: &dyn KeyValueStore) -> Self {
        let mut popups = Self::default();
        if store.get(HAS_VISITED).is_none() {
            popups.open(PopupKind::Welcome);
            store.set(HAS_VISITED, "true");
        }
        popups
    }

    fn flag(&mut self, kind: PopupKind) -> &mut bool {
        match kind {
            PopupKind::Welcome => &mut self.welcome,
            PopupKind::Feature => &mut self.feature,
            PopupKind::Info => &mut self.info,
        }
    }

    pub fn is_open(&self, kind: PopupKind) -> bool {
        match kind {
            PopupKind::Welcome => self.welcome,
            PopupKind::Feature => self.feature,
            PopupKind::Info => self.info,
        }
    }

    pub fn open(&mut self, kind: PopupKind) {
        *self.flag(kind) = true;
    }

    /// Returns whether the click closed the popup. Clicks inside the body do
    /// not reach the backdrop handler.
    pub fn click(&mut self, kind: PopupKind, origin: ClickOrigin) -> bool {
        let flag = self.flag(kind);
        if !*flag || origin == ClickOrigin::Body {
            return false;
        }
        *flag = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn welcome_only_on_first_visit() {
        let store = MemoryStore::default();
        assert!(Popups::on_start(&store).welcome);
        assert!(!Popups::on_start(&store).welcome);
    }

    #[test]
    fn body_click_does_not_close() {
        let mut popups = Popups::default();
        popups.open(PopupKind::Info);
        assert!(!popups.click(PopupKind::Info, ClickOrigin::Body));
        assert!(popups.info);
        assert!(popups.click(PopupKind::Info, ClickOrigin::Backdrop));
        assert!(!popups.info);
    }

    #[test]
    fn popups_are_independent() {
        let mut popups = Popups::default();
        popups.open(PopupKind::Feature);
        popups.open(PopupKind::Info);
        popups.click(PopupKind::Feature, ClickOrigin::CloseButton);
        assert!(!popups.is_open(PopupKind::Feature));
        assert!(popups.is_open(PopupKind::Info));
        assert!(!popups.click(PopupKind::Feature, ClickOrigin::Backdrop));
    }

    #[test]
    fn parse_round_trip() {
        for kind in [PopupKind::Welcome, PopupKind::Feature, PopupKind::Info] {
            assert_eq!(PopupKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(PopupKind::parse("modal"), None);
    }
}
