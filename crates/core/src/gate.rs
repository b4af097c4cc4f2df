use std::sync::Arc;

use serde::Serialize;

use crate::error::GateError;
use crate::playback::{
    Binding, LoadTicket, MediaSignal, PlaybackPanel, PlaybackStatus, SignalOutcome,
};
use crate::types::{CatalogItem, Episode, ErrorKind, ItemId};

/// Where the selection currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "playback", rename_all = "snake_case")]
pub enum GatePhase {
    Idle,
    SelectedLocked,
    SelectedUnlocked,
    Playing(PlaybackStatus),
}

impl GatePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::SelectedLocked => "selected_locked",
            Self::SelectedUnlocked => "selected_unlocked",
            Self::Playing(_) => "playing",
        }
    }

    pub fn is_unlocked(&self) -> bool {
        matches!(self, Self::SelectedUnlocked | Self::Playing(_))
    }
}

impl std::fmt::Display for GatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a password submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unlock {
    Granted,
    Denied,
}

/// Transient per-session selection.
#[derive(Debug, Clone)]
pub struct Selection {
    pub item: Arc<CatalogItem>,
    pub episode: Option<Episode>,
    pub unlocked: bool,
    pub attempted_password: String,
    pub last_error: Option<ErrorKind>,
}

impl Selection {
    fn new(item: Arc<CatalogItem>) -> Self {
        Self {
            episode: item.first_episode().cloned(),
            unlocked: !item.locked,
            item,
            attempted_password: String::new(),
            last_error: None,
        }
    }

    /// Episode URL for series, the item URL otherwise.
    pub fn media_url(&self) -> &str {
        match &self.episode {
            Some(ep) => &ep.url,
            None => &self.item.url,
        }
    }
}

/// Selection & gate state machine, one per browsing session.
///
/// Movies and series share this controller; a series just carries a current
/// episode. Password comparison is plain `==` against the catalog's plaintext.
#[derive(Debug, Default)]
pub struct SelectionController {
    selection: Option<Selection>,
    panel: PlaybackPanel,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GatePhase {
        match &self.selection {
            None => GatePhase::Idle,
            Some(s) if !s.unlocked => GatePhase::SelectedLocked,
            Some(_) => match self.panel.status() {
                None => GatePhase::SelectedUnlocked,
                Some(status) => GatePhase::Playing(status),
            },
        }
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.panel.binding()
    }

    /// Pick an item. Re-picking the item that is already unlocked keeps its
    /// state unless its media failed, in which case the player is reset.
    pub fn select(&mut self, item: Arc<CatalogItem>) -> GatePhase {
        let same_unlocked = self
            .selection
            .as_ref()
            .is_some_and(|s| s.item.id == item.id && s.unlocked);
        if same_unlocked && self.panel.status() != Some(PlaybackStatus::Failed) {
            return self.phase();
        }

        self.panel.unbind();
        self.selection = Some(Selection::new(item));
        self.phase()
    }

    pub fn submit_password(&mut self, candidate: &str) -> Result<Unlock, GateError> {
        let selection = self.selection.as_mut().ok_or(GateError::NothingSelected)?;
        if selection.unlocked {
            return Err(GateError::NotLocked);
        }

        selection.attempted_password = candidate.to_string();
        if selection.item.password.as_deref() == Some(candidate) {
            selection.unlocked = true;
            selection.last_error = None;
            Ok(Unlock::Granted)
        } else {
            selection.last_error = Some(ErrorKind::WrongPassword);
            Ok(Unlock::Denied)
        }
    }

    /// Bind the resolved source to the player and enter `Playing(Loading)`.
    pub fn play(&mut self) -> Result<LoadTicket, GateError> {
        let selection = self.selection.as_ref().ok_or(GateError::NothingSelected)?;
        if !selection.unlocked {
            return Err(GateError::StillLocked);
        }
        let episode_id = selection.episode.as_ref().map(|e| e.id.clone());
        Ok(self.panel.bind(selection.media_url(), episode_id))
    }

    pub fn select_episode(&mut self, episode_id: &ItemId) -> Result<LoadTicket, GateError> {
        let selection = self.selection.as_mut().ok_or(GateError::NothingSelected)?;
        if !selection.unlocked {
            return Err(GateError::StillLocked);
        }
        if !selection.item.is_series() {
            return Err(GateError::NoEpisodes);
        }
        let episode = selection
            .item
            .episode(episode_id)
            .cloned()
            .ok_or_else(|| GateError::UnknownEpisode(episode_id.clone()))?;

        selection.episode = Some(episode);
        selection.last_error = None;
        let episode_id = selection.episode.as_ref().map(|e| e.id.clone());
        Ok(self.panel.bind(selection.media_url(), episode_id))
    }

    /// Feed a ready/error event from the media element.
    pub fn media_signal(&mut self, ticket: LoadTicket, signal: MediaSignal) -> SignalOutcome {
        let outcome = self.panel.signal(ticket, signal);
        if outcome == SignalOutcome::Applied(PlaybackStatus::Failed) {
            if let Some(selection) = self.selection.as_mut() {
                selection.last_error = Some(ErrorKind::MediaLoadFailed);
            }
        }
        outcome
    }

    pub fn close(&mut self) {
        self.panel.unbind();
        self.selection = None;
    }
}
