use serde::{Deserialize, Serialize};

use crate::types::ItemId;

/// Player status while something is bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Loading,
    Ready,
    Failed,
}

/// Identifies one bind of a source to the player. Signals carry it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadTicket(pub u64);

/// Event reported by the host media element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaSignal {
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Binding {
    pub ticket: LoadTicket,
    pub url: String,
    pub episode_id: Option<ItemId>,
    pub status: PlaybackStatus,
}

/// What happened to a media signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Applied(PlaybackStatus),
    /// Ticket belongs to an older bind, or the panel is already settled.
    Ignored,
}

/// Passive binder between the selection and the host media element.
///
/// It never fetches the URL. Each bind hands out a fresh ticket and only
/// signals carrying the current ticket move the status out of `Loading`.
#[derive(Debug, Default)]
pub struct PlaybackPanel {
    binding: Option<Binding>,
    last_ticket: u64,
}

impl PlaybackPanel {
    pub fn bind(&mut self, url: impl Into<String>, episode_id: Option<ItemId>) -> LoadTicket {
        self.last_ticket += 1;
        let ticket = LoadTicket(self.last_ticket);
        self.binding = Some(Binding {
            ticket,
            url: url.into(),
            episode_id,
            status: PlaybackStatus::Loading,
        });
        ticket
    }

    pub fn unbind(&mut self) {
        self.binding = None;
    }

    pub fn binding(&self) -> Option<&Binding> {
        self.binding.as_ref()
    }

    pub fn status(&self) -> Option<PlaybackStatus> {
        self.binding.as_ref().map(|b| b.status)
    }

    pub fn signal(&mut self, ticket: LoadTicket, signal: MediaSignal) -> SignalOutcome {
        let Some(binding) = self.binding.as_mut() else {
            return SignalOutcome::Ignored;
        };
        if binding.ticket != ticket || binding.status != PlaybackStatus::Loading {
            return SignalOutcome::Ignored;
        }
        binding.status = match signal {
            MediaSignal::Ready => PlaybackStatus::Ready,
            MediaSignal::Error => PlaybackStatus::Failed,
        };
        SignalOutcome::Applied(binding.status)
    }
}
