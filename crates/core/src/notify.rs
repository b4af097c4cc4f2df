use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How long a notification stays up unless replaced or dismissed.
pub const DEFAULT_VISIBLE_FOR: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn filter_applied(shown: usize, total: usize) -> Self {
        Self::new(
            NotificationKind::Info,
            "Filter applied",
            format!("Showing {shown} of {total} movies"),
        )
    }

    pub fn filters_cleared() -> Self {
        Self::new(NotificationKind::Info, "Filters cleared", "Showing all movies")
    }

    pub fn access_granted(title: &str) -> Self {
        Self::new(
            NotificationKind::Success,
            "Access granted",
            format!("Enjoy watching {title}"),
        )
    }

    pub fn access_denied() -> Self {
        Self::new(NotificationKind::Error, "Access denied", "Incorrect password")
    }

    pub fn item_not_found(raw_id: &str) -> Self {
        Self::new(
            NotificationKind::Error,
            "Not found",
            format!("No movie with id {raw_id}, back to the listing"),
        )
    }

    pub fn video_ready(title: &str) -> Self {
        Self::new(
            NotificationKind::Success,
            "Video ready",
            format!("{title} is ready to play"),
        )
    }

    pub fn video_failed(title: &str) -> Self {
        Self::new(
            NotificationKind::Error,
            "Video error",
            format!("{title} could not be loaded"),
        )
    }
}

/// Handle for the auto-dismissal of one specific notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DismissTicket(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShownNotification {
    pub id: DismissTicket,
    #[serde(flatten)]
    pub notification: Notification,
    pub shown_at: DateTime<Utc>,
}

/// At most one visible notification. Showing replaces; no queue.
#[derive(Debug, Default)]
pub struct NotificationCenter {
    current: Option<ShownNotification>,
    last_id: u64,
}

impl NotificationCenter {
    pub fn show(&mut self, notification: Notification) -> DismissTicket {
        self.last_id += 1;
        let id = DismissTicket(self.last_id);
        self.current = Some(ShownNotification {
            id,
            notification,
            shown_at: Utc::now(),
        });
        id
    }

    pub fn current(&self) -> Option<&ShownNotification> {
        self.current.as_ref()
    }

    /// Timer-driven dismissal. Only hides the notification it was issued for.
    pub fn expire(&mut self, ticket: DismissTicket) -> bool {
        if self.current.as_ref().is_some_and(|n| n.id == ticket) {
            self.current = None;
            true
        } else {
            false
        }
    }

    /// Explicit dismissal of whatever is visible.
    pub fn dismiss(&mut self) -> Option<DismissTicket> {
        self.current.take().map(|n| n.id)
    }
}
