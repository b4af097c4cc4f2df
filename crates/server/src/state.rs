use std::sync::Arc;

use futures::Stream;
use moviewatch_core::catalog::Catalog;
use moviewatch_core::notify::ShownNotification;
use moviewatch_core::store::KeyValueStore;

use tokio::sync::broadcast;

use crate::config::ServerConfig;
use crate::session::SessionManager;

/// Server-sent event types.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "notification_shown")]
    NotificationShown {
        session_id: String,
        notification: ShownNotification,
    },
    #[serde(rename = "notification_dismissed")]
    NotificationDismissed { session_id: String, id: u64 },
    #[serde(rename = "session_closed")]
    SessionClosed { session_id: String },
    #[serde(rename = "heartbeat")]
    Heartbeat { seq: u64 },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotificationShown { .. } => "notification_shown",
            Self::NotificationDismissed { .. } => "notification_dismissed",
            Self::SessionClosed { .. } => "session_closed",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }

    /// Owning session, or `None` for server-wide events such as heartbeats.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::NotificationShown { session_id, .. }
            | Self::NotificationDismissed { session_id, .. }
            | Self::SessionClosed { session_id } => Some(session_id),
            Self::Heartbeat { .. } => None,
        }
    }
}

/// An item on one session's event feed.
#[derive(Debug, Clone)]
pub enum FeedItem {
    Event(ServerEvent),
    /// The receiver fell behind and this many events were dropped.
    Lagged(u64),
}

/// Events addressed to `session_id` plus heartbeats. Ends once the session
/// is closed or the broadcast channel shuts down.
pub fn session_feed(
    mut rx: broadcast::Receiver<ServerEvent>,
    session_id: String,
) -> impl Stream<Item = FeedItem> {
    async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(evt) => {
                    if evt.session_id().is_some_and(|owner| owner != session_id) {
                        continue;
                    }
                    let closed = matches!(evt, ServerEvent::SessionClosed { .. });
                    yield FeedItem::Event(evt);
                    if closed {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => yield FeedItem::Lagged(n),
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<Catalog>,
    pub sessions: Arc<SessionManager>,
    pub visits: Arc<dyn KeyValueStore>,
    pub config: Arc<ServerConfig>,
    pub events: broadcast::Sender<ServerEvent>,
}

impl AppState {
    pub fn new(
        catalog: Catalog,
        config: ServerConfig,
        visits: Arc<dyn KeyValueStore>,
        events: broadcast::Sender<ServerEvent>,
    ) -> Self {
        let catalog = Arc::new(catalog);
        let sessions = Arc::new(SessionManager::new(
            catalog.clone(),
            config.notification_visible_for,
            config.session_idle_timeout,
            events.clone(),
        ));
        Self {
            catalog,
            sessions,
            visits,
            config: Arc::new(config),
            events,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn feed_skips_other_sessions_and_ends_on_close() {
        let (tx, rx) = broadcast::channel(16);
        let feed = session_feed(rx, "b".to_string());

        tx.send(ServerEvent::NotificationDismissed { session_id: "a".into(), id: 1 }).unwrap();
        tx.send(ServerEvent::Heartbeat { seq: 1 }).unwrap();
        tx.send(ServerEvent::NotificationDismissed { session_id: "b".into(), id: 2 }).unwrap();
        tx.send(ServerEvent::SessionClosed { session_id: "a".into() }).unwrap();
        tx.send(ServerEvent::SessionClosed { session_id: "b".into() }).unwrap();
        tx.send(ServerEvent::Heartbeat { seq: 2 }).unwrap();

        let names: Vec<_> = feed
            .map(|item| match item {
                FeedItem::Event(evt) => {
                    assert_ne!(evt.session_id(), Some("a"));
                    evt.name()
                }
                FeedItem::Lagged(_) => "lagged",
            })
            .collect()
            .await;
        assert_eq!(names, ["heartbeat", "notification_dismissed", "session_closed"]);
    }
}
