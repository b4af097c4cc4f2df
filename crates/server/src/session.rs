use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use moviewatch_core::catalog::Catalog;
use moviewatch_core::error::ApiError;
use moviewatch_core::filter::FilterState;
use moviewatch_core::gate::{GatePhase, SelectionController, Unlock};
use moviewatch_core::notify::{DismissTicket, Notification, NotificationCenter};
use moviewatch_core::playback::{LoadTicket, MediaSignal, PlaybackStatus, SignalOutcome};
use moviewatch_core::popup::{ClickOrigin, PopupKind, Popups};
use moviewatch_core::types::{EpisodeSummary, ItemId, ItemSummary};
use tokio::sync::{Mutex, broadcast};
use tokio::time::Instant;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::state::ServerEvent;
use crate::views::{CatalogPage, SessionView};

/// Pending auto-dismissal. Dropping it cancels the timer task.
pub struct DismissTimer {
    _guard: DropGuard,
}

/// One visitor's view of the site.
pub struct BrowsingSession {
    pub id: String,
    pub gate: SelectionController,
    pub filter: FilterState,
    pub notifications: NotificationCenter,
    pub popups: Popups,
    pub last_seen: Instant,
    timer: Option<DismissTimer>,
}

impl BrowsingSession {
    fn new(id: String, popups: Popups) -> Self {
        Self {
            id,
            gate: SelectionController::new(),
            filter: FilterState::default(),
            notifications: NotificationCenter::default(),
            popups,
            last_seen: Instant::now(),
            timer: None,
        }
    }

    fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn has_pending_dismissal(&self) -> bool {
        self.timer.is_some()
    }

    pub fn view(&self, catalog: &Catalog) -> SessionView {
        let selection = self.gate.selection();
        SessionView {
            id: self.id.clone(),
            phase: self.gate.phase().as_str(),
            item: selection.map(|s| ItemSummary::from(s.item.as_ref())),
            episode: selection
                .and_then(|s| s.episode.as_ref())
                .map(EpisodeSummary::from),
            playback: self.gate.binding().cloned(),
            password_attempted: selection.is_some_and(|s| !s.attempted_password.is_empty()),
            last_error: selection.and_then(|s| s.last_error),
            notification: self.notifications.current().cloned(),
            popups: self.popups,
            filter: self.filter.clone(),
            page: CatalogPage::build(catalog, &self.filter),
        }
    }
}

/// Result of reporting a media event.
#[derive(Debug, serde::Serialize)]
pub struct MediaReport {
    pub applied: bool,
    pub session: SessionView,
}

/// Owns every live browsing session and their notification timers.
pub struct SessionManager {
    catalog: Arc<Catalog>,
    sessions: Arc<Mutex<HashMap<String, BrowsingSession>>>,
    visible_for: Duration,
    idle_timeout: Duration,
    events: broadcast::Sender<ServerEvent>,
}

type Sessions = HashMap<String, BrowsingSession>;

fn lookup<'a>(sessions: &'a mut Sessions, id: &str) -> Result<&'a mut BrowsingSession, ApiError> {
    let session = sessions
        .get_mut(id)
        .ok_or_else(|| ApiError::NotFound(format!("session {id}")))?;
    session.touch();
    Ok(session)
}

impl SessionManager {
    pub fn new(
        catalog: Arc<Catalog>,
        visible_for: Duration,
        idle_timeout: Duration,
        events: broadcast::Sender<ServerEvent>,
    ) -> Self {
        Self {
            catalog,
            sessions: Arc::new(Mutex::new(HashMap::new())),
            visible_for,
            idle_timeout,
            events,
        }
    }

    pub async fn create(&self, popups: Popups) -> SessionView {
        let id = uuid::Uuid::new_v4().to_string();
        let session = BrowsingSession::new(id.clone(), popups);
        let view = session.view(&self.catalog);
        self.sessions.lock().await.insert(id.clone(), session);
        info!(session_id = %id, welcome = popups.welcome, "browsing session created");
        view
    }

    pub async fn view(&self, id: &str) -> Result<SessionView, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = lookup(&mut sessions, id)?;
        Ok(session.view(&self.catalog))
    }

    /// Tear the session down. Its pending dismissal is cancelled with it.
    pub async fn remove(&self, id: &str) -> Result<(), ApiError> {
        let removed = self.sessions.lock().await.remove(id);
        match removed {
            Some(_) => {
                let _ = self.events.send(ServerEvent::SessionClosed {
                    session_id: id.to_string(),
                });
                info!(session_id = id, "browsing session closed");
                Ok(())
            }
            None => Err(ApiError::NotFound(format!("session {id}"))),
        }
    }

    pub async fn set_filter(&self, id: &str, filter: FilterState) -> Result<SessionView, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = lookup(&mut sessions, id)?;
        session.filter = filter;
        let page = CatalogPage::build(&self.catalog, &session.filter);
        self.notify(session, Notification::filter_applied(page.shown, page.total));
        Ok(session.view(&self.catalog))
    }

    pub async fn clear_filter(&self, id: &str) -> Result<SessionView, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = lookup(&mut sessions, id)?;
        session.filter.clear();
        self.notify(session, Notification::filters_cleared());
        Ok(session.view(&self.catalog))
    }

    /// Pick a title. Ids match the way `/v/{id}` does, so `"1"` and `1`
    /// name the same item. Unlocked titles go straight to the player; unknown
    /// ids close the player and send the visitor back to the listing.
    pub async fn select(&self, id: &str, item_id: &ItemId) -> Result<SessionView, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = lookup(&mut sessions, id)?;

        let Some(item) = self.catalog.resolve_route(&item_id.to_string()) else {
            session.gate.close();
            self.notify(session, Notification::item_not_found(&item_id.to_string()));
            return Err(ApiError::ItemNotFound(item_id.to_string()));
        };

        let phase = session.gate.select(item);
        if phase == GatePhase::SelectedUnlocked {
            session.gate.play()?;
        }
        debug!(session_id = id, item_id = %item_id, phase = %session.gate.phase(), "item selected");
        Ok(session.view(&self.catalog))
    }

    pub async fn submit_password(&self, id: &str, candidate: &str) -> Result<SessionView, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = lookup(&mut sessions, id)?;

        match session.gate.submit_password(candidate)? {
            Unlock::Granted => {
                session.gate.play()?;
                let title = session
                    .gate
                    .selection()
                    .map(|s| s.item.title.clone())
                    .unwrap_or_default();
                info!(session_id = id, title = %title, "access granted");
                self.notify(session, Notification::access_granted(&title));
            }
            Unlock::Denied => {
                info!(session_id = id, "wrong password");
                self.notify(session, Notification::access_denied());
            }
        }
        Ok(session.view(&self.catalog))
    }

    pub async fn select_episode(&self, id: &str, episode_id: &ItemId) -> Result<SessionView, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = lookup(&mut sessions, id)?;
        let ticket = session.gate.select_episode(episode_id)?;
        debug!(session_id = id, episode_id = %episode_id, ticket = ticket.0, "episode bound");
        Ok(session.view(&self.catalog))
    }

    pub async fn close(&self, id: &str) -> Result<SessionView, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = lookup(&mut sessions, id)?;
        session.gate.close();
        Ok(session.view(&self.catalog))
    }

    pub async fn media_signal(
        &self,
        id: &str,
        ticket: LoadTicket,
        signal: MediaSignal,
    ) -> Result<MediaReport, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = lookup(&mut sessions, id)?;

        let outcome = session.gate.media_signal(ticket, signal);
        let title = session
            .gate
            .selection()
            .map(|s| s.item.title.clone())
            .unwrap_or_default();
        match outcome {
            SignalOutcome::Applied(PlaybackStatus::Ready) => {
                self.notify(session, Notification::video_ready(&title));
            }
            SignalOutcome::Applied(PlaybackStatus::Failed) => {
                info!(session_id = id, title = %title, "media failed to load");
                self.notify(session, Notification::video_failed(&title));
            }
            SignalOutcome::Applied(PlaybackStatus::Loading) => {}
            SignalOutcome::Ignored => {
                debug!(session_id = id, ticket = ticket.0, ?signal, "stale media signal ignored");
            }
        }

        Ok(MediaReport {
            applied: outcome != SignalOutcome::Ignored,
            session: session.view(&self.catalog),
        })
    }

    pub async fn dismiss_notification(&self, id: &str) -> Result<SessionView, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = lookup(&mut sessions, id)?;
        session.timer = None;
        if let Some(ticket) = session.notifications.dismiss() {
            let _ = self.events.send(ServerEvent::NotificationDismissed {
                session_id: id.to_string(),
                id: ticket.0,
            });
        }
        Ok(session.view(&self.catalog))
    }

    pub async fn open_popup(&self, id: &str, kind: PopupKind) -> Result<SessionView, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = lookup(&mut sessions, id)?;
        session.popups.open(kind);
        Ok(session.view(&self.catalog))
    }

    pub async fn click_popup(
        &self,
        id: &str,
        kind: PopupKind,
        origin: ClickOrigin,
    ) -> Result<SessionView, ApiError> {
        let mut sessions = self.sessions.lock().await;
        let session = lookup(&mut sessions, id)?;
        let closed = session.popups.click(kind, origin);
        debug!(session_id = id, popup = %kind, ?origin, closed, "popup click");
        Ok(session.view(&self.catalog))
    }

    /// Drop sessions nobody has touched within the idle timeout.
    pub async fn cleanup_idle(&self) -> usize {
        let timeout = self.idle_timeout;
        let mut sessions = self.sessions.lock().await;
        let before = sessions.len();
        sessions.retain(|id, s| {
            let keep = s.last_seen.elapsed() < timeout;
            if !keep {
                info!(session_id = %id, "reaped idle browsing session");
                let _ = self.events.send(ServerEvent::SessionClosed {
                    session_id: id.clone(),
                });
            }
            keep
        });
        before - sessions.len()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Show a notification, replacing the visible one and its timer.
    fn notify(&self, session: &mut BrowsingSession, notification: Notification) {
        let ticket = session.notifications.show(notification);
        if let Some(shown) = session.notifications.current() {
            let _ = self.events.send(ServerEvent::NotificationShown {
                session_id: session.id.clone(),
                notification: shown.clone(),
            });
        }
        session.timer = Some(self.schedule_dismissal(session.id.clone(), ticket));
    }

    fn schedule_dismissal(&self, session_id: String, ticket: DismissTicket) -> DismissTimer {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let sessions = Arc::downgrade(&self.sessions);
        let events = self.events.clone();
        let after = self.visible_for;

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let Some(sessions) = sessions.upgrade() else { return };
                    let mut sessions = sessions.lock().await;
                    let Some(session) = sessions.get_mut(&session_id) else { return };
                    if session.notifications.expire(ticket) {
                        debug!(session_id = %session_id, id = ticket.0, "notification auto-dismissed");
                        let _ = events.send(ServerEvent::NotificationDismissed {
                            session_id: session_id.clone(),
                            id: ticket.0,
                        });
                    }
                }
            }
        });

        DismissTimer {
            _guard: token.drop_guard(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use moviewatch_core::notify::NotificationKind;

    fn manager(visible_for: Duration) -> SessionManager {
        let catalog = Catalog::from_json_str(
            r#"[
            {"id": 1, "title": "Foo", "category": "Drama", "url": "a.mp4"},
            {"id": 2, "title": "Bar", "category": "Comedy", "locked": true, "password": "x", "url": "b.mp4"}
        ]"#,
        )
        .unwrap();
        let (tx, _) = broadcast::channel(16);
        SessionManager::new(Arc::new(catalog), visible_for, Duration::from_secs(60), tx)
    }

    #[tokio::test(start_paused = true)]
    async fn replaced_notification_timer_does_not_hide_newer_one() {
        let mgr = manager(Duration::from_secs(3));
        let sid = mgr.create(Popups::default()).await.id;

        mgr.select(&sid, &ItemId::Int(2)).await.unwrap();
        mgr.submit_password(&sid, "x").await.unwrap();
        let view = mgr.view(&sid).await.unwrap();
        assert_eq!(view.notification.unwrap().notification.kind, NotificationKind::Success);

        tokio::time::sleep(Duration::from_secs(1)).await;
        mgr.select(&sid, &ItemId::Int(99)).await.unwrap_err();

        // t = 3.5s: the success timer would have fired by now
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let view = mgr.view(&sid).await.unwrap();
        assert_eq!(view.notification.unwrap().notification.kind, NotificationKind::Error);

        // t = 4.5s: the error's own timer has fired
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(mgr.view(&sid).await.unwrap().notification.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_dismissal() {
        let mgr = manager(Duration::from_secs(3));
        let sid = mgr.create(Popups::default()).await.id;
        mgr.clear_filter(&sid).await.unwrap();
        {
            let sessions = mgr.sessions.lock().await;
            assert!(sessions[&sid].has_pending_dismissal());
        }
        mgr.remove(&sid).await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(mgr.active_count().await, 0);
        assert!(mgr.view(&sid).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_dismiss_releases_timer() {
        let mgr = manager(Duration::from_secs(3));
        let sid = mgr.create(Popups::default()).await.id;
        mgr.clear_filter(&sid).await.unwrap();
        let view = mgr.dismiss_notification(&sid).await.unwrap();
        assert!(view.notification.is_none());
        let sessions = mgr.sessions.lock().await;
        assert!(!sessions[&sid].has_pending_dismissal());
    }

    #[tokio::test(start_paused = true)]
    async fn idle_sessions_are_reaped() {
        let mgr = manager(Duration::from_secs(3));
        let mut rx = mgr.events.subscribe();
        let stale = mgr.create(Popups::default()).await.id;
        tokio::time::sleep(Duration::from_secs(45)).await;
        let fresh = mgr.create(Popups::default()).await.id;
        tokio::time::sleep(Duration::from_secs(20)).await;

        assert_eq!(mgr.cleanup_idle().await, 1);
        assert!(mgr.view(&stale).await.is_err());
        assert!(mgr.view(&fresh).await.is_ok());

        match rx.try_recv().unwrap() {
            ServerEvent::SessionClosed { session_id } => assert_eq!(session_id, stale),
            other => panic!("unexpected event {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn unlocked_pick_goes_straight_to_loading() {
        let mgr = manager(Duration::from_secs(3));
        let sid = mgr.create(Popups::default()).await.id;
        let view = mgr.select(&sid, &ItemId::Int(1)).await.unwrap();
        assert_eq!(view.phase, "playing");
        let binding = view.playback.unwrap();
        assert_eq!(binding.status, PlaybackStatus::Loading);
        assert_eq!(binding.url, "a.mp4");

        let report = mgr
            .media_signal(&sid, binding.ticket, MediaSignal::Ready)
            .await
            .unwrap();
        assert!(report.applied);
        assert_eq!(report.session.playback.unwrap().status, PlaybackStatus::Ready);
        let shown = report.session.notification.unwrap();
        assert_eq!(shown.notification.kind, NotificationKind::Success);
        assert_eq!(shown.notification.title, "Video ready");
    }

    #[tokio::test(start_paused = true)]
    async fn media_failure_is_surfaced_and_stale_signal_is_silent() {
        let mgr = manager(Duration::from_secs(3));
        let sid = mgr.create(Popups::default()).await.id;
        let stale = mgr.select(&sid, &ItemId::Int(1)).await.unwrap().playback.unwrap().ticket;

        // Reopen the title: a fresh bind supersedes the first ticket.
        mgr.close(&sid).await.unwrap();
        let current = mgr.select(&sid, &ItemId::Int(1)).await.unwrap().playback.unwrap().ticket;
        assert_ne!(stale, current);

        let report = mgr.media_signal(&sid, current, MediaSignal::Error).await.unwrap();
        assert!(report.applied);
        let shown = report.session.notification.unwrap();
        assert_eq!(shown.notification.kind, NotificationKind::Error);
        assert_eq!(shown.notification.title, "Video error");
        let error_id = shown.id;

        let mut rx = mgr.events.subscribe();
        let report = mgr.media_signal(&sid, stale, MediaSignal::Ready).await.unwrap();
        assert!(!report.applied);
        let shown = report.session.notification.unwrap();
        assert_eq!(shown.id, error_id);
        assert_eq!(shown.notification.title, "Video error");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn select_accepts_ids_in_route_form() {
        let mgr = manager(Duration::from_secs(3));
        let sid = mgr.create(Popups::default()).await.id;
        let view = mgr.select(&sid, &ItemId::from("2")).await.unwrap();
        assert_eq!(view.phase, "selected_locked");
        assert_eq!(view.item.unwrap().title, "Bar");
    }
}
