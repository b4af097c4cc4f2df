use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use moviewatch_core::error::ApiError;
use moviewatch_core::filter::FilterState;
use moviewatch_core::playback::{LoadTicket, MediaSignal};
use moviewatch_core::popup::{ClickOrigin, PopupKind, Popups};
use moviewatch_core::store::Namespaced;
use moviewatch_core::types::{ALL_CATEGORIES, ItemId};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::bot_guard::{BotGuard, bot_guard_middleware};
use crate::error::AppError;
use crate::session::MediaReport;
use crate::state::{AppState, FeedItem, session_feed};
use crate::views::{CatalogPage, ItemDetail, SessionView};

pub fn build_router(state: AppState) -> Router {
    let guard = BotGuard::from_config(&state.config);

    let guarded = Router::new()
        .nest("/api/v1", api_router())
        .route("/v/{id}", get(deep_link))
        .layer(
            ServiceBuilder::new()
                .layer(Extension(guard))
                .layer(axum::middleware::from_fn(bot_guard_middleware)),
        );

    Router::new()
        .route("/health", get(health))
        .merge(guarded)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_router() -> Router<AppState> {
    Router::new()
        // Catalog (stateless)
        .route("/catalog", get(list_catalog))
        .route("/categories", get(list_categories))
        .route("/items/{id}", get(get_item))
        // Browsing sessions
        .route("/sessions", post(create_session))
        .route("/sessions/{sid}", get(get_session).delete(delete_session))
        .route("/sessions/{sid}/filter", axum::routing::put(put_filter))
        .route("/sessions/{sid}/filter/clear", post(clear_filter))
        .route("/sessions/{sid}/select", post(select_item))
        .route("/sessions/{sid}/password", post(submit_password))
        .route("/sessions/{sid}/episode", post(select_episode))
        .route("/sessions/{sid}/close", post(close_player))
        .route("/sessions/{sid}/media", post(media_signal))
        .route(
            "/sessions/{sid}/notification/dismiss",
            post(dismiss_notification),
        )
        .route("/sessions/{sid}/popups/{kind}/open", post(open_popup))
        .route("/sessions/{sid}/popups/{kind}/close", post(close_popup))
        .route("/sessions/{sid}/events", get(sse_events))
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    items: usize,
    sessions: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        items: state.catalog.len(),
        sessions: state.sessions.active_count().await,
    })
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct CatalogQuery {
    #[serde(default)]
    q: String,
    category: Option<String>,
}

async fn list_catalog(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> Json<CatalogPage> {
    let filter = FilterState::new(
        query.q,
        query.category.unwrap_or_else(|| ALL_CATEGORIES.to_string()),
    );
    Json(CatalogPage::build(&state.catalog, &filter))
}

async fn list_categories(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.catalog.categories())
}

async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ItemDetail>, AppError> {
    let item = state
        .catalog
        .resolve_route(&id)
        .ok_or_else(|| ApiError::ItemNotFound(id.clone()))?;
    Ok(Json(ItemDetail::from(item.as_ref())))
}

/// Deep link to a title. Unknown ids go back to the listing.
async fn deep_link(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.catalog.resolve_route(&id) {
        Some(item) => Json(ItemDetail::from(item.as_ref())).into_response(),
        None => {
            tracing::debug!(id = %id, "deep link to unknown item, redirecting");
            Redirect::temporary("/").into_response()
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/// Visitors identify themselves with `X-Visitor-Id`; anonymous visitors
/// always count as first-time.
async fn create_session(State(state): State<AppState>, headers: HeaderMap) -> Json<SessionView> {
    let visitor = headers
        .get("x-visitor-id")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty());

    let popups = match visitor {
        Some(visitor) => Popups::on_start(&Namespaced::new(state.visits.as_ref(), visitor)),
        None => {
            let mut popups = Popups::default();
            popups.open(PopupKind::Welcome);
            popups
        }
    };
    Json(state.sessions.create(popups).await)
}

async fn get_session(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.view(&sid).await?))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.sessions.remove(&sid).await?;
    Ok(Json(serde_json::json!({ "closed": true })))
}

async fn put_filter(
    State(state): State<AppState>,
    Path(sid): Path<String>,
    Json(body): Json<FilterState>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.set_filter(&sid, body).await?))
}

async fn clear_filter(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.clear_filter(&sid).await?))
}

#[derive(Deserialize)]
struct SelectRequest {
    item_id: ItemId,
}

async fn select_item(
    State(state): State<AppState>,
    Path(sid): Path<String>,
    Json(body): Json<SelectRequest>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.select(&sid, &body.item_id).await?))
}

#[derive(Deserialize)]
struct PasswordRequest {
    password: String,
}

async fn submit_password(
    State(state): State<AppState>,
    Path(sid): Path<String>,
    Json(body): Json<PasswordRequest>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        state.sessions.submit_password(&sid, &body.password).await?,
    ))
}

#[derive(Deserialize)]
struct EpisodeRequest {
    episode_id: ItemId,
}

async fn select_episode(
    State(state): State<AppState>,
    Path(sid): Path<String>,
    Json(body): Json<EpisodeRequest>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(
        state.sessions.select_episode(&sid, &body.episode_id).await?,
    ))
}

async fn close_player(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.close(&sid).await?))
}

#[derive(Deserialize)]
struct MediaRequest {
    ticket: LoadTicket,
    event: MediaSignal,
}

async fn media_signal(
    State(state): State<AppState>,
    Path(sid): Path<String>,
    Json(body): Json<MediaRequest>,
) -> Result<Json<MediaReport>, AppError> {
    Ok(Json(
        state
            .sessions
            .media_signal(&sid, body.ticket, body.event)
            .await?,
    ))
}

async fn dismiss_notification(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.sessions.dismiss_notification(&sid).await?))
}

fn parse_popup(kind: &str) -> Result<PopupKind, ApiError> {
    PopupKind::parse(kind).ok_or_else(|| ApiError::NotFound(format!("popup {kind}")))
}

async fn open_popup(
    State(state): State<AppState>,
    Path((sid, kind)): Path<(String, String)>,
) -> Result<Json<SessionView>, AppError> {
    let kind = parse_popup(&kind)?;
    Ok(Json(state.sessions.open_popup(&sid, kind).await?))
}

#[derive(Deserialize)]
struct PopupClick {
    #[serde(default = "default_origin")]
    origin: ClickOrigin,
}

fn default_origin() -> ClickOrigin {
    ClickOrigin::CloseButton
}

async fn close_popup(
    State(state): State<AppState>,
    Path((sid, kind)): Path<(String, String)>,
    body: Option<Json<PopupClick>>,
) -> Result<Json<SessionView>, AppError> {
    let kind = parse_popup(&kind)?;
    let origin = body.map_or_else(default_origin, |Json(click)| click.origin);
    Ok(Json(state.sessions.click_popup(&sid, kind, origin).await?))
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Live feed for one session. Other sessions' events never reach it.
async fn sse_events(
    State(state): State<AppState>,
    Path(sid): Path<String>,
) -> Result<
    axum::response::Sse<
        impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>,
    >,
    AppError,
> {
    use axum::response::sse::Event;
    use futures::StreamExt;
    use std::convert::Infallible;
    use std::time::Duration;

    // Subscribe before the lookup so nothing sent in between is missed.
    let rx = state.events.subscribe();
    state.sessions.view(&sid).await?;

    let stream = session_feed(rx, sid).filter_map(|item| async move {
        let event = match item {
            FeedItem::Event(evt) => {
                let data = serde_json::to_string(&evt).ok()?;
                Event::default().event(evt.name()).data(data)
            }
            FeedItem::Lagged(n) => Event::default()
                .event("error")
                .data(format!(r#"{{"lagged":{n}}}"#)),
        };
        Some(Ok::<_, Infallible>(event))
    });

    Ok(axum::response::Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    ))
}
