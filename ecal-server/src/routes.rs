//! HTTP routes.

use crate::errors::Result;
use crate::state::AppState;
use crate::status::{StatusSnapshot, SyncProcessInfo};
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use ecal_calendar::{CalendarEvent, CalendarInfo, Settings};
use ecal_sync::{HashPayload, SyncStatus};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

type Shared = State<Arc<AppState>>;

/// All server routes over `state`.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/events", get(events))
        .route("/api/calendar_list", get(calendar_list))
        .route("/api/settings", get(get_settings).post(post_settings))
        .route("/image", get(image))
        .route("/hash", get(hash))
        .route("/api/refresh", post(refresh))
        .route("/api/status", get(get_status).post(post_status))
        .route("/api/logs", get(logs))
        .route("/api/sync", get(sync_info))
        .route("/api/sync/start", post(sync_start))
        .route("/api/sync/stop", post(sync_stop))
        .with_state(state)
}

async fn events(State(state): Shared) -> Result<Json<Vec<CalendarEvent>>> {
    Ok(Json(state.events().await?))
}

#[derive(Serialize)]
struct CalendarList {
    calendars: Vec<CalendarInfo>,
}

async fn calendar_list(State(state): Shared) -> Result<Json<CalendarList>> {
    Ok(Json(CalendarList {
        calendars: state.calendars().await?,
    }))
}

async fn get_settings(State(state): Shared) -> Result<Json<Settings>> {
    Ok(Json(state.settings.get()?))
}

#[derive(Serialize)]
struct SettingsSaved {
    success: bool,
    settings: Settings,
}

async fn post_settings(
    State(state): Shared,
    Json(update): Json<Value>,
) -> Result<Json<SettingsSaved>> {
    let settings = state.settings.update(&update)?;
    Ok(Json(SettingsSaved {
        success: true,
        settings,
    }))
}

async fn image(State(state): Shared) -> Result<impl IntoResponse> {
    let rendered = state.current_image().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CACHE_CONTROL, "no-store".to_string()),
            (header::ETAG, format!("\"{}\"", rendered.hash)),
        ],
        rendered.png,
    ))
}

async fn hash(State(state): Shared) -> Result<Json<HashPayload>> {
    Ok(Json(state.hash().await?))
}

async fn refresh(State(state): Shared) -> Result<Json<Value>> {
    let rendered = state.refresh().await?;
    Ok(Json(json!({ "success": true, "hash": rendered.hash })))
}

async fn get_status(State(state): Shared) -> Json<StatusSnapshot> {
    Json(state.status.get())
}

async fn post_status(State(state): Shared, Json(status): Json<SyncStatus>) -> Json<Value> {
    state.status.set(status);
    Json(json!({ "success": true }))
}

#[derive(Deserialize)]
struct LogQuery {
    limit: Option<usize>,
}

async fn logs(State(state): Shared, Query(query): Query<LogQuery>) -> Json<Value> {
    Json(json!({ "logs": state.logs.recent(query.limit) }))
}

async fn sync_info(State(state): Shared) -> Json<SyncProcessInfo> {
    Json(state.sync.info().await)
}

async fn sync_start(State(state): Shared) -> Result<Json<SyncProcessInfo>> {
    Ok(Json(state.sync.start().await?))
}

async fn sync_stop(State(state): Shared) -> Result<Json<SyncProcessInfo>> {
    Ok(Json(state.sync.stop().await?))
}
